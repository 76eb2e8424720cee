//! Latest-wins widget aggregate dispatch
//!
//! Mutations publish fresh aggregates without waiting. An actor task owns
//! the queue: it keeps only the newest value by store revision, waits out a
//! short debounce so bursts collapse into one write, then hands the values
//! to the sink followed by a reload signal. A value older than one already
//! pending or published is dropped. A steady stream of publishes is written
//! at least once every [`MAX_WAIT_FACTOR`] debounce windows.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::sink::WidgetSink;
use crate::models::TravelStats;

/// Longest a pending value waits, in debounce windows from when it first became pending
pub const MAX_WAIT_FACTOR: u32 = 4;

/// Message types for the DispatchActor
enum DispatchMessage {
    Publish { revision: u64, stats: TravelStats },
    /// Publish the pending value now and acknowledge
    Flush(oneshot::Sender<()>),
    /// Publish the pending value and stop
    Shutdown,
}

struct DispatchActor {
    receiver: mpsc::UnboundedReceiver<DispatchMessage>,
    sink: Arc<dyn WidgetSink>,
    debounce: Duration,
    max_wait: Duration,
    pending: Option<(u64, TravelStats)>,
    pending_since: Instant,
    deadline: Instant,
    last_published: Option<u64>,
}

impl DispatchActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(DispatchMessage::Publish { revision, stats }) => {
                        self.accept(revision, stats);
                    }
                    Some(DispatchMessage::Flush(ack)) => {
                        self.publish_pending().await;
                        let _ = ack.send(());
                    }
                    Some(DispatchMessage::Shutdown) => {
                        info!("Widget dispatcher received shutdown signal, publishing...");
                        self.publish_pending().await;
                        break;
                    }
                    None => {
                        warn!("Widget dispatcher channel closed unexpectedly, publishing...");
                        self.publish_pending().await;
                        break;
                    }
                },
                _ = sleep_until(self.deadline), if self.pending.is_some() => {
                    self.publish_pending().await;
                }
            }
        }
    }

    fn accept(&mut self, revision: u64, stats: TravelStats) {
        let newest = self.pending.map(|(r, _)| r).max(self.last_published);
        if newest.is_some_and(|newest| revision <= newest) {
            debug!(revision, ?newest, "Dropping stale widget aggregates");
            return;
        }

        let now = Instant::now();
        if self.pending.is_none() {
            self.pending_since = now;
        }
        self.pending = Some((revision, stats));
        self.deadline = (now + self.debounce).min(self.pending_since + self.max_wait);
    }

    async fn publish_pending(&mut self) {
        let Some((revision, stats)) = self.pending.take() else {
            return;
        };
        self.last_published = Some(revision);

        if let Err(e) = self.sink.write(&stats).await {
            warn!(revision, "Failed to write widget data: {}", e);
            return;
        }
        if let Err(e) = self.sink.reload().await {
            warn!(revision, "Failed to signal widget reload: {}", e);
            return;
        }
        debug!(revision, ?stats, "Published widget aggregates");
    }
}

pub struct WidgetDispatcher {
    actor_tx: mpsc::UnboundedSender<DispatchMessage>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WidgetDispatcher {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

    /// Spawn the dispatcher actor. Must be called from within a tokio runtime.
    pub fn spawn(sink: Arc<dyn WidgetSink>, debounce: Duration) -> Self {
        let (actor_tx, receiver) = mpsc::unbounded_channel();

        let actor = DispatchActor {
            receiver,
            sink,
            debounce,
            max_wait: debounce * MAX_WAIT_FACTOR,
            pending: None,
            pending_since: Instant::now(),
            deadline: Instant::now(),
            last_published: None,
        };
        let handle = tokio::spawn(actor.run());

        Self {
            actor_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queue aggregates computed at `revision`; never blocks.
    pub fn publish(&self, revision: u64, stats: TravelStats) {
        if self
            .actor_tx
            .send(DispatchMessage::Publish { revision, stats })
            .is_err()
        {
            warn!(revision, "Widget dispatcher is stopped, dropping aggregates");
        }
    }

    /// Publish any pending aggregates immediately and wait for the sink.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.actor_tx.send(DispatchMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.actor_tx.send(DispatchMessage::Shutdown);
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Widget dispatcher task ended abnormally: {}", e);
            }
        }
    }
}
