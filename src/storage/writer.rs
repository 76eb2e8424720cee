//! Background snapshot persistence
//!
//! Mutations hand their new snapshot to the writer without waiting. A
//! background task saves only the most recent one, so a burst of mutations
//! collapses into a single write. Failed saves are logged and counted; the
//! in-memory state that produced them stays authoritative.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::models::VisitedSnapshot;
use crate::storage::SnapshotStorage;

#[derive(Debug)]
struct PendingSave {
    revision: u64,
    snapshot: VisitedSnapshot,
}

pub struct SnapshotWriter {
    /// Latest snapshot awaiting a save
    pending_tx: watch::Sender<Option<Arc<PendingSave>>>,
    /// Revision of the last save attempt, successful or not
    attempted_rx: watch::Receiver<u64>,
    shutdown_tx: watch::Sender<bool>,
    failures: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotWriter {
    /// Spawn the writer task. Must be called from within a tokio runtime.
    pub fn spawn(storage: Arc<dyn SnapshotStorage>) -> Self {
        let (pending_tx, mut pending_rx) = watch::channel::<Option<Arc<PendingSave>>>(None);
        let (attempted_tx, attempted_rx) = watch::channel(0u64);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let failures = Arc::new(AtomicU64::new(0));

        let task_failures = Arc::clone(&failures);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = pending_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let pending = pending_rx.borrow_and_update().clone();
                        if let Some(pending) = pending {
                            save(&storage, &pending, &task_failures).await;
                            attempted_tx.send_replace(pending.revision);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            if pending_rx.has_changed().unwrap_or(false) {
                                let pending = pending_rx.borrow_and_update().clone();
                                if let Some(pending) = pending {
                                    info!("Shutdown signal received, saving pending snapshot...");
                                    save(&storage, &pending, &task_failures).await;
                                    attempted_tx.send_replace(pending.revision);
                                }
                            }
                            break;
                        }
                    }
                }
            }
        });

        Self {
            pending_tx,
            attempted_rx,
            shutdown_tx,
            failures,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queue a snapshot for saving, replacing any snapshot not yet written.
    ///
    /// Callers must submit in increasing revision order.
    pub fn submit(&self, revision: u64, snapshot: VisitedSnapshot) {
        self.pending_tx
            .send_replace(Some(Arc::new(PendingSave { revision, snapshot })));
    }

    /// Wait until the most recently submitted snapshot has been attempted.
    pub async fn flush(&self) {
        let target = match self.pending_tx.borrow().as_ref() {
            Some(pending) => pending.revision,
            None => return,
        };

        let mut attempted = self.attempted_rx.clone();
        // Err means the task is gone; nothing left to wait for
        let _ = attempted.wait_for(|revision| *revision >= target).await;
    }

    /// Number of saves that failed since the writer started
    pub fn failed_saves(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Save whatever is pending and stop the background task.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Snapshot writer task ended abnormally: {}", e);
            }
        }
    }
}

async fn save(storage: &Arc<dyn SnapshotStorage>, pending: &PendingSave, failures: &AtomicU64) {
    match storage.save(&pending.snapshot).await {
        Ok(()) => debug!(revision = pending.revision, "Persisted visited state"),
        Err(e) => {
            failures.fetch_add(1, Ordering::Relaxed);
            error!(
                revision = pending.revision,
                "Failed to persist visited state: {}", e
            );
        }
    }
}
