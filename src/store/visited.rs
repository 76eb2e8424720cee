use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::reducer::{self, Command, Effect, Outcome};
use super::state::VisitedState;
use super::stats;
use crate::catalog::RegionCatalog;
use crate::models::{
    CountryProgress, NewVisit, TravelStats, TripEntry, Visit, VisitPatch, VisitedSnapshot,
};
use crate::storage::{SnapshotStorage, SnapshotWriter};
use crate::widget::WidgetDispatcher;

/// Owner of the visits and the visited-region/visited-country sets.
///
/// Mutations run to completion under one write lock and never wait on I/O.
/// Persistence and widget updates are queued while the lock is held, so they
/// are enqueued in revision order, and run later on background tasks.
/// Readers always get copies.
pub struct VisitedStore {
    state: RwLock<VisitedState>,
    catalog: Arc<RegionCatalog>,
    writer: Option<SnapshotWriter>,
    widget: Option<WidgetDispatcher>,
}

/// Load the saved snapshot, falling back to an empty one if nothing was
/// saved or the storage cannot be read.
pub async fn load_snapshot(storage: &dyn SnapshotStorage) -> VisitedSnapshot {
    match storage.load().await {
        Ok(Some(snapshot)) => {
            info!(visits = snapshot.visits.len(), "Loaded visited state");
            snapshot
        }
        Ok(None) => {
            info!("No saved visited state, starting empty");
            VisitedSnapshot::default()
        }
        Err(e) => {
            warn!("Failed to load visited state, starting empty: {}", e);
            VisitedSnapshot::default()
        }
    }
}

fn new_visit_id() -> String {
    Uuid::new_v4().to_string()
}

impl VisitedStore {
    pub fn new(catalog: Arc<RegionCatalog>) -> Self {
        Self::from_snapshot(catalog, VisitedSnapshot::default())
    }

    pub fn from_snapshot(catalog: Arc<RegionCatalog>, snapshot: VisitedSnapshot) -> Self {
        Self {
            state: RwLock::new(VisitedState::from_snapshot(snapshot)),
            catalog,
            writer: None,
            widget: None,
        }
    }

    /// Build a store from whatever `storage` holds.
    pub async fn hydrate(catalog: Arc<RegionCatalog>, storage: &dyn SnapshotStorage) -> Self {
        Self::from_snapshot(catalog, load_snapshot(storage).await)
    }

    pub fn with_writer(mut self, writer: SnapshotWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Attach a widget dispatcher and publish the current aggregates to it,
    /// replacing whatever the widget showed before this store existed.
    pub fn with_widget(mut self, widget: WidgetDispatcher) -> Self {
        let (revision, stats) = {
            let state = self.read_state();
            (state.revision(), stats::travel_stats(&state, &self.catalog))
        };
        widget.publish(revision, stats);

        self.widget = Some(widget);
        self
    }

    pub fn catalog(&self) -> &Arc<RegionCatalog> {
        &self.catalog
    }

    fn read_state(&self) -> RwLockReadGuard<'_, VisitedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, VisitedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, state: &mut VisitedState, command: Command) -> Outcome {
        let transition = reducer::apply(state, command);

        for effect in &transition.effects {
            match effect {
                Effect::Persist => {
                    if let Some(writer) = &self.writer {
                        writer.submit(state.revision(), state.to_snapshot());
                    }
                }
                Effect::PublishStats => {
                    if let Some(widget) = &self.widget {
                        widget.publish(state.revision(), stats::travel_stats(state, &self.catalog));
                    }
                }
            }
        }

        if transition.changed() {
            debug!(revision = state.revision(), outcome = ?transition.outcome, "Committed visited state");
        }
        transition.outcome
    }

    /// Record a new visit. Always succeeds.
    ///
    /// A caller-supplied id is kept only if no existing visit uses it.
    pub fn add_visit(&self, input: NewVisit) -> Visit {
        let mut state = self.write_state();

        let id = match input.id {
            Some(id) if !id.is_empty() && !state.contains_visit(&id) => id,
            Some(id) => {
                debug!(%id, "Visit id unusable, generating a new one");
                new_visit_id()
            }
            None => new_visit_id(),
        };

        let visit = Visit {
            id,
            region_code: input.region_code,
            country_code: input.country_code,
            date_from: input.date_from,
            date_to: input.date_to,
        };
        self.commit(&mut state, Command::AddVisit(visit.clone()));
        visit
    }

    /// Merge a date patch into a visit; `None` when the id is unknown.
    pub fn update_visit(&self, id: &str, patch: VisitPatch) -> Option<Visit> {
        let mut state = self.write_state();
        let command = Command::UpdateVisit {
            id: id.to_string(),
            patch,
        };
        match self.commit(&mut state, command) {
            Outcome::Updated(visit) => Some(visit),
            _ => None,
        }
    }

    /// Delete a visit; `None` when the id is unknown.
    pub fn remove_visit(&self, id: &str) -> Option<Visit> {
        let mut state = self.write_state();
        match self.commit(&mut state, Command::RemoveVisit { id: id.to_string() }) {
            Outcome::Removed(visit) => Some(visit),
            _ => None,
        }
    }

    /// Mark a country visited without any region. Returns whether it was new.
    pub fn add_country(&self, country_code: &str) -> bool {
        let mut state = self.write_state();
        let command = Command::AddCountry {
            country_code: country_code.to_string(),
        };
        matches!(self.commit(&mut state, command), Outcome::CountryAdded)
    }

    /// Unmark a country and delete all of its visits. Returns the number of visits removed.
    pub fn remove_country(&self, country_code: &str) -> usize {
        let mut state = self.write_state();
        let command = Command::RemoveCountry {
            country_code: country_code.to_string(),
        };
        match self.commit(&mut state, command) {
            Outcome::CountryRemoved { removed_visits } => removed_visits,
            _ => 0,
        }
    }

    pub fn clear_all(&self) {
        let mut state = self.write_state();
        self.commit(&mut state, Command::ClearAll);
    }

    /// Install `snapshot` as the whole state, repairing its derived sets.
    pub fn replace(&self, snapshot: VisitedSnapshot) {
        let mut state = self.write_state();
        self.commit(&mut state, Command::Restore(snapshot));
    }

    pub fn get_visit(&self, id: &str) -> Option<Visit> {
        self.read_state().visit(id).cloned()
    }

    /// Visits of a region in insertion order
    pub fn get_visits(&self, region_code: &str) -> Vec<Visit> {
        self.read_state()
            .visits_for_region(region_code)
            .cloned()
            .collect()
    }

    pub fn visits(&self) -> Vec<Visit> {
        self.read_state().visits().to_vec()
    }

    pub fn visited_regions(&self) -> Vec<String> {
        self.read_state().visited_regions().iter().cloned().collect()
    }

    pub fn visited_countries(&self) -> Vec<String> {
        self.read_state().visited_countries().iter().cloned().collect()
    }

    pub fn snapshot(&self) -> VisitedSnapshot {
        self.read_state().to_snapshot()
    }

    pub fn revision(&self) -> u64 {
        self.read_state().revision()
    }

    pub fn stats(&self) -> TravelStats {
        stats::travel_stats(&self.read_state(), &self.catalog)
    }

    pub fn is_country_completed(&self, country_code: &str) -> bool {
        self.catalog
            .country(country_code)
            .is_some_and(|country| stats::is_completed(&self.read_state(), country))
    }

    pub fn trips(&self) -> Vec<TripEntry> {
        stats::trips(&self.read_state(), &self.catalog)
    }

    pub fn country_progress(&self) -> Vec<CountryProgress> {
        stats::country_progress(&self.read_state(), &self.catalog)
    }

    /// Wait for queued persistence and widget work to finish.
    pub async fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
        if let Some(widget) = &self.widget {
            widget.flush().await;
        }
    }

    /// Number of snapshot saves that failed during this process
    pub fn failed_saves(&self) -> u64 {
        self.writer.as_ref().map_or(0, SnapshotWriter::failed_saves)
    }

    pub async fn shutdown(&self) {
        if let Some(writer) = &self.writer {
            writer.shutdown().await;
        }
        if let Some(widget) = &self.widget {
            widget.shutdown().await;
        }
    }
}
