//! Transactional update function for the visited state
//!
//! Every mutation is expressed as a [`Command`]. [`apply`] runs it against the
//! state and reports what happened plus the side effects the caller must run
//! once the new state is committed. The reducer itself never fails and never
//! performs I/O.

use tracing::debug;

use super::state::VisitedState;
use crate::models::{Visit, VisitPatch, VisitedSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a visit; its id must already be unique within the state
    AddVisit(Visit),
    UpdateVisit { id: String, patch: VisitPatch },
    RemoveVisit { id: String },
    AddCountry { country_code: String },
    RemoveCountry { country_code: String },
    ClearAll,
    Restore(VisitedSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Write the complete snapshot to storage
    Persist,
    /// Recompute widget aggregates and hand them to the dispatcher
    PublishStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(Visit),
    Updated(Visit),
    Removed(Visit),
    CountryAdded,
    CountryRemoved { removed_visits: usize },
    Cleared,
    Restored,
    /// Unknown id, or a mutation that would not change anything
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn committed(state: &mut VisitedState, outcome: Outcome) -> Self {
        state.revision += 1;
        Self {
            outcome,
            effects: vec![Effect::Persist, Effect::PublishStats],
        }
    }

    fn unchanged() -> Self {
        Self {
            outcome: Outcome::Unchanged,
            effects: Vec::new(),
        }
    }

    pub fn changed(&self) -> bool {
        !self.effects.is_empty()
    }
}

pub fn apply(state: &mut VisitedState, command: Command) -> Transition {
    match command {
        Command::AddVisit(visit) => {
            debug_assert!(!state.contains_visit(&visit.id), "duplicate visit id");
            state.regions.insert(visit.region_code.clone());
            state.countries.insert(visit.country_code.clone());
            state.visits.push(visit.clone());
            Transition::committed(state, Outcome::Added(visit))
        }

        Command::UpdateVisit { id, patch } => {
            let Some(visit) = state.visits.iter_mut().find(|v| v.id == id) else {
                debug!(%id, "Update for unknown visit ignored");
                return Transition::unchanged();
            };

            if !patch.apply_to(visit) {
                return Transition {
                    outcome: Outcome::Updated(visit.clone()),
                    effects: Vec::new(),
                };
            }

            let updated = visit.clone();
            Transition::committed(state, Outcome::Updated(updated))
        }

        Command::RemoveVisit { id } => {
            let Some(index) = state.visits.iter().position(|v| v.id == id) else {
                debug!(%id, "Remove for unknown visit ignored");
                return Transition::unchanged();
            };

            let removed = state.visits.remove(index);
            drop_unreferenced_region(state, &removed.region_code);
            drop_unreferenced_country(state, &removed.country_code);
            Transition::committed(state, Outcome::Removed(removed))
        }

        Command::AddCountry { country_code } => {
            if !state.countries.insert(country_code) {
                return Transition::unchanged();
            }
            Transition::committed(state, Outcome::CountryAdded)
        }

        Command::RemoveCountry { country_code } => {
            let (removed, kept): (Vec<Visit>, Vec<Visit>) = std::mem::take(&mut state.visits)
                .into_iter()
                .partition(|v| v.country_code == country_code);
            state.visits = kept;

            let was_marked = state.countries.remove(&country_code);
            if removed.is_empty() && !was_marked {
                return Transition::unchanged();
            }

            for visit in &removed {
                drop_unreferenced_region(state, &visit.region_code);
            }

            Transition::committed(
                state,
                Outcome::CountryRemoved {
                    removed_visits: removed.len(),
                },
            )
        }

        Command::ClearAll => {
            state.visits.clear();
            state.regions.clear();
            state.countries.clear();
            Transition::committed(state, Outcome::Cleared)
        }

        Command::Restore(snapshot) => {
            let revision = state.revision;
            *state = VisitedState::from_snapshot(snapshot);
            state.revision = revision;
            Transition::committed(state, Outcome::Restored)
        }
    }
}

fn drop_unreferenced_region(state: &mut VisitedState, region_code: &str) {
    if !state.visits.iter().any(|v| v.region_code == region_code) {
        state.regions.remove(region_code);
    }
}

fn drop_unreferenced_country(state: &mut VisitedState, country_code: &str) {
    if !state.visits.iter().any(|v| v.country_code == country_code) {
        state.countries.remove(country_code);
    }
}
