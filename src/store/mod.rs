//! Visited-state store
//!
//! [`VisitedStore`] owns the canonical visits and the two sets derived from
//! them. Mutations go through the [`reducer`], and the effects it reports
//! (persist, publish widget aggregates) are handed to background workers.

pub mod reducer;
pub mod state;
pub mod stats;
mod visited;

pub use reducer::{Command, Effect, Outcome, Transition};
pub use state::VisitedState;
pub use visited::{load_snapshot, VisitedStore};
