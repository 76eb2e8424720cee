mod snapshot;
mod visit;

pub use snapshot::{CountryProgress, TravelStats, TripEntry, VisitedSnapshot};
pub use visit::{NewVisit, Visit, VisitPatch};
