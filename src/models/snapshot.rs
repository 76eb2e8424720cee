use serde::{Deserialize, Serialize};

use super::Visit;

/// Persisted layout of the visited state, written whole on every save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedSnapshot {
    #[serde(default)]
    pub visited_countries: Vec<String>,
    #[serde(default)]
    pub visited_regions: Vec<String>,
    #[serde(default)]
    pub visits: Vec<Visit>,
}

impl VisitedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.visited_countries.is_empty() && self.visited_regions.is_empty() && self.visits.is_empty()
    }
}

/// The four integers published to the home-screen widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelStats {
    pub visited_countries: u32,
    pub visited_regions: u32,
    pub countries_completed: u32,
    pub world_completed: u32,
}

/// A visit joined with display names, as listed on the trips screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEntry {
    #[serde(flatten)]
    pub visit: Visit,
    pub region_name: String,
    pub country_name: String,
    pub duration_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryProgress {
    pub code: String,
    pub name: String,
    pub visited_regions: usize,
    pub total_regions: usize,
    pub visited: bool,
    pub completed: bool,
}
