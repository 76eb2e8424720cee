use std::collections::{BTreeSet, HashSet};

use crate::models::{Visit, VisitedSnapshot};

/// In-memory visited state: the canonical visits plus the two derived sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedState {
    pub(crate) visits: Vec<Visit>,
    pub(crate) regions: BTreeSet<String>,
    pub(crate) countries: BTreeSet<String>,
    pub(crate) revision: u64,
}

impl VisitedState {
    /// Builds a state from a stored snapshot, repairing derived sets that
    /// drifted from the visits they derive from.
    ///
    /// Regions are rebuilt from visits alone. Countries keep their stored
    /// members (direct marks have no visit) and gain every visit's country.
    /// Visits repeating an earlier id are dropped.
    pub fn from_snapshot(snapshot: VisitedSnapshot) -> Self {
        let mut seen = HashSet::new();
        let visits: Vec<Visit> = snapshot
            .visits
            .into_iter()
            .filter(|v| seen.insert(v.id.clone()))
            .collect();

        let regions = visits.iter().map(|v| v.region_code.clone()).collect();
        let countries = snapshot
            .visited_countries
            .into_iter()
            .chain(visits.iter().map(|v| v.country_code.clone()))
            .collect();

        Self {
            visits,
            regions,
            countries,
            revision: 0,
        }
    }

    pub fn to_snapshot(&self) -> VisitedSnapshot {
        VisitedSnapshot {
            visited_countries: self.countries.iter().cloned().collect(),
            visited_regions: self.regions.iter().cloned().collect(),
            visits: self.visits.clone(),
        }
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn visited_regions(&self) -> &BTreeSet<String> {
        &self.regions
    }

    pub fn visited_countries(&self) -> &BTreeSet<String> {
        &self.countries
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains_visit(&self, id: &str) -> bool {
        self.visits.iter().any(|v| v.id == id)
    }

    pub fn visit(&self, id: &str) -> Option<&Visit> {
        self.visits.iter().find(|v| v.id == id)
    }

    /// Visits of one region, in insertion order
    pub fn visits_for_region<'a>(&'a self, region_code: &'a str) -> impl Iterator<Item = &'a Visit> {
        self.visits.iter().filter(move |v| v.region_code == region_code)
    }
}
