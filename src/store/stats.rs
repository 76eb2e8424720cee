//! Aggregates derived from the visited state and the region catalog

use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Reverse;

use super::state::VisitedState;
use crate::catalog::{Country, RegionCatalog};
use crate::models::{CountryProgress, TravelStats, TripEntry};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub fn travel_stats(state: &VisitedState, catalog: &RegionCatalog) -> TravelStats {
    let visited_countries = state.visited_countries().len();

    TravelStats {
        visited_countries: visited_countries as u32,
        visited_regions: state.visited_regions().len() as u32,
        countries_completed: countries_completed(state, catalog) as u32,
        world_completed: world_completed_percent(visited_countries, catalog.total_countries()),
    }
}

/// A country is completed when every catalog region it has is visited.
/// Countries catalogued without regions are completed once marked visited.
pub fn is_completed(state: &VisitedState, country: &Country) -> bool {
    if country.regions.is_empty() {
        return state.visited_countries().contains(&country.code);
    }
    country
        .regions
        .iter()
        .all(|r| state.visited_regions().contains(&r.code))
}

pub fn countries_completed(state: &VisitedState, catalog: &RegionCatalog) -> usize {
    catalog
        .countries()
        .iter()
        .filter(|c| is_completed(state, c))
        .count()
}

pub fn world_completed_percent(visited_countries: usize, total_countries: usize) -> u32 {
    debug_assert!(total_countries > 0, "catalog is never empty");
    if total_countries == 0 {
        return 0;
    }
    (visited_countries as f64 / total_countries as f64 * 100.0).round() as u32
}

/// Visits with display names, most recent first; undated trips go last.
pub fn trips(state: &VisitedState, catalog: &RegionCatalog) -> Vec<TripEntry> {
    let mut entries: Vec<(Option<DateTime<Utc>>, TripEntry)> = state
        .visits()
        .iter()
        .map(|visit| {
            let from = visit.date_from.as_deref().and_then(parse_instant);
            let to = visit.date_to.as_deref().and_then(parse_instant);

            let country_name = catalog
                .region(&visit.region_code)
                .map(|r| r.country_name.clone())
                .unwrap_or_else(|| catalog.country_name(&visit.country_code).to_string());

            let entry = TripEntry {
                region_name: catalog.region_name(&visit.region_code).to_string(),
                country_name,
                duration_days: from.zip(to).map(|(from, to)| duration_days(from, to)),
                visit: visit.clone(),
            };
            (from, entry)
        })
        .collect();

    // `None` sorts before `Some`, so reversing puts undated entries last
    entries.sort_by_key(|(from, _)| Reverse(*from));
    entries.into_iter().map(|(_, entry)| entry).collect()
}

/// Per-country region progress; countries with any visit first, then by name.
pub fn country_progress(state: &VisitedState, catalog: &RegionCatalog) -> Vec<CountryProgress> {
    let mut progress: Vec<CountryProgress> = catalog
        .countries()
        .iter()
        .map(|country| {
            let visited_regions = country
                .regions
                .iter()
                .filter(|r| state.visited_regions().contains(&r.code))
                .count();

            CountryProgress {
                code: country.code.clone(),
                name: country.name.clone(),
                visited_regions,
                total_regions: country.regions.len(),
                visited: visited_regions > 0 || state.visited_countries().contains(&country.code),
                completed: is_completed(state, country),
            }
        })
        .collect();

    progress.sort_by(|a, b| b.visited.cmp(&a.visited).then_with(|| a.name.cmp(&b.name)));
    progress
}

/// Parses an RFC 3339 instant or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

/// Whole days between two instants, rounded up, regardless of order.
pub fn duration_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let ms = (to - from).num_milliseconds().abs();
    (ms + DAY_MS - 1) / DAY_MS
}
