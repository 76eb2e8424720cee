//! Integration tests for the visited-state store
//!
//! These exercise the store through its public API together with real
//! storage backends and a widget sink, the way the server wires them.

use async_trait::async_trait;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wayfar::catalog::RegionCatalog;
use wayfar::models::{NewVisit, TravelStats, VisitPatch, VisitedSnapshot};
use wayfar::storage::{
    MemoryStorage, SnapshotStorage, SnapshotWriter, SqliteStorage, StorageError, StorageResult,
};
use wayfar::store::VisitedStore;
use wayfar::widget::{WidgetDispatcher, WidgetError, WidgetSink};

const CATALOG: &str = r#"[
    {"code2": "US", "name": "United States", "states": [
        {"code": "CA", "name": "California"},
        {"code": "NY", "name": "New York"}
    ]},
    {"code2": "FR", "name": "France", "states": [
        {"code": "A", "name": "Alsace"},
        {"code": "B", "name": "Bretagne"}
    ]},
    {"code2": "X", "name": "Exampleland", "states": [
        {"code": "1", "name": "One"},
        {"code": "2", "name": "Two"}
    ]},
    {"code2": "MC", "name": "Monaco", "states": []}
]"#;

fn catalog() -> Arc<RegionCatalog> {
    Arc::new(RegionCatalog::from_json(CATALOG).unwrap())
}

/// Storage that refuses every save
struct FailingStorage {
    attempts: AtomicUsize,
}

#[async_trait]
impl SnapshotStorage for FailingStorage {
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn load(&self) -> StorageResult<Option<VisitedSnapshot>> {
        Err(StorageError::Other(anyhow::anyhow!("storage offline")))
    }

    async fn save(&self, _snapshot: &VisitedSnapshot) -> StorageResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Other(anyhow::anyhow!("disk full")))
    }
}

#[derive(Default)]
struct RecordingSink {
    writes: Mutex<Vec<TravelStats>>,
    reloads: AtomicUsize,
}

#[async_trait]
impl WidgetSink for RecordingSink {
    async fn write(&self, stats: &TravelStats) -> Result<(), WidgetError> {
        self.writes.lock().unwrap().push(*stats);
        Ok(())
    }

    async fn reload(&self) -> Result<(), WidgetError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_add_visit_scenario() {
    let store = VisitedStore::new(catalog());

    store.add_visit(NewVisit::new("US-CA", "US").dated(Some("2024-01-01"), Some("2024-01-10")));

    let visits = store.get_visits("US-CA");
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].date_from.as_deref(), Some("2024-01-01"));
    assert_eq!(visits[0].date_to.as_deref(), Some("2024-01-10"));

    let stats = store.stats();
    assert_eq!(stats.visited_regions, 1);
    assert_eq!(stats.visited_countries, 1);
}

#[test]
fn test_remove_country_scenario() {
    let store = VisitedStore::new(catalog());
    store.add_visit(NewVisit::new("US-CA", "US").dated(Some("2024-01-01"), Some("2024-01-10")));
    store.add_visit(NewVisit::new("FR-A", "FR"));

    assert_eq!(store.remove_country("US"), 1);

    assert!(store.visits().iter().all(|v| v.country_code != "US"));
    assert!(store.visited_regions().iter().all(|r| !r.starts_with("US")));
    assert!(store.visited_countries().iter().all(|c| !c.starts_with("US")));
    // Other countries are untouched
    assert_eq!(store.visited_regions(), vec!["FR-A".to_string()]);
}

#[test]
fn test_clear_all_is_idempotent() {
    let store = VisitedStore::new(catalog());
    store.add_visit(NewVisit::new("US-CA", "US"));
    store.add_country("MC");

    store.clear_all();
    let once = store.snapshot();
    store.clear_all();
    let twice = store.snapshot();

    assert_eq!(once, twice);
    assert!(twice.is_empty());
    assert_eq!(store.stats(), TravelStats::default());
}

#[test]
fn test_update_touches_only_target_visit() {
    let store = VisitedStore::new(catalog());
    let first = store.add_visit(NewVisit::new("US-CA", "US").dated(Some("2023-05-01"), None));
    let second = store.add_visit(NewVisit::new("FR-A", "FR").dated(Some("2022-01-01"), Some("2022-01-03")));
    let regions_before = store.visited_regions();
    let countries_before = store.visited_countries();

    let updated = store
        .update_visit(&first.id, VisitPatch::date_from(Some("2024-02-02")))
        .unwrap();

    assert_eq!(updated.id, first.id);
    assert_eq!(updated.region_code, first.region_code);
    assert_eq!(updated.country_code, first.country_code);
    assert_eq!(updated.date_from.as_deref(), Some("2024-02-02"));
    assert_eq!(updated.date_to, first.date_to);

    assert_eq!(store.get_visit(&second.id), Some(second));
    assert_eq!(store.visited_regions(), regions_before);
    assert_eq!(store.visited_countries(), countries_before);
}

#[test]
fn test_update_unknown_visit_is_noop() {
    let store = VisitedStore::new(catalog());
    store.add_visit(NewVisit::new("US-CA", "US"));
    let revision = store.revision();

    assert!(store
        .update_visit("missing", VisitPatch::date_from(Some("2024-01-01")))
        .is_none());
    assert_eq!(store.revision(), revision);
}

#[test]
fn test_remove_keeps_country_with_other_regions() {
    let store = VisitedStore::new(catalog());
    let a = store.add_visit(NewVisit::new("FR-A", "FR"));
    store.add_visit(NewVisit::new("FR-B", "FR"));

    store.remove_visit(&a.id);

    assert!(store.visited_countries().contains(&"FR".to_string()));
    assert!(store.visited_regions().contains(&"FR-B".to_string()));
    assert!(!store.visited_regions().contains(&"FR-A".to_string()));
}

#[test]
fn test_repeat_trips_keep_region_until_last_visit() {
    let store = VisitedStore::new(catalog());
    let first = store.add_visit(NewVisit::new("US-NY", "US").dated(Some("2020-01-01"), None));
    let second = store.add_visit(NewVisit::new("US-NY", "US").dated(Some("2021-01-01"), None));

    store.remove_visit(&first.id);
    assert_eq!(store.visited_regions(), vec!["US-NY".to_string()]);

    store.remove_visit(&second.id);
    assert!(store.visited_regions().is_empty());
    assert!(store.visited_countries().is_empty());
}

#[test]
fn test_completion_follows_region_set() {
    let store = VisitedStore::new(catalog());
    let one = store.add_visit(NewVisit::new("X-1", "X"));
    assert!(!store.is_country_completed("X"));
    assert_eq!(store.stats().countries_completed, 0);

    let two = store.add_visit(NewVisit::new("X-2", "X"));
    assert!(store.is_country_completed("X"));
    assert_eq!(store.stats().countries_completed, 1);

    store.remove_visit(&one.id);
    assert!(!store.is_country_completed("X"));
    assert_eq!(store.stats().countries_completed, 0);

    store.add_visit(NewVisit::new("X-1", "X"));
    store.remove_visit(&two.id);
    assert_eq!(store.stats().countries_completed, 0);
}

#[test]
fn test_world_percentage_rounds() {
    let store = VisitedStore::new(catalog());
    store.add_country("MC");

    // 1 of 4 catalog countries
    assert_eq!(store.stats().world_completed, 25);
    // Monaco has no regions, so marking it completes it
    assert!(store.is_country_completed("MC"));
}

#[test]
fn test_trips_and_progress_views() {
    let store = VisitedStore::new(catalog());
    store.add_visit(NewVisit::new("US-CA", "US").dated(Some("2023-01-01"), Some("2023-01-05")));
    store.add_visit(NewVisit::new("FR-B", "FR").dated(Some("2024-06-01"), Some("2024-06-02")));
    store.add_visit(NewVisit::new("X-1", "X"));

    let trips = store.trips();
    assert_eq!(trips.len(), 3);
    assert_eq!(trips[0].region_name, "Bretagne");
    assert_eq!(trips[0].duration_days, Some(1));
    assert_eq!(trips[1].country_name, "United States");
    assert_eq!(trips[1].duration_days, Some(4));
    assert_eq!(trips[2].duration_days, None);

    let progress = store.country_progress();
    let us = progress.iter().find(|p| p.code == "US").unwrap();
    assert_eq!(us.visited_regions, 1);
    assert_eq!(us.total_regions, 2);
    assert!(us.visited);
    assert!(!us.completed);
}

const REGIONS: [(&str, &str); 6] = [
    ("US-CA", "US"),
    ("US-NY", "US"),
    ("FR-A", "FR"),
    ("FR-B", "FR"),
    ("X-1", "X"),
    ("X-2", "X"),
];
const COUNTRIES: [&str; 4] = ["US", "FR", "X", "MC"];

#[derive(Debug, Clone)]
enum Op {
    AddVisit(usize),
    RemoveVisit(usize),
    UpdateVisit(usize, Option<String>),
    AddCountry(usize),
    RemoveCountry(usize),
    ClearAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..REGIONS.len()).prop_map(Op::AddVisit),
        3 => any::<usize>().prop_map(Op::RemoveVisit),
        2 => (any::<usize>(), proptest::option::of("2024-0[1-9]-1[0-9]"))
            .prop_map(|(pick, date)| Op::UpdateVisit(pick, date)),
        2 => (0..COUNTRIES.len()).prop_map(Op::AddCountry),
        1 => (0..COUNTRIES.len()).prop_map(Op::RemoveCountry),
        1 => Just(Op::ClearAll),
    ]
}

proptest! {
    #[test]
    fn prop_derived_sets_follow_every_operation(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let store = VisitedStore::new(catalog());
        // Countries expected in the visited set: every visit's country plus
        // direct marks, where a mark is dropped with the country's last visit
        let mut countries: BTreeSet<String> = BTreeSet::new();

        for op in ops {
            match op {
                Op::AddVisit(index) => {
                    let (region_code, country_code) = REGIONS[index];
                    store.add_visit(NewVisit::new(region_code, country_code));
                    countries.insert(country_code.to_string());
                }
                Op::RemoveVisit(pick) => {
                    let visits = store.visits();
                    if !visits.is_empty() {
                        let removed = &visits[pick % visits.len()];
                        prop_assert!(store.remove_visit(&removed.id).is_some());
                        if store.visits().iter().all(|v| v.country_code != removed.country_code) {
                            countries.remove(&removed.country_code);
                        }
                    }
                }
                Op::UpdateVisit(pick, date) => {
                    let visits = store.visits();
                    if !visits.is_empty() {
                        let target = &visits[pick % visits.len()];
                        let updated = store
                            .update_visit(&target.id, VisitPatch::date_from(date.as_deref()))
                            .unwrap();
                        prop_assert_eq!(&updated.region_code, &target.region_code);
                        prop_assert_eq!(updated.date_from, date);
                    }
                }
                Op::AddCountry(index) => {
                    store.add_country(COUNTRIES[index]);
                    countries.insert(COUNTRIES[index].to_string());
                }
                Op::RemoveCountry(index) => {
                    store.remove_country(COUNTRIES[index]);
                    countries.remove(COUNTRIES[index]);
                    prop_assert!(store.visits().iter().all(|v| v.country_code != COUNTRIES[index]));
                }
                Op::ClearAll => {
                    store.clear_all();
                    countries.clear();
                }
            }

            let visits = store.visits();
            let regions: BTreeSet<String> = visits.iter().map(|v| v.region_code.clone()).collect();
            prop_assert_eq!(store.visited_regions().into_iter().collect::<BTreeSet<_>>(), regions);
            prop_assert_eq!(
                store.visited_countries().into_iter().collect::<BTreeSet<_>>(),
                countries.clone()
            );
            prop_assert!(visits.iter().all(|v| countries.contains(&v.country_code)));

            let ids: BTreeSet<&str> = visits.iter().map(|v| v.id.as_str()).collect();
            prop_assert_eq!(ids.len(), visits.len());
        }
    }
}

#[tokio::test]
async fn test_failed_persistence_keeps_state() {
    let storage = Arc::new(FailingStorage {
        attempts: AtomicUsize::new(0),
    });
    let store = VisitedStore::new(catalog()).with_writer(SnapshotWriter::spawn(storage.clone()));

    let visit = store.add_visit(NewVisit::new("US-CA", "US"));
    store.flush().await;

    assert!(storage.attempts.load(Ordering::SeqCst) >= 1);
    assert!(store.failed_saves() >= 1);
    assert_eq!(store.get_visit(&visit.id), Some(visit));
    assert_eq!(store.visited_regions(), vec!["US-CA".to_string()]);

    store.shutdown().await;
}

#[tokio::test]
async fn test_unreadable_storage_hydrates_empty() {
    let storage = FailingStorage {
        attempts: AtomicUsize::new(0),
    };
    let store = VisitedStore::hydrate(catalog(), &storage).await;

    assert!(store.snapshot().is_empty());
    assert_eq!(store.revision(), 0);
}

#[tokio::test]
async fn test_hydrate_repairs_saved_sets() {
    let saved: VisitedSnapshot = serde_json::from_str(
        r#"{
            "visitedCountries": ["FR", "US"],
            "visitedRegions": ["FR-A", "US-ZZ"],
            "visits": [
                {"id": "v1", "regionCode": "US-CA", "countryCode": "US", "dateFrom": "2024-01-01"},
                {"id": "v1", "regionCode": "US-NY", "countryCode": "US"}
            ]
        }"#,
    )
    .unwrap();
    let storage = MemoryStorage::with_snapshot(saved);

    let store = VisitedStore::hydrate(catalog(), &storage).await;

    assert_eq!(store.visits().len(), 1);
    assert_eq!(store.visited_regions(), vec!["US-CA".to_string()]);
    assert!(store.visited_countries().contains(&"US".to_string()));
}

#[tokio::test]
async fn test_state_survives_restart_sqlite() {
    let path = std::env::temp_dir().join(format!("wayfar-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let storage: Arc<dyn SnapshotStorage> =
        Arc::new(SqliteStorage::new(&url, 2, "visited-storage").await.unwrap());
    storage.init().await.unwrap();

    let store = VisitedStore::hydrate(catalog(), storage.as_ref())
        .await
        .with_writer(SnapshotWriter::spawn(Arc::clone(&storage)));
    let kept = store.add_visit(NewVisit::new("FR-A", "FR").dated(Some("2024-04-01"), None));
    let dropped = store.add_visit(NewVisit::new("US-CA", "US"));
    store.remove_visit(&dropped.id);
    store.add_country("MC");
    store.shutdown().await;
    assert_eq!(store.failed_saves(), 0);

    let reopened = SqliteStorage::new(&url, 2, "visited-storage").await.unwrap();
    reopened.init().await.unwrap();
    let restored = VisitedStore::hydrate(catalog(), &reopened).await;

    assert_eq!(restored.visits(), vec![kept]);
    assert_eq!(restored.visited_countries(), vec!["FR".to_string(), "MC".to_string()]);
    assert_eq!(restored.visited_regions(), vec!["FR-A".to_string()]);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test(start_paused = true)]
async fn test_widget_receives_latest_stats() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = WidgetDispatcher::spawn(sink.clone(), Duration::from_millis(250));
    let store = VisitedStore::new(catalog()).with_widget(dispatcher);

    store.add_visit(NewVisit::new("X-1", "X"));
    store.add_visit(NewVisit::new("X-2", "X"));
    store.add_visit(NewVisit::new("US-CA", "US"));
    store.flush().await;

    let writes = sink.writes.lock().unwrap().clone();
    assert_eq!(writes.last(), Some(&store.stats()));
    assert_eq!(
        writes.last().map(|s| (s.visited_countries, s.visited_regions, s.countries_completed)),
        Some((2, 3, 1))
    );
    assert!(sink.reloads.load(Ordering::SeqCst) >= 1);

    store.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_widget_gets_hydrated_stats_without_mutation() {
    let saved = VisitedSnapshot {
        visited_countries: vec!["MC".to_string()],
        visited_regions: Vec::new(),
        visits: Vec::new(),
    };
    let storage = MemoryStorage::with_snapshot(saved);

    let sink = Arc::new(RecordingSink::default());
    let dispatcher = WidgetDispatcher::spawn(sink.clone(), Duration::from_millis(250));
    let store = VisitedStore::hydrate(catalog(), &storage)
        .await
        .with_widget(dispatcher);

    tokio::time::sleep(Duration::from_secs(1)).await;

    let writes = sink.writes.lock().unwrap().clone();
    assert_eq!(writes, vec![store.stats()]);
    assert_eq!(writes[0].visited_countries, 1);
    assert_eq!(writes[0].countries_completed, 1);
    assert_eq!(sink.reloads.load(Ordering::SeqCst), 1);

    store.shutdown().await;
}

