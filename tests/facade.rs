use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use geoptim::core::clock::ManualClock;
use geoptim::core::config::{CacheConfig, Config};
use geoptim::core::error::{Error, ErrorKind, Result};
use geoptim::core::types::{Filters, LocationId, LocationRecord};
use geoptim::optimizer::{
    ActionKind, InMemorySource, OptimizationFacade, ResultSource, SpatialSource,
};
use geoptim::queue::HeapMode;
use serde_json::json;

/// Wraps an `InMemorySource`, counting calls and optionally failing
/// candidate-restricted or all queries
struct FlakySource {
    inner: InMemorySource,
    calls: AtomicUsize,
    fail_candidates: AtomicBool,
    fail_all: AtomicBool,
}

impl FlakySource {
    fn new(records: Vec<LocationRecord>) -> Self {
        FlakySource {
            inner: InMemorySource::new(records),
            calls: AtomicUsize::new(0),
            fail_candidates: AtomicBool::new(false),
            fail_all: AtomicBool::new(false),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpatialSource for FlakySource {
    fn find_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        filters: &Filters,
        candidates: Option<&[LocationId]>,
    ) -> Result<Vec<LocationRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Error::collaborator("database unavailable"));
        }
        if candidates.is_some() && self.fail_candidates.load(Ordering::SeqCst) {
            return Err(Error::collaborator("candidate list too long"));
        }
        self.inner.find_within_radius(latitude, longitude, radius_km, filters, candidates)
    }
}

fn stations() -> Vec<LocationRecord> {
    vec![
        LocationRecord::new(1, 40.7128, -74.0060).with_attribute("type", "station"),
        LocationRecord::new(2, 40.7357, -74.1724).with_attribute("type", "station"),
        LocationRecord::new(3, 40.6413, -73.7781).with_attribute("type", "airport"),
        LocationRecord::new(4, 51.5074, -0.1278).with_attribute("type", "station"),
    ]
}

fn facade_with(source: Arc<FlakySource>) -> (OptimizationFacade, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_epoch());
    let facade = OptimizationFacade::with_clock(&Config::default(), source, clock.clone()).unwrap();
    facade.index_locations(stations());
    (facade, clock)
}

#[test]
fn test_hybrid_search_then_cache_hit() {
    let source = Arc::new(FlakySource::new(stations()));
    let (facade, _) = facade_with(source.clone());

    let first = facade.search(40.7128, -74.0060, 50.0, &Filters::new()).unwrap();
    assert_eq!(first.source, ResultSource::OptimizedHybrid);
    assert!(!first.cache_hit);
    assert_eq!(first.candidate_count, 3);
    assert_eq!(first.total, 3);
    assert_eq!(first.locations[0].id, LocationId(1));
    assert_eq!(source.calls(), 1);

    let second = facade.search(40.7128, -74.0060, 50.0, &Filters::new()).unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.source, ResultSource::OptimizedHybrid);
    assert_eq!(second.locations, first.locations);
    assert_eq!(source.calls(), 1, "cache hit must not reach the source");

    let stats = facade.stats();
    assert_eq!(stats.searches.optimized, 1);
    assert_eq!(stats.searches.cache_hits, 1);
    assert_eq!(stats.query_cache.hits, 1);
}

#[test]
fn test_filters_reach_the_source_and_the_key() {
    let source = Arc::new(FlakySource::new(stations()));
    let (facade, _) = facade_with(source.clone());

    let mut filters = Filters::new();
    filters.insert("type".to_string(), json!("airport"));

    let airports = facade.search(40.7128, -74.0060, 50.0, &filters).unwrap();
    assert_eq!(airports.total, 1);
    assert_eq!(airports.locations[0].id, LocationId(3));

    let everything = facade.search(40.7128, -74.0060, 50.0, &Filters::new()).unwrap();
    assert!(!everything.cache_hit);
    assert_eq!(everything.total, 3);
    assert_eq!(source.calls(), 2);
}

#[test]
fn test_empty_index_region_skips_source() {
    let source = Arc::new(FlakySource::new(stations()));
    let (facade, _) = facade_with(source.clone());

    // Middle of the Pacific
    let result = facade.search(0.0, -150.0, 100.0, &Filters::new()).unwrap();
    assert_eq!(result.source, ResultSource::QuadtreeEmpty);
    assert_eq!(result.total, 0);
    assert!(result.locations.is_empty());
    assert_eq!(source.calls(), 0);

    let again = facade.search(0.0, -150.0, 100.0, &Filters::new()).unwrap();
    assert!(again.cache_hit);
    assert_eq!(again.source, ResultSource::QuadtreeEmpty);
}

#[test]
fn test_fallback_result_is_not_cached() {
    let source = Arc::new(FlakySource::new(stations()));
    source.fail_candidates.store(true, Ordering::SeqCst);
    let (facade, _) = facade_with(source.clone());

    let result = facade.search(40.7128, -74.0060, 50.0, &Filters::new()).unwrap();
    assert_eq!(result.source, ResultSource::Fallback);
    assert_eq!(result.total, 3);
    assert_eq!(source.calls(), 2);

    let again = facade.search(40.7128, -74.0060, 50.0, &Filters::new()).unwrap();
    assert!(!again.cache_hit);
    assert_eq!(again.source, ResultSource::Fallback);
    assert_eq!(source.calls(), 4);
    assert_eq!(facade.stats().searches.fallbacks, 2);
    assert_eq!(facade.stats().query_cache.size, 0);
}

#[test]
fn test_failed_fallback_propagates() {
    let source = Arc::new(FlakySource::new(stations()));
    source.fail_all.store(true, Ordering::SeqCst);
    let (facade, _) = facade_with(source.clone());

    let err = facade.search(40.7128, -74.0060, 50.0, &Filters::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Collaborator);
    assert_eq!(source.calls(), 2);
}

#[test]
fn test_cached_results_expire() {
    let source = Arc::new(FlakySource::new(stations()));
    let (facade, clock) = facade_with(source.clone());

    facade.search(40.7128, -74.0060, 50.0, &Filters::new()).unwrap();
    clock.advance(CacheConfig::spatial_queries().ttl() + Duration::from_secs(1));

    assert_eq!(facade.clean_expired(), 1);
    let result = facade.search(40.7128, -74.0060, 50.0, &Filters::new()).unwrap();
    assert!(!result.cache_hit);
    assert_eq!(source.calls(), 2);
}

#[test]
fn test_event_triage() {
    let source = Arc::new(FlakySource::new(Vec::new()));
    let (facade, _) = facade_with(source);

    let storm = facade.queue_event(json!({"type": "storm"}), Some(9.8)).unwrap();
    let heat = facade.queue_event(json!({"type": "heat"}), Some(6.0)).unwrap();
    facade.queue_event(json!({"type": "drizzle"}), Some(2.0)).unwrap();

    let urgent = facade.high_priority_events(5.0);
    assert_eq!(urgent.iter().map(|e| e.id.clone()).collect::<Vec<_>>(), vec![storm.clone(), heat.clone()]);

    let report = facade.process_events(2);
    assert_eq!(report.processed, 2);
    assert_eq!(report.remaining, 1);
    let actions: Vec<(String, ActionKind)> = report.actions.iter().map(|a| (a.event_id.clone(), a.kind)).collect();
    assert_eq!(
        actions,
        vec![
            (storm.clone(), ActionKind::EmergencyAlert),
            (storm, ActionKind::NotifyAuthorities),
            (heat, ActionKind::WeatherWarning),
        ]
    );

    let rest = facade.process_events(10);
    assert_eq!(rest.processed, 1);
    assert!(rest.actions.is_empty());
    assert_eq!(facade.pending_events(), 0);
}

#[test]
fn test_events_without_severity_are_scored() {
    let source = Arc::new(FlakySource::new(Vec::new()));
    let (facade, _) = facade_with(source);

    facade
        .queue_event(json!({"temperature": 47.0, "wind_speed": 130.0, "precipitation": 10.0}), None)
        .unwrap();
    let events = facade.high_priority_events(8.0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].priority, 8.0);

    let err = facade.queue_event(json!({}), Some(f64::NAN)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_artifacts_round_trip_through_compression() {
    let source = Arc::new(FlakySource::new(Vec::new()));
    let (facade, _) = facade_with(source);

    let report: Vec<String> = (0..200).map(|i| format!("station {} nominal", i)).collect();
    assert!(facade.cache_artifact("report:daily", &report).unwrap());
    assert!(!facade.cache_artifact("report:tiny", "ok").unwrap());

    let restored: Option<Vec<String>> = facade.cached_artifact("report:daily").unwrap();
    assert_eq!(restored, Some(report));
    let missing: Option<String> = facade.cached_artifact("report:weekly").unwrap();
    assert_eq!(missing, None);

    facade.clear_caches();
    let cleared: Option<String> = facade.cached_artifact("report:tiny").unwrap();
    assert_eq!(cleared, None);
}

#[test]
fn test_out_of_world_locations_are_rejected() {
    let source = Arc::new(FlakySource::new(Vec::new()));
    let (facade, _) = facade_with(source);
    let before = facade.indexed_locations();

    assert!(!facade.index_location(LocationRecord::new(99, 95.0, 10.0)));
    assert!(facade.index_location(LocationRecord::new(100, -33.86, 151.2)));
    assert_eq!(facade.indexed_locations(), before + 1);
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "query_cache": {{ "capacity": 2, "ttl_secs": 30 }},
            "queue": {{ "mode": "min" }},
            "search": {{ "km_per_degree": 111.32, "cache_prefix": "geo" }}
        }}"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.query_cache, CacheConfig::new(2, 30));
    assert_eq!(config.artifact_cache, CacheConfig::report_artifacts());
    assert_eq!(config.queue.mode, HeapMode::Min);
    assert_eq!(config.search.cache_prefix, "geo");

    let source: Arc<dyn SpatialSource> = Arc::new(InMemorySource::new(stations()));
    let facade = OptimizationFacade::new(&config, source).unwrap();
    assert!(facade.search_key(1.0, 2.0, 3.0, &Filters::new()).unwrap().starts_with("geo:"));
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "query_cache": {{ "capacity": 0, "ttl_secs": 30 }} }}"#).unwrap();
    let err = Config::from_file(file.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let missing = Config::from_file("/definitely/not/here.json").unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Io);
}
