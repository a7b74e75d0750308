/// Weather dashboard walkthrough
///
/// Demonstrates the optimization facade in front of a slow location store:
/// - Indexing stations into the quadtree pre-filter
/// - Radius search (index-assisted, cached, empty region)
/// - Weather event triage by severity
/// - Artifact caching and statistics
///
/// Run with `RUST_LOG=geoptim=debug` to see the structured log events.

use geoptim::core::config::Config;
use geoptim::core::logging::init_logging;
use geoptim::core::types::{Filters, LocationRecord};
use geoptim::optimizer::{InMemorySource, OptimizationFacade};
use serde_json::json;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info")?;

    println!("=== Weather Dashboard Demo ===\n");

    // 1. Stations known to the location store
    let stations = vec![
        LocationRecord::new(1, 40.7128, -74.0060).with_attribute("name", "Manhattan").with_attribute("type", "station"),
        LocationRecord::new(2, 40.7357, -74.1724).with_attribute("name", "Newark").with_attribute("type", "station"),
        LocationRecord::new(3, 40.6413, -73.7781).with_attribute("name", "JFK").with_attribute("type", "airport"),
        LocationRecord::new(4, 51.5074, -0.1278).with_attribute("name", "London").with_attribute("type", "station"),
        LocationRecord::new(5, 35.6895, 139.6917).with_attribute("name", "Tokyo").with_attribute("type", "station"),
        LocationRecord::new(6, -33.8688, 151.2093).with_attribute("name", "Sydney").with_attribute("type", "airport"),
    ];
    let source = Arc::new(InMemorySource::new(stations.clone()));

    // 2. Facade with default presets
    let facade = OptimizationFacade::new(&Config::default(), source)?;
    let indexed = facade.index_locations(stations);
    println!("✓ Indexed {} stations", indexed);

    // 3. Searches
    println!("\n--- Search ---");
    let nearby = facade.search(40.7128, -74.0060, 50.0, &Filters::new())?;
    println!("Near Manhattan (50 km): {} of {} candidates via {:?}", nearby.total, nearby.candidate_count, nearby.source);
    for location in &nearby.locations {
        println!("  • {}", location.attribute("name").and_then(|v| v.as_str()).unwrap_or("?"));
    }

    let again = facade.search(40.7128, -74.0060, 50.0, &Filters::new())?;
    println!("Repeat search served from cache: {}", again.cache_hit);

    let mut airports = Filters::new();
    airports.insert("type".to_string(), json!("airport"));
    let filtered = facade.search(40.7128, -74.0060, 50.0, &airports)?;
    println!("Airports near Manhattan: {}", filtered.total);

    let ocean = facade.search(0.0, -150.0, 500.0, &Filters::new())?;
    println!("Mid-Pacific: {} results via {:?}", ocean.total, ocean.source);

    // 4. Event triage
    println!("\n--- Events ---");
    facade.queue_event(json!({"station": 1, "kind": "hurricane"}), Some(9.8))?;
    facade.queue_event(json!({"station": 2, "temperature": 41.0, "wind_speed": 65.0}), None)?;
    facade.queue_event(json!({"station": 4, "kind": "drizzle"}), Some(2.0))?;

    for event in facade.high_priority_events(5.0) {
        println!("Pending urgent event {} (priority {:.1})", event.id, event.priority);
    }

    let report = facade.process_events(10);
    println!("Processed {} events, {} remaining", report.processed, report.remaining);
    for action in &report.actions {
        println!("  → {:?} for {} (priority {:.1})", action.kind, action.event_id, action.priority);
    }

    // 5. Artifacts
    println!("\n--- Artifacts ---");
    let summary: Vec<String> = (0..100).map(|i| format!("station {} reporting nominal", i)).collect();
    let compressed = facade.cache_artifact("report:daily", &summary)?;
    println!("✓ Cached daily report (compressed: {})", compressed);
    let restored: Option<Vec<String>> = facade.cached_artifact("report:daily")?;
    println!("✓ Restored {} lines", restored.map_or(0, |lines| lines.len()));

    // 6. Statistics
    println!("\n--- Statistics ---");
    println!("{}", serde_json::to_string_pretty(&facade.stats())?);

    Ok(())
}
