use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use crate::cache::{generate_key, EvictionCache};
use crate::compression::compress::{CompressedBlock, CompressionPriority};
use crate::core::clock::{system_clock, SharedClock};
use crate::core::config::{Config, SearchConfig};
use crate::core::error::Result;
use crate::core::stats::{OptimizerStats, SearchCounters};
use crate::core::types::{EventRecord, Filters, LocationId, LocationRecord};
use crate::optimizer::severity::score_event;
use crate::optimizer::source::SpatialSource;
use crate::queue::{PriorityItem, PriorityQueue};
use crate::spatial::quadtree::QuadTree;

/// Priority above which an event raises an alert and notifies authorities
pub const ESCALATION_THRESHOLD: f64 = 8.0;
/// Priority above which an event raises a weather warning
pub const WARNING_THRESHOLD: f64 = 5.0;

/// How a search result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    /// The index found no candidates; the precise query was skipped
    QuadtreeEmpty,
    /// Index pre-filter followed by the precise query over the candidates
    OptimizedHybrid,
    /// The candidate query failed and the unrestricted query answered instead
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub locations: Vec<LocationRecord>,
    pub source: ResultSource,
    pub candidate_count: usize,
    pub total: usize,
    /// Set on the returned copy only; cached results are stored with `false`
    #[serde(default)]
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    EmergencyAlert,
    NotifyAuthorities,
    WeatherWarning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageAction {
    pub event_id: String,
    pub kind: ActionKind,
    pub priority: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    pub actions: Vec<TriageAction>,
    pub processed: usize,
    pub remaining: usize,
}

/// Coordinates the spatial index, the two caches and the event queue in
/// front of a slow `SpatialSource`.
///
/// Every structure sits behind its own lock. Locks are taken for the
/// duration of a single structure operation and are never held while the
/// source is being called.
pub struct OptimizationFacade {
    index: RwLock<QuadTree<LocationRecord>>,
    query_cache: Mutex<EvictionCache<CompressedBlock>>,
    artifact_cache: Mutex<EvictionCache<CompressedBlock>>,
    events: Mutex<PriorityQueue<EventRecord>>,
    source: Arc<dyn SpatialSource>,
    search: SearchConfig,

    // Metrics
    cache_hits: AtomicU64,
    quadtree_empty: AtomicU64,
    optimized: AtomicU64,
    fallbacks: AtomicU64,
}

impl OptimizationFacade {
    pub fn new(config: &Config, source: Arc<dyn SpatialSource>) -> Result<Self> {
        Self::with_clock(config, source, system_clock())
    }

    /// Same as `new` with every time-dependent structure reading `clock`
    pub fn with_clock(config: &Config, source: Arc<dyn SpatialSource>, clock: SharedClock) -> Result<Self> {
        config.validate()?;

        let index = QuadTree::with_max_depth(
            config.index.bounds,
            config.index.node_capacity,
            config.index.max_depth,
        )?;
        let query_cache = EvictionCache::from_config(&config.query_cache, clock.clone())?
            .with_weight_fn(CompressedBlock::stored_size);
        let artifact_cache = EvictionCache::from_config(&config.artifact_cache, clock.clone())?
            .with_weight_fn(CompressedBlock::stored_size);
        let events = PriorityQueue::with_clock(config.queue.mode, clock);

        info!(
            query_cache = config.query_cache.capacity,
            artifact_cache = config.artifact_cache.capacity,
            queue_mode = ?config.queue.mode,
            "optimization facade ready"
        );

        Ok(OptimizationFacade {
            index: RwLock::new(index),
            query_cache: Mutex::new(query_cache),
            artifact_cache: Mutex::new(artifact_cache),
            events: Mutex::new(events),
            source,
            search: config.search.clone(),
            cache_hits: AtomicU64::new(0),
            quadtree_empty: AtomicU64::new(0),
            optimized: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        })
    }

    /// Add a location to the index at (longitude, latitude). Returns false
    /// when the coordinates fall outside the index bounds.
    pub fn index_location(&self, record: LocationRecord) -> bool {
        let (x, y) = (record.longitude, record.latitude);
        let id = record.id;
        let inserted = self.index.write().insert(x, y, record);
        if !inserted {
            debug!(location = id.value(), x, y, "location outside index bounds");
        }
        inserted
    }

    /// Bulk `index_location` under a single write lock; returns the number
    /// of locations accepted
    pub fn index_locations<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = LocationRecord>,
    {
        let mut index = self.index.write();
        let mut accepted = 0;
        for record in records {
            if index.insert(record.longitude, record.latitude, record) {
                accepted += 1;
            }
        }
        info!(accepted, total_indexed = index.len(), "indexed locations");
        accepted
    }

    pub fn indexed_locations(&self) -> usize {
        self.index.read().len()
    }

    /// Cache key for a search; equal for equal parameter sets regardless of
    /// filter insertion order
    pub fn search_key(&self, latitude: f64, longitude: f64, radius_km: f64, filters: &Filters) -> Result<String> {
        generate_key(
            &self.search.cache_prefix,
            [
                ("lat", json!(latitude)),
                ("lon", json!(longitude)),
                ("radius", json!(radius_km)),
                ("filters", json!(filters)),
            ],
        )
    }

    /// Radius search in kilometres, answered from cache, from the index
    /// alone, or by the source over the index's candidates.
    ///
    /// When the candidate query fails the source is asked again without
    /// candidates; that result is returned uncached. An error is returned
    /// only when the unrestricted query fails as well.
    pub fn search(&self, latitude: f64, longitude: f64, radius_km: f64, filters: &Filters) -> Result<SearchResult> {
        let key = self.search_key(latitude, longitude, radius_km, filters)?;

        let cached = self.query_cache.lock().get_compressed::<SearchResult>(&key);
        match cached {
            Ok(Some(mut result)) => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "search served from cache");
                result.cache_hit = true;
                return Ok(result);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unreadable cached search result");
                self.query_cache.lock().remove(&key);
            }
        }

        let radius_deg = radius_km / self.search.km_per_degree;
        let candidates: Vec<LocationId> = self
            .index
            .read()
            .query_radius(longitude, latitude, radius_deg)
            .iter()
            .map(|n| n.point.payload.id)
            .collect();

        if candidates.is_empty() {
            self.quadtree_empty.fetch_add(1, Ordering::Relaxed);
            let result = SearchResult {
                locations: Vec::new(),
                source: ResultSource::QuadtreeEmpty,
                candidate_count: 0,
                total: 0,
                cache_hit: false,
            };
            self.store_result(&key, &result);
            debug!(latitude, longitude, radius_km, "no index candidates");
            return Ok(result);
        }

        let candidate_count = candidates.len();
        match self.source.find_within_radius(latitude, longitude, radius_km, filters, Some(&candidates)) {
            Ok(locations) => {
                self.optimized.fetch_add(1, Ordering::Relaxed);
                let result = SearchResult {
                    total: locations.len(),
                    locations,
                    source: ResultSource::OptimizedHybrid,
                    candidate_count,
                    cache_hit: false,
                };
                self.store_result(&key, &result);
                info!(candidate_count, total = result.total, "optimized spatial search");
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, candidate_count, "candidate query failed, falling back to direct query");
                let locations = self.source.find_within_radius(latitude, longitude, radius_km, filters, None)?;
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                Ok(SearchResult {
                    total: locations.len(),
                    locations,
                    source: ResultSource::Fallback,
                    candidate_count,
                    cache_hit: false,
                })
            }
        }
    }

    fn store_result(&self, key: &str, result: &SearchResult) {
        if let Err(err) = self.query_cache.lock().put_compressed(key, result) {
            warn!(key = %key, error = %err, "failed to cache search result");
        }
    }

    /// Queue a weather event. Without an explicit severity the event is
    /// scored from its weather fields.
    pub fn queue_event(&self, data: EventRecord, severity: Option<f64>) -> Result<String> {
        let priority = severity.unwrap_or_else(|| score_event(&data));
        let id = self.events.lock().insert(data, priority)?;
        debug!(event = %id, priority, "queued event");
        Ok(id)
    }

    /// Same as `queue_event` with caller-chosen id and metadata
    pub fn queue_event_with(
        &self,
        data: EventRecord,
        severity: Option<f64>,
        id: Option<String>,
        metadata: HashMap<String, Value>,
    ) -> Result<String> {
        let priority = severity.unwrap_or_else(|| score_event(&data));
        self.events.lock().insert_with(data, priority, id, metadata)
    }

    /// Pop up to `batch_size` events in priority order and derive the
    /// response actions for each.
    pub fn process_events(&self, batch_size: usize) -> TriageReport {
        let (batch, remaining) = {
            let mut events = self.events.lock();
            let batch = events.extract_batch(batch_size);
            (batch, events.len())
        };

        let actions: Vec<TriageAction> = batch.iter().flat_map(triage).collect();
        info!(processed = batch.len(), actions = actions.len(), remaining, "processed events");

        TriageReport {
            actions,
            processed: batch.len(),
            remaining,
        }
    }

    /// Queued events meeting `threshold`, highest priority first, without
    /// removing them
    pub fn high_priority_events(&self, threshold: f64) -> Vec<PriorityItem<EventRecord>> {
        self.events
            .lock()
            .get_high_priority_items(threshold)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.lock().len()
    }

    /// Store a computed artifact (a generated report, for instance). Large
    /// artifacts are zstd-compressed; returns whether compression applied.
    pub fn cache_artifact<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool> {
        self.artifact_cache
            .lock()
            .put_compressed_with(key, value, CompressionPriority::Ratio)
    }

    pub fn cached_artifact<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.artifact_cache.lock().get_compressed(key)
    }

    /// Drop expired entries from both caches; returns how many were removed
    pub fn clean_expired(&self) -> usize {
        let removed = self.query_cache.lock().clean_expired() + self.artifact_cache.lock().clean_expired();
        if removed > 0 {
            debug!(removed, "cleaned expired cache entries");
        }
        removed
    }

    pub fn clear_caches(&self) {
        self.query_cache.lock().clear();
        self.artifact_cache.lock().clear();
        info!("caches cleared");
    }

    pub fn stats(&self) -> OptimizerStats {
        OptimizerStats {
            index: self.index.read().stats(),
            query_cache: self.query_cache.lock().stats(),
            artifact_cache: self.artifact_cache.lock().stats(),
            queue: self.events.lock().stats(),
            searches: SearchCounters {
                cache_hits: self.cache_hits.load(Ordering::Relaxed),
                quadtree_empty: self.quadtree_empty.load(Ordering::Relaxed),
                optimized: self.optimized.load(Ordering::Relaxed),
                fallbacks: self.fallbacks.load(Ordering::Relaxed),
            },
        }
    }
}

fn triage(item: &PriorityItem<EventRecord>) -> Vec<TriageAction> {
    let kinds: &[ActionKind] = if item.priority > ESCALATION_THRESHOLD {
        &[ActionKind::EmergencyAlert, ActionKind::NotifyAuthorities]
    } else if item.priority > WARNING_THRESHOLD {
        &[ActionKind::WeatherWarning]
    } else {
        &[]
    };

    kinds
        .iter()
        .map(|&kind| TriageAction {
            event_id: item.id.clone(),
            kind,
            priority: item.priority,
        })
        .collect()
}
