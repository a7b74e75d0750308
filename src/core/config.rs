use std::path::Path;
use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};
use crate::queue::item::HeapMode;
use crate::spatial::bounds::Bounds;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub query_cache: CacheConfig,      // spatial search results
    pub artifact_cache: CacheConfig,   // computed artifacts (generated reports)
    pub queue: QueueConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            index: IndexConfig::world(),
            query_cache: CacheConfig::spatial_queries(),
            artifact_cache: CacheConfig::report_artifacts(),
            queue: QueueConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject values the data structures treat as caller-contract violations
    pub fn validate(&self) -> Result<()> {
        self.index.validate()?;
        self.query_cache.validate("query_cache")?;
        self.artifact_cache.validate("artifact_cache")?;

        if !(self.search.km_per_degree.is_finite() && self.search.km_per_degree > 0.0) {
            return Err(Error::invalid_argument(format!(
                "search.km_per_degree must be positive, got {}",
                self.search.km_per_degree
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub bounds: Bounds,
    pub node_capacity: usize,
    pub max_depth: usize,
}

impl IndexConfig {
    /// Longitude/latitude world: x in [-180, 180), y in [-90, 90)
    pub fn world() -> Self {
        IndexConfig {
            bounds: Bounds::new(-180.0, -90.0, 360.0, 180.0),
            node_capacity: 10,
            max_depth: 16,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.node_capacity == 0 {
            return Err(Error::invalid_argument("index.node_capacity must be at least 1"));
        }
        if !self.bounds.has_area() {
            return Err(Error::invalid_argument(format!(
                "index.bounds must have a positive finite area, got {:?}",
                self.bounds
            )));
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::world()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        CacheConfig { capacity, ttl_secs }
    }

    /// Sized for radius-search results: many small entries, short-lived
    pub fn spatial_queries() -> Self {
        CacheConfig {
            capacity: 1000,
            ttl_secs: 30 * 60,
        }
    }

    /// Sized for expensive generated artifacts: few large entries, long-lived
    pub fn report_artifacts() -> Self {
        CacheConfig {
            capacity: 100,
            ttl_secs: 2 * 60 * 60,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::invalid_argument(format!("{}.capacity must be at least 1", name)));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::spatial_queries()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    pub mode: HeapMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Kilometres per degree used to turn a search radius into a pre-filter
    /// radius. Only exact near the equator; the precise query corrects it.
    pub km_per_degree: f64,
    pub cache_prefix: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            km_per_degree: 111.0,
            cache_prefix: "spatial_search".to_string(),
        }
    }
}
