use serde::{Serialize, Deserialize};
use crate::cache::eviction::CacheStats;
use crate::queue::heap::QueueStats;
use crate::spatial::quadtree::TreeStats;

/// Point-in-time snapshot of every structure behind the facade, for
/// monitoring and demo endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerStats {
    pub index: TreeStats,
    pub query_cache: CacheStats,
    pub artifact_cache: CacheStats,
    pub queue: QueueStats,
    pub searches: SearchCounters,
}

/// How search requests were answered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCounters {
    pub cache_hits: u64,
    pub quadtree_empty: u64,
    pub optimized: u64,
    pub fallbacks: u64,
}

impl SearchCounters {
    pub fn total(&self) -> u64 {
        self.cache_hits + self.quadtree_empty + self.optimized + self.fallbacks
    }
}
