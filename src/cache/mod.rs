pub mod eviction;
pub mod key;

pub use eviction::{CacheEntry, CacheStats, EvictionCache, COMPRESSION_THRESHOLD};
pub use key::generate_key;
