pub mod core;
pub mod spatial;
pub mod compression;
pub mod cache;
pub mod queue;
pub mod optimizer;

pub use crate::cache::{generate_key, CacheStats, EvictionCache};
pub use crate::core::clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::stats::OptimizerStats;
pub use crate::core::types::{EventRecord, Filters, LocationId, LocationRecord};
pub use crate::optimizer::{OptimizationFacade, ResultSource, SearchResult, SpatialSource};
pub use crate::queue::{HeapMode, PriorityItem, PriorityQueue};
pub use crate::spatial::bounds::Bounds;
pub use crate::spatial::quadtree::QuadTree;

/*
┌──────────────────────────────────────────────────────────────────────────────────────┐
│                               GEOPTIM STRUCT ARCHITECTURE                            │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── FACADE LAYER ────────────────────────────────────┐
│                                                                                      │
│  ┌────────────────────────────────────────────────────────────────────────────────┐ │
│  │                          struct OptimizationFacade                              │ │
│  │  index: RwLock<QuadTree<LocationRecord>>          // candidate pre-filter       │ │
│  │  query_cache: Mutex<EvictionCache<CompressedBlock>>     // search results      │ │
│  │  artifact_cache: Mutex<EvictionCache<CompressedBlock>>  // generated reports   │ │
│  │  events: Mutex<PriorityQueue<EventRecord>>        // weather event triage       │ │
│  │  source: Arc<dyn SpatialSource>                   // slow precise query         │ │
│  │  // Metrics                                                                     │ │
│  │  cache_hits / quadtree_empty / optimized / fallbacks: AtomicU64                 │ │
│  └────────────────────────────────────────────────────────────────────────────────┘ │
│                                                                                      │
│  search(lat, lon, km, filters)                                                       │
│    key = generate_key(prefix, params) ──► query_cache hit? ──► return (cache_hit)    │
│    candidates = index.query_radius(lon, lat, km / km_per_degree)                     │
│      empty ──► QuadtreeEmpty (cached)                                                │
│      else  ──► source(candidates) ──ok──► OptimizedHybrid (cached)                   │
│                                  └─err──► source(None) ──► Fallback (not cached)     │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── STRUCTURE LAYER ─────────────────────────────────┐
│                                                                                      │
│  ┌────────────────────────┐  ┌──────────────────────────┐  ┌──────────────────────┐ │
│  │ struct QuadTree<T>     │  │ struct EvictionCache<V>  │  │ struct PriorityQueue │ │
│  │ • root: QuadNode<T>    │  │ • entries: LruCache      │  │ • heap: Vec<Item>    │ │
│  │ • capacity             │  │ • capacity, ttl          │  │ • positions: HashMap │ │
│  │ • max_depth            │  │ • clock: SharedClock     │  │ • mode: HeapMode     │ │
│  │ • next_seq, len        │  │ • hits/misses/evictions  │  │ • clock              │ │
│  └────────────────────────┘  └──────────────────────────┘  └──────────────────────┘ │
│                                                                                      │
│  ┌────────────────────────┐  ┌──────────────────────────┐                            │
│  │ struct QuadNode<T>     │  │ struct CompressedBlock   │                            │
│  │ • bounds: Bounds       │  │ • data: Vec<u8>          │                            │
│  │ • depth                │  │ • original_size          │                            │
│  │ • points: Vec<Point>   │  │ • compression            │                            │
│  │ • children: Box<[4]>   │  │ • checksum: crc32        │                            │
│  └────────────────────────┘  └──────────────────────────┘                            │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── CORE LAYER ──────────────────────────────────────┐
│  Config (index / query_cache / artifact_cache / queue / search)                      │
│  Error { kind: ErrorKind, context }      Clock: SystemClock | ManualClock            │
│  LocationRecord { id, latitude, longitude, attributes }    EventRecord = Value       │
└──────────────────────────────────────────────────────────────────────────────────────┘
*/
