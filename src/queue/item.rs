use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Heap ordering, fixed for the lifetime of a queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeapMode {
    #[default]
    Max,
    Min,
}

impl HeapMode {
    /// True when priority `a` must sit strictly above `b` in the heap
    pub fn outranks(&self, a: f64, b: f64) -> bool {
        match self {
            HeapMode::Max => a > b,
            HeapMode::Min => a < b,
        }
    }

    /// Threshold test used by threshold extraction and scans:
    /// `>=` for max-heaps, `<=` for min-heaps
    pub fn meets(&self, priority: f64, threshold: f64) -> bool {
        match self {
            HeapMode::Max => priority >= threshold,
            HeapMode::Min => priority <= threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityItem<T> {
    pub id: String,
    pub payload: T,
    pub priority: f64,
    pub inserted_at: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}
