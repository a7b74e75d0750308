use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use tracing::debug;
use uuid::Uuid;
use crate::core::clock::{system_clock, SharedClock};
use crate::core::error::{Error, Result};
use crate::queue::item::{HeapMode, PriorityItem};

/// Array-backed binary heap of prioritized payloads.
///
/// Parent of `i` is `(i - 1) / 2`, children are `2i + 1` and `2i + 2`.
/// Ids are unique; `positions` maps each id to its current array slot and is
/// kept in step with every swap.
pub struct PriorityQueue<T> {
    heap: Vec<PriorityItem<T>>,
    positions: HashMap<String, usize>,
    mode: HeapMode,
    clock: SharedClock,
    total_inserted: u64,
    total_extracted: u64,
    peak_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_inserted: u64,
    pub total_extracted: u64,
    pub peak_size: usize,
    pub current_size: usize,
    pub average_priority: f64,
    pub priority_range: Option<PriorityRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapViolation {
    pub parent_index: usize,
    pub child_index: usize,
    pub parent_priority: f64,
    pub child_priority: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapValidation {
    pub is_valid: bool,
    pub violations: Vec<HeapViolation>,
}

impl<T> PriorityQueue<T> {
    pub fn new(mode: HeapMode) -> Self {
        Self::with_clock(mode, system_clock())
    }

    pub fn with_clock(mode: HeapMode, clock: SharedClock) -> Self {
        PriorityQueue {
            heap: Vec::new(),
            positions: HashMap::new(),
            mode,
            clock,
            total_inserted: 0,
            total_extracted: 0,
            peak_size: 0,
        }
    }

    pub fn insert(&mut self, payload: T, priority: f64) -> Result<String> {
        self.insert_with(payload, priority, None, HashMap::new())
    }

    /// Insert with an explicit id (generated when `None`) and metadata.
    /// NaN priorities and duplicate ids are rejected.
    pub fn insert_with(
        &mut self,
        payload: T,
        priority: f64,
        id: Option<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<String> {
        if priority.is_nan() {
            return Err(Error::invalid_argument("priority must not be NaN"));
        }
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.positions.contains_key(&id) {
            return Err(Error::invalid_argument(format!("duplicate priority item id '{}'", id)));
        }

        let index = self.heap.len();
        self.heap.push(PriorityItem {
            id: id.clone(),
            payload,
            priority,
            inserted_at: self.clock.now(),
            metadata,
        });
        self.positions.insert(id.clone(), index);
        self.sift_up(index);

        self.total_inserted += 1;
        self.peak_size = self.peak_size.max(self.heap.len());
        Ok(id)
    }

    /// Remove and return the root, or `None` when empty
    pub fn extract(&mut self) -> Option<PriorityItem<T>> {
        let item = self.take_at(0)?;
        self.total_extracted += 1;
        Some(item)
    }

    pub fn peek(&self) -> Option<&PriorityItem<T>> {
        self.heap.first()
    }

    /// Up to `n` items in priority order
    pub fn extract_batch(&mut self, n: usize) -> Vec<PriorityItem<T>> {
        let mut batch = Vec::with_capacity(n.min(self.heap.len()));
        while batch.len() < n {
            match self.extract() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        batch
    }

    /// Extract while the current root meets `threshold` (`>=` for max-heaps,
    /// `<=` for min-heaps). Only the root is tested at each step; the heap
    /// property guarantees nothing left behind can qualify.
    pub fn extract_by_threshold(&mut self, threshold: f64) -> Vec<PriorityItem<T>> {
        let mut extracted = Vec::new();
        while self
            .peek()
            .is_some_and(|root| self.mode.meets(root.priority, threshold))
        {
            if let Some(item) = self.extract() {
                extracted.push(item);
            }
        }
        debug!(threshold, extracted = extracted.len(), remaining = self.heap.len(), "threshold extraction");
        extracted
    }

    /// Change an item's priority and restore the heap. `Ok(false)` if `id` is unknown.
    pub fn update_priority(&mut self, id: &str, priority: f64) -> Result<bool> {
        if priority.is_nan() {
            return Err(Error::invalid_argument("priority must not be NaN"));
        }
        let Some(&index) = self.positions.get(id) else {
            return Ok(false);
        };

        let previous = self.heap[index].priority;
        self.heap[index].priority = priority;
        if self.mode.outranks(priority, previous) {
            self.sift_up(index);
        } else {
            self.sift_down(index);
        }
        Ok(true)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        match self.positions.get(id) {
            Some(&index) => self.take_at(index).is_some(),
            None => false,
        }
    }

    /// Every item meeting `threshold`, best first. Does not modify the heap.
    pub fn get_high_priority_items(&self, threshold: f64) -> Vec<&PriorityItem<T>> {
        let mut items: Vec<&PriorityItem<T>> = self.heap
            .iter()
            .filter(|item| self.mode.meets(item.priority, threshold))
            .collect();

        match self.mode {
            HeapMode::Max => items.sort_by(|a, b| b.priority.total_cmp(&a.priority)),
            HeapMode::Min => items.sort_by(|a, b| a.priority.total_cmp(&b.priority)),
        }
        items
    }

    /// Full parent/child check over the array
    pub fn validate(&self) -> HeapValidation {
        let violations: Vec<HeapViolation> = (1..self.heap.len())
            .filter_map(|child| {
                let parent = (child - 1) / 2;
                let (p, c) = (self.heap[parent].priority, self.heap[child].priority);
                self.mode.outranks(c, p).then_some(HeapViolation {
                    parent_index: parent,
                    child_index: child,
                    parent_priority: p,
                    child_priority: c,
                })
            })
            .collect();

        HeapValidation {
            is_valid: violations.is_empty(),
            violations,
        }
    }

    pub fn stats(&self) -> QueueStats {
        let priorities = self.heap.iter().map(|item| item.priority);
        let priority_range = priorities.clone().fold(None, |range: Option<PriorityRange>, p| {
            Some(match range {
                None => PriorityRange { min: p, max: p },
                Some(r) => PriorityRange { min: r.min.min(p), max: r.max.max(p) },
            })
        });
        let average_priority = if self.heap.is_empty() {
            0.0
        } else {
            priorities.sum::<f64>() / self.heap.len() as f64
        };

        QueueStats {
            total_inserted: self.total_inserted,
            total_extracted: self.total_extracted,
            peak_size: self.peak_size,
            current_size: self.heap.len(),
            average_priority,
            priority_range,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&PriorityItem<T>> {
        self.positions.get(id).map(|&index| &self.heap[index])
    }

    /// Items in array (heap) order, not priority order
    pub fn iter(&self) -> std::slice::Iter<'_, PriorityItem<T>> {
        self.heap.iter()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn mode(&self) -> HeapMode {
        self.mode
    }

    /// Swap slot `index` with the last element, pop it, and repair the heap
    /// from `index` in whichever direction is needed.
    fn take_at(&mut self, index: usize) -> Option<PriorityItem<T>> {
        if index >= self.heap.len() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(index, last);
        let item = self.heap.pop()?;
        self.positions.remove(&item.id);

        if index < self.heap.len() && self.sift_up(index) == index {
            self.sift_down(index);
        }
        Some(item)
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.mode.outranks(self.heap[index].priority, self.heap[parent].priority) {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut best = index;

            if left < len && self.mode.outranks(self.heap[left].priority, self.heap[best].priority) {
                best = left;
            }
            if right < len && self.mode.outranks(self.heap[right].priority, self.heap[best].priority) {
                best = right;
            }
            if best == index {
                break;
            }
            self.swap(index, best);
            index = best;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        if let Some(slot) = self.positions.get_mut(&self.heap[a].id) {
            *slot = a;
        }
        if let Some(slot) = self.positions.get_mut(&self.heap[b].id) {
            *slot = b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn drain_priorities<T>(queue: &mut PriorityQueue<T>) -> Vec<f64> {
        std::iter::from_fn(|| queue.extract().map(|item| item.priority)).collect()
    }

    #[test]
    fn max_heap_extracts_non_increasing() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        for p in [3.0, 9.5, 1.0, 7.25, 9.5, 0.0, 4.0] {
            queue.insert((), p).unwrap();
            assert!(queue.validate().is_valid);
        }
        assert_eq!(drain_priorities(&mut queue), vec![9.5, 9.5, 7.25, 4.0, 3.0, 1.0, 0.0]);
        assert!(queue.extract().is_none());
    }

    #[test]
    fn min_heap_extracts_non_decreasing() {
        let mut queue = PriorityQueue::new(HeapMode::Min);
        for p in [3.0, -2.0, 8.0, 1.0] {
            queue.insert("x", p).unwrap();
        }
        assert_eq!(queue.peek().unwrap().priority, -2.0);
        assert_eq!(drain_priorities(&mut queue), vec![-2.0, 1.0, 3.0, 8.0]);
    }

    #[test]
    fn nan_and_duplicate_ids_are_rejected() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        assert_eq!(queue.insert(1, f64::NAN).unwrap_err().kind(), ErrorKind::InvalidArgument);

        queue.insert_with(1, 1.0, Some("evt".into()), HashMap::new()).unwrap();
        let err = queue.insert_with(2, 2.0, Some("evt".into()), HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(queue.len(), 1);
        assert!(queue.update_priority("evt", f64::NAN).is_err());
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        let a = queue.insert(1, 1.0).unwrap();
        let b = queue.insert(2, 1.0).unwrap();
        assert_ne!(a, b);
        assert!(queue.contains(&a) && queue.contains(&b));
    }

    #[test]
    fn update_priority_moves_both_ways() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        let low = queue.insert("low", 1.0).unwrap();
        let high = queue.insert("high", 10.0).unwrap();
        queue.insert("mid", 5.0).unwrap();

        assert!(queue.update_priority(&low, 20.0).unwrap());
        assert_eq!(queue.peek().unwrap().payload, "low");
        assert!(queue.validate().is_valid);

        assert!(queue.update_priority(&low, 0.5).unwrap());
        assert!(queue.update_priority(&high, 2.0).unwrap());
        assert!(queue.validate().is_valid);
        assert_eq!(queue.peek().unwrap().payload, "mid");

        assert!(!queue.update_priority("missing", 3.0).unwrap());
    }

    #[test]
    fn remove_from_middle_keeps_heap_valid() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        let ids: Vec<String> = [50.0, 40.0, 30.0, 35.0, 38.0, 20.0, 25.0, 1.0]
            .iter()
            .map(|&p| queue.insert(p as i32, p).unwrap())
            .collect();

        assert!(queue.remove(&ids[2]));
        assert!(queue.validate().is_valid);
        assert!(!queue.remove(&ids[2]));
        assert!(queue.remove(&ids[0]));
        assert!(queue.validate().is_valid);
        for id in &ids[3..] {
            assert_eq!(queue.get(id).unwrap().id, *id);
        }
        assert_eq!(drain_priorities(&mut queue), vec![40.0, 38.0, 35.0, 25.0, 20.0, 1.0]);
    }

    #[test]
    fn threshold_extraction_stops_at_first_failure() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        queue.insert("a", 8.5).unwrap();
        queue.insert("b", 2.0).unwrap();
        queue.insert("c", 9.8).unwrap();

        let taken: Vec<&str> = queue.extract_by_threshold(7.0).into_iter().map(|i| i.payload).collect();
        assert_eq!(taken, vec!["c", "a"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek().unwrap().priority, 2.0);
    }

    #[test]
    fn min_heap_threshold_is_upper_bound() {
        let mut queue = PriorityQueue::new(HeapMode::Min);
        for p in [5.0, 1.0, 3.0, 9.0] {
            queue.insert(p, p).unwrap();
        }
        let scan: Vec<f64> = queue.get_high_priority_items(3.0).iter().map(|i| i.priority).collect();
        assert_eq!(scan, vec![1.0, 3.0]);
        let taken: Vec<f64> = queue.extract_by_threshold(3.0).iter().map(|i| i.priority).collect();
        assert_eq!(taken, vec![1.0, 3.0]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn high_priority_scan_is_non_destructive() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        for p in [2.0, 9.0, 6.0, 8.0, 1.0] {
            queue.insert(p, p).unwrap();
        }
        let scan: Vec<f64> = queue.get_high_priority_items(6.0).iter().map(|i| i.priority).collect();
        assert_eq!(scan, vec![9.0, 8.0, 6.0]);
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn validate_reports_violations() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        queue.insert((), 5.0).unwrap();
        queue.insert((), 1.0).unwrap();
        queue.heap[1].priority = 10.0;
        let report = queue.validate();
        assert!(!report.is_valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].child_index, 1);
    }

    #[test]
    fn stats_track_lifetime_counters() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        assert_eq!(queue.stats().priority_range, None);
        for p in [2.0, 4.0, 6.0] {
            queue.insert((), p).unwrap();
        }
        queue.extract();
        let stats = queue.stats();
        assert_eq!(stats.total_inserted, 3);
        assert_eq!(stats.total_extracted, 1);
        assert_eq!(stats.peak_size, 3);
        assert_eq!(stats.current_size, 2);
        assert_eq!(stats.average_priority, 3.0);
        assert_eq!(stats.priority_range, Some(PriorityRange { min: 2.0, max: 4.0 }));
    }

    #[test]
    fn batch_stops_when_empty() {
        let mut queue = PriorityQueue::new(HeapMode::Max);
        queue.insert(1, 1.0).unwrap();
        queue.insert(2, 2.0).unwrap();
        let batch = queue.extract_batch(5);
        assert_eq!(batch.iter().map(|i| i.payload).collect::<Vec<_>>(), vec![2, 1]);
        assert!(queue.is_empty());
    }
}
