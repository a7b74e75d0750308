pub mod heap;
pub mod item;

pub use heap::{HeapValidation, HeapViolation, PriorityQueue, PriorityRange, QueueStats};
pub use item::{HeapMode, PriorityItem};
