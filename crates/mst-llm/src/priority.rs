use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Declaration order doubles as the ordinal: `Critical` (0) is the highest
/// priority, `Low` (3) the lowest. Derived `Ord` therefore ranks `Critical`
/// as the *smallest* value — callers wanting "highest priority first" pop
/// from a min-heap (`BinaryHeap<Reverse<QueuedRequest>>`), not a max-heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestPriority {
    Critical,
    High,
    Normal,
    Low,
}

#[derive(Debug, Default)]
pub struct SequenceCounter(AtomicU64);

impl SequenceCounter {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// One entry in the priority queue. Ordered by `(priority, sequence)` so
/// that within a priority tier, requests are served FIFO. `temperature`/
/// `max_tokens`/`system_prompt` ride along so a caller's sampling
/// parameters reach the provider call unchanged, but take no part in
/// ordering.
#[derive(Debug, Clone)]
pub struct QueuedRequest {
    pub id: Uuid,
    pub priority: RequestPriority,
    pub sequence: u64,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl PartialEq for QueuedRequest {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for QueuedRequest {}

impl PartialOrd for QueuedRequest {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedRequest {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.priority, self.sequence).cmp(&(other.priority, other.sequence))
    }
}

pub type HeapEntry = Reverse<QueuedRequest>;
