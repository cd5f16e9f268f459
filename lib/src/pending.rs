use crate::Item;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

// Items that were received but not emitted yet
//
// Ordered by `priority` only, so popping yields
// the highest priority item buffered. Items with
// equal priority come out in whatever order the
// heap happens to keep them.
//
// Note: unbounded. Anything the producer sends
// ahead of the consumer ends up here.
#[derive(Default)]
pub struct Pending {
    heap: BinaryHeap<ByPriority>,
}

struct ByPriority(Item);

impl PartialEq for ByPriority {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority() == other.0.priority()
    }
}

impl Eq for ByPriority {}

impl PartialOrd for ByPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.priority().cmp(&other.0.priority())
    }
}

impl Pending {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, item: Item) {
        self.heap.push(ByPriority(item));
    }

    /// Remove and return the highest priority item
    pub fn pop(&mut self) -> Option<Item> {
        self.heap.pop().map(|by_priority| by_priority.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
