//! Deferred vote requests.

use sanders_types::VoteRequest;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Priority queue of vote requests that could not be granted immediately.
///
/// Extraction order is the protocol priority: timestamp ascending, then
/// requester identity ascending. Duplicates are kept; a requester that shows
/// up twice is granted twice, once per extraction.
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    heap: BinaryHeap<Reverse<VoteRequest>>,
}

impl DeferredQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request. O(log n).
    pub fn insert(&mut self, request: VoteRequest) {
        self.heap.push(Reverse(request));
    }

    /// Remove and return the highest-priority request.
    ///
    /// `None` means nobody is waiting for this node's vote.
    pub fn extract_min(&mut self) -> Option<VoteRequest> {
        self.heap.pop().map(|Reverse(request)| request)
    }

    /// The highest-priority request, without removing it.
    pub fn peek(&self) -> Option<&VoteRequest> {
        self.heap.peek().map(|Reverse(request)| request)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if no request is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
