//! One-shot relative timers keyed by firing round.

use sanders_core::TimerId;
use sanders_types::NodeId;
use std::collections::BTreeMap;

/// Key for ordering armed timers deterministically.
///
/// Ordered by: round, then node, then arming sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerKey {
    /// Round in which the timer fires.
    pub round: u64,
    /// Node that armed the timer.
    pub node: NodeId,
    /// Arming order, for timers sharing a round and node.
    pub sequence: u64,
}

/// Armed timers, owned by the runner.
///
/// A timer only carries the identity of the node that armed it; the runner
/// looks the node up in its own table when the timer fires.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: BTreeMap<TimerKey, TimerId>,
    sequence: u64,
}

impl TimerQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `id` for `node` to fire in `round`.
    pub fn schedule(&mut self, node: NodeId, round: u64, id: TimerId) -> TimerKey {
        let key = TimerKey {
            round,
            node,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.timers.insert(key, id);
        key
    }

    /// Remove and return every timer of `node` due in `round`, in arming order.
    pub fn take_due(&mut self, node: NodeId, round: u64) -> Vec<TimerId> {
        let start = TimerKey {
            round,
            node,
            sequence: 0,
        };
        let end = TimerKey {
            round,
            node,
            sequence: u64::MAX,
        };
        let due: Vec<TimerKey> = self.timers.range(start..=end).map(|(k, _)| *k).collect();
        due.into_iter()
            .filter_map(|key| self.timers.remove(&key))
            .collect()
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Check if no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
