//! Reliable, neighbor-scoped message delivery with a one-round delay.

use sanders_messages::{Envelope, ProtocolMessage};
use sanders_types::{NodeId, Topology};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Simulated network between neighboring nodes.
///
/// Messages posted during round `r` become visible in round `r + 1`, when
/// [`Network::begin_round`] moves them into the inboxes. Delivery never
/// drops, duplicates or reorders messages.
pub struct Network {
    topology: Arc<dyn Topology>,

    /// Inboxes drained during the current round.
    current: BTreeMap<NodeId, Vec<Envelope>>,

    /// Messages posted during the current round.
    pending: BTreeMap<NodeId, Vec<Envelope>>,

    /// Total messages posted, one per recipient.
    posted: u64,
}

impl Network {
    /// Create a network over the given topology.
    pub fn new(topology: Arc<dyn Topology>) -> Self {
        Self {
            topology,
            current: BTreeMap::new(),
            pending: BTreeMap::new(),
            posted: 0,
        }
    }

    /// The topology messages are routed over.
    pub fn topology(&self) -> &Arc<dyn Topology> {
        &self.topology
    }

    /// Make last round's messages deliverable.
    ///
    /// Anything left undrained in the previous round's inboxes is discarded;
    /// the runner always drains every inbox.
    pub fn begin_round(&mut self) {
        self.current = std::mem::take(&mut self.pending);
    }

    /// Post a message to one neighbor.
    ///
    /// Returns false (and posts nothing) if `to` is not a neighbor of `from`.
    pub fn send(&mut self, from: NodeId, to: NodeId, message: ProtocolMessage) -> bool {
        if !self.topology.are_neighbors(from, to) {
            return false;
        }
        self.pending
            .entry(to)
            .or_default()
            .push(Envelope::new(from, message));
        self.posted += 1;
        true
    }

    /// Post a message to every neighbor of `from`, in ascending identity order.
    pub fn broadcast(&mut self, from: NodeId, message: ProtocolMessage) {
        let Self {
            topology,
            pending,
            posted,
            ..
        } = self;
        for &to in topology.neighbors(from) {
            pending.entry(to).or_default().push(Envelope::new(from, message));
            *posted += 1;
        }
    }

    /// Remove and return this round's inbox for `node`, in arrival order.
    pub fn take_inbox(&mut self, node: NodeId) -> Vec<Envelope> {
        self.current.remove(&node).unwrap_or_default()
    }

    /// Messages waiting for delivery in the next round.
    pub fn in_flight(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Total messages posted so far.
    pub fn posted(&self) -> u64 {
        self.posted
    }
}
