//! A message paired with its sender.

use crate::ProtocolMessage;
use sanders_types::{NodeId, VoteRequest};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A delivered message together with the identity of the neighbor that sent it.
///
/// Inboxes are sequences of envelopes, processed in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending neighbor.
    pub from: NodeId,
    /// The message itself.
    pub message: ProtocolMessage,
}

impl Envelope {
    /// Create a new envelope.
    pub fn new(from: NodeId, message: ProtocolMessage) -> Self {
        Self { from, message }
    }

    /// The `(timestamp, sender)` priority of a timestamped message.
    ///
    /// Returns None for YES and RELEASE, which carry no timestamp.
    pub fn priority(&self) -> Option<VoteRequest> {
        self.message
            .timestamp()
            .map(|timestamp| VoteRequest::new(self.from, timestamp))
    }

    /// Compare two timestamped messages by priority: timestamp ascending,
    /// then sender identity ascending.
    ///
    /// Returns None if either message carries no timestamp.
    pub fn cmp_priority(&self, other: &Envelope) -> Option<Ordering> {
        Some(self.priority()?.cmp(&other.priority()?))
    }
}
