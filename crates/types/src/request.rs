//! Vote requests and their priority order.

use crate::{NodeId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A pending ask for a node's vote.
///
/// Ordering is the protocol's priority order: timestamp ascending, then
/// requester identity ascending. A *smaller* request has *higher* priority.
/// The derived `Ord` relies on the field order below.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct VoteRequest {
    /// Timestamp the requester attached to its CS attempt.
    pub timestamp: Timestamp,
    /// The node asking for the vote.
    pub requester: NodeId,
}

impl VoteRequest {
    /// Create a new vote request.
    pub fn new(requester: NodeId, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            requester,
        }
    }

    /// Whether this request should be served before `other`.
    pub fn has_priority_over(&self, other: &VoteRequest) -> bool {
        self < other
    }
}

impl fmt::Display for VoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.timestamp, self.requester)
    }
}
