//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier.
///
/// Identities are unique and totally ordered; the order is the tie-breaker
/// between requests carrying the same timestamp.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Logical clock value.
///
/// Each node advances its clock by exactly one at the end of every round.
/// A request is stamped with the clock value of the round it was issued in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Clock value before the first round has ended.
    pub const ZERO: Self = Timestamp(0);

    /// Get the next clock value.
    pub fn next(self) -> Self {
        Timestamp(self.0 + 1)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts{}", self.0)
    }
}
