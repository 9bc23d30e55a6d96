//! Protocol invariant violations.

use sanders_types::{NodeId, NodeState};
use thiserror::Error;

/// A detected violation of the protocol's own invariants.
///
/// None of these can occur while every node follows the state machine
/// exactly. They are fatal for the run and are returned to the caller
/// rather than ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// More votes collected than the node has neighbors.
    #[error("vote count {votes} exceeds neighbor count {neighbors}")]
    VoteOverflow { votes: usize, neighbors: usize },

    /// A relinquish was requested with no vote left to give back.
    #[error("cannot relinquish vote to {to}: no votes held")]
    VoteUnderflow { to: NodeId },

    /// A YES arrived while the node was not collecting votes.
    #[error("unexpected vote from {from} while {state}")]
    UnexpectedVote { from: NodeId, state: NodeState },

    /// The leave-CS timer fired outside the critical section.
    #[error("leave-CS timer fired while {state}")]
    UnexpectedTimer { state: NodeState },

    /// A message arrived from, or was addressed to, a node that is not a neighbor.
    #[error("{0} is not a neighbor")]
    NotANeighbor(NodeId),
}
