//! Errors that abort a simulation run.

use sanders_core::ProtocolError;
use sanders_types::NodeId;
use thiserror::Error;

/// A fatal condition detected while running rounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// A node's state machine reported a broken invariant.
    #[error("{node} failed in round {round}: {source}")]
    Protocol {
        node: NodeId,
        round: u64,
        #[source]
        source: ProtocolError,
    },

    /// Two adjacent nodes were in their critical sections at the same time.
    #[error("adjacent nodes {a} and {b} both in critical section in round {round}")]
    MutualExclusionViolated { round: u64, a: NodeId, b: NodeId },

    /// A node was in its critical section while a neighbor's vote was promised elsewhere.
    #[error("{node} in critical section without the vote of {neighbor} in round {round}")]
    VoteNotHeld {
        round: u64,
        node: NodeId,
        neighbor: NodeId,
    },

    /// A node was supplied that the topology does not know.
    #[error("{0} is not part of the topology")]
    UnknownNode(NodeId),
}
