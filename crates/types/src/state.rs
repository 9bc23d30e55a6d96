//! Protocol state of a single node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a node is in its critical-section cycle.
///
/// The cycle is `NotInCs -> Waiting -> InCs -> NotInCs`, repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Idle; not requesting entry.
    #[default]
    NotInCs,
    /// Request broadcast, collecting votes.
    Waiting,
    /// Holding every neighbor's vote.
    InCs,
}

impl NodeState {
    /// Short name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::NotInCs => "not_in_cs",
            NodeState::Waiting => "waiting",
            NodeState::InCs => "in_cs",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
