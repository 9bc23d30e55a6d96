//! Outbound actions a node asks the runner to perform.

use sanders_messages::ProtocolMessage;
use sanders_types::NodeId;

/// Identifies a timer armed by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// Fires once the dwell time in the critical section is over.
    LeaveCriticalSection,
}

/// Side effects requested by the state machine.
///
/// Sends are fire-and-forget and neighbor-scoped. Timers are one-shot and
/// cannot be cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a message to one neighbor.
    Send { to: NodeId, message: ProtocolMessage },

    /// Send a message to every neighbor.
    Broadcast { message: ProtocolMessage },

    /// Fire `id` once, `delay_rounds` rounds from now.
    SetTimer { id: TimerId, delay_rounds: u64 },
}

impl Action {
    /// The message carried by this action, if any.
    pub fn message(&self) -> Option<&ProtocolMessage> {
        match self {
            Action::Send { message, .. } | Action::Broadcast { message } => Some(message),
            Action::SetTimer { .. } => None,
        }
    }
}
