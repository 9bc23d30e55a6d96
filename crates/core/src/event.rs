//! Inbound events delivered to a node by the runner.

use crate::TimerId;
use sanders_messages::{Envelope, ProtocolMessage};
use sanders_types::NodeId;

/// Everything a node can be asked to react to.
///
/// Within one round the runner delivers, per node and in this order:
/// `RoundStart`, any due `TimerFired`, one `MessageReceived` per inbox
/// entry (arrival order), then `RoundEnd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new round begins. Idle nodes decide here whether to request entry.
    RoundStart { round: u64 },

    /// A message from a neighbor, taken from this round's inbox.
    MessageReceived { from: NodeId, message: ProtocolMessage },

    /// A relative timer armed by this node has fired.
    TimerFired { id: TimerId },

    /// The round is over; the logical clock advances.
    RoundEnd { round: u64 },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::RoundStart { .. } => "RoundStart",
            Event::MessageReceived { .. } => "MessageReceived",
            Event::TimerFired { .. } => "TimerFired",
            Event::RoundEnd { .. } => "RoundEnd",
        }
    }
}

impl From<Envelope> for Event {
    fn from(envelope: Envelope) -> Self {
        Event::MessageReceived {
            from: envelope.from,
            message: envelope.message,
        }
    }
}
