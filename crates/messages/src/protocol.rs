//! The five message kinds of the voting protocol.

use sanders_types::Timestamp;
use serde::{Deserialize, Serialize};

/// A message exchanged between two adjacent nodes.
///
/// Messages are plain values; once sent they are never modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolMessage {
    /// Sender asks for the receiver's vote for a CS attempt stamped `timestamp`.
    Request { timestamp: Timestamp },

    /// Receiver of a request grants its vote to the requester.
    Yes,

    /// Sender asks the receiver to give back the vote granted for `timestamp`,
    /// because a higher-priority request is pending.
    Inquire { timestamp: Timestamp },

    /// Sender gives back a vote, re-submitting itself as a deferred request
    /// with the same `timestamp`.
    Relinquish { timestamp: Timestamp },

    /// Sender left its critical section; the vote it held is free again.
    Release,
}

impl ProtocolMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ProtocolMessage::Request { .. } => "REQ",
            ProtocolMessage::Yes => "YES",
            ProtocolMessage::Inquire { .. } => "INQ",
            ProtocolMessage::Relinquish { .. } => "RELINQUISH",
            ProtocolMessage::Release => "RELEASE",
        }
    }

    /// The timestamp carried by this message, if its kind has one.
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            ProtocolMessage::Request { timestamp }
            | ProtocolMessage::Inquire { timestamp }
            | ProtocolMessage::Relinquish { timestamp } => Some(*timestamp),
            ProtocolMessage::Yes | ProtocolMessage::Release => None,
        }
    }
}
