//! Protocol messages exchanged between neighboring nodes.
//!
//! Five immutable message kinds make up the whole protocol. They carry no
//! behavior beyond the priority comparison defined on [`Envelope`].

mod envelope;
mod protocol;

pub use envelope::Envelope;
pub use protocol::ProtocolMessage;
