//! Core types for the per-node protocol state machine.
//!
//! A node is driven entirely by [`Event`]s and answers with [`Action`]s.
//! It never touches another node's state and never performs I/O; the runner
//! owns delivery, timers, and the node table.

mod action;
mod error;
mod event;
mod traits;

pub use action::{Action, TimerId};
pub use error::ProtocolError;
pub use event::Event;
pub use traits::StateMachine;
