//! Core traits for state machines.

use crate::{Action, Event, ProtocolError};

/// A state machine that processes events.
///
/// This is the core abstraction for the protocol. Every node is a state
/// machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// impl StateMachine for MutexState {
///     fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError> {
///         match event {
///             Event::RoundStart { round } => Ok(self.on_round_start(round)),
///             Event::MessageReceived { from, message } => self.on_message(from, message),
///             // ... etc
///         }
///     }
///
///     fn round(&self) -> u64 {
///         self.round
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Atomic per event**: All state changes for one event are complete
    ///   before the returned actions are executed
    /// - **No I/O**: All I/O is performed by the runner via the returned actions
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] if the event exposes a broken invariant.
    /// The caller should treat this as fatal for the run.
    fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError>;

    /// The round last announced via `Event::RoundStart`.
    fn round(&self) -> u64;
}
