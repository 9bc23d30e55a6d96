//! Deterministic round-based simulation runner.
//!
//! Given the same topology, configuration and seed, a run produces identical
//! results every time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Network: per-node inboxes, FIFO per round      │ │
//! │  │     Timers:  BTreeMap<TimerKey, TimerId>           │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     nodes: Vec<MutexState>, ascending NodeId       │ │
//! │  │     RoundStart → timers → inbox → RoundEnd         │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → next round's inboxes, timers         │ │
//! │  │     Invariant check + RoundSnapshot                │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! A message sent in round `r` is delivered in round `r + 1`. Each inbox is
//! drained exactly once, in send order.

mod error;
mod invariants;
mod network;
mod runner;
mod snapshot;
mod timers;

pub use error::SimulationError;
pub use invariants::check_invariants;
pub use network::Network;
pub use runner::{SimulationRunner, SimulationStats};
pub use snapshot::RoundSnapshot;
pub use timers::{TimerKey, TimerQueue};
