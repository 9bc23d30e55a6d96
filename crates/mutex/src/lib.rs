//! Sanders voting state machine for neighborhood mutual exclusion.
//!
//! This crate provides the per-node protocol logic. A node may enter its
//! critical section only after collecting a YES vote from every neighbor.
//! Each node can promise its own vote to one requester at a time; a vote
//! can be reclaimed for a higher-priority requester through INQ/RELINQUISH.
//!
//! # Architecture
//!
//! The state machine processes events synchronously:
//!
//! - `Event::RoundStart` → Sample the entry decision, broadcast REQ if idle
//! - `Event::MessageReceived` → Grant, defer, inquire, relinquish, or count votes
//! - `Event::TimerFired` → Leave the critical section, broadcast RELEASE
//! - `Event::RoundEnd` → Advance the logical clock
//!
//! All I/O is performed by the runner via returned `Action`s.

mod config;
mod queue;
mod sampler;
mod state;

pub use config::{DistributionConfig, MutexConfig};
pub use queue::DeferredQueue;
pub use sampler::{DistributionSampler, Sampler, SamplingError};
pub use state::{MutexState, NodeStats};
