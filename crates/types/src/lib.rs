//! Core types for the Sanders neighborhood mutual-exclusion protocol.
//!
//! This crate holds the vocabulary shared by every other crate in the
//! workspace: node identities, logical timestamps, the request priority
//! order, and the neighbor topology a node is allowed to talk to.

mod identifiers;
mod request;
mod state;
mod topology;

pub use identifiers::{NodeId, Timestamp};
pub use request::VoteRequest;
pub use state::NodeState;
pub use topology::{StaticTopology, Topology, TopologyError};
