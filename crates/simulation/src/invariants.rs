//! Global safety checks over the node table.

use crate::SimulationError;
use sanders_mutex::MutexState;
use sanders_types::{NodeId, NodeState, Topology};
use std::collections::BTreeMap;

/// Check mutual exclusion and vote ownership across all nodes.
///
/// - No two adjacent nodes are in their critical sections.
/// - A node in its critical section is the candidate of every neighbor.
pub fn check_invariants<'a>(
    round: u64,
    topology: &dyn Topology,
    nodes: impl IntoIterator<Item = &'a MutexState>,
) -> Result<(), SimulationError> {
    let table: BTreeMap<NodeId, &MutexState> = nodes.into_iter().map(|n| (n.id(), n)).collect();

    for (&id, node) in &table {
        if node.state() != NodeState::InCs {
            continue;
        }
        for &neighbor in topology.neighbors(id) {
            let Some(other) = table.get(&neighbor) else {
                continue;
            };
            if other.state() == NodeState::InCs && id < neighbor {
                return Err(SimulationError::MutualExclusionViolated {
                    round,
                    a: id,
                    b: neighbor,
                });
            }
            if other.candidate().map(|c| c.requester) != Some(id) {
                return Err(SimulationError::VoteNotHeld {
                    round,
                    node: id,
                    neighbor,
                });
            }
        }
    }
    Ok(())
}
