//! Topology trait and static implementation.

use crate::NodeId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Read-only neighbor graph.
///
/// Links are undirected: if `b` is a neighbor of `a`, then `a` is a neighbor
/// of `b`. Exclusion is only enforced between neighbors.
pub trait Topology: Send + Sync {
    /// All nodes, in ascending identity order.
    fn nodes(&self) -> &[NodeId];

    /// Ordered neighbors of a node. Empty for unknown nodes.
    fn neighbors(&self, node: NodeId) -> &[NodeId];

    // Derived methods

    /// Number of nodes in the graph.
    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// Whether the node is part of this graph.
    fn contains(&self, node: NodeId) -> bool {
        self.nodes().binary_search(&node).is_ok()
    }

    /// Number of neighbors of a node.
    fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// Check if two nodes are directly connected.
    fn are_neighbors(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Every undirected link once, as `(low, high)` pairs.
    fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes()
            .iter()
            .flat_map(|&a| {
                self.neighbors(a)
                    .iter()
                    .filter(move |&&b| a < b)
                    .map(move |&b| (a, b))
            })
            .collect()
    }
}

/// Errors that can occur when building a topology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// An edge references a node that was not declared.
    #[error("edge references unknown node {0}")]
    UnknownNode(NodeId),

    /// A node cannot be its own neighbor.
    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),

    /// A graph needs at least one node.
    #[error("topology must contain at least one node")]
    Empty,
}

/// A static topology implementation.
#[derive(Debug, Clone)]
pub struct StaticTopology {
    nodes: Vec<NodeId>,
    neighbors: BTreeMap<NodeId, Vec<NodeId>>,
}

impl StaticTopology {
    /// Create a topology from a node list and undirected edges.
    ///
    /// Duplicate edges are merged.
    pub fn from_edges(
        nodes: impl IntoIterator<Item = NodeId>,
        edges: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> Result<Self, TopologyError> {
        let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> = nodes
            .into_iter()
            .map(|node| (node, BTreeSet::new()))
            .collect();

        if adjacency.is_empty() {
            return Err(TopologyError::Empty);
        }

        for (a, b) in edges {
            if a == b {
                return Err(TopologyError::SelfLoop(a));
            }
            for node in [a, b] {
                if !adjacency.contains_key(&node) {
                    return Err(TopologyError::UnknownNode(node));
                }
            }
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }

        let nodes = adjacency.keys().copied().collect();
        let neighbors = adjacency
            .into_iter()
            .map(|(node, set)| (node, set.into_iter().collect()))
            .collect();

        Ok(Self { nodes, neighbors })
    }

    /// Square grid of `size * size` nodes with identities `1..=size*size`.
    ///
    /// Two nodes are neighbors iff they share a row or a column, where
    /// `row = (id - 1) % size` and `col = (id - 1) / size`.
    pub fn grid(size: u32) -> Result<Self, TopologyError> {
        let count = size * size;
        let row = |id: u32| (id - 1) % size;
        let col = |id: u32| (id - 1) / size;

        let mut edges = Vec::new();
        for a in 1..=count {
            for b in (a + 1)..=count {
                if row(a) == row(b) || col(a) == col(b) {
                    edges.push((NodeId(a), NodeId(b)));
                }
            }
        }

        Self::from_edges((1..=count).map(NodeId), edges)
    }

    /// Ring of `count` nodes with identities `1..=count`.
    pub fn ring(count: u32) -> Result<Self, TopologyError> {
        let edges: Vec<_> = if count < 2 {
            Vec::new()
        } else if count == 2 {
            vec![(NodeId(1), NodeId(2))]
        } else {
            (1..=count)
                .map(|id| (NodeId(id), NodeId(id % count + 1)))
                .collect()
        };

        Self::from_edges((1..=count).map(NodeId), edges)
    }

    /// Create a topology as an Arc.
    pub fn into_arc(self) -> Arc<dyn Topology> {
        Arc::new(self)
    }
}

impl Topology for StaticTopology {
    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.neighbors
            .get(&node)
            .map(|n| n.as_slice())
            .unwrap_or(&[])
    }
}
