// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure owning nodes and their input edges.

use crate::connection::Connection;
use crate::document::{NodeRecord, ParseError};
use crate::node::{Node, NodeId};
use crate::swizzle::{Swizzle, SwizzleError};
use indexmap::IndexMap;
use std::cmp::Reverse;

/// A material graph.
///
/// Nodes live in a single arena and reference each other by [`NodeId`].
/// Building happens in two passes: every node is added, then edges are
/// connected, which accumulates each target's read modifiers. Code
/// generation only borrows the graph, so it always sees a frozen graph.
#[derive(Debug, Clone)]
pub struct MaterialGraph {
    /// Graph name
    pub name: String,
    /// Node arena
    nodes: Vec<Node>,
    /// Name lookup
    names: IndexMap<String, NodeId>,
}

impl MaterialGraph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            names: IndexMap::new(),
        }
    }

    /// Add a node to the graph. Names must be unique.
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, ParseError> {
        if self.names.contains_key(&node.name) {
            return Err(ParseError::DuplicateName(node.name));
        }
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.names.insert(node.name.clone(), id);
        self.nodes.push(node);
        Ok(id)
    }

    /// Build a node from a document record and add it
    pub fn create_node(&mut self, record: &NodeRecord) -> Result<NodeId, ParseError> {
        let node = Node::from_record(record)?;
        self.add_node(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id.0)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id.0)
    }

    /// Find a node ID by name
    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Find a node by name
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.id_of(name).and_then(|id| self.node(id))
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Register input `connector` on `source`, reading `target` through `swizzle`.
    ///
    /// The swizzle is merged into the target's read modifiers, since the
    /// target's declared width depends on every place that reads it.
    pub fn connect(
        &mut self,
        source: NodeId,
        connector: &str,
        target: NodeId,
        swizzle: &str,
    ) -> Result<(), ConnectionError> {
        if self.node(source).is_none() {
            return Err(ConnectionError::NodeNotFound(source));
        }
        if self.node(target).is_none() {
            return Err(ConnectionError::NodeNotFound(target));
        }
        if source == target {
            return Err(ConnectionError::SelfLoop);
        }
        if self.depends_on(target, source) {
            return Err(ConnectionError::Cycle {
                source_node: self.nodes[source.0].name.clone(),
                target_node: self.nodes[target.0].name.clone(),
            });
        }
        let swizzle = Swizzle::parse(swizzle)?;

        self.nodes[target.0].used_by_modifiers.merge(&swizzle);
        self.nodes[source.0]
            .inputs
            .insert(connector.to_string(), Connection::new(target, swizzle));
        Ok(())
    }

    /// [`connect`](Self::connect) with nodes addressed by name
    pub fn connect_by_name(
        &mut self,
        source: &str,
        connector: &str,
        target: &str,
        swizzle: &str,
    ) -> Result<(), ConnectionError> {
        let source_id = self
            .id_of(source)
            .ok_or_else(|| ConnectionError::UnknownName(source.to_string()))?;
        let target_id = self
            .id_of(target)
            .ok_or_else(|| ConnectionError::UnknownName(target.to_string()))?;
        self.connect(source_id, connector, target_id, swizzle)
    }

    /// Whether `node` reads `other`, directly or transitively. Ids outside
    /// the graph read nothing.
    pub fn depends_on(&self, node: NodeId, other: NodeId) -> bool {
        let mut stack = vec![node];
        let mut visited = vec![false; self.nodes.len()];
        while let Some(current) = stack.pop() {
            let (Some(seen), Some(node)) = (visited.get_mut(current.0), self.nodes.get(current.0)) else {
                continue;
            };
            if current == other {
                return true;
            }
            if std::mem::replace(seen, true) {
                continue;
            }
            stack.extend(node.inputs.values().map(|c| c.target));
        }
        false
    }

    /// Nodes that read `node_id` through at least one connector
    pub fn readers_of(&self, node_id: NodeId) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(move |n| n.inputs.values().any(|c| c.reads(node_id)))
    }

    /// Depth of every node: 0 when nothing reads it, otherwise one more than
    /// its deepest reader.
    ///
    /// A node is settled once every edge reading it has been visited, so
    /// the walk never recurses and handles chains of any length.
    pub fn compute_depths(&self) -> Vec<u32> {
        let mut pending = vec![0usize; self.nodes.len()];
        for connection in self.nodes.iter().flat_map(|n| n.inputs.values()) {
            pending[connection.target.0] += 1;
        }

        let mut depths = vec![0u32; self.nodes.len()];
        let mut settled: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| pending[n.id.0] == 0)
            .map(|n| n.id)
            .collect();
        while let Some(id) = settled.pop() {
            let depth = depths[id.0] + 1;
            for connection in self.nodes[id.0].inputs.values() {
                let target = connection.target.0;
                depths[target] = depths[target].max(depth);
                pending[target] -= 1;
                if pending[target] == 0 {
                    settled.push(connection.target);
                }
            }
        }
        depths
    }

    /// Store [`compute_depths`](Self::compute_depths) in each node's depth marker
    pub fn assign_depth_markers(&mut self) {
        let depths = self.compute_depths();
        for (node, depth) in self.nodes.iter_mut().zip(depths) {
            node.set_depth_marker(depth);
        }
    }

    /// Order in which nodes emit code: deepest first, so every node comes
    /// after everything it reads. Material nodes close their depth, since
    /// they snapshot the pixel code emitted so far. Other ties keep
    /// insertion order.
    pub fn generation_order(&self) -> Vec<NodeId> {
        let depths = self.compute_depths();
        let mut order: Vec<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        order.sort_by_key(|id| (Reverse(depths[id.0]), self.nodes[id.0].kind.is_material()));
        order
    }
}

impl Default for MaterialGraph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// No node with this name
    #[error("No node named {0:?}")]
    UnknownName(String),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// The edge would close a cycle
    #[error("Connecting {source_node:?} to {target_node:?} would create a cycle")]
    Cycle {
        /// Reading node
        source_node: String,
        /// Node being read
        target_node: String,
    },

    /// Malformed swizzle
    #[error(transparent)]
    Swizzle(#[from] SwizzleError),
}
