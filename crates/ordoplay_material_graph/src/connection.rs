// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use crate::swizzle::Swizzle;

/// An input edge: the node that owns it reads `target` through `swizzle`.
///
/// The target is referenced by arena index; the graph owns every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Node being read
    pub target: NodeId,
    /// Components read from the target
    pub swizzle: Swizzle,
}

impl Connection {
    /// Create a new connection
    pub fn new(target: NodeId, swizzle: Swizzle) -> Self {
        Self { target, swizzle }
    }

    /// Check if this connection reads a specific node
    pub fn reads(&self, node_id: NodeId) -> bool {
        self.target == node_id
    }
}

/// Connector names understood by the built-in node kinds
pub mod connectors {
    /// First operand
    pub const A: &str = "a";
    /// Second operand
    pub const B: &str = "b";
    /// Blend factor
    pub const T: &str = "t";
    /// Emissive input of a material
    pub const EMISSIVE: &str = "emissive";
    /// Diffuse input of a material
    pub const DIFFUSE: &str = "diffuse";
    /// Specular input of a material
    pub const SPECULAR: &str = "specular";
    /// Normal input of a material
    pub const NORMAL: &str = "normal";
}
