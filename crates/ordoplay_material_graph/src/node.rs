// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the material graph.

use crate::connection::Connection;
use crate::swizzle::ReadModifiers;
use indexmap::IndexMap;
use std::fmt;

/// Index of a node inside its owning graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operation a node performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Placeholder that generates nothing
    None,
    /// Terminal node of a forward-lit material
    ForwardMaterial,
    /// Terminal node of a deferred material
    DeferredMaterial,
    /// 2D texture fetch
    Sample2D {
        /// Texture coordinate set (`varTexCoord[input]`)
        texture_input: u32,
        /// Texture unit (`texture[channel]`)
        texture_channel: u32,
    },
    /// Component-wise product of `a` and `b`
    Mul,
    /// Component-wise sum of `a` and `b`
    Add,
    /// Linear blend from `a` to `b` by `t`
    Lerp,
    /// Shader time input
    Time,
    /// Sine of `a`
    Sin,
    /// Cosine of `a`
    Cos,
}

/// Canonical and short type names, in tag order
const TYPE_NAMES: [(&str, &str); 10] = [
    ("TYPE_NONE", "None"),
    ("TYPE_FORWARD_MATERIAL", "ForwardMaterial"),
    ("TYPE_DEFERRED_MATERIAL", "DeferredMaterial"),
    ("TYPE_SAMPLE_2D", "Sample2D"),
    ("TYPE_MUL", "Mul"),
    ("TYPE_ADD", "Add"),
    ("TYPE_LERP", "Lerp"),
    ("TYPE_TIME", "Time"),
    ("TYPE_SIN", "Sin"),
    ("TYPE_COS", "Cos"),
];

impl NodeKind {
    /// Look up a kind by its document type name.
    ///
    /// `Sample2D` comes back with texture indices 0; the document loader fills
    /// them in afterwards.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let index = TYPE_NAMES
            .iter()
            .position(|(canonical, short)| *canonical == name || *short == name)?;
        Some(match index {
            0 => Self::None,
            1 => Self::ForwardMaterial,
            2 => Self::DeferredMaterial,
            3 => Self::Sample2D { texture_input: 0, texture_channel: 0 },
            4 => Self::Mul,
            5 => Self::Add,
            6 => Self::Lerp,
            7 => Self::Time,
            8 => Self::Sin,
            _ => Self::Cos,
        })
    }

    /// Canonical type name used in documents
    pub fn type_name(&self) -> &'static str {
        let index = match self {
            Self::None => 0,
            Self::ForwardMaterial => 1,
            Self::DeferredMaterial => 2,
            Self::Sample2D { .. } => 3,
            Self::Mul => 4,
            Self::Add => 5,
            Self::Lerp => 6,
            Self::Time => 7,
            Self::Sin => 8,
            Self::Cos => 9,
        };
        TYPE_NAMES[index].0
    }

    /// Whether this kind terminates a material graph
    pub fn is_material(&self) -> bool {
        matches!(self, Self::ForwardMaterial | Self::DeferredMaterial)
    }
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Arena index, assigned when the node is added to a graph
    pub id: NodeId,
    /// Unique name, also the GLSL variable the node declares
    pub name: String,
    /// Operation
    pub kind: NodeKind,
    /// Whether the node's statement goes to the vertex stage
    pub vertex_stage: bool,
    /// Topological depth
    pub depth_marker: u32,
    /// Components read from this node by every consumer
    pub(crate) used_by_modifiers: ReadModifiers,
    /// Named input edges
    pub(crate) inputs: IndexMap<String, Connection>,
}

impl Node {
    /// Create a pixel-stage node
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId(0),
            name: name.into(),
            kind,
            vertex_stage: false,
            depth_marker: 0,
            used_by_modifiers: ReadModifiers::default(),
            inputs: IndexMap::new(),
        }
    }

    /// Move the node to the vertex stage
    pub fn in_vertex_stage(mut self) -> Self {
        self.vertex_stage = true;
        self
    }

    /// Set the topological depth
    pub fn set_depth_marker(&mut self, depth_marker: u32) {
        self.depth_marker = depth_marker;
    }

    /// Components read from this node by its consumers
    pub fn used_by_modifiers(&self) -> &ReadModifiers {
        &self.used_by_modifiers
    }

    /// Get an input connection by connector name
    pub fn input(&self, connector: &str) -> Option<&Connection> {
        self.inputs.get(connector)
    }

    /// All input connections, keyed by connector name
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &Connection)> {
        self.inputs.iter().map(|(name, c)| (name.as_str(), c))
    }

    /// Number of input connections
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_lookup() {
        assert_eq!(NodeKind::from_type_name("TYPE_MUL"), Some(NodeKind::Mul));
        assert_eq!(NodeKind::from_type_name("Mul"), Some(NodeKind::Mul));
        assert_eq!(
            NodeKind::from_type_name("Sample2D"),
            Some(NodeKind::Sample2D { texture_input: 0, texture_channel: 0 })
        );
        assert_eq!(NodeKind::from_type_name("TYPE_COS"), Some(NodeKind::Cos));
        assert_eq!(NodeKind::from_type_name("TYPE_DIV"), None);
        assert_eq!(NodeKind::from_type_name("mul"), None);
    }

    #[test]
    fn test_type_name_round_trip() {
        for (canonical, _) in TYPE_NAMES {
            let kind = NodeKind::from_type_name(canonical).unwrap();
            assert_eq!(kind.type_name(), canonical);
        }
    }

    #[test]
    fn test_new_node_defaults() {
        let node = Node::new("n1", NodeKind::Add);
        assert!(!node.vertex_stage);
        assert!(node.used_by_modifiers().is_empty());
        assert_eq!(node.input_count(), 0);
        assert!(Node::new("v", NodeKind::Sin).in_vertex_stage().vertex_stage);
        assert!(NodeKind::ForwardMaterial.is_material());
        assert!(!NodeKind::Time.is_material());
    }
}
