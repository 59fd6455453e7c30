// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material graph documents.
//!
//! A document lists node records and the connections between them. Records
//! are plain key-value data; RON is the native format and JSON is accepted
//! for documents produced by external tools.

use crate::graph::{ConnectionError, MaterialGraph};
use crate::node::{Node, NodeKind};
use ron::extensions::Extensions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One node as it appears in a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Type name, e.g. `"TYPE_MUL"` or `"Mul"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Unique node name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Texture coordinate set (`Sample2D` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<i64>,
    /// Texture unit (`Sample2D` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<i64>,
    /// Emit into the vertex stage instead of the pixel stage
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub vertex: bool,
}

impl NodeRecord {
    /// Record with the two mandatory fields
    pub fn new(node: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node: Some(node.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Set the texture inputs of a `Sample2D` record
    pub fn with_texture(mut self, input: i64, channel: i64) -> Self {
        self.input = Some(input);
        self.channel = Some(channel);
        self
    }
}

/// One edge as it appears in a document: `from` reads `to` on `connector`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Reading node
    pub from: String,
    /// Connector name on the reading node
    pub connector: String,
    /// Node being read
    pub to: String,
    /// Components read
    #[serde(default)]
    pub swizzle: String,
}

/// A full graph document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Graph name
    #[serde(default)]
    pub name: String,
    /// Node records
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Edges, applied after every node exists
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl GraphDocument {
    /// Parse a RON document. Optional fields may be written without `Some(..)`.
    pub fn from_ron(s: &str) -> Result<Self, DocumentError> {
        let options = ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
        Ok(options.from_str(s)?)
    }

    /// Parse a JSON document
    pub fn from_json(s: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Load a document, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_ron(&contents)
        }
    }
}

impl Node {
    /// Build a node from a document record
    pub fn from_record(record: &NodeRecord) -> Result<Self, ParseError> {
        let type_name = record
            .node
            .as_deref()
            .ok_or(ParseError::MissingField { field: "node" })?;
        let name = record
            .name
            .as_deref()
            .ok_or(ParseError::MissingField { field: "name" })?;
        let mut kind = NodeKind::from_type_name(type_name)
            .ok_or_else(|| ParseError::UnknownNodeType(type_name.to_string()))?;

        if let NodeKind::Sample2D { texture_input, texture_channel } = &mut kind {
            *texture_input = index_field("input", record.input)?;
            *texture_channel = index_field("channel", record.channel)?;
        }

        let mut node = Node::new(name, kind);
        node.vertex_stage = record.vertex;
        Ok(node)
    }
}

fn index_field(field: &'static str, value: Option<i64>) -> Result<u32, ParseError> {
    match value {
        None => Ok(0),
        Some(v) => u32::try_from(v).map_err(|_| ParseError::InvalidIndex { field, value: v }),
    }
}

impl MaterialGraph {
    /// Build a graph from a document: every node first, then every edge.
    pub fn from_document(document: &GraphDocument) -> Result<Self, DocumentError> {
        let mut graph = MaterialGraph::new(document.name.clone());
        for (index, record) in document.nodes.iter().enumerate() {
            graph
                .create_node(record)
                .map_err(|source| DocumentError::Node { index, source })?;
        }
        for record in &document.connections {
            graph
                .connect_by_name(&record.from, &record.connector, &record.to, &record.swizzle)
                .map_err(|source| DocumentError::Connection {
                    from: record.from.clone(),
                    connector: record.connector.clone(),
                    source,
                })?;
        }
        tracing::debug!(
            "Built material graph {} with {} nodes",
            graph.name,
            graph.node_count()
        );
        Ok(graph)
    }
}

/// Error when building a node from a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Required field absent
    #[error("Missing required field {field:?}")]
    MissingField {
        /// Field name
        field: &'static str,
    },

    /// Type name not in the node type table
    #[error("Unknown node type: {0:?}")]
    UnknownNodeType(String),

    /// Texture index out of range
    #[error("Field {field:?} must be a non-negative index, got {value}")]
    InvalidIndex {
        /// Field name
        field: &'static str,
        /// Value found
        value: i64,
    },

    /// Another node already has this name
    #[error("Duplicate node name: {0:?}")]
    DuplicateName(String),
}

/// Error when loading a graph document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Malformed RON
    #[error("Invalid RON document: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Malformed JSON
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// A node record was rejected
    #[error("Node record {index}: {source}")]
    Node {
        /// Position in the node list
        index: usize,
        /// Underlying error
        source: ParseError,
    },

    /// A connection record was rejected
    #[error("Connection {from:?}.{connector}: {source}")]
    Connection {
        /// Reading node
        from: String,
        /// Connector name
        connector: String,
        /// Underlying error
        source: ConnectionError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::CodegenError;

    const SCENARIO: &str = r#"(
        name: "lit",
        nodes: [
            (node: "Sample2D", name: "texA", input: 0, channel: 0),
            (node: "TYPE_TIME", name: "time"),
            (node: "Mul", name: "n1"),
            (node: "ForwardMaterial", name: "material"),
        ],
        connections: [
            (from: "n1", connector: "a", to: "texA", swizzle: "xyz"),
            (from: "n1", connector: "b", to: "time", swizzle: "xyz"),
            (from: "material", connector: "diffuse", to: "n1"),
        ],
    )"#;

    #[test]
    fn test_sample_defaults_missing_indices_to_zero() {
        let node = Node::from_record(&NodeRecord::new("Sample2D", "texA")).unwrap();
        assert_eq!(node.kind, NodeKind::Sample2D { texture_input: 0, texture_channel: 0 });

        let node = Node::from_record(&NodeRecord::new("TYPE_SAMPLE_2D", "t").with_texture(1, 3)).unwrap();
        assert_eq!(node.kind, NodeKind::Sample2D { texture_input: 1, texture_channel: 3 });
    }

    #[test]
    fn test_record_errors() {
        assert_eq!(
            Node::from_record(&NodeRecord::new("Divide", "d")).unwrap_err(),
            ParseError::UnknownNodeType("Divide".to_string())
        );
        let nameless = NodeRecord {
            node: Some("Mul".to_string()),
            ..Default::default()
        };
        assert_eq!(
            Node::from_record(&nameless).unwrap_err(),
            ParseError::MissingField { field: "name" }
        );
        assert_eq!(
            Node::from_record(&NodeRecord::new("Sample2D", "t").with_texture(-1, 0)).unwrap_err(),
            ParseError::InvalidIndex { field: "input", value: -1 }
        );
    }

    #[test]
    fn test_vertex_flag() {
        let record = NodeRecord {
            vertex: true,
            ..NodeRecord::new("Add", "offset")
        };
        assert!(Node::from_record(&record).unwrap().vertex_stage);
    }

    #[test]
    fn test_ron_document_builds_and_generates() {
        let document = GraphDocument::from_ron(SCENARIO).unwrap();
        let graph = MaterialGraph::from_document(&document).unwrap();
        assert_eq!(graph.node_count(), 4);

        let out = graph.generate().unwrap();
        assert!(out.pixel_code.ends_with("vec3 n1 = texA.xyz * time.xyz;"));
        assert!(out.fragment_macros.contains("#define IN_DIFFUSE n1\n"));
        assert_eq!(out.vertex_macros, "#define VERTEX_LIT\n");
    }

    #[test]
    fn test_json_document() {
        let json = r#"{
            "name": "broken",
            "nodes": [
                {"node": "Sample2D", "name": "texA"},
                {"node": "Mul", "name": "n1"}
            ],
            "connections": [
                {"from": "n1", "connector": "a", "to": "texA", "swizzle": "xyz"}
            ]
        }"#;
        let graph = MaterialGraph::from_document(&GraphDocument::from_json(json).unwrap()).unwrap();
        assert!(matches!(
            graph.generate(),
            Err(CodegenError::NotEnoughConnectors { connector: "b", .. })
        ));
    }

    #[test]
    fn test_document_errors_name_the_record() {
        let mut document = GraphDocument::from_ron(SCENARIO).unwrap();
        document.nodes.push(NodeRecord::new("Blur", "blur"));
        assert!(matches!(
            MaterialGraph::from_document(&document),
            Err(DocumentError::Node { index: 4, source: ParseError::UnknownNodeType(_) })
        ));

        let mut document = GraphDocument::from_ron(SCENARIO).unwrap();
        document.connections.push(ConnectionRecord {
            from: "texA".to_string(),
            connector: "a".to_string(),
            to: "material".to_string(),
            swizzle: String::new(),
        });
        assert!(matches!(
            MaterialGraph::from_document(&document),
            Err(DocumentError::Connection { source: ConnectionError::Cycle { .. }, .. })
        ));
    }

    #[test]
    fn test_serialization() {
        let document = GraphDocument::from_ron(SCENARIO).unwrap();
        let ron_str = document.to_ron().unwrap();
        let loaded = GraphDocument::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, document);
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let dir = std::env::temp_dir().join(format!("ordoplay_graph_doc_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lit.material.ron");
        std::fs::write(&path, SCENARIO).unwrap();
        assert_eq!(GraphDocument::load(&path).unwrap().name, "lit");

        let missing = dir.join("missing.json");
        assert!(matches!(GraphDocument::load(&missing), Err(DocumentError::Io { .. })));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
