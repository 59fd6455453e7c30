// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL code generation from a material graph.
//!
//! Each node emits at most one statement into the vertex or pixel buffer.
//! The terminal material node turns the pixel buffer into the
//! `GRAPH_CUSTOM_PIXEL_CODE` macro and describes which material inputs are
//! wired, so the uber-shader can be specialized through defines alone.

use crate::connection::{connectors, Connection};
use crate::graph::MaterialGraph;
use crate::node::{Node, NodeId, NodeKind};
use crate::swizzle::{binary_width, ResultType};

/// Output of generating code for a whole graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedShader {
    /// Statements emitted by vertex-stage nodes
    pub vertex_code: String,
    /// Statements emitted by pixel-stage nodes
    pub pixel_code: String,
    /// Macro preamble for the vertex stage
    pub vertex_macros: String,
    /// Macro preamble for the fragment stage
    pub fragment_macros: String,
}

/// Per-node code emitter over a frozen graph
pub struct CodeGenerator<'a> {
    graph: &'a MaterialGraph,
    output: GeneratedShader,
}

impl<'a> CodeGenerator<'a> {
    /// Create a generator with empty buffers
    pub fn new(graph: &'a MaterialGraph) -> Self {
        Self {
            graph,
            output: GeneratedShader::default(),
        }
    }

    /// Buffers accumulated so far
    pub fn output(&self) -> &GeneratedShader {
        &self.output
    }

    /// Finish and take the generated buffers
    pub fn finish(self) -> GeneratedShader {
        self.output
    }

    /// Generate code for one node.
    ///
    /// On error nothing is appended to any buffer.
    pub fn generate_node(&mut self, node_id: NodeId) -> Result<(), CodegenError> {
        let graph = self.graph;
        let node = graph
            .node(node_id)
            .ok_or(CodegenError::NodeNotFound(node_id))?;

        let statement = match node.kind {
            NodeKind::Sample2D { texture_input, texture_channel } => {
                Some(self.sample_2d(node, texture_input, texture_channel)?)
            }
            NodeKind::Mul => Some(self.binary(node, "*")?),
            NodeKind::Add => Some(self.binary(node, "+")?),
            NodeKind::Lerp => Some(self.lerp(node)?),
            NodeKind::Sin => Some(self.unary(node, "sin")?),
            NodeKind::Cos => Some(self.unary(node, "cos")?),
            NodeKind::ForwardMaterial => {
                self.forward_material(node)?;
                None
            }
            NodeKind::None | NodeKind::DeferredMaterial | NodeKind::Time => None,
        };

        if let Some(statement) = statement {
            tracing::debug!("Generated {}: {}", node.name, statement);
            // No separator: the pixel buffer becomes the body of a one-line macro
            if node.vertex_stage {
                self.output.vertex_code.push_str(&statement);
            } else {
                self.output.pixel_code.push_str(&statement);
            }
        }
        Ok(())
    }

    fn sample_2d(
        &self,
        node: &Node,
        texture_input: u32,
        texture_channel: u32,
    ) -> Result<String, CodegenError> {
        let reads = node.used_by_modifiers();
        if reads.is_empty() {
            return Err(CodegenError::UnusedNode { node: node.name.clone() });
        }
        let result = ResultType::from_width(reads.width()).ok_or_else(|| CodegenError::IllTyped {
            node: node.name.clone(),
            detail: format!("read as {:?}, wider than vec4", reads.as_str()),
        })?;
        Ok(format!(
            "{result} {} = texture2D(texture[{texture_channel}], varTexCoord[{texture_input}]).{};",
            node.name,
            reads.as_str()
        ))
    }

    fn binary(&self, node: &Node, op: &str) -> Result<String, CodegenError> {
        let a = required(node, connectors::A)?;
        let b = required(node, connectors::B)?;
        let result = binary_width(a.swizzle.len(), b.swizzle.len())
            .and_then(ResultType::from_width)
            .ok_or_else(|| CodegenError::IllTyped {
                node: node.name.clone(),
                detail: format!("cannot combine {:?} with {:?}", a.swizzle.as_str(), b.swizzle.as_str()),
            })?;
        Ok(format!(
            "{result} {} = {} {op} {};",
            node.name,
            self.operand(a)?,
            self.operand(b)?
        ))
    }

    fn lerp(&self, node: &Node) -> Result<String, CodegenError> {
        let a = required(node, connectors::A)?;
        let b = required(node, connectors::B)?;
        let t = required(node, connectors::T)?;
        let width = binary_width(a.swizzle.len(), b.swizzle.len());
        let result = width
            .filter(|w| t.swizzle.len() == 1 || t.swizzle.len() == *w)
            .and_then(ResultType::from_width)
            .ok_or_else(|| CodegenError::IllTyped {
                node: node.name.clone(),
                detail: format!(
                    "cannot blend {:?} and {:?} by {:?}",
                    a.swizzle.as_str(),
                    b.swizzle.as_str(),
                    t.swizzle.as_str()
                ),
            })?;
        Ok(format!(
            "{result} {} = mix({}, {}, {});",
            node.name,
            self.operand(a)?,
            self.operand(b)?,
            self.operand(t)?
        ))
    }

    fn unary(&self, node: &Node, function: &str) -> Result<String, CodegenError> {
        let a = required(node, connectors::A)?;
        let result = ResultType::from_width(a.swizzle.len()).ok_or_else(|| CodegenError::IllTyped {
            node: node.name.clone(),
            detail: format!("{function} needs a swizzled operand, got {:?}", a.swizzle.as_str()),
        })?;
        Ok(format!("{result} {} = {function}({});", node.name, self.operand(a)?))
    }

    fn forward_material(&mut self, node: &Node) -> Result<(), CodegenError> {
        let mut fragment = format!("#define GRAPH_CUSTOM_PIXEL_CODE {}\n", self.output.pixel_code);
        for (connector, macro_name) in [
            (connectors::EMISSIVE, "IN_EMISSIVE"),
            (connectors::DIFFUSE, "IN_DIFFUSE"),
            (connectors::SPECULAR, "IN_SPECULAR"),
            (connectors::NORMAL, "IN_NORMAL"),
        ] {
            if let Some(connection) = node.input(connector) {
                let source = target_name(self.graph, connection)?;
                fragment.push_str(&format!("#define {macro_name} {source}\n"));
            }
        }
        let out = &mut self.output;
        out.fragment_macros.push_str(&fragment);

        let lighting = if node.input(connectors::NORMAL).is_some() {
            Some("PIXEL_LIT")
        } else if node.input(connectors::DIFFUSE).is_some() || node.input(connectors::SPECULAR).is_some() {
            Some("VERTEX_LIT")
        } else {
            None
        };
        if let Some(lighting) = lighting {
            let line = format!("#define {lighting}\n");
            out.fragment_macros.push_str(&line);
            out.vertex_macros.push_str(&line);
        }
        tracing::debug!("Material {} lighting: {}", node.name, lighting.unwrap_or("ambient"));
        Ok(())
    }

    fn operand(&self, connection: &Connection) -> Result<String, CodegenError> {
        Ok(connection.swizzle.operand(target_name(self.graph, connection)?))
    }
}

fn target_name<'g>(graph: &'g MaterialGraph, connection: &Connection) -> Result<&'g str, CodegenError> {
    graph
        .node(connection.target)
        .map(|n| n.name.as_str())
        .ok_or(CodegenError::NodeNotFound(connection.target))
}

fn required<'n>(node: &'n Node, connector: &'static str) -> Result<&'n Connection, CodegenError> {
    node.input(connector).ok_or_else(|| CodegenError::NotEnoughConnectors {
        node: node.name.clone(),
        connector,
    })
}

impl MaterialGraph {
    /// Generate code for every node, inputs before the nodes reading them.
    ///
    /// Stops at the first failing node; no partial output is returned.
    pub fn generate(&self) -> Result<GeneratedShader, CodegenError> {
        let mut generator = CodeGenerator::new(self);
        for node_id in self.generation_order() {
            generator.generate_node(node_id)?;
        }
        let output = generator.finish();
        tracing::info!(
            "Generated material graph {}: {} vertex bytes, {} pixel bytes",
            self.name,
            output.vertex_code.len(),
            output.pixel_code.len()
        );
        Ok(output)
    }
}

/// Error during code generation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A required input edge is missing
    #[error("Node {node:?} is missing its {connector:?} connector")]
    NotEnoughConnectors {
        /// Node being generated
        node: String,
        /// Missing connector
        connector: &'static str,
    },

    /// Operand widths do not combine into a GLSL type
    #[error("Node {node:?} is ill-typed: {detail}")]
    IllTyped {
        /// Node being generated
        node: String,
        /// What did not match
        detail: String,
    },

    /// Nothing reads the node, so its result width is unknown
    #[error("Node {node:?} is not read by any other node")]
    UnusedNode {
        /// Node being generated
        node: String,
    },
}
