// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material graph for `OrdoPlay`.
//!
//! A small dataflow IR whose nodes emit GLSL statements:
//! - Typed nodes (texture samples, arithmetic, terminal materials)
//! - Named input edges carrying swizzle modifiers
//! - Result types inferred from how nodes are read
//! - Deterministic code generation into vertex and pixel buffers
//!
//! ## Architecture
//!
//! Graphs are built in two passes. All nodes are added first (usually from a
//! [`GraphDocument`]), then edges are connected, which accumulates the
//! components every consumer reads from each node. Code generation runs over
//! the frozen graph, dependencies first, and produces a [`GeneratedShader`]
//! whose macro preambles are fed to the shader program compiler as defines.

pub mod swizzle;
pub mod node;
pub mod connection;
pub mod graph;
pub mod codegen;
pub mod document;

pub use swizzle::{ResultType, Swizzle, SwizzleError};
pub use node::{Node, NodeId, NodeKind};
pub use connection::{connectors, Connection};
pub use graph::{ConnectionError, MaterialGraph};
pub use codegen::{CodeGenerator, CodegenError, GeneratedShader};
pub use document::{ConnectionRecord, DocumentError, GraphDocument, NodeRecord, ParseError};
