// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL shader programs for `OrdoPlay`.
//!
//! Turns a pair of vertex/fragment source buffers plus per-stage define
//! blocks into a linked, reflected program:
//! - Sources are loaded once and shared between a program and its variants
//! - Defines are submitted as a separate fragment ahead of the body
//! - Reflection maps attributes to canonical slots and uniforms to semantics
//! - Binding refreshes semantic uniforms and skips redundant activation
//!
//! ## Architecture
//!
//! All native work goes through the [`ShaderDevice`] trait. The device lives
//! inside a [`RenderContext`] together with the active-program marker, both
//! behind one lock, so programs never touch ambient globals. The
//! [`HeadlessDevice`] implements the trait in pure Rust for offline
//! validation and tests, preprocessing with `pp-rs` and handing
//! Vulkan-style sources to naga.

pub mod uniform;
pub mod device;
pub mod context;
pub mod source;
pub mod reflection;
pub mod program;
pub mod preprocess;
pub mod validate;
pub mod headless;

pub use uniform::{UniformSemantic, UniformValue, ValueType, VertexAttribute};
pub use device::{ActiveVariable, ProgramHandle, ShaderDevice, ShaderHandle, ShaderStage};
pub use context::{AutoUniforms, RenderContext, RenderState, TransformState};
pub use source::{define_block, DescriptorError, ShaderDescriptor, ShaderSources, SourceBuffer};
pub use reflection::{AttributeBinding, Reflection, UniformBinding};
pub use program::{ProgramState, ShaderError, ShaderProgram};
pub use headless::{HeadlessDevice, Submission};
