// SPDX-License-Identifier: MIT OR Apache-2.0
//! The native graphics API seen by the shader program compiler.
//!
//! The trait mirrors the GLSL program object model: stages are created,
//! given source, compiled, attached to a program and linked. Implementations
//! wrap a real context or, like [`HeadlessDevice`](crate::HeadlessDevice),
//! emulate one.

use crate::uniform::{UniformValue, ValueType};
use std::fmt;
use std::num::NonZeroU32;

/// Pipeline stage a shader object belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

impl ShaderStage {
    /// Lowercase stage name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Native shader object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub NonZeroU32);

/// Native program object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub NonZeroU32);

/// An active attribute or uniform reported by a linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    /// Declared name (arrays report `name[0]`)
    pub name: String,
    /// Array length, 1 for non-arrays
    pub size: u32,
    /// Value type
    pub value_type: ValueType,
}

/// Native shader compilation, linking, reflection and uniform upload.
///
/// Every call must happen on the thread that owns the graphics context;
/// [`RenderContext`](crate::RenderContext) serializes access.
pub trait ShaderDevice {
    /// Create an empty shader object
    fn create_shader(&mut self, stage: ShaderStage) -> Option<ShaderHandle>;

    /// Set the shader's source as a list of fragments, compiled as if
    /// concatenated. Line numbers in diagnostics restart per fragment on
    /// most drivers.
    fn shader_source(&mut self, shader: ShaderHandle, fragments: &[&[u8]]);

    /// Compile; returns the compile status
    fn compile_shader(&mut self, shader: ShaderHandle) -> bool;

    /// Compiler output for a shader
    fn shader_info_log(&self, shader: ShaderHandle) -> String;

    /// Delete a shader object
    fn delete_shader(&mut self, shader: ShaderHandle);

    /// Create an empty program object
    fn create_program(&mut self) -> Option<ProgramHandle>;

    /// Attach a compiled shader
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    /// Detach a shader
    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    /// Link attached shaders; returns the link status
    fn link_program(&mut self, program: ProgramHandle) -> bool;

    /// Linker output for a program
    fn program_info_log(&self, program: ProgramHandle) -> String;

    /// Delete a program object
    fn delete_program(&mut self, program: ProgramHandle);

    /// Active vertex attributes of a linked program
    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveVariable>;

    /// Location bound to an attribute
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Active uniforms of a linked program
    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveVariable>;

    /// Location of a uniform, `None` when inactive
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<i32>;

    /// Make a program current, or none
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Upload a value to a uniform of the current program
    fn set_uniform(&mut self, location: i32, value: &UniformValue);
}
