// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader program lifecycle: sources, defines, compile, reflect, bind.

use crate::context::{AutoUniforms, RenderContext};
use crate::device::{ProgramHandle, ShaderDevice, ShaderHandle, ShaderStage};
use crate::reflection::Reflection;
use crate::source::{define_block, ShaderDescriptor, ShaderSources, SourceBuffer};
use crate::uniform::{UniformSemantic, UniformValue, VertexAttribute};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

/// Error from compiling or using a shader program
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    /// No source buffers were loaded
    #[error("Program has no source buffers")]
    NoSources,

    /// Compile called while native objects exist
    #[error("Program is already compiled")]
    AlreadyCompiled,

    /// Operation needs a compiled program
    #[error("Program is not compiled")]
    NotCompiled,

    /// A stage was rejected by the compiler
    #[error("Failed to compile {stage} shader {path}:\n{log}")]
    Compile {
        /// Rejected stage
        stage: ShaderStage,
        /// Source the stage was read from
        path: String,
        /// Compiler output
        log: String,
    },

    /// The stages compiled but did not link
    #[error("Failed to link program ({vertex}, {fragment}):\n{log}")]
    Link {
        /// Vertex source path
        vertex: String,
        /// Fragment source path
        fragment: String,
        /// Linker output
        log: String,
    },

    /// The device refused to create an object
    #[error("Device could not create a {0} object")]
    ResourceCreation(&'static str),

    /// Negative uniform location
    #[error("Invalid uniform location {0}")]
    InvalidLocation(i32),
}

impl ShaderError {
    /// Errors caused by misuse of the API rather than by shader source
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::NoSources | Self::AlreadyCompiled | Self::NotCompiled | Self::InvalidLocation(_)
        )
    }
}

/// Lifecycle state of a [`ShaderProgram`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// No sources
    Empty,
    /// Sources held, no native objects
    SourcesLoaded,
    /// Linked and reflected
    Compiled,
}

#[derive(Debug)]
struct CompiledProgram {
    vertex: ShaderHandle,
    fragment: ShaderHandle,
    program: ProgramHandle,
    reflection: Reflection,
}

/// A vertex/fragment program compiled from shared source buffers.
///
/// Defines are kept per stage and prepended at compile time as a separate
/// source fragment, so the buffers are never modified and can be shared
/// with every variant.
pub struct ShaderProgram<D: ShaderDevice> {
    context: Arc<RenderContext<D>>,
    sources: Option<Arc<ShaderSources>>,
    vertex_defines: String,
    fragment_defines: String,
    compiled: Option<CompiledProgram>,
}

impl<D: ShaderDevice> ShaderProgram<D> {
    /// Program without sources
    pub fn new(context: Arc<RenderContext<D>>) -> Self {
        Self {
            context,
            sources: None,
            vertex_defines: String::new(),
            fragment_defines: String::new(),
            compiled: None,
        }
    }

    /// Program over already loaded sources
    pub fn with_sources(context: Arc<RenderContext<D>>, sources: Arc<ShaderSources>) -> Self {
        let mut program = Self::new(context);
        program.sources = Some(sources);
        program
    }

    /// Read both stages from disk. Never fails: unreadable files become
    /// empty buffers and are reported by [`compile`](Self::compile).
    pub fn load(context: Arc<RenderContext<D>>, vertex_path: &Path, fragment_path: &Path) -> Self {
        Self::with_sources(context, ShaderSources::load(vertex_path, fragment_path))
    }

    /// Sources and default defines from a descriptor
    pub fn from_descriptor(context: Arc<RenderContext<D>>, descriptor: &ShaderDescriptor) -> Self {
        let mut program = Self::with_sources(context, descriptor.load_sources());
        program.set_define_list(&descriptor.define_list());
        program
    }

    /// Lifecycle state
    pub fn state(&self) -> ProgramState {
        match (&self.sources, &self.compiled) {
            (_, Some(_)) => ProgramState::Compiled,
            (Some(_), None) => ProgramState::SourcesLoaded,
            (None, None) => ProgramState::Empty,
        }
    }

    /// Raw define text for both stages
    pub fn set_defines(&mut self, defines: impl Into<String>) {
        let defines = defines.into();
        self.fragment_defines.clone_from(&defines);
        self.vertex_defines = defines;
    }

    /// Raw define text for the vertex stage
    pub fn set_vertex_defines(&mut self, defines: impl Into<String>) {
        self.vertex_defines = defines.into();
    }

    /// Raw define text for the fragment stage
    pub fn set_fragment_defines(&mut self, defines: impl Into<String>) {
        self.fragment_defines = defines.into();
    }

    /// `#define` every name of a `;`-separated list in both stages
    pub fn set_define_list(&mut self, define_list: &str) {
        self.set_defines(define_block(define_list));
    }

    /// Vertex define text
    pub fn vertex_defines(&self) -> &str {
        &self.vertex_defines
    }

    /// Fragment define text
    pub fn fragment_defines(&self) -> &str {
        &self.fragment_defines
    }

    /// Shared source buffers
    pub fn sources(&self) -> Option<&Arc<ShaderSources>> {
        self.sources.as_ref()
    }

    /// Render context the program lives in
    pub fn context(&self) -> &Arc<RenderContext<D>> {
        &self.context
    }

    /// Native program object, when compiled
    pub fn program_handle(&self) -> Option<ProgramHandle> {
        self.compiled.as_ref().map(|c| c.program)
    }

    /// Reflection tables, when compiled
    pub fn reflection(&self) -> Option<&Reflection> {
        self.compiled.as_ref().map(|c| &c.reflection)
    }

    /// Location of the attribute bound to a canonical slot
    pub fn attribute_location(&self, slot: VertexAttribute) -> Option<u32> {
        self.reflection()?.attribute_location(slot)
    }

    /// Location of a uniform by exact name
    pub fn find_uniform_location(&self, name: &str) -> Option<i32> {
        self.reflection()?.find_uniform_location(name)
    }

    /// Compile both stages, link and reflect.
    ///
    /// Every native object created by a failed attempt is deleted before
    /// returning.
    pub fn compile(&mut self) -> Result<(), ShaderError> {
        if self.compiled.is_some() {
            return Err(ShaderError::AlreadyCompiled);
        }
        let sources = self.sources.clone().ok_or(ShaderError::NoSources)?;

        let mut state = self.context.lock_non_main();
        let device = &mut state.device;

        let vertex = compile_stage(device, ShaderStage::Vertex, &sources.vertex, &self.vertex_defines)?;
        let fragment =
            match compile_stage(device, ShaderStage::Fragment, &sources.fragment, &self.fragment_defines) {
                Ok(fragment) => fragment,
                Err(e) => {
                    device.delete_shader(vertex);
                    return Err(e);
                }
            };

        let Some(program) = device.create_program() else {
            device.delete_shader(vertex);
            device.delete_shader(fragment);
            tracing::error!("Failed to create program object");
            return Err(ShaderError::ResourceCreation("program"));
        };
        device.attach_shader(program, vertex);
        device.attach_shader(program, fragment);

        if !device.link_program(program) {
            let log = device.program_info_log(program);
            device.detach_shader(program, vertex);
            device.detach_shader(program, fragment);
            device.delete_shader(vertex);
            device.delete_shader(fragment);
            device.delete_program(program);
            tracing::error!(
                "Failed to link program ({}, {}): {}",
                sources.vertex.label,
                sources.fragment.label,
                log
            );
            return Err(ShaderError::Link {
                vertex: sources.vertex.label.clone(),
                fragment: sources.fragment.label.clone(),
                log,
            });
        }

        let reflection = Reflection::build(&*device, program);
        drop(state);

        tracing::info!(
            "Compiled program {} ({}, {}): {} attributes, {} uniforms",
            program.0,
            sources.vertex.label,
            sources.fragment.label,
            reflection.attribute_count(),
            reflection.uniform_count()
        );
        self.compiled = Some(CompiledProgram {
            vertex,
            fragment,
            program,
            reflection,
        });
        Ok(())
    }

    /// Tear down any compiled objects and compile with the current defines
    pub fn recompile(&mut self) -> Result<(), ShaderError> {
        self.lost();
        self.compile()
    }

    /// New program over the same source buffers with `define_list` defined
    /// in both stages
    pub fn create_variant(&self, define_list: &str) -> Result<Self, ShaderError> {
        let defines = define_block(define_list);
        self.create_variant_with_defines(defines.clone(), defines)
    }

    /// New program over the same source buffers with explicit per-stage
    /// define text
    pub fn create_variant_with_defines(
        &self,
        vertex_defines: String,
        fragment_defines: String,
    ) -> Result<Self, ShaderError> {
        let sources = self.sources.clone().ok_or(ShaderError::NoSources)?;
        let mut variant = Self::with_sources(Arc::clone(&self.context), sources);
        variant.vertex_defines = vertex_defines;
        variant.fragment_defines = fragment_defines;
        variant.compile()?;
        Ok(variant)
    }

    /// Make the program current and refresh its semantic uniforms.
    ///
    /// The native activation is skipped when the program is already the
    /// active one; uniforms are refreshed either way.
    pub fn bind(&self, uniforms: &impl AutoUniforms) -> Result<(), ShaderError> {
        let compiled = self.compiled.as_ref().ok_or(ShaderError::NotCompiled)?;
        let mut state = self.context.lock_non_main();

        if state.active_program != Some(compiled.program) {
            state.device.use_program(Some(compiled.program));
            state.active_program = Some(compiled.program);
        }

        for uniform in compiled.reflection.semantic_uniforms() {
            if uniform.location < 0 {
                continue;
            }
            let value = match uniform.semantic {
                UniformSemantic::ModelViewProjection => UniformValue::Mat4(uniforms.model_view_projection()),
                UniformSemantic::ModelView => UniformValue::Mat4(uniforms.model_view()),
                UniformSemantic::Projection => UniformValue::Mat4(uniforms.projection()),
                UniformSemantic::NormalMatrix => UniformValue::Mat3(uniforms.normal_matrix()),
                UniformSemantic::FlatColor => UniformValue::Color(uniforms.flat_color()),
                UniformSemantic::None => continue,
            };
            state.device.set_uniform(uniform.location, &value);
        }
        Ok(())
    }

    /// Make no program current
    pub fn unbind(&self) {
        self.context.unbind_program();
    }

    /// Upload a value to a uniform of this program
    pub fn set_uniform_value(&self, location: i32, value: impl Into<UniformValue>) -> Result<(), ShaderError> {
        if self.compiled.is_none() {
            return Err(ShaderError::NotCompiled);
        }
        if location < 0 {
            return Err(ShaderError::InvalidLocation(location));
        }
        self.context.lock_non_main().device.set_uniform(location, &value.into());
        Ok(())
    }

    /// Delete the native objects, keeping sources and defines.
    /// Does nothing when not compiled.
    pub fn lost(&mut self) {
        let Some(compiled) = self.compiled.take() else {
            return;
        };
        let mut state = self.context.lock_non_main();
        if state.active_program == Some(compiled.program) {
            state.active_program = None;
        }
        let device = &mut state.device;
        device.detach_shader(compiled.program, compiled.vertex);
        device.detach_shader(compiled.program, compiled.fragment);
        device.delete_shader(compiled.vertex);
        device.delete_shader(compiled.fragment);
        device.delete_program(compiled.program);
        tracing::debug!("Released program {}", compiled.program.0);
    }

    /// Compile again from the retained sources after [`lost`](Self::lost).
    /// Does nothing when already compiled.
    pub fn invalidate(&mut self) -> Result<(), ShaderError> {
        if self.compiled.is_some() {
            return Ok(());
        }
        self.compile()
    }

    /// Diagnostic listing of the reflected attributes and uniforms
    pub fn dump(&self) -> String {
        let _guard = self.context.lock_non_main();
        let mut out = String::new();
        match &self.compiled {
            Some(compiled) => {
                let _ = write!(out, "Program {}", compiled.program.0);
                if let Some(sources) = &self.sources {
                    let _ = write!(out, " ({}, {})", sources.vertex.label, sources.fragment.label);
                }
                out.push('\n');
                out.push_str(&compiled.reflection.dump());
            }
            None => out.push_str("Program not compiled\n"),
        }
        tracing::debug!("{}", out);
        out
    }
}

impl<D: ShaderDevice> Drop for ShaderProgram<D> {
    fn drop(&mut self) {
        self.lost();
    }
}

fn compile_stage<D: ShaderDevice>(
    device: &mut D,
    stage: ShaderStage,
    source: &SourceBuffer,
    defines: &str,
) -> Result<ShaderHandle, ShaderError> {
    let Some(shader) = device.create_shader(stage) else {
        tracing::error!("Failed to create {} shader object", stage);
        return Err(ShaderError::ResourceCreation("shader"));
    };

    if defines.is_empty() {
        device.shader_source(shader, &[source.bytes.as_slice()]);
    } else {
        device.shader_source(shader, &[defines.as_bytes(), source.bytes.as_slice()]);
    }

    if !device.compile_shader(shader) {
        let log = device.shader_info_log(shader);
        device.delete_shader(shader);
        tracing::error!("Failed to compile {} shader {}: {}", stage, source.label, log);
        return Err(ShaderError::Compile {
            stage,
            path: source.label.clone(),
            log,
        });
    }
    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransformState;
    use crate::uniform::ValueType;
    use crate::HeadlessDevice;

    const VERTEX: &str = "attribute vec3 inPosition;\n\
                          #ifdef SKINNING\n\
                          attribute vec4 inJointWeight;\n\
                          #endif\n\
                          uniform mat4 modelViewProjectionMatrix;\n\
                          varying vec2 varTexCoord0;\n\
                          void main() {\n\
                              gl_Position = modelViewProjectionMatrix * vec4(inPosition, 1.0);\n\
                          }\n";
    const FRAGMENT: &str = "#ifdef BROKEN\n\
                            #error broken variant\n\
                            #endif\n\
                            varying vec2 varTexCoord0;\n\
                            uniform vec3 flatColor;\n\
                            uniform sampler2D albedo;\n\
                            void main() { gl_FragColor = vec4(flatColor, 1.0); }\n";

    fn program(vertex: &str, fragment: &str) -> ShaderProgram<HeadlessDevice> {
        let context = RenderContext::new(HeadlessDevice::new());
        let sources = ShaderSources::new(
            SourceBuffer::from_memory("test.vsh", vertex),
            SourceBuffer::from_memory("test.fsh", fragment),
        );
        ShaderProgram::with_sources(context, sources)
    }

    #[test]
    fn test_defines_submitted_as_separate_fragment() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.set_vertex_defines(define_block("FOO;BAR"));
        shader.compile().unwrap();

        let state = shader.context().lock_non_main();
        let submissions = state.device.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].stage, ShaderStage::Vertex);
        assert_eq!(submissions[0].fragments.len(), 2);
        assert_eq!(submissions[0].fragments[0], b"#define FOO\n#define BAR\n");
        assert_eq!(submissions[0].fragments[1], VERTEX.as_bytes());
        assert_eq!(submissions[1].fragments.len(), 1);
    }

    #[test]
    fn test_reflection_after_compile() {
        let mut shader = program(VERTEX, FRAGMENT);
        assert_eq!(shader.state(), ProgramState::SourcesLoaded);
        shader.compile().unwrap();
        assert_eq!(shader.state(), ProgramState::Compiled);

        let reflection = shader.reflection().unwrap();
        assert_eq!(reflection.attributes()[0].name, "inPosition");
        assert_eq!(reflection.attributes()[0].slot, Some(VertexAttribute::Position));

        let mvp = &reflection.uniforms()[0];
        assert_eq!(mvp.name, "modelViewProjectionMatrix");
        assert_eq!(mvp.semantic, UniformSemantic::ModelViewProjection);
        assert_eq!(mvp.value_type, ValueType::FloatMat4);
        assert_eq!(mvp.type_size(), 64);

        assert_eq!(shader.attribute_location(VertexAttribute::Position), Some(0));
        assert_eq!(shader.attribute_location(VertexAttribute::JointWeight), None);
        assert_eq!(shader.find_uniform_location("albedo"), Some(2));
    }

    #[test]
    fn test_compile_twice_is_programming_error() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.compile().unwrap();
        let err = shader.compile().unwrap_err();
        assert_eq!(err, ShaderError::AlreadyCompiled);
        assert!(err.is_programming_error());

        let mut empty = ShaderProgram::new(RenderContext::new(HeadlessDevice::new()));
        assert_eq!(empty.state(), ProgramState::Empty);
        assert_eq!(empty.compile(), Err(ShaderError::NoSources));
    }

    #[test]
    fn test_compile_failure_leaves_nothing_behind() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.set_fragment_defines(define_block("BROKEN"));
        let err = shader.compile().unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile { stage: ShaderStage::Fragment, ref path, .. } if path == "test.fsh"
        ));
        assert!(!err.is_programming_error());
        assert_eq!(shader.state(), ProgramState::SourcesLoaded);

        let state = shader.context().lock_non_main();
        assert_eq!(state.device.live_shader_count(), 0);
        assert_eq!(state.device.live_program_count(), 0);
    }

    #[test]
    fn test_empty_source_is_compile_error() {
        let mut shader = program("", FRAGMENT);
        let err = shader.compile().unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
        // Fragment stage never reached
        assert_eq!(shader.context().lock_non_main().device.submissions().len(), 1);
    }

    #[test]
    fn test_link_failure_leaves_nothing_behind() {
        let mut shader = program("void main() {}", FRAGMENT);
        let err = shader.compile().unwrap_err();
        assert!(matches!(err, ShaderError::Link { ref log, .. } if log.contains("varTexCoord0")));

        let state = shader.context().lock_non_main();
        assert_eq!(state.device.live_shader_count(), 0);
        assert_eq!(state.device.live_program_count(), 0);
    }

    #[test]
    fn test_program_creation_failure() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.context().lock_non_main().device.set_fail_program_creation(true);
        assert_eq!(shader.compile(), Err(ShaderError::ResourceCreation("program")));
        assert_eq!(shader.context().lock_non_main().device.live_shader_count(), 0);
    }

    #[test]
    fn test_bind_twice_activates_once() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.compile().unwrap();
        let transform = TransformState::default();

        shader.bind(&transform).unwrap();
        shader.bind(&transform).unwrap();

        let state = shader.context().lock_non_main();
        assert_eq!(state.device.use_program_calls(), 1);
        assert_eq!(state.active_program(), shader.program_handle());
        // modelViewProjectionMatrix and flatColor, refreshed on both binds
        let uploads = state.device.uniform_uploads();
        assert_eq!(uploads.len(), 4);
        assert_eq!(uploads[0], (0, UniformValue::Mat4(transform.model_view_projection())));
        assert_eq!(uploads[1], (1, UniformValue::Color([1.0; 4])));
    }

    #[test]
    fn test_unbind_without_bind_is_noop() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.compile().unwrap();
        shader.unbind();
        assert_eq!(shader.context().lock_non_main().device.use_program_calls(), 0);

        shader.bind(&TransformState::default()).unwrap();
        shader.unbind();
        shader.unbind();
        let state = shader.context().lock_non_main();
        assert_eq!(state.device.use_program_calls(), 2);
        assert_eq!(state.active_program(), None);
        assert_eq!(state.device.current_program(), None);
    }

    #[test]
    fn test_bind_requires_compile() {
        let shader = program(VERTEX, FRAGMENT);
        assert_eq!(shader.bind(&TransformState::default()), Err(ShaderError::NotCompiled));
    }

    #[test]
    fn test_set_uniform_value() {
        let mut shader = program(VERTEX, FRAGMENT);
        assert_eq!(shader.set_uniform_value(0, 1.0f32), Err(ShaderError::NotCompiled));
        shader.compile().unwrap();

        let albedo = shader.find_uniform_location("albedo").unwrap();
        shader.set_uniform_value(albedo, 3i32).unwrap();
        assert_eq!(shader.set_uniform_value(-1, 3i32), Err(ShaderError::InvalidLocation(-1)));
        assert_eq!(
            shader.context().lock_non_main().device.uniform_uploads(),
            &[(albedo, UniformValue::Int(3))]
        );
    }

    #[test]
    fn test_variant_shares_sources() {
        let mut base = program(VERTEX, FRAGMENT);
        base.compile().unwrap();

        let variant = base.create_variant("SKINNING").unwrap();
        assert!(Arc::ptr_eq(base.sources().unwrap(), variant.sources().unwrap()));
        assert_eq!(variant.vertex_defines(), "#define SKINNING\n");
        assert_eq!(variant.reflection().unwrap().attribute_count(), 2);
        assert_eq!(variant.attribute_location(VertexAttribute::JointWeight), Some(1));
        assert_eq!(base.reflection().unwrap().attribute_count(), 1);

        let err = base.create_variant("BROKEN").err().unwrap();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
        assert_eq!(Arc::strong_count(base.sources().unwrap()), 2);
    }

    #[test]
    fn test_recompile_picks_up_defines() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.compile().unwrap();
        shader.set_vertex_defines(define_block("SKINNING"));
        shader.recompile().unwrap();
        assert_eq!(shader.reflection().unwrap().attribute_count(), 2);

        let state = shader.context().lock_non_main();
        assert_eq!(state.device.live_shader_count(), 2);
        assert_eq!(state.device.live_program_count(), 1);
    }

    #[test]
    fn test_lost_and_invalidate_are_idempotent() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.compile().unwrap();
        shader.bind(&TransformState::default()).unwrap();

        shader.lost();
        shader.lost();
        assert_eq!(shader.state(), ProgramState::SourcesLoaded);
        assert!(shader.sources().is_some());
        {
            let state = shader.context().lock_non_main();
            assert_eq!(state.active_program(), None);
            assert_eq!(state.device.live_shader_count(), 0);
            assert_eq!(state.device.live_program_count(), 0);
        }

        shader.invalidate().unwrap();
        shader.invalidate().unwrap();
        assert_eq!(shader.state(), ProgramState::Compiled);
        let state = shader.context().lock_non_main();
        assert_eq!(state.device.live_program_count(), 1);
        // Sources were submitted again, not re-read
        assert_eq!(state.device.submissions().len(), 4);
    }

    #[test]
    fn test_context_loss_recovers_from_retained_sources() {
        let mut shader = program(VERTEX, FRAGMENT);
        shader.compile().unwrap();
        shader.bind(&TransformState::default()).unwrap();
        let before = shader.program_handle();

        {
            let mut state = shader.context().lock_non_main();
            state.device.reset();
            state.device.clear_uniform_uploads();
            assert_eq!(state.device.live_program_count(), 0);
            assert_eq!(state.device.current_program(), None);
        }
        shader.lost();
        assert_eq!(shader.state(), ProgramState::SourcesLoaded);
        assert_eq!(shader.context().lock_non_main().active_program(), None);

        shader.invalidate().unwrap();
        assert_ne!(shader.program_handle(), before);
        assert_eq!(shader.attribute_location(VertexAttribute::Position), Some(0));
        assert_eq!(shader.find_uniform_location("albedo"), Some(2));

        shader.bind(&TransformState::default()).unwrap();
        let state = shader.context().lock_non_main();
        assert_eq!(state.device.live_shader_count(), 2);
        assert_eq!(state.device.live_program_count(), 1);
        assert_eq!(state.device.current_program(), shader.program_handle());
        assert_eq!(state.device.use_program_calls(), 2);
        assert_eq!(state.device.uniform_uploads().len(), 2);
        assert_eq!(state.device.submissions().len(), 4);
    }

    #[test]
    fn test_drop_releases_native_objects() {
        let context = RenderContext::new(HeadlessDevice::new());
        {
            let sources = ShaderSources::new(
                SourceBuffer::from_memory("a.vsh", VERTEX),
                SourceBuffer::from_memory("a.fsh", FRAGMENT),
            );
            let mut shader = ShaderProgram::with_sources(Arc::clone(&context), sources);
            shader.compile().unwrap();
            assert_eq!(context.lock_non_main().device.live_program_count(), 1);
        }
        let state = context.lock_non_main();
        assert_eq!(state.device.live_program_count(), 0);
        assert_eq!(state.device.live_shader_count(), 0);
    }

    #[test]
    fn test_dump() {
        let mut shader = program(VERTEX, FRAGMENT);
        assert_eq!(shader.dump(), "Program not compiled\n");
        shader.compile().unwrap();
        let dump = shader.dump();
        assert!(dump.contains("(test.vsh, test.fsh)"));
        assert!(dump.contains("mat4 modelViewProjectionMatrix semantic=modelViewProjectionMatrix"));
        assert!(dump.contains("sampler2D albedo semantic=none"));
    }
}
