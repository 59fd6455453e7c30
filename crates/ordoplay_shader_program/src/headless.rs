// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure-Rust shader device for offline validation and tests.
//!
//! `HeadlessDevice` compiles legacy GLSL by preprocessing it into tokens and
//! scanning the globals, and hands `#version 440`+ sources to naga for a
//! full parse and validation. It links by matching varyings between the
//! stages and reflects the declared attributes and uniforms. It also keeps
//! a record of everything submitted to it so callers can inspect the exact
//! traffic a program generated.

use crate::device::{ActiveVariable, ProgramHandle, ShaderDevice, ShaderHandle, ShaderStage};
use crate::preprocess::{self, Declaration, Storage};
use crate::uniform::{UniformValue, ValueType};
use crate::validate;
use std::collections::HashMap;
use std::num::NonZeroU32;

/// Source handed to one shader object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Shader the source was set on
    pub shader: ShaderHandle,
    /// Stage of that shader
    pub stage: ShaderStage,
    /// Fragments in submission order
    pub fragments: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct ShaderObject {
    stage: Option<ShaderStage>,
    fragments: Vec<Vec<u8>>,
    declarations: Option<Vec<Declaration>>,
    info_log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<ShaderHandle>,
    attributes: Vec<ActiveVariable>,
    uniforms: Vec<ActiveVariable>,
    linked: bool,
    info_log: String,
}

/// Software [`ShaderDevice`]
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_handle: u32,
    shaders: HashMap<ShaderHandle, ShaderObject>,
    programs: HashMap<ProgramHandle, ProgramObject>,
    current_program: Option<ProgramHandle>,
    fail_program_creation: bool,

    submissions: Vec<Submission>,
    use_program_calls: usize,
    uniform_uploads: Vec<(i32, UniformValue)>,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_program` fail, as a driver out of objects would
    pub fn set_fail_program_creation(&mut self, fail: bool) {
        self.fail_program_creation = fail;
    }

    /// Every `shader_source` call so far
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Number of `use_program` calls
    pub fn use_program_calls(&self) -> usize {
        self.use_program_calls
    }

    /// Every uniform upload as (location, value)
    pub fn uniform_uploads(&self) -> &[(i32, UniformValue)] {
        &self.uniform_uploads
    }

    /// Forget recorded uploads
    pub fn clear_uniform_uploads(&mut self) {
        self.uniform_uploads.clear();
    }

    /// Shader objects not yet deleted
    pub fn live_shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Program objects not yet deleted
    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    /// Program made current by the last `use_program`
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Simulate a context loss: every object is gone
    pub fn reset(&mut self) {
        self.shaders.clear();
        self.programs.clear();
        self.current_program = None;
    }

    fn allocate(&mut self) -> Option<NonZeroU32> {
        self.next_handle = self.next_handle.checked_add(1)?;
        NonZeroU32::new(self.next_handle)
    }

    fn compile_stage(stage: ShaderStage, fragments: &[Vec<u8>]) -> Result<Vec<Declaration>, String> {
        if fragments.iter().all(Vec::is_empty) {
            return Err("ERROR: 0:0: empty source".to_string());
        }
        let mut text = Vec::with_capacity(fragments.len());
        for (index, fragment) in fragments.iter().enumerate() {
            let fragment = std::str::from_utf8(fragment)
                .map_err(|e| format!("ERROR: {index}:0: source is not valid UTF-8 ({e})"))?;
            text.push(fragment);
        }

        if validate::is_module_source(&text) {
            return validate::compile_module(stage, &text).map_err(|e| e.to_string());
        }

        let tokens = preprocess::preprocess(&text).map_err(|e| e.to_string())?;
        if !preprocess::braces_balanced(&tokens) {
            return Err("ERROR: 0:0: unbalanced braces".to_string());
        }
        if !preprocess::has_main(&tokens) {
            return Err(format!("ERROR: 0:0: {stage} shader has no 'main' function"));
        }
        Ok(preprocess::scan_declarations(&tokens, stage == ShaderStage::Vertex))
    }

    fn link(&self, program: &ProgramObject) -> Result<(Vec<ActiveVariable>, Vec<ActiveVariable>), String> {
        let mut vertex = None;
        let mut fragment = None;
        for handle in &program.attached {
            let shader = self
                .shaders
                .get(handle)
                .ok_or_else(|| format!("attached shader {} was deleted", handle.0))?;
            let declarations = shader
                .declarations
                .as_ref()
                .ok_or_else(|| format!("attached shader {} is not compiled", handle.0))?;
            match shader.stage {
                Some(ShaderStage::Vertex) => vertex = Some(declarations),
                Some(ShaderStage::Fragment) => fragment = Some(declarations),
                None => {}
            }
        }
        let vertex = vertex.ok_or("no vertex shader attached")?;
        let fragment = fragment.ok_or("no fragment shader attached")?;

        for input in fragment.iter().filter(|d| d.storage == Storage::Varying) {
            let output = vertex
                .iter()
                .find(|d| d.storage == Storage::Varying && d.name == input.name);
            match output {
                None => {
                    return Err(format!(
                        "varying '{}' is read by the fragment shader but not written by the vertex shader",
                        input.name
                    ))
                }
                Some(output) if output.type_name != input.type_name => {
                    return Err(format!(
                        "varying '{}' is {} in the vertex shader but {} in the fragment shader",
                        input.name, output.type_name, input.type_name
                    ))
                }
                Some(_) => {}
            }
        }

        let attributes = vertex
            .iter()
            .filter(|d| d.storage == Storage::Attribute)
            .map(active_variable)
            .collect();

        let mut uniforms: Vec<ActiveVariable> = Vec::new();
        let mut declared: HashMap<&str, &str> = HashMap::new();
        for uniform in vertex
            .iter()
            .chain(fragment.iter())
            .filter(|d| d.storage == Storage::Uniform)
        {
            match declared.get(uniform.name.as_str()) {
                Some(type_name) if *type_name != uniform.type_name => {
                    return Err(format!(
                        "uniform '{}' is declared as both {} and {}",
                        uniform.name, type_name, uniform.type_name
                    ));
                }
                Some(_) => {}
                None => {
                    declared.insert(&uniform.name, &uniform.type_name);
                    uniforms.push(active_variable(uniform));
                }
            }
        }

        Ok((attributes, uniforms))
    }
}

fn active_variable(declaration: &Declaration) -> ActiveVariable {
    let name = if declaration.size > 1 {
        format!("{}[0]", declaration.name)
    } else {
        declaration.name.clone()
    };
    ActiveVariable {
        name,
        size: declaration.size,
        value_type: ValueType::from_glsl_name(&declaration.type_name).unwrap_or(ValueType::Other(0)),
    }
}

/// Index of a reflected variable, also accepting `name` for `name[0]`
fn variable_index(variables: &[ActiveVariable], name: &str) -> Option<usize> {
    variables
        .iter()
        .position(|v| v.name == name || v.name.strip_suffix("[0]") == Some(name))
}

impl ShaderDevice for HeadlessDevice {
    fn create_shader(&mut self, stage: ShaderStage) -> Option<ShaderHandle> {
        let handle = ShaderHandle(self.allocate()?);
        self.shaders.insert(
            handle,
            ShaderObject {
                stage: Some(stage),
                ..Default::default()
            },
        );
        Some(handle)
    }

    fn shader_source(&mut self, shader: ShaderHandle, fragments: &[&[u8]]) {
        let Some(object) = self.shaders.get_mut(&shader) else {
            return;
        };
        object.fragments = fragments.iter().map(|f| f.to_vec()).collect();
        object.declarations = None;
        self.submissions.push(Submission {
            shader,
            stage: object.stage.unwrap_or(ShaderStage::Vertex),
            fragments: object.fragments.clone(),
        });
    }

    fn compile_shader(&mut self, shader: ShaderHandle) -> bool {
        let Some(object) = self.shaders.get_mut(&shader) else {
            return false;
        };
        let stage = object.stage.unwrap_or(ShaderStage::Vertex);
        match Self::compile_stage(stage, &object.fragments) {
            Ok(declarations) => {
                object.declarations = Some(declarations);
                object.info_log.clear();
                true
            }
            Err(log) => {
                object.declarations = None;
                object.info_log = log;
                false
            }
        }
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        self.shaders
            .get(&shader)
            .map(|s| s.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> Option<ProgramHandle> {
        if self.fail_program_creation {
            return None;
        }
        let handle = ProgramHandle(self.allocate()?);
        self.programs.insert(handle, ProgramObject::default());
        Some(handle)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(object) = self.programs.get_mut(&program) {
            if !object.attached.contains(&shader) {
                object.attached.push(shader);
            }
        }
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(object) = self.programs.get_mut(&program) {
            object.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&mut self, program: ProgramHandle) -> bool {
        let Some(object) = self.programs.get(&program) else {
            return false;
        };
        let result = self.link(object);
        let Some(object) = self.programs.get_mut(&program) else {
            return false;
        };
        match result {
            Ok((attributes, uniforms)) => {
                object.attributes = attributes;
                object.uniforms = uniforms;
                object.linked = true;
                object.info_log.clear();
                true
            }
            Err(log) => {
                object.attributes.clear();
                object.uniforms.clear();
                object.linked = false;
                object.info_log = format!("ERROR: Link: {log}");
                false
            }
        }
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.programs
            .get(&program)
            .map(|p| p.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.programs
            .get(&program)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let object = self.programs.get(&program).filter(|p| p.linked)?;
        variable_index(&object.attributes, name).and_then(|i| u32::try_from(i).ok())
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<i32> {
        let object = self.programs.get(&program).filter(|p| p.linked)?;
        variable_index(&object.uniforms, name).and_then(|i| i32::try_from(i).ok())
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.use_program_calls += 1;
        self.current_program = program;
    }

    fn set_uniform(&mut self, location: i32, value: &UniformValue) {
        self.uniform_uploads.push((location, *value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "attribute vec3 inPosition;\n\
                          uniform mat4 modelViewProjectionMatrix;\n\
                          varying vec2 uv;\n\
                          void main() { gl_Position = modelViewProjectionMatrix * vec4(inPosition, 1.0); }\n";
    const FRAGMENT: &str = "varying vec2 uv;\n\
                            uniform vec3 flatColor;\n\
                            void main() { gl_FragColor = vec4(flatColor, 1.0); }\n";

    fn compile(device: &mut HeadlessDevice, stage: ShaderStage, fragments: &[&[u8]]) -> (ShaderHandle, bool) {
        let shader = device.create_shader(stage).unwrap();
        device.shader_source(shader, fragments);
        let ok = device.compile_shader(shader);
        (shader, ok)
    }

    #[test]
    fn test_compile_failures() {
        let mut device = HeadlessDevice::new();
        let (shader, ok) = compile(&mut device, ShaderStage::Vertex, &[b"".as_slice()]);
        assert!(!ok);
        assert!(device.shader_info_log(shader).contains("empty"));

        let (_, ok) = compile(&mut device, ShaderStage::Vertex, &[b"\xff\xfe".as_slice()]);
        assert!(!ok);
        let (_, ok) = compile(&mut device, ShaderStage::Vertex, &[b"float x;".as_slice()]);
        assert!(!ok);
        let (_, ok) = compile(&mut device, ShaderStage::Vertex, &[b"void main() {".as_slice()]);
        assert!(!ok);

        let (shader, ok) = compile(
            &mut device,
            ShaderStage::Fragment,
            &[b"#define BROKEN\n".as_slice(), b"#ifdef BROKEN\n#error no\n#endif\nvoid main() {}".as_slice()],
        );
        assert!(!ok);
        assert!(device.shader_info_log(shader).starts_with("ERROR: 1:"));
    }

    #[test]
    fn test_expression_conditionals() {
        let mut device = HeadlessDevice::new();
        let body: &[u8] = b"#if QUALITY > 1\nattribute vec3 inNormal;\n#endif\n\
                            #if(defined(SKIN))\nattribute vec4 inJointWeight;\n#endif\n\
                            void main() {}\n";
        let (vs, ok) = compile(&mut device, ShaderStage::Vertex, &[b"#define QUALITY 2\n".as_slice(), body]);
        assert!(ok);
        let (fs, _) = compile(&mut device, ShaderStage::Fragment, &[b"void main() {}".as_slice()]);
        let program = device.create_program().unwrap();
        device.attach_shader(program, vs);
        device.attach_shader(program, fs);
        assert!(device.link_program(program));
        let names: Vec<String> = device.active_attributes(program).into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["inNormal"]);
    }

    #[test]
    fn test_vulkan_glsl_goes_through_naga() {
        let vertex: &[u8] = b"#version 450\n\
                              layout(location = 0) in vec3 inPosition;\n\
                              layout(location = 0) out vec2 uv;\n\
                              layout(set = 0, binding = 0) uniform Transforms { mat4 modelViewProjectionMatrix; };\n\
                              void main() {\n\
                                  uv = inPosition.xy;\n\
                                  gl_Position = modelViewProjectionMatrix * vec4(inPosition, 1.0);\n\
                              }\n";
        let fragment: &[u8] = b"#version 450\n\
                                layout(location = 0) in vec2 uv;\n\
                                layout(location = 0) out vec4 outColor;\n\
                                layout(set = 0, binding = 1) uniform Material { vec4 flatColor; };\n\
                                void main() { outColor = flatColor * uv.x; }\n";
        let mut device = HeadlessDevice::new();
        let (vs, ok) = compile(&mut device, ShaderStage::Vertex, &[b"#define UNUSED 1\n".as_slice(), vertex]);
        assert!(ok);
        let (fs, ok) = compile(&mut device, ShaderStage::Fragment, &[fragment]);
        assert!(ok);

        let program = device.create_program().unwrap();
        device.attach_shader(program, vs);
        device.attach_shader(program, fs);
        assert!(device.link_program(program));
        assert_eq!(device.attribute_location(program, "inPosition"), Some(0));
        let uniforms = device.active_uniforms(program);
        assert_eq!(uniforms[0].name, "modelViewProjectionMatrix");
        assert_eq!(uniforms[0].value_type, ValueType::FloatMat4);
        assert_eq!(device.uniform_location(program, "flatColor"), Some(1));

        let broken: &[u8] = b"#version 450\nvoid main() { float x = missing; }\n";
        let (shader, ok) = compile(&mut device, ShaderStage::Fragment, &[broken]);
        assert!(!ok);
        assert!(device.shader_info_log(shader).contains("GLSL parse error"));
    }

    #[test]
    fn test_defines_select_code() {
        let mut device = HeadlessDevice::new();
        let body: &[u8] = b"#ifdef SKIN\nattribute vec4 inJointWeight;\n#endif\nvoid main() {}\n";
        let (vs, ok) = compile(&mut device, ShaderStage::Vertex, &[b"#define SKIN\n".as_slice(), body]);
        assert!(ok);
        let (fs, ok) = compile(&mut device, ShaderStage::Fragment, &[b"void main() {}".as_slice()]);
        assert!(ok);

        let program = device.create_program().unwrap();
        device.attach_shader(program, vs);
        device.attach_shader(program, fs);
        assert!(device.link_program(program));
        let attributes = device.active_attributes(program);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].name, "inJointWeight");

        let (vs, ok) = compile(&mut device, ShaderStage::Vertex, &[body]);
        assert!(ok);
        let program = device.create_program().unwrap();
        device.attach_shader(program, vs);
        device.attach_shader(program, fs);
        assert!(device.link_program(program));
        assert!(device.active_attributes(program).is_empty());
    }

    #[test]
    fn test_link_and_reflect() {
        let mut device = HeadlessDevice::new();
        let (vs, _) = compile(&mut device, ShaderStage::Vertex, &[VERTEX.as_bytes()]);
        let (fs, _) = compile(&mut device, ShaderStage::Fragment, &[FRAGMENT.as_bytes()]);
        let program = device.create_program().unwrap();
        device.attach_shader(program, vs);
        device.attach_shader(program, fs);
        assert!(device.link_program(program));

        let uniforms = device.active_uniforms(program);
        assert_eq!(uniforms.len(), 2);
        assert_eq!(uniforms[0].value_type, ValueType::FloatMat4);
        assert_eq!(device.uniform_location(program, "flatColor"), Some(1));
        assert_eq!(device.uniform_location(program, "unknown"), None);
        assert_eq!(device.attribute_location(program, "inPosition"), Some(0));
        assert_eq!(device.live_shader_count(), 2);
        assert_eq!(device.live_program_count(), 1);
    }

    #[test]
    fn test_link_rejects_mismatched_varyings() {
        let mut device = HeadlessDevice::new();
        let (vs, _) = compile(&mut device, ShaderStage::Vertex, &[b"varying vec3 uv;\nvoid main() {}".as_slice()]);
        let (fs, _) = compile(&mut device, ShaderStage::Fragment, &[FRAGMENT.as_bytes()]);
        let program = device.create_program().unwrap();
        device.attach_shader(program, vs);
        device.attach_shader(program, fs);
        assert!(!device.link_program(program));
        assert!(device.program_info_log(program).contains("uv"));
        assert!(device.active_uniforms(program).is_empty());

        let lone = device.create_program().unwrap();
        device.attach_shader(lone, fs);
        assert!(!device.link_program(lone));
    }

    #[test]
    fn test_records_traffic() {
        let mut device = HeadlessDevice::new();
        compile(&mut device, ShaderStage::Vertex, &[b"#define A\n".as_slice(), b"void main() {}".as_slice()]);
        assert_eq!(device.submissions().len(), 1);
        assert_eq!(device.submissions()[0].fragments[0], b"#define A\n");

        device.use_program(None);
        device.set_uniform(3, &UniformValue::Float(0.5));
        assert_eq!(device.use_program_calls(), 1);
        assert_eq!(device.uniform_uploads(), &[(3, UniformValue::Float(0.5))]);
    }
}
