// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vulkan-style GLSL (`#version 440` and up) through naga.
//!
//! The stage is parsed by naga's GLSL frontend, validated, and reflected
//! from the module: entry point arguments and results give the stage
//! interface, uniform blocks and resource globals give the uniforms.

use crate::device::ShaderStage;
use crate::preprocess::{declared_version, Declaration, SourceError, Storage};
use naga::{AddressSpace, ArraySize, Binding, Handle, ImageDimension, Module, ScalarKind, Type, TypeInner};

/// Lowest `#version` handed to naga
pub const MIN_VERSION: u32 = 440;

/// Whether the fragments carry a version naga has to handle
pub fn is_module_source(fragments: &[&str]) -> bool {
    fragments
        .iter()
        .find_map(|fragment| declared_version(fragment))
        .is_some_and(|version| version >= MIN_VERSION)
}

/// Join the fragments with the `#version` line moved to the front, where
/// the frontend requires it. The line it leaves behind becomes blank.
fn hoist_version(fragments: &[&str]) -> String {
    let mut version = String::new();
    let mut rest = String::new();
    for fragment in fragments {
        for line in fragment.split_inclusive('\n') {
            if version.is_empty() && declared_version(line).is_some() {
                version.push_str(line.trim_end());
                version.push('\n');
                rest.push('\n');
            } else {
                rest.push_str(line);
            }
        }
        if !fragment.is_empty() && !fragment.ends_with('\n') {
            rest.push('\n');
        }
    }
    version + &rest
}

/// Parse, validate and reflect one stage
pub fn compile_module(stage: ShaderStage, fragments: &[&str]) -> Result<Vec<Declaration>, SourceError> {
    let fragment = fragments.len().saturating_sub(1);
    let error = |message: String| SourceError {
        fragment,
        line: 0,
        message,
    };

    let options = naga::front::glsl::Options {
        stage: match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        },
        defines: naga::FastHashMap::default(),
    };
    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&options, &hoist_version(fragments))
        .map_err(|errors| error(format!("GLSL parse error: {errors}")))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| error(format!("Validation error: {e}")))?;

    Ok(reflect(&module, stage))
}

fn reflect(module: &Module, stage: ShaderStage) -> Vec<Declaration> {
    let vertex = stage == ShaderStage::Vertex;
    let mut declarations = Vec::new();
    let mut push = |storage: Storage, name: &Option<String>, ty: Handle<Type>| {
        let (Some(name), Some((type_name, size))) = (name, glsl_type(module, ty)) else {
            return;
        };
        declarations.push(Declaration {
            storage,
            type_name,
            name: name.clone(),
            size,
        });
    };

    if let Some(entry) = module.entry_points.iter().find(|e| e.name == "main") {
        let input = if vertex { Storage::Attribute } else { Storage::Varying };
        for argument in &entry.function.arguments {
            if matches!(argument.binding, Some(Binding::Location { .. })) {
                push(input, &argument.name, argument.ty);
            }
        }

        let output = if vertex { Storage::Varying } else { Storage::Output };
        if let Some(result) = &entry.function.result {
            if let TypeInner::Struct { members, .. } = &module.types[result.ty].inner {
                for member in members {
                    if matches!(member.binding, Some(Binding::Location { .. })) {
                        push(output, &member.name, member.ty);
                    }
                }
            }
        }
    }

    for (_, global) in module.global_variables.iter() {
        match global.space {
            AddressSpace::Uniform | AddressSpace::PushConstant => match &module.types[global.ty].inner {
                TypeInner::Struct { members, .. } => {
                    for member in members {
                        push(Storage::Uniform, &member.name, member.ty);
                    }
                }
                _ => push(Storage::Uniform, &global.name, global.ty),
            },
            AddressSpace::Handle => push(Storage::Uniform, &global.name, global.ty),
            _ => {}
        }
    }

    declarations
}

/// GLSL type keyword and array length; `None` for types with no uniform
/// or varying equivalent (separate samplers, structs, runtime arrays)
fn glsl_type(module: &Module, ty: Handle<Type>) -> Option<(String, u32)> {
    let name = match &module.types[ty].inner {
        TypeInner::Scalar(scalar) => match scalar.kind {
            ScalarKind::Float => "float".to_string(),
            ScalarKind::Sint => "int".to_string(),
            ScalarKind::Uint => "uint".to_string(),
            ScalarKind::Bool => "bool".to_string(),
            _ => return None,
        },
        TypeInner::Vector { size, scalar } => {
            let prefix = match scalar.kind {
                ScalarKind::Float => "",
                ScalarKind::Sint => "i",
                ScalarKind::Uint => "u",
                ScalarKind::Bool => "b",
                _ => return None,
            };
            format!("{prefix}vec{}", *size as u8)
        }
        TypeInner::Matrix { columns, rows, .. } if columns == rows => format!("mat{}", *columns as u8),
        TypeInner::Image {
            dim: ImageDimension::D2,
            arrayed: false,
            ..
        } => "sampler2D".to_string(),
        TypeInner::Image {
            dim: ImageDimension::Cube,
            arrayed: false,
            ..
        } => "samplerCube".to_string(),
        TypeInner::Array {
            base,
            size: ArraySize::Constant(length),
            ..
        } => {
            let (name, _) = glsl_type(module, *base)?;
            return Some((name, length.get()));
        }
        _ => return None,
    };
    Some((name, 1))
}
