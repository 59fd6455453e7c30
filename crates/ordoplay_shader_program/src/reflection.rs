// SPDX-License-Identifier: MIT OR Apache-2.0
//! Attribute and uniform tables of a linked program.

use crate::device::{ProgramHandle, ShaderDevice};
use crate::uniform::{UniformSemantic, ValueType, VertexAttribute};
use std::fmt::Write as _;

/// An active vertex attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeBinding {
    /// Declared name
    pub name: String,
    /// Canonical slot, `None` for unrecognized names
    pub slot: Option<VertexAttribute>,
    /// Native location
    pub location: Option<u32>,
    /// Value type
    pub value_type: ValueType,
}

/// An active uniform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBinding {
    /// Declared name
    pub name: String,
    /// Recognized semantic, [`UniformSemantic::None`] when the renderer sets it
    pub semantic: UniformSemantic,
    /// Native location, negative when the uniform has none
    pub location: i32,
    /// Value type
    pub value_type: ValueType,
    /// Array length
    pub size: u32,
}

impl UniformBinding {
    /// Byte size of one element
    pub fn type_size(&self) -> usize {
        self.value_type.size_in_bytes()
    }
}

/// Reflection tables built after a successful link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflection {
    attributes: Vec<AttributeBinding>,
    uniforms: Vec<UniformBinding>,
    slot_locations: [Option<u32>; VertexAttribute::COUNT],
}

impl Reflection {
    /// Enumerate active attributes and uniforms of a linked program
    pub fn build<D: ShaderDevice>(device: &D, program: ProgramHandle) -> Self {
        let mut reflection = Self::default();

        for variable in device.active_attributes(program) {
            let slot = VertexAttribute::from_name(&variable.name);
            let location = device.attribute_location(program, &variable.name);
            if let Some(slot) = slot {
                reflection.slot_locations[slot.slot()] = location;
            }
            reflection.attributes.push(AttributeBinding {
                name: variable.name,
                slot,
                location,
                value_type: variable.value_type,
            });
        }

        for variable in device.active_uniforms(program) {
            let location = device.uniform_location(program, &variable.name).unwrap_or(-1);
            reflection.uniforms.push(UniformBinding {
                semantic: UniformSemantic::from_name(&variable.name),
                name: variable.name,
                location,
                value_type: variable.value_type,
                size: variable.size,
            });
        }

        reflection
    }

    /// Active attributes in device order
    pub fn attributes(&self) -> &[AttributeBinding] {
        &self.attributes
    }

    /// Active uniforms in device order
    pub fn uniforms(&self) -> &[UniformBinding] {
        &self.uniforms
    }

    /// Number of active attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Number of active uniforms
    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    /// Location of the attribute bound to a canonical slot
    pub fn attribute_location(&self, slot: VertexAttribute) -> Option<u32> {
        self.slot_locations[slot.slot()]
    }

    /// Location of a uniform by exact name
    pub fn find_uniform_location(&self, name: &str) -> Option<i32> {
        self.uniforms
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.location)
            .filter(|location| *location >= 0)
    }

    /// Uniforms the program refreshes on bind
    pub fn semantic_uniforms(&self) -> impl Iterator<Item = &UniformBinding> {
        self.uniforms
            .iter()
            .filter(|u| u.semantic != UniformSemantic::None)
    }

    /// Human-readable listing of both tables
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Attributes: {}", self.attributes.len());
        for (index, attribute) in self.attributes.iter().enumerate() {
            let slot = attribute
                .slot
                .map_or_else(|| "-".to_string(), |slot| slot.slot().to_string());
            let location = attribute
                .location
                .map_or_else(|| "-".to_string(), |location| location.to_string());
            let _ = writeln!(
                out,
                "  [{index}] {} {} slot={slot} location={location}",
                attribute.value_type, attribute.name
            );
        }
        let _ = writeln!(out, "Uniforms: {}", self.uniforms.len());
        for (index, uniform) in self.uniforms.iter().enumerate() {
            let _ = writeln!(
                out,
                "  [{index}] {} {} semantic={} location={} size={} bytes={}",
                uniform.value_type,
                uniform.name,
                uniform.semantic.uniform_name(),
                uniform.location,
                uniform.size,
                uniform.type_size()
            );
        }
        out
    }
}
