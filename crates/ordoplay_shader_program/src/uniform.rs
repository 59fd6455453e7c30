// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value types, uniform semantics and vertex attribute slots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of an active attribute or uniform, as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// `float`
    Float,
    /// `vec2`
    FloatVec2,
    /// `vec3`
    FloatVec3,
    /// `vec4`
    FloatVec4,
    /// `int`
    Int,
    /// `ivec2`
    IntVec2,
    /// `ivec3`
    IntVec3,
    /// `ivec4`
    IntVec4,
    /// `bool`
    Bool,
    /// `bvec2`
    BoolVec2,
    /// `bvec3`
    BoolVec3,
    /// `bvec4`
    BoolVec4,
    /// `mat2`
    FloatMat2,
    /// `mat3`
    FloatMat3,
    /// `mat4`
    FloatMat4,
    /// `sampler2D`
    Sampler2D,
    /// `samplerCube`
    SamplerCube,
    /// A GL type code outside the table
    Other(u32),
}

/// (type, GL enum, GLSL name)
const TYPE_TABLE: [(ValueType, u32, &str); 17] = [
    (ValueType::Float, 0x1406, "float"),
    (ValueType::FloatVec2, 0x8B50, "vec2"),
    (ValueType::FloatVec3, 0x8B51, "vec3"),
    (ValueType::FloatVec4, 0x8B52, "vec4"),
    (ValueType::Int, 0x1404, "int"),
    (ValueType::IntVec2, 0x8B53, "ivec2"),
    (ValueType::IntVec3, 0x8B54, "ivec3"),
    (ValueType::IntVec4, 0x8B55, "ivec4"),
    (ValueType::Bool, 0x8B56, "bool"),
    (ValueType::BoolVec2, 0x8B57, "bvec2"),
    (ValueType::BoolVec3, 0x8B58, "bvec3"),
    (ValueType::BoolVec4, 0x8B59, "bvec4"),
    (ValueType::FloatMat2, 0x8B5A, "mat2"),
    (ValueType::FloatMat3, 0x8B5B, "mat3"),
    (ValueType::FloatMat4, 0x8B5C, "mat4"),
    (ValueType::Sampler2D, 0x8B5E, "sampler2D"),
    (ValueType::SamplerCube, 0x8B60, "samplerCube"),
];

impl ValueType {
    /// Map a GL type enum
    pub fn from_gl_enum(code: u32) -> Self {
        TYPE_TABLE
            .iter()
            .find(|(_, gl, _)| *gl == code)
            .map_or(Self::Other(code), |(ty, _, _)| *ty)
    }

    /// GL type enum
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Other(code) => code,
            ty => TYPE_TABLE
                .iter()
                .find(|(t, _, _)| *t == ty)
                .map_or(0, |(_, gl, _)| *gl),
        }
    }

    /// Map a GLSL type keyword
    pub fn from_glsl_name(name: &str) -> Option<Self> {
        TYPE_TABLE.iter().find(|(_, _, n)| *n == name).map(|(ty, _, _)| *ty)
    }

    /// Size in bytes of one element of this type
    pub fn size_in_bytes(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Bool | Self::Sampler2D | Self::SamplerCube => 4,
            Self::FloatVec2 | Self::IntVec2 | Self::BoolVec2 => 4 * 2,
            Self::FloatVec3 | Self::IntVec3 | Self::BoolVec3 => 4 * 3,
            Self::FloatVec4 | Self::IntVec4 | Self::BoolVec4 => 4 * 4,
            Self::FloatMat2 => 4 * 2 * 2,
            Self::FloatMat3 => 4 * 3 * 3,
            Self::FloatMat4 => 4 * 4 * 4,
            Self::Other(_) => 0,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "0x{code:04X}"),
            ty => {
                let name = TYPE_TABLE
                    .iter()
                    .find(|(t, _, _)| t == ty)
                    .map_or("?", |(_, _, n)| *n);
                f.write_str(name)
            }
        }
    }
}

/// Uniforms the program refreshes by itself on every bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniformSemantic {
    /// Not recognized; set explicitly by the renderer
    None,
    /// `modelViewProjectionMatrix`
    ModelViewProjection,
    /// `modelViewMatrix`
    ModelView,
    /// `projectionMatrix`
    Projection,
    /// `normalMatrix`
    NormalMatrix,
    /// `flatColor`
    FlatColor,
}

impl UniformSemantic {
    /// Every semantic, in table order
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::ModelViewProjection,
        Self::ModelView,
        Self::Projection,
        Self::NormalMatrix,
        Self::FlatColor,
    ];

    /// Uniform name the semantic is recognized by
    pub fn uniform_name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ModelViewProjection => "modelViewProjectionMatrix",
            Self::ModelView => "modelViewMatrix",
            Self::Projection => "projectionMatrix",
            Self::NormalMatrix => "normalMatrix",
            Self::FlatColor => "flatColor",
        }
    }

    /// Match a uniform name exactly; unknown names map to `None`
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.uniform_name() == name)
            .unwrap_or(Self::None)
    }
}

/// Canonical vertex attribute slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexAttribute {
    /// `inPosition`
    Position,
    /// `inNormal`
    Normal,
    /// `inColor`
    Color,
    /// `inTexCoord0`
    TexCoord0,
    /// `inTexCoord1`
    TexCoord1,
    /// `inTexCoord2`
    TexCoord2,
    /// `inTexCoord3`
    TexCoord3,
    /// `inTangent`
    Tangent,
    /// `inBinormal`
    Binormal,
    /// `inJointWeight`
    JointWeight,
}

impl VertexAttribute {
    /// Number of slots
    pub const COUNT: usize = 10;

    /// Every slot, in slot order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Position,
        Self::Normal,
        Self::Color,
        Self::TexCoord0,
        Self::TexCoord1,
        Self::TexCoord2,
        Self::TexCoord3,
        Self::Tangent,
        Self::Binormal,
        Self::JointWeight,
    ];

    /// Slot index
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Attribute name the slot is recognized by
    pub fn attribute_name(self) -> &'static str {
        match self {
            Self::Position => "inPosition",
            Self::Normal => "inNormal",
            Self::Color => "inColor",
            Self::TexCoord0 => "inTexCoord0",
            Self::TexCoord1 => "inTexCoord1",
            Self::TexCoord2 => "inTexCoord2",
            Self::TexCoord3 => "inTexCoord3",
            Self::Tangent => "inTangent",
            Self::Binormal => "inBinormal",
            Self::JointWeight => "inJointWeight",
        }
    }

    /// Match an attribute name exactly
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.attribute_name() == name)
    }
}

/// A value uploaded to a uniform location
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer (also sampler units)
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vec2([f32; 2]),
    /// 3D vector
    Vec3([f32; 3]),
    /// 4D vector
    Vec4([f32; 4]),
    /// RGBA color, uploaded as its RGB components
    Color([f32; 4]),
    /// Column-major 3x3 matrix
    Mat3([f32; 9]),
    /// Column-major 4x4 matrix
    Mat4([f32; 16]),
}

impl UniformValue {
    /// Type the value uploads as
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Vec2(_) => ValueType::FloatVec2,
            Self::Vec3(_) | Self::Color(_) => ValueType::FloatVec3,
            Self::Vec4(_) => ValueType::FloatVec4,
            Self::Mat3(_) => ValueType::FloatMat3,
            Self::Mat4(_) => ValueType::FloatMat4,
        }
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        Self::Vec2(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        Self::Vec3(value)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(value: [f32; 4]) -> Self {
        Self::Vec4(value)
    }
}

impl From<[f32; 9]> for UniformValue {
    fn from(value: [f32; 9]) -> Self {
        Self::Mat3(value)
    }
}

impl From<[f32; 16]> for UniformValue {
    fn from(value: [f32; 16]) -> Self {
        Self::Mat4(value)
    }
}
