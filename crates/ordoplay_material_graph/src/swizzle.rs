// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swizzle modifiers and the vector result types they imply.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Component letter sets accepted in a swizzle. Letters may not be mixed
/// across sets inside one swizzle.
const COMPONENT_SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];

/// GLSL type a node result is declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    /// Scalar
    Float,
    /// 2-component vector
    Vec2,
    /// 3-component vector
    Vec3,
    /// 4-component vector
    Vec4,
}

impl ResultType {
    /// Map a component count to a result type.
    ///
    /// Widths 0 and above 4 have no GLSL type and return `None`; callers
    /// surface that as an ill-typed node.
    pub fn from_width(width: usize) -> Option<Self> {
        match width {
            1 => Some(Self::Float),
            2 => Some(Self::Vec2),
            3 => Some(Self::Vec3),
            4 => Some(Self::Vec4),
            _ => None,
        }
    }

    /// Number of components
    pub fn width(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }

    /// GLSL spelling
    pub fn glsl_name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// Result width of a binary operation over two operand swizzle lengths.
///
/// A scalar operand broadcasts, so the wider side wins; otherwise both sides
/// must agree. Any other combination yields `None`.
pub fn binary_width(s1: usize, s2: usize) -> Option<usize> {
    if s1 == 1 || s2 == 1 {
        Some(s1.max(s2))
    } else if s1 == s2 {
        Some(s1)
    } else {
        None
    }
}

/// Result type of a binary operation over two swizzles
pub fn infer_binary(a: &Swizzle, b: &Swizzle) -> Option<ResultType> {
    binary_width(a.len(), b.len()).and_then(ResultType::from_width)
}

/// A validated swizzle modifier (`"xyz"`, `"r"`, or empty for "whole value")
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Swizzle(String);

impl Swizzle {
    /// Parse a swizzle string
    pub fn parse(text: &str) -> Result<Self, SwizzleError> {
        if text.len() > 4 {
            return Err(SwizzleError::TooLong(text.to_string()));
        }
        if text.is_empty() {
            return Ok(Self::default());
        }
        let valid = COMPONENT_SETS
            .iter()
            .any(|set| text.chars().all(|c| set.contains(c)));
        if !valid {
            return Err(SwizzleError::InvalidComponents(text.to_string()));
        }
        Ok(Self(text.to_string()))
    }

    /// The modifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of components selected
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the whole value is read
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render an operand reference, `name` or `name.xyz`
    pub fn operand(&self, name: &str) -> String {
        if self.is_empty() {
            name.to_string()
        } else {
            format!("{name}.{}", self.0)
        }
    }
}

impl TryFrom<String> for Swizzle {
    type Error = SwizzleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Swizzle> for String {
    fn from(value: Swizzle) -> Self {
        value.0
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Component letters read from a node by all of its consumers.
///
/// Every read site contributes all of its letters, in read order, so a
/// component read twice counts twice. The accumulated width decides the
/// type the node declares its result with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadModifiers(String);

impl ReadModifiers {
    /// Merge the letters of one more read site
    pub fn merge(&mut self, swizzle: &Swizzle) {
        self.0.push_str(swizzle.as_str());
    }

    /// Accumulated letters
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of components read across all read sites
    pub fn width(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether nothing reads a component of this node
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Error when parsing a swizzle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwizzleError {
    /// More than four components
    #[error("Swizzle has more than 4 components: {0:?}")]
    TooLong(String),

    /// Unknown or mixed component letters
    #[error("Swizzle must use letters from one of xyzw, rgba, stpq: {0:?}")]
    InvalidComponents(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sw(text: &str) -> Swizzle {
        Swizzle::parse(text).unwrap()
    }

    #[test]
    fn test_binary_width_rules() {
        assert_eq!(binary_width(1, 3), Some(3));
        assert_eq!(binary_width(4, 1), Some(4));
        assert_eq!(binary_width(2, 2), Some(2));
        assert_eq!(binary_width(2, 3), None);
        assert_eq!(binary_width(0, 0), Some(0));
        assert_eq!(ResultType::from_width(0), None);
    }

    #[test]
    fn test_binary_width_is_commutative() {
        for s1 in 0..=5 {
            for s2 in 0..=5 {
                assert_eq!(binary_width(s1, s2), binary_width(s2, s1), "({s1}, {s2})");
            }
        }
    }

    #[test]
    fn test_infer_binary() {
        assert_eq!(infer_binary(&sw("xyz"), &sw("x")), Some(ResultType::Vec3));
        assert_eq!(infer_binary(&sw("xy"), &sw("rg")), Some(ResultType::Vec2));
        assert_eq!(infer_binary(&sw("xy"), &sw("xyz")), None);
        // Whole-value reads carry no width information
        assert_eq!(infer_binary(&sw(""), &sw("")), None);
        assert_eq!(infer_binary(&sw(""), &sw("w")), Some(ResultType::Float));
    }

    #[test]
    fn test_swizzle_validation() {
        assert!(Swizzle::parse("xyzw").is_ok());
        assert!(Swizzle::parse("bgr").is_ok());
        assert!(Swizzle::parse("").unwrap().is_empty());
        assert!(matches!(Swizzle::parse("xyzwx"), Err(SwizzleError::TooLong(_))));
        assert!(matches!(Swizzle::parse("xg"), Err(SwizzleError::InvalidComponents(_))));
        assert!(matches!(Swizzle::parse("q1"), Err(SwizzleError::InvalidComponents(_))));
    }

    #[test]
    fn test_operand_text() {
        assert_eq!(sw("xyz").operand("texA"), "texA.xyz");
        assert_eq!(sw("").operand("time"), "time");
    }

    #[test]
    fn test_read_modifiers_count_every_read() {
        let mut reads = ReadModifiers::default();
        assert!(reads.is_empty());
        reads.merge(&sw("xy"));
        reads.merge(&sw("zx"));
        reads.merge(&sw(""));
        assert_eq!(reads.as_str(), "xyzx");
        assert_eq!(reads.width(), 4);

        let mut twice = ReadModifiers::default();
        twice.merge(&sw("x"));
        twice.merge(&sw("x"));
        assert_eq!(twice.as_str(), "xx");
        assert_eq!(twice.width(), 2);
    }
}
