// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader source buffers, define blocks and shader descriptors.

use ron::extensions::Extensions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Raw bytes of one stage's source, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBuffer {
    /// Where the bytes came from, for diagnostics
    pub label: String,
    /// Source bytes
    pub bytes: Vec<u8>,
}

impl SourceBuffer {
    /// Wrap in-memory source
    pub fn from_memory(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file verbatim. A missing or unreadable file yields an empty
    /// buffer; the failure surfaces when the stage is compiled.
    pub fn read(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read shader source {:?}: {}", path, e);
                Vec::new()
            }
        };
        Self {
            label: path.display().to_string(),
            bytes,
        }
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Vertex and fragment source of a program. Shared between a program and
/// every variant created from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    /// Vertex stage source
    pub vertex: SourceBuffer,
    /// Fragment stage source
    pub fragment: SourceBuffer,
}

impl ShaderSources {
    /// Pair two buffers
    pub fn new(vertex: SourceBuffer, fragment: SourceBuffer) -> Arc<Self> {
        Arc::new(Self { vertex, fragment })
    }

    /// Read both stages from disk
    pub fn load(vertex_path: &Path, fragment_path: &Path) -> Arc<Self> {
        Self::new(SourceBuffer::read(vertex_path), SourceBuffer::read(fragment_path))
    }
}

/// Build a `#define NAME` block from a `;`-separated list of names.
///
/// Names are trimmed and empty entries skipped.
pub fn define_block(define_list: &str) -> String {
    define_list
        .split(';')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| format!("#define {name}\n"))
        .collect()
}

/// Shader asset descriptor: source paths relative to the descriptor file,
/// default defines, and the define combinations to prebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderDescriptor {
    /// Vertex stage source path
    pub vertex_shader: PathBuf,
    /// Fragment stage source path
    pub fragment_shader: PathBuf,
    /// Defines applied to both stages
    #[serde(default)]
    pub defines: Vec<String>,
    /// Define lists (`"A;B"`) of variants to build
    #[serde(default)]
    pub variants: Vec<String>,
}

impl ShaderDescriptor {
    /// Parse a RON descriptor
    pub fn from_ron(s: &str) -> Result<Self, DescriptorError> {
        let options = ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
        Ok(options.from_str(s)?)
    }

    /// Parse a JSON descriptor
    pub fn from_json(s: &str) -> Result<Self, DescriptorError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a descriptor and resolve its source paths against its directory
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let mut descriptor = if is_json {
            Self::from_json(&contents)?
        } else {
            Self::from_ron(&contents)?
        };

        if let Some(dir) = path.parent() {
            descriptor.vertex_shader = dir.join(&descriptor.vertex_shader);
            descriptor.fragment_shader = dir.join(&descriptor.fragment_shader);
        }
        Ok(descriptor)
    }

    /// Default defines as a `;`-separated list
    pub fn define_list(&self) -> String {
        self.defines.join(";")
    }

    /// Read the sources the descriptor points at
    pub fn load_sources(&self) -> Arc<ShaderSources> {
        ShaderSources::load(&self.vertex_shader, &self.fragment_shader)
    }
}

/// Error when loading a shader descriptor
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// File could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// Descriptor path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Malformed RON
    #[error("Invalid RON descriptor: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Malformed JSON
    #[error("Invalid JSON descriptor: {0}")]
    Json(#[from] serde_json::Error),
}
