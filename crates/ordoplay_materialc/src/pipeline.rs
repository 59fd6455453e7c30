// SPDX-License-Identifier: MIT OR Apache-2.0
//! One pass of the material pipeline: graph → code → program → variants.

use notify_debouncer_full::notify;
use ordoplay_material_graph::{CodegenError, DocumentError, GeneratedShader, GraphDocument, MaterialGraph};
use ordoplay_shader_program::{
    define_block, DescriptorError, HeadlessDevice, RenderContext, ShaderDescriptor, ShaderError,
    ShaderProgram,
};
use std::path::{Path, PathBuf};

/// Error that stops a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Graph document could not be loaded or built
    #[error("{0}")]
    Document(#[from] DocumentError),

    /// Graph did not generate
    #[error("Code generation failed: {0}")]
    Codegen(#[from] CodegenError),

    /// Shader descriptor could not be loaded
    #[error("{0}")]
    Descriptor(#[from] DescriptorError),

    /// Base program did not compile
    #[error("{0}")]
    Shader(#[from] ShaderError),

    /// Output could not be written
    #[error("Failed to write {path:?}: {source}")]
    Io {
        /// Output path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File watching failed
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Some variants did not build
    #[error("{0} variant(s) failed to build")]
    VariantsFailed(usize),
}

/// What to run
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Graph document
    pub graph: PathBuf,
    /// Shader descriptor
    pub shader: Option<PathBuf>,
    /// Extra `;`-separated defines for both stages
    pub defines: Option<String>,
    /// Extra variant define lists
    pub variants: Vec<String>,
    /// Directory for generated define files
    pub out: Option<PathBuf>,
}

impl PipelineOptions {
    /// Files whose change invalidates a run
    pub fn inputs(&self) -> Vec<PathBuf> {
        let mut inputs = vec![self.graph.clone()];
        if let Some(shader) = &self.shader {
            inputs.push(shader.clone());
            if let Ok(descriptor) = ShaderDescriptor::load(shader) {
                inputs.push(descriptor.vertex_shader);
                inputs.push(descriptor.fragment_shader);
            }
        }
        inputs
    }
}

/// Outcome of one variant build
#[derive(Debug)]
pub struct VariantReport {
    /// Define list the variant was built with
    pub defines: String,
    /// Reflection dump, or why it failed
    pub result: Result<String, ShaderError>,
}

/// Everything one run produced
#[derive(Debug)]
pub struct PipelineReport {
    /// Graph name used for output files
    pub name: String,
    /// Generated code and macro preambles
    pub generated: GeneratedShader,
    /// Files written to the output directory
    pub written: Vec<PathBuf>,
    /// Reflection dump of the base program
    pub program_dump: Option<String>,
    /// Variant outcomes, in build order
    pub variants: Vec<VariantReport>,
}

impl PipelineReport {
    /// Number of variants that failed
    pub fn failed_variants(&self) -> usize {
        self.variants.iter().filter(|v| v.result.is_err()).count()
    }
}

/// Run the pipeline once
pub fn run(options: &PipelineOptions) -> Result<PipelineReport, ToolError> {
    let document = GraphDocument::load(&options.graph)?;
    let graph = MaterialGraph::from_document(&document)?;
    let generated = graph.generate()?;
    let name = output_name(&graph, &options.graph);

    let written = match &options.out {
        Some(dir) => write_defines(dir, &name, &generated)?,
        None => Vec::new(),
    };

    let mut report = PipelineReport {
        name,
        generated,
        written,
        program_dump: None,
        variants: Vec::new(),
    };

    if let Some(shader) = &options.shader {
        build_programs(shader, options, &mut report)?;
    }
    Ok(report)
}

fn output_name(graph: &MaterialGraph, path: &Path) -> String {
    if !graph.name.is_empty() {
        return graph.name.clone();
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.split('.').next())
        .unwrap_or("material")
        .to_string()
}

fn write_defines(dir: &Path, name: &str, generated: &GeneratedShader) -> Result<Vec<PathBuf>, ToolError> {
    std::fs::create_dir_all(dir).map_err(|source| ToolError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let files = [
        (dir.join(format!("{name}.vert.glsl-defines")), &generated.vertex_macros),
        (dir.join(format!("{name}.frag.glsl-defines")), &generated.fragment_macros),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (path, contents) in files {
        std::fs::write(&path, contents).map_err(|source| ToolError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Wrote {:?}", path);
        written.push(path);
    }
    Ok(written)
}

fn build_programs(shader: &Path, options: &PipelineOptions, report: &mut PipelineReport) -> Result<(), ToolError> {
    let descriptor = ShaderDescriptor::load(shader)?;
    let context = RenderContext::new(HeadlessDevice::new());
    let mut program = ShaderProgram::from_descriptor(context, &descriptor);

    let descriptor_defines = descriptor.define_list();
    let mut seen = Vec::new();
    let mut common = fresh_defines(&mut seen, &descriptor_defines);
    if let Some(defines) = &options.defines {
        common.push_str(&fresh_defines(&mut seen, defines));
    }
    let vertex_defines = format!("{}{}", report.generated.vertex_macros, common);
    let fragment_defines = format!("{}{}", report.generated.fragment_macros, common);
    program.set_vertex_defines(vertex_defines.clone());
    program.set_fragment_defines(fragment_defines.clone());

    program.compile()?;
    report.program_dump = Some(program.dump());

    for defines in descriptor.variants.iter().chain(&options.variants) {
        let block = fresh_defines(&mut seen.clone(), defines);
        let result = program
            .create_variant_with_defines(format!("{vertex_defines}{block}"), format!("{fragment_defines}{block}"))
            .map(|variant| variant.dump());
        match &result {
            Ok(_) => tracing::info!("Variant [{}] built", defines),
            Err(e) => tracing::error!("Variant [{}] failed: {}", defines, e),
        }
        report.variants.push(VariantReport {
            defines: defines.clone(),
            result,
        });
    }
    Ok(())
}

/// `#define` block for the names in `list` not already in `seen`. The
/// preprocessor rejects a name defined twice.
fn fresh_defines<'a>(seen: &mut Vec<&'a str>, list: &'a str) -> String {
    let mut fresh = Vec::new();
    for name in list.split(';').map(str::trim).filter(|name| !name.is_empty()) {
        if !seen.contains(&name) {
            seen.push(name);
            fresh.push(name);
        }
    }
    define_block(&fresh.join(";"))
}
