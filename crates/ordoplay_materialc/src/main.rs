// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` material compiler.
//!
//! Command-line front end for the material pipeline:
//! - Loads a material graph document and generates its GLSL macros
//! - Compiles a shader program against them on the headless device
//! - Prints the reflection dump and builds every requested variant
//! - Optionally re-runs whenever an input file changes
//!
//! ## Usage
//!
//! ```text
//! ordoplay_materialc lit.graph.ron --shader lit.shader.ron --variant SKINNING --watch
//! ```

mod pipeline;
mod watch;

use clap::Parser;
use pipeline::{PipelineOptions, PipelineReport, ToolError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use watch::{PipelineWatcher, WatchEvent};

#[derive(Parser, Debug)]
#[command(
    name = "ordoplay_materialc",
    version,
    about = "Compile OrdoPlay material graphs into GLSL programs"
)]
struct Args {
    /// Material graph document (.ron or .json)
    graph: PathBuf,

    /// Shader descriptor (.ron or .json) to compile against the graph
    #[arg(long)]
    shader: Option<PathBuf>,

    /// Extra defines for both stages, separated by ';'
    #[arg(long)]
    defines: Option<String>,

    /// Variant define list to build; may be repeated
    #[arg(long = "variant")]
    variants: Vec<String>,

    /// Directory to write the generated define files into
    #[arg(long)]
    out: Option<PathBuf>,

    /// Re-run whenever an input file changes
    #[arg(long)]
    watch: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl From<Args> for PipelineOptions {
    fn from(args: Args) -> Self {
        Self {
            graph: args.graph,
            shader: args.shader,
            defines: args.defines,
            variants: args.variants,
            out: args.out,
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default_directives = format!(
        "ordoplay_materialc={level},ordoplay_material_graph={level},ordoplay_shader_program={level}"
    );
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(report: &PipelineReport) {
    if report.written.is_empty() {
        println!("// {}.vert", report.name);
        print!("{}", report.generated.vertex_macros);
        if !report.generated.vertex_code.is_empty() {
            println!("// vertex code: {}", report.generated.vertex_code);
        }
        println!("// {}.frag", report.name);
        print!("{}", report.generated.fragment_macros);
    }
    if let Some(dump) = &report.program_dump {
        print!("{dump}");
    }
    for variant in &report.variants {
        match &variant.result {
            Ok(_) => println!("variant [{}]: ok", variant.defines),
            Err(e) => println!("variant [{}]: FAILED\n{e}", variant.defines),
        }
    }
}

fn run_once(options: &PipelineOptions) -> Result<(), ToolError> {
    let report = pipeline::run(options)?;
    print_report(&report);
    match report.failed_variants() {
        0 => Ok(()),
        failed => Err(ToolError::VariantsFailed(failed)),
    }
}

fn watch(options: &PipelineOptions) -> Result<(), ToolError> {
    let mut watcher = PipelineWatcher::new(Duration::from_millis(250))?;
    loop {
        if let Err(e) = run_once(options) {
            tracing::error!("{e}");
        }
        // Descriptor edits may point at new sources
        for input in options.inputs() {
            watcher.watch_file(&input)?;
        }
        tracing::info!("Waiting for changes to {} file(s)", watcher.watched_file_count());

        loop {
            match watcher.wait(Duration::from_secs(1)) {
                Some(WatchEvent::Changed(paths)) => {
                    tracing::info!("Changed: {:?}", paths);
                    break;
                }
                Some(WatchEvent::Error(e)) => tracing::warn!("File watcher error: {e}"),
                None => {}
            }
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    tracing::info!("OrdoPlay material compiler v{}", env!("CARGO_PKG_VERSION"));

    let watch_mode = args.watch;
    let options = PipelineOptions::from(args);
    let result = if watch_mode { watch(&options) } else { run_once(&options) };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
