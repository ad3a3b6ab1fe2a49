//! Command-line runner for the restoration comparison pipeline.
//!
//! Stages the given images, runs every configured super-resolution tool
//! over them, and writes one side-by-side comparison image per input.

use anyhow::Context;
use clap::Parser;
use sr_compare::config::PipelineConfig;
use sr_compare::events::LoggingEventSink;
use sr_compare::pipeline::Pipeline;
use sr_compare::render::RenderConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "sr-compare", version, about = "Compare super-resolution tools side by side")]
struct Args {
    /// Images to restore and compare.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Pipeline configuration file (JSON). Without it the built-in
    /// four-tool restoration pipeline is used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the shared input directory tools read from.
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Override the results root directory.
    #[arg(long)]
    results_root: Option<PathBuf>,

    /// Override the reference stage driving correlation.
    #[arg(long)]
    reference: Option<String>,

    /// Font file for panel titles. Without it a common system font is
    /// tried, and titles are skipped when none is found.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading pipeline config from '{}'", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = args.input_dir {
        config = config.with_input_dir(dir);
    }
    if let Some(dir) = args.results_root {
        config = config.with_results_root(dir);
    }
    if let Some(reference) = args.reference {
        config = config.with_reference_stage(reference);
    }

    let render_config = match &args.font {
        Some(path) => RenderConfig::with_font_path(path)
            .with_context(|| format!("loading title font from '{}'", path.display()))?,
        None => RenderConfig::with_system_font(),
    };

    let pipeline = Pipeline::new(config)
        .context("invalid pipeline configuration")?
        .with_event_sink(Arc::new(LoggingEventSink::info()))
        .with_render_config(render_config);

    let report = pipeline.run(&args.inputs).await?;

    println!("run {} completed", report.run_id);
    for timing in &report.timings {
        println!("  {:<16} {:.1?}", timing.stage, timing.elapsed);
    }
    println!("comparisons:");
    for path in &report.comparisons {
        println!("  {}", path.display());
    }

    Ok(())
}
