//! The pipeline: staging, stage execution, correlation, rendering.
//!
//! A [`Pipeline`] is validated up front from a [`PipelineConfig`], then
//! [`run`](Pipeline::run) drives one full comparison: inputs are copied
//! into the shared input directory with fresh correlation keys, every
//! stage runs to completion in order, stage outputs are correlated back
//! to their inputs, and one comparison image is written per input. Any
//! failure aborts the run; there is no retry, resume, or partial result.


use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::correlate::CorrelationIndex;
use crate::errors::{ConfigError, SrCompareError};
use crate::events::{EventSink, NoOpEventSink};
use crate::render::{ComparisonRenderer, RenderConfig};
use crate::stages::{run_stage, StageSpec};
use crate::store::ArtifactStore;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

/// How long one stage took.
#[derive(Debug, Clone)]
pub struct StageTiming {
    /// The stage name.
    pub stage: String,
    /// Wall-clock time from tool start to relocated output.
    pub elapsed: Duration,
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unique ID of the run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Per-stage wall-clock timings, in execution order.
    pub timings: Vec<StageTiming>,
    /// The composed comparison images, one per input.
    pub comparisons: Vec<PathBuf>,
}

/// A validated, runnable comparison pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    stages: Vec<StageSpec>,
    event_sink: Arc<dyn EventSink>,
    render_config: RenderConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Builds a pipeline from configuration, compiling each stage's
    /// command tool.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let stages = config
            .stages
            .iter()
            .map(StageSpec::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_stages(config, stages)
    }

    /// Builds a pipeline around pre-built stages.
    ///
    /// The stage list replaces whatever `config.stages` declares; the
    /// config still supplies the directory layout and reference stage.
    pub fn from_stages(
        config: PipelineConfig,
        stages: Vec<StageSpec>,
    ) -> Result<Self, ConfigError> {
        if stages.is_empty() {
            return Err(ConfigError::invalid("pipeline requires at least one stage"));
        }
        let mut names = HashSet::new();
        let mut tokens = HashSet::new();
        for stage in &stages {
            if !names.insert(stage.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate stage name '{}'",
                    stage.name
                )));
            }
            if !tokens.insert(stage.suffix_token.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate suffix token '{}' (stage '{}')",
                    stage.suffix_token, stage.name
                )));
            }
        }
        if !names.contains(config.reference_stage.as_str()) {
            return Err(ConfigError::invalid(format!(
                "reference stage '{}' is not in the stage list",
                config.reference_stage
            )));
        }

        Ok(Self {
            config,
            stages,
            event_sink: Arc::new(NoOpEventSink),
            render_config: RenderConfig::default(),
        })
    }

    /// Sets the event sink runs report through.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the comparison rendering configuration.
    #[must_use]
    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.render_config = config;
        self
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the compiled stages, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Runs the pipeline against a set of user images.
    pub async fn run(&self, inputs: &[PathBuf]) -> Result<RunReport, SrCompareError> {
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            pipeline = %self.config.name,
            inputs = inputs.len(),
            stages = self.stages.len(),
            "pipeline run starting"
        );

        let store = ArtifactStore::open(&self.config.input_dir, &self.config.results_root)?;
        let manifest = store.stage_inputs(inputs)?;
        let mut ctx = RunContext::new(run_id, store, manifest)
            .with_event_sink(self.event_sink.clone());

        ctx.emit_event(
            "run.started",
            None,
            Some(serde_json::json!({
                "pipeline": self.config.name,
                "stages": self.stages.len(),
            })),
        )
        .await;
        ctx.emit_event(
            "inputs.staged",
            None,
            Some(serde_json::json!({"count": ctx.manifest().len()})),
        )
        .await;

        let mut timings = Vec::with_capacity(self.stages.len());
        for (index, stage) in self.stages.iter().enumerate() {
            ctx.emit_event(
                "stage.started",
                Some(&stage.name),
                Some(serde_json::json!({"index": index})),
            )
            .await;

            let start = Instant::now();
            match run_stage(&ctx, stage).await {
                Ok(dir) => {
                    let elapsed = start.elapsed();
                    ctx.record_stage_dir(&stage.name, dir);
                    ctx.emit_event(
                        "stage.completed",
                        Some(&stage.name),
                        Some(serde_json::json!({"elapsed_ms": elapsed.as_millis() as u64})),
                    )
                    .await;
                    timings.push(StageTiming {
                        stage: stage.name.clone(),
                        elapsed,
                    });
                }
                Err(err) => {
                    error!(run_id = %run_id, stage = %stage.name, error = %err, "stage failed");
                    ctx.emit_event(
                        "stage.failed",
                        Some(&stage.name),
                        Some(serde_json::json!({"error": err.to_string()})),
                    )
                    .await;
                    return Err(err);
                }
            }
        }

        let index =
            CorrelationIndex::build(&ctx, &self.config.reference_stage, &self.stages)?;
        ctx.emit_event(
            "correlation.completed",
            None,
            Some(serde_json::json!({"tuples": index.len()})),
        )
        .await;

        let comparisons_dir = self
            .config
            .results_root
            .join(&self.config.comparisons_dir);
        let renderer = ComparisonRenderer::new(comparisons_dir, self.render_config.clone());

        let mut comparisons = Vec::with_capacity(index.len());
        for tuple in index.tuples() {
            let path = renderer.render_to_file(tuple)?;
            ctx.emit_event(
                "comparison.rendered",
                None,
                Some(serde_json::json!({
                    "key": tuple.key.as_str(),
                    "path": path.display().to_string(),
                })),
            )
            .await;
            comparisons.push(path);
        }

        ctx.emit_event(
            "run.completed",
            None,
            Some(serde_json::json!({"comparisons": comparisons.len()})),
        )
        .await;
        info!(
            run_id = %run_id,
            comparisons = comparisons.len(),
            "pipeline run completed"
        );

        Ok(RunReport {
            run_id,
            started_at: ctx.started_at(),
            timings,
            comparisons,
        })
    }
}
