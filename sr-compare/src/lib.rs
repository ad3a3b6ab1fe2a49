//! # sr-compare
//!
//! A comparison pipeline for external image super-resolution tools.
//!
//! sr-compare stages a common set of input images, runs a configured
//! sequence of black-box restoration tools over them, reconciles each
//! tool's output naming scheme, and renders side-by-side comparisons:
//!
//! - **Artifact store**: one canonical directory per stage plus a shared
//!   input directory the tools read from
//! - **Stage runner**: blocking subprocess invocation with exit-status
//!   checking and output relocation
//! - **Correlation**: keyed filename matching that detects miscounted or
//!   stray artifacts instead of silently misaligning comparisons
//! - **Rendering**: one titled panel per stage, composed per input image
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sr_compare::config::PipelineConfig;
//! use sr_compare::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(PipelineConfig::from_file("pipeline.json")?)?;
//! let report = pipeline.run(&images).await?;
//! for comparison in &report.comparisons {
//!     println!("{}", comparison.display());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod correlate;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod render;
pub mod stages;
pub mod store;
pub mod testing;
pub mod tools;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{PipelineConfig, RenameRuleConfig, StageConfig};
    pub use crate::context::{CorrelationKey, RunContext, StagedInput, StagingManifest};
    pub use crate::correlate::{ComparisonTuple, CorrelationIndex, StageArtifact};
    pub use crate::errors::{
        ConfigError, CorrelationError, RelocationError, RenderError, SrCompareError,
        StagingError, ToolError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent,
    };
    pub use crate::pipeline::{Pipeline, RunReport, StageTiming};
    pub use crate::render::{ComparisonRenderer, RenderConfig};
    pub use crate::stages::{run_stage, RenameRule, StageSpec};
    pub use crate::store::ArtifactStore;
    pub use crate::tools::{CommandTool, ExternalTool, OutputLocation, OutputSpec};
}
