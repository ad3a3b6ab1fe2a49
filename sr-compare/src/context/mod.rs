//! Run state: correlation keys, the staging manifest, and the run context.
//!
//! This module provides:
//! - Correlation keys assigned to inputs at staging time
//! - The staging manifest mapping keys back to original images
//! - The mutable run context threaded through stage execution

mod manifest;
mod run;

pub use manifest::{CorrelationKey, StagedInput, StagingManifest};
pub use run::RunContext;
