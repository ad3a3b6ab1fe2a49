//! External tool invocation.
//!
//! This module provides:
//! - The [`ExternalTool`] trait stages run their work through
//! - Output negotiation types ([`OutputSpec`], [`OutputLocation`])
//! - A subprocess-backed implementation ([`CommandTool`])

mod command;

pub use command::CommandTool;

use crate::errors::ToolError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Where a stage asks its tool to put outputs.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    /// The canonical directory the stage wants populated.
    requested: PathBuf,
}

impl OutputSpec {
    /// Creates an output spec for a requested directory.
    #[must_use]
    pub fn new(requested: impl Into<PathBuf>) -> Self {
        Self {
            requested: requested.into(),
        }
    }

    /// Returns the requested output directory.
    #[must_use]
    pub fn requested_dir(&self) -> &Path {
        &self.requested
    }
}

/// Where a tool reports its outputs actually landed.
///
/// Well-behaved tools honor the requested directory; others ignore it
/// and write to a location of their own choosing. The stage runner
/// compares this against the canonical directory and relocates when
/// they differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    dir: PathBuf,
}

impl OutputLocation {
    /// Creates an output location.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory the tool wrote to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Consumes the location, returning the directory.
    #[must_use]
    pub fn into_dir(self) -> PathBuf {
        self.dir
    }
}

/// Trait for external tools a stage can run.
///
/// A tool reads every image in `input_dir` and writes its outputs
/// somewhere; the returned [`OutputLocation`] says where. An `Err`
/// means the tool itself failed (bad template, spawn failure, non-zero
/// exit), never that its output is misplaced.
#[async_trait]
pub trait ExternalTool: Send + Sync + Debug {
    /// Returns the tool's name.
    fn name(&self) -> &str;

    /// Runs the tool against the shared input directory.
    async fn run(&self, input_dir: &Path, output: &OutputSpec)
        -> Result<OutputLocation, ToolError>;
}
