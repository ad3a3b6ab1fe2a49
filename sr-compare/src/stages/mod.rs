//! Stage descriptors and the stage runner.
//!
//! A stage wraps one external tool invocation plus the housekeeping
//! that puts its outputs where the rest of the pipeline expects them:
//! relocation into the canonical directory and an optional filename
//! rewrite.

mod rename;
mod runner;

pub use rename::RenameRule;
pub use runner::run_stage;

use crate::config::StageConfig;
use crate::errors::ConfigError;
use crate::tools::{CommandTool, ExternalTool};
use std::sync::Arc;

/// A runnable stage: a named tool plus its output conventions.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The stage name, also the canonical directory name under the
    /// results root and the panel title in comparisons.
    pub name: String,
    /// The filename fragment the tool appends to its outputs.
    pub suffix_token: String,
    /// The tool this stage invokes.
    pub tool: Arc<dyn ExternalTool>,
    /// Filename rewrite applied once the output is in place.
    pub rename: Option<RenameRule>,
}

impl StageSpec {
    /// Creates a stage around an existing tool.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        suffix_token: impl Into<String>,
        tool: Arc<dyn ExternalTool>,
    ) -> Self {
        Self {
            name: name.into(),
            suffix_token: suffix_token.into(),
            tool,
            rename: None,
        }
    }

    /// Sets the rename rule.
    #[must_use]
    pub fn with_rename(mut self, rule: RenameRule) -> Self {
        self.rename = Some(rule);
        self
    }

    /// Builds a stage (and its command tool) from configuration.
    pub fn from_config(config: &StageConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut tool = CommandTool::new(&config.name, config.command.clone());
        if let Some(dir) = &config.working_dir {
            tool = tool.with_working_dir(dir);
        }
        if let Some(dir) = &config.expected_output {
            tool = tool.with_output_override(dir);
        }

        let rename = config
            .rename
            .as_ref()
            .map(RenameRule::from_config)
            .transpose()?;

        Ok(Self {
            name: config.name.clone(),
            suffix_token: config.suffix_token.clone(),
            tool: Arc::new(tool),
            rename,
        })
    }
}
