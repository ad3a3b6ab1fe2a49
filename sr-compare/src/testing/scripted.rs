//! Scripted stand-ins for external restoration tools.

use crate::errors::ToolError;
use crate::store::ArtifactStore;
use crate::tools::{ExternalTool, OutputLocation, OutputSpec};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// What a [`ScriptedTool`] does when run.
#[derive(Debug, Clone)]
pub enum ScriptedBehavior {
    /// Write one artifact per input into the requested directory.
    WriteRequested,
    /// Write artifacts into a directory of the tool's own choosing and
    /// report that location, like a tool with hardcoded output paths.
    WriteTo(PathBuf),
    /// Exit with a non-zero status before writing anything.
    ExitNonZero {
        /// The exit code to report.
        code: i32,
        /// The stderr text to report.
        stderr: String,
    },
    /// Report success without writing any output directory.
    WriteNothing,
    /// Write one artifact fewer than there are inputs.
    DropLastArtifact,
    /// Write artifacts whose correlation key prefix is garbage.
    CorruptKeys,
}

/// An in-process [`ExternalTool`] that fabricates tool outputs.
///
/// Artifacts are byte copies of the corresponding input file under the
/// tool's derived name (`<staged-stem>_<token>.<ext>`), so they decode
/// as real images and keep each input's pixels recognizable in composed
/// comparisons.
#[derive(Debug)]
pub struct ScriptedTool {
    name: String,
    suffix_token: String,
    behavior: ScriptedBehavior,
    calls: Mutex<usize>,
}

impl ScriptedTool {
    /// Creates a well-behaved scripted tool.
    #[must_use]
    pub fn new(name: impl Into<String>, suffix_token: impl Into<String>) -> Self {
        Self::with_behavior(name, suffix_token, ScriptedBehavior::WriteRequested)
    }

    /// Creates a scripted tool with an explicit behavior.
    #[must_use]
    pub fn with_behavior(
        name: impl Into<String>,
        suffix_token: impl Into<String>,
        behavior: ScriptedBehavior,
    ) -> Self {
        Self {
            name: name.into(),
            suffix_token: suffix_token.into(),
            behavior,
            calls: Mutex::new(0),
        }
    }

    /// Returns how many times the tool was run.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    /// Derives the artifact name this tool would give a staged input.
    fn derive_name(&self, staged_name: &str, corrupt_key: bool) -> String {
        let (stem, ext) = staged_name
            .rsplit_once('.')
            .unwrap_or((staged_name, "png"));
        let mut name = format!("{stem}_{}.{ext}", self.suffix_token);
        if corrupt_key {
            name.replace_range(..8, "zzzzzzzz");
        }
        name
    }

    /// Writes fabricated artifacts for every input into `out_dir`.
    fn write_artifacts(&self, input_dir: &Path, out_dir: &Path, drop_last: bool, corrupt: bool) {
        std::fs::create_dir_all(out_dir)
            .unwrap_or_else(|e| panic!("scripted tool '{}': create output dir: {e}", self.name));
        let inputs = ArtifactStore::list_sorted(input_dir)
            .unwrap_or_else(|e| panic!("scripted tool '{}': list input dir: {e}", self.name));

        let keep = if drop_last {
            inputs.len().saturating_sub(1)
        } else {
            inputs.len()
        };
        for input in &inputs[..keep] {
            let staged_name = input
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_else(|| panic!("scripted tool '{}': unreadable input name", self.name));
            let artifact = out_dir.join(self.derive_name(staged_name, corrupt));
            std::fs::copy(input, &artifact)
                .unwrap_or_else(|e| panic!("scripted tool '{}': write artifact: {e}", self.name));
        }
    }
}

#[async_trait]
impl ExternalTool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        input_dir: &Path,
        output: &OutputSpec,
    ) -> Result<OutputLocation, ToolError> {
        *self.calls.lock() += 1;

        match &self.behavior {
            ScriptedBehavior::WriteRequested => {
                self.write_artifacts(input_dir, output.requested_dir(), false, false);
                Ok(OutputLocation::new(output.requested_dir()))
            }
            ScriptedBehavior::WriteTo(dir) => {
                self.write_artifacts(input_dir, dir, false, false);
                Ok(OutputLocation::new(dir))
            }
            ScriptedBehavior::ExitNonZero { code, stderr } => Err(ToolError::nonzero_exit(
                &self.name,
                Some(*code),
                stderr.clone(),
            )),
            ScriptedBehavior::WriteNothing => Ok(OutputLocation::new(output.requested_dir())),
            ScriptedBehavior::DropLastArtifact => {
                self.write_artifacts(input_dir, output.requested_dir(), true, false);
                Ok(OutputLocation::new(output.requested_dir()))
            }
            ScriptedBehavior::CorruptKeys => {
                self.write_artifacts(input_dir, output.requested_dir(), false, true);
                Ok(OutputLocation::new(output.requested_dir()))
            }
        }
    }
}
