//! Subprocess-backed external tools.

use super::{ExternalTool, OutputLocation, OutputSpec};
use crate::errors::ToolError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// An external tool invoked as a subprocess.
///
/// The command template is rendered by substituting the `{input}` and
/// `{output}` placeholders with the shared input directory and the
/// requested output directory. Tools that hardcode their own paths use
/// neither placeholder and declare where they write via
/// [`with_output_override`](Self::with_output_override).
#[derive(Debug, Clone)]
pub struct CommandTool {
    /// The tool name used in errors and logs.
    name: String,
    /// The argv template, placeholders unrendered.
    template: Vec<String>,
    /// Working directory for the subprocess.
    working_dir: Option<PathBuf>,
    /// Where the tool actually writes, when it ignores the requested
    /// directory.
    output_override: Option<PathBuf>,
}

impl CommandTool {
    /// Creates a new command tool.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        template: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into_iter().map(Into::into).collect(),
            working_dir: None,
            output_override: None,
        }
    }

    /// Sets the subprocess working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Declares the directory the tool writes to regardless of the
    /// requested output.
    #[must_use]
    pub fn with_output_override(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_override = Some(dir.into());
        self
    }

    /// Renders the argv by substituting placeholders.
    fn render(&self, input_dir: &Path, output: &OutputSpec) -> Result<Vec<String>, ToolError> {
        if self.template.is_empty() {
            return Err(ToolError::invalid_template(
                &self.name,
                "command template is empty",
            ));
        }
        let input = input_dir.to_string_lossy();
        let requested = output.requested_dir().to_string_lossy();
        Ok(self
            .template
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &requested))
            .collect())
    }
}

#[async_trait]
impl ExternalTool for CommandTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        input_dir: &Path,
        output: &OutputSpec,
    ) -> Result<OutputLocation, ToolError> {
        let argv = self.render(input_dir, output)?;
        let mut parts = argv.iter();
        let program = parts.next().ok_or_else(|| {
            ToolError::invalid_template(&self.name, "command template is empty")
        })?;

        let mut command = Command::new(program);
        command.args(parts);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        debug!(tool = %self.name, command = ?argv, "invoking external tool");

        let result = command
            .output()
            .await
            .map_err(|e| ToolError::spawn_failed(&self.name, program, e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(ToolError::nonzero_exit(
                &self.name,
                result.status.code(),
                stderr,
            ));
        }

        let dir = self
            .output_override
            .clone()
            .unwrap_or_else(|| output.requested_dir().to_path_buf());
        Ok(OutputLocation::new(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolError;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_render_substitutes_placeholders() {
        let tool = CommandTool::new("t", ["run", "--input", "{input}", "--output", "{output}"]);
        let argv = tool
            .render(Path::new("/data/in"), &OutputSpec::new("/data/out"))
            .unwrap();

        assert_eq!(argv, vec!["run", "--input", "/data/in", "--output", "/data/out"]);
    }

    #[test]
    fn test_render_leaves_plain_args_alone() {
        let tool = CommandTool::new("t", ["python", "main_test_bsrgan.py"]);
        let argv = tool
            .render(Path::new("/in"), &OutputSpec::new("/out"))
            .unwrap();

        assert_eq!(argv, vec!["python", "main_test_bsrgan.py"]);
    }

    #[tokio::test]
    async fn test_empty_template_rejected() {
        let tool = CommandTool::new("empty", Vec::<String>::new());
        let err = tool
            .run(Path::new("/in"), &OutputSpec::new("/out"))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidTemplate { .. }));
    }

    #[tokio::test]
    async fn test_successful_run_reports_requested_dir() {
        let tool = CommandTool::new("noop", ["true"]);
        let location = tool
            .run(Path::new("/in"), &OutputSpec::new("/out"))
            .await
            .unwrap();

        assert_eq!(location.dir(), Path::new("/out"));
    }

    #[tokio::test]
    async fn test_output_override_wins() {
        let tool = CommandTool::new("noop", ["true"]).with_output_override("/elsewhere");
        let location = tool
            .run(Path::new("/in"), &OutputSpec::new("/out"))
            .await
            .unwrap();

        assert_eq!(location.dir(), Path::new("/elsewhere"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_captures_stderr() {
        let tool = CommandTool::new("angry", ["sh", "-c", "echo boom >&2; exit 3"]);
        let err = tool
            .run(Path::new("/in"), &OutputSpec::new("/out"))
            .await
            .unwrap_err();

        match err {
            ToolError::NonZeroExit { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("boom"));
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let tool = CommandTool::new("ghost", ["sr-compare-no-such-binary"]);
        let err = tool
            .run(Path::new("/in"), &OutputSpec::new("/out"))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_working_dir_respected() {
        let dir = TempDir::new().unwrap();
        let tool =
            CommandTool::new("writer", ["sh", "-c", "touch marker.txt"]).with_working_dir(dir.path());

        tool.run(Path::new("/in"), &OutputSpec::new("/out"))
            .await
            .unwrap();

        assert!(dir.path().join("marker.txt").is_file());
    }
}
