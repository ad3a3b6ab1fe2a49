//! Error types for the comparison pipeline.
//!
//! Each pipeline phase has its own error enum so callers can tell a failed
//! tool apart from a missing output directory or a correlation defect. The
//! umbrella [`SrCompareError`] carries all of them across the public API.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum SrCompareError {
    /// Pipeline configuration was invalid or unreadable.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Copying a user-supplied image into the input directory failed.
    #[error("{0}")]
    Staging(#[from] StagingError),

    /// An external tool failed to spawn or exited with an error.
    #[error("{0}")]
    Tool(#[from] ToolError),

    /// A tool's output directory could not be relocated into the store.
    #[error("{0}")]
    Relocation(#[from] RelocationError),

    /// Stage outputs could not be matched back to their source images.
    #[error("{0}")]
    Correlation(#[from] CorrelationError),

    /// Loading or composing comparison images failed.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while copying user images into the shared input directory.
///
/// Staging runs before any stage; these errors abort the run before an
/// external tool is ever invoked.
#[derive(Debug, Error)]
pub enum StagingError {
    /// A user-supplied image path does not exist or is not a file.
    #[error("input image not found: {}", .path.display())]
    SourceMissing {
        /// The missing source path.
        path: PathBuf,
    },

    /// Copying an image into the input directory failed.
    #[error("failed to copy '{}' into '{}': {source}", .src.display(), .dest.display())]
    Copy {
        /// The source image path.
        src: PathBuf,
        /// The staged destination path.
        dest: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A store directory (shared input or results root) could not be created.
    #[error("failed to prepare directory '{}': {source}", .dir.display())]
    Prepare {
        /// The directory being created.
        dir: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Two staged inputs carry the same correlation key.
    #[error("duplicate correlation key '{key}' in staging manifest")]
    DuplicateKey {
        /// The colliding key.
        key: String,
    },
}

impl StagingError {
    /// Creates a source missing error.
    #[must_use]
    pub fn source_missing(path: impl Into<PathBuf>) -> Self {
        Self::SourceMissing { path: path.into() }
    }

    /// Creates a copy error.
    #[must_use]
    pub fn copy(src: impl Into<PathBuf>, dest: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Copy {
            src: src.into(),
            dest: dest.into(),
            source,
        }
    }

    /// Creates a directory preparation error.
    #[must_use]
    pub fn prepare(dir: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Prepare {
            dir: dir.into(),
            source,
        }
    }

    /// Creates a duplicate key error.
    #[must_use]
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }
}

/// Errors raised while invoking an external tool.
///
/// Distinct from [`RelocationError`]: a `ToolError` means the subprocess
/// itself failed, a relocation error means the tool reported success but its
/// output was not where the stage configuration said it would be.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The command template was empty or otherwise unusable.
    #[error("tool '{name}': invalid command template: {reason}")]
    InvalidTemplate {
        /// The tool name.
        name: String,
        /// Why the template was rejected.
        reason: String,
    },

    /// The subprocess could not be spawned.
    #[error("tool '{name}': failed to spawn '{program}': {source}")]
    Spawn {
        /// The tool name.
        name: String,
        /// The program that failed to start.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The subprocess exited with a non-zero status.
    #[error("tool '{name}' exited with {}{}", exit_label(.code), stderr_excerpt(.stderr))]
    NonZeroExit {
        /// The tool name.
        name: String,
        /// The exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured stderr from the subprocess.
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

fn stderr_excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl ToolError {
    /// Creates an invalid template error.
    #[must_use]
    pub fn invalid_template(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a spawn failure error.
    #[must_use]
    pub fn spawn_failed(
        name: impl Into<String>,
        program: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Spawn {
            name: name.into(),
            program: program.into(),
            source,
        }
    }

    /// Creates a non-zero exit error.
    #[must_use]
    pub fn nonzero_exit(name: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::NonZeroExit {
            name: name.into(),
            code,
            stderr: stderr.into(),
        }
    }
}

/// Errors raised while relocating a tool's output into the artifact store.
#[derive(Debug, Error)]
pub enum RelocationError {
    /// The expected output directory is absent after a successful tool run.
    ///
    /// Either the tool wrote nowhere or it wrote to a different location
    /// than the stage configuration declares.
    #[error("stage '{stage}': expected output directory '{}' is missing after tool run", .expected.display())]
    SourceMissing {
        /// The stage name.
        stage: String,
        /// The directory the tool was expected to populate.
        expected: PathBuf,
    },

    /// The canonical directory already exists in the store.
    #[error("stage '{stage}': canonical directory '{}' already exists", .canonical.display())]
    DestinationExists {
        /// The stage name.
        stage: String,
        /// The pre-existing canonical directory.
        canonical: PathBuf,
    },

    /// The filesystem move itself failed.
    #[error("stage '{stage}': failed to move '{}' to '{}': {source}", .from.display(), .to.display())]
    MoveFailed {
        /// The stage name.
        stage: String,
        /// The move source.
        from: PathBuf,
        /// The move destination.
        to: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl RelocationError {
    /// Creates a source missing error.
    #[must_use]
    pub fn source_missing(stage: impl Into<String>, expected: impl Into<PathBuf>) -> Self {
        Self::SourceMissing {
            stage: stage.into(),
            expected: expected.into(),
        }
    }

    /// Creates a destination exists error.
    #[must_use]
    pub fn destination_exists(stage: impl Into<String>, canonical: impl Into<PathBuf>) -> Self {
        Self::DestinationExists {
            stage: stage.into(),
            canonical: canonical.into(),
        }
    }

    /// Creates a move failure error.
    #[must_use]
    pub fn move_failed(
        stage: impl Into<String>,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::MoveFailed {
            stage: stage.into(),
            from: from.into(),
            to: to.into(),
            source,
        }
    }
}

/// Errors raised while matching stage artifacts back to their source images.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// A stage directory holds a different number of artifacts than the
    /// staging manifest has inputs.
    #[error("stage '{stage}': expected {expected} artifacts, found {actual}")]
    CountMismatch {
        /// The stage whose artifact count diverged.
        stage: String,
        /// The number of staged inputs.
        expected: usize,
        /// The number of artifacts found on disk.
        actual: usize,
    },

    /// An artifact filename carries no parseable correlation key.
    #[error("stage '{stage}': artifact '{}' carries no correlation key", .artifact.display())]
    UnkeyedArtifact {
        /// The stage the artifact belongs to.
        stage: String,
        /// The offending artifact path.
        artifact: PathBuf,
    },

    /// An artifact's correlation key is unknown to the staging manifest.
    #[error("stage '{stage}': artifact '{}' carries unknown correlation key '{key}'", .artifact.display())]
    UnknownKey {
        /// The stage the artifact belongs to.
        stage: String,
        /// The parsed key.
        key: String,
        /// The offending artifact path.
        artifact: PathBuf,
    },

    /// A reference artifact does not end with the reference suffix token.
    #[error("stage '{stage}': artifact '{}' does not carry suffix token '{token}'", .artifact.display())]
    SuffixMismatch {
        /// The stage the artifact belongs to.
        stage: String,
        /// The offending artifact path.
        artifact: PathBuf,
        /// The suffix token the stage declares.
        token: String,
    },

    /// A derived artifact path does not exist on disk.
    #[error("stage '{stage}': no artifact for key '{key}' at '{}'", .expected.display())]
    MissingArtifact {
        /// The stage the artifact should belong to.
        stage: String,
        /// The correlation key being resolved.
        key: String,
        /// The derived path that is absent.
        expected: PathBuf,
    },

    /// A stage named in correlation has no canonical directory recorded.
    #[error("stage '{stage}' has not produced a canonical output directory")]
    StageNotRun {
        /// The stage name.
        stage: String,
    },

    /// A stage directory could not be listed.
    #[error("stage '{stage}': failed to list '{}': {source}", .dir.display())]
    ListDir {
        /// The stage name.
        stage: String,
        /// The directory that could not be listed.
        dir: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl CorrelationError {
    /// Creates a count mismatch error.
    #[must_use]
    pub fn count_mismatch(stage: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::CountMismatch {
            stage: stage.into(),
            expected,
            actual,
        }
    }

    /// Creates an unkeyed artifact error.
    #[must_use]
    pub fn unkeyed_artifact(stage: impl Into<String>, artifact: impl Into<PathBuf>) -> Self {
        Self::UnkeyedArtifact {
            stage: stage.into(),
            artifact: artifact.into(),
        }
    }

    /// Creates an unknown key error.
    #[must_use]
    pub fn unknown_key(
        stage: impl Into<String>,
        key: impl Into<String>,
        artifact: impl Into<PathBuf>,
    ) -> Self {
        Self::UnknownKey {
            stage: stage.into(),
            key: key.into(),
            artifact: artifact.into(),
        }
    }

    /// Creates a suffix mismatch error.
    #[must_use]
    pub fn suffix_mismatch(
        stage: impl Into<String>,
        artifact: impl Into<PathBuf>,
        token: impl Into<String>,
    ) -> Self {
        Self::SuffixMismatch {
            stage: stage.into(),
            artifact: artifact.into(),
            token: token.into(),
        }
    }

    /// Creates a missing artifact error.
    #[must_use]
    pub fn missing_artifact(
        stage: impl Into<String>,
        key: impl Into<String>,
        expected: impl Into<PathBuf>,
    ) -> Self {
        Self::MissingArtifact {
            stage: stage.into(),
            key: key.into(),
            expected: expected.into(),
        }
    }

    /// Creates a stage-not-run error.
    #[must_use]
    pub fn stage_not_run(stage: impl Into<String>) -> Self {
        Self::StageNotRun {
            stage: stage.into(),
        }
    }

    /// Creates a directory listing error.
    #[must_use]
    pub fn list_dir(stage: impl Into<String>, dir: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ListDir {
            stage: stage.into(),
            dir: dir.into(),
            source,
        }
    }
}

/// Errors raised while loading or composing comparison images.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An image could not be loaded (missing file, corrupt data).
    #[error("failed to load image '{}': {source}", .path.display())]
    Load {
        /// The image path.
        path: PathBuf,
        /// The underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// The composed comparison image could not be written.
    #[error("failed to write comparison image '{}': {source}", .path.display())]
    Save {
        /// The output path.
        path: PathBuf,
        /// The underlying encode error.
        #[source]
        source: image::ImageError,
    },

    /// The comparisons directory could not be created.
    #[error("failed to create comparisons directory '{}': {source}", .dir.display())]
    OutputDir {
        /// The directory.
        dir: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A font file could not be read or parsed.
    #[error("failed to load font '{}': {reason}", .path.display())]
    Font {
        /// The font path.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },
}

impl RenderError {
    /// Creates an image load error.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }

    /// Creates an image save error.
    #[must_use]
    pub fn save(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Save {
            path: path.into(),
            source,
        }
    }

    /// Creates an output directory error.
    #[must_use]
    pub fn output_dir(dir: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputDir {
            dir: dir.into(),
            source,
        }
    }

    /// Creates a font error.
    #[must_use]
    pub fn font(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Font {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or validating pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        /// The config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The configuration failed validation.
    #[error("invalid pipeline configuration: {reason}")]
    Invalid {
        /// Why validation failed.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a read error.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}
