//! Pipeline configuration.
//!
//! A [`PipelineConfig`] declares the directory layout and the static set of
//! stages to run. It is a plain serde document so deployments can keep their
//! tool commands in a JSON file; the built-in default mirrors the four-tool
//! restoration pipeline this crate grew out of (BSRGAN, Real-ESRGAN, SwinIR,
//! SwinIR large).

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Configuration for a comparison pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Human-readable pipeline name, used in events and logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory user images are staged into; this is the layout external
    /// tools read from.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Root directory canonical stage outputs are collected under.
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,
    /// Name of the directory (under the results root) composed comparison
    /// images are written to.
    #[serde(default = "default_comparisons_dir")]
    pub comparisons_dir: String,
    /// The stage whose outputs drive correlation.
    #[serde(default = "default_reference_stage")]
    pub reference_stage: String,
    /// The stages to run, in order.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,
}

fn default_name() -> String {
    "restoration-comparison".to_string()
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("BSRGAN/testsets/RealSRSet")
}

fn default_results_root() -> PathBuf {
    PathBuf::from("results")
}

fn default_comparisons_dir() -> String {
    "comparisons".to_string()
}

fn default_reference_stage() -> String {
    "SwinIR".to_string()
}

fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig::new("BSRGAN", "BSRGAN", ["python", "main_test_bsrgan.py"])
            .with_working_dir("BSRGAN")
            .with_expected_output("BSRGAN/testsets/RealSRSet_results_x4"),
        StageConfig::new(
            "realESRGAN",
            "realESRGAN",
            [
                "python",
                "Real-ESRGAN/inference_realesrgan.py",
                "-n",
                "RealESRGAN_x4plus",
                "--input",
                "{input}",
                "-s",
                "4",
                "--output",
                "{output}",
            ],
        ),
        StageConfig::new(
            "SwinIR",
            "SwinIR",
            [
                "python",
                "SwinIR/main_test_swinir.py",
                "--task",
                "real_sr",
                "--model_path",
                "SwinIR/model_zoo/003_realSR_BSRGAN_DFO_s64w8_SwinIR-M_x4_GAN.pth",
                "--folder_lq",
                "{input}",
                "--scale",
                "4",
            ],
        )
        .with_expected_output("results/swinir_real_sr_x4"),
        StageConfig::new(
            "SwinIR_large",
            "SwinIR_large",
            [
                "python",
                "SwinIR/main_test_swinir.py",
                "--task",
                "real_sr",
                "--model_path",
                "SwinIR/model_zoo/003_realSR_BSRGAN_DFO_s64w8_SwinIR-L_x4_GAN.pth",
                "--folder_lq",
                "{input}",
                "--scale",
                "4",
                "--large_model",
            ],
        )
        .with_expected_output("results/swinir_real_sr_x4_large")
        .with_rename(RenameRuleConfig::new("*.png", "SwinIR.png", "SwinIR_large.png")),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            input_dir: default_input_dir(),
            results_root: default_results_root(),
            comparisons_dir: default_comparisons_dir(),
            reference_stage: default_reference_stage(),
            stages: default_stages(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with the built-in restoration stages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty configuration to build up stage by stage.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::parse(path, e))
    }

    /// Sets the input directory.
    #[must_use]
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    /// Sets the results root directory.
    #[must_use]
    pub fn with_results_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_root = dir.into();
        self
    }

    /// Sets the reference stage.
    #[must_use]
    pub fn with_reference_stage(mut self, stage: impl Into<String>) -> Self {
        self.reference_stage = stage.into();
        self
    }

    /// Appends a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: StageConfig) -> Self {
        self.stages.push(stage);
        self
    }

    /// Validates the configuration.
    ///
    /// Rejects an empty stage list, duplicate stage names or suffix tokens,
    /// a reference stage that is not in the list, and unusable stage
    /// descriptors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::invalid("pipeline requires at least one stage"));
        }

        let mut names = HashSet::new();
        let mut tokens = HashSet::new();
        for stage in &self.stages {
            stage.validate()?;
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

        if !names.contains(self.reference_stage.as_str()) {
            return Err(ConfigError::invalid(format!(
                "reference stage '{}' is not in the stage list",
                self.reference_stage
            )));
        }

        Ok(())
    }
}

/// Configuration for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// The stage name, also the canonical directory name under the results
    /// root and the panel title in comparisons.
    pub name: String,
    /// The filename fragment the tool appends to its outputs, used as the
    /// substitution key for correlation.
    pub suffix_token: String,
    /// The command template. `{input}` and `{output}` placeholders are
    /// rendered with the shared input directory and the stage's canonical
    /// output directory. Tools with hardcoded paths may use neither.
    pub command: Vec<String>,
    /// Working directory for the subprocess.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Where the tool actually leaves its artifacts, when that differs from
    /// the canonical directory. The stage runner relocates this directory
    /// into the store after the tool exits.
    #[serde(default)]
    pub expected_output: Option<PathBuf>,
    /// Filename rewrite applied to the canonical directory after relocation.
    #[serde(default)]
    pub rename: Option<RenameRuleConfig>,
}

impl StageConfig {
    /// Creates a new stage configuration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        suffix_token: impl Into<String>,
        command: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            suffix_token: suffix_token.into(),
            command: command.into_iter().map(Into::into).collect(),
            working_dir: None,
            expected_output: None,
            rename: None,
        }
    }

    /// Sets the subprocess working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the directory the tool writes to before relocation.
    #[must_use]
    pub fn with_expected_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.expected_output = Some(dir.into());
        self
    }

    /// Sets the post-relocation rename rule.
    #[must_use]
    pub fn with_rename(mut self, rule: RenameRuleConfig) -> Self {
        self.rename = Some(rule);
        self
    }

    /// Validates the stage descriptor.
    ///
    /// A command template must carry an `{input}` placeholder unless the
    /// stage declares a hardcoded-path convention (a working directory or
    /// an expected output directory) the way BSRGAN-style tools do.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("stage name cannot be empty"));
        }
        if self.suffix_token.trim().is_empty() {
            return Err(ConfigError::invalid(format!(
                "stage '{}' has an empty suffix token",
                self.name
            )));
        }
        if self.command.is_empty() {
            return Err(ConfigError::invalid(format!(
                "stage '{}' has an empty command template",
                self.name
            )));
        }
        if self.working_dir.is_none()
            && self.expected_output.is_none()
            && !self.command.iter().any(|arg| arg.contains("{input}"))
        {
            return Err(ConfigError::invalid(format!(
                "stage '{}' has no '{{input}}' placeholder and declares no \
                 working_dir or expected_output",
                self.name
            )));
        }
        Ok(())
    }
}

/// Serde form of a rename rule (see [`crate::stages::RenameRule`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRuleConfig {
    /// Filename glob selecting the files to rewrite (`*` wildcards only).
    pub pattern: String,
    /// The suffix to replace.
    pub from: String,
    /// The replacement suffix.
    pub to: String,
}

impl RenameRuleConfig {
    /// Creates a new rename rule configuration.
    #[must_use]
    pub fn new(pattern: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}
