//! Matching stage outputs back to their source images.
//!
//! Every tool decorates filenames with its own suffix token, so outputs
//! of the same input differ only in that token. Correlation walks the
//! reference stage's directory, pulls the correlation key out of each
//! artifact name, and derives the sibling artifact names for every other
//! stage by substituting suffix tokens. Any stray, missing, or
//! miscounted artifact surfaces as a [`CorrelationError`] instead of a
//! misaligned comparison.

use crate::context::{CorrelationKey, RunContext};
use crate::errors::CorrelationError;
use crate::stages::StageSpec;
use crate::store::ArtifactStore;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Replaces the trailing suffix token of an artifact stem.
///
/// `substitute_suffix("k_chip_SwinIR.png", "SwinIR", "BSRGAN")` yields
/// `k_chip_BSRGAN.png`. Returns `None` when the name has no extension or
/// its stem does not end with `from`.
#[must_use]
pub fn substitute_suffix(file_name: &str, from: &str, to: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    let base = stem.strip_suffix(from)?;
    Some(format!("{base}{to}.{ext}"))
}

/// One stage's artifact for a given input.
#[derive(Debug, Clone)]
pub struct StageArtifact {
    /// The stage that produced the artifact.
    pub stage: String,
    /// The artifact path inside the stage's canonical directory.
    pub path: PathBuf,
}

/// Everything that belongs to one input image: the staged input plus one
/// artifact per stage.
#[derive(Debug, Clone)]
pub struct ComparisonTuple {
    /// The correlation key assigned at staging.
    pub key: CorrelationKey,
    /// The filename the input arrived with.
    pub original_name: String,
    /// The staged input image.
    pub input: PathBuf,
    /// One artifact per stage, reference stage first.
    pub artifacts: Vec<StageArtifact>,
}

impl ComparisonTuple {
    /// Returns the artifact a given stage produced for this input.
    #[must_use]
    pub fn artifact(&self, stage: &str) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|a| a.stage == stage)
            .map(|a| a.path.as_path())
    }
}

/// The full correlation result for a run, in staged input order.
#[derive(Debug, Clone)]
pub struct CorrelationIndex {
    tuples: Vec<ComparisonTuple>,
}

impl CorrelationIndex {
    /// Correlates every stage's artifacts against the staging manifest.
    ///
    /// Every stage directory must hold exactly one artifact per staged
    /// input; the count is verified for all stages before any pairing
    /// happens, so a miscount is reported even when the reference stage
    /// itself looks healthy.
    pub fn build(
        ctx: &RunContext,
        reference: &str,
        stages: &[StageSpec],
    ) -> Result<Self, CorrelationError> {
        let reference_spec = stages
            .iter()
            .find(|s| s.name == reference)
            .ok_or_else(|| CorrelationError::stage_not_run(reference))?;

        let mut dirs = Vec::with_capacity(stages.len());
        for stage in stages {
            let dir = ctx
                .stage_dir(&stage.name)
                .ok_or_else(|| CorrelationError::stage_not_run(&stage.name))?;
            dirs.push((stage, dir));
        }

        let expected = ctx.manifest().len();
        let mut reference_files = Vec::new();
        for (stage, dir) in &dirs {
            let files = ArtifactStore::list_sorted(dir)
                .map_err(|e| CorrelationError::list_dir(&stage.name, *dir, e))?;
            if files.len() != expected {
                return Err(CorrelationError::count_mismatch(
                    &stage.name,
                    expected,
                    files.len(),
                ));
            }
            debug!(stage = %stage.name, count = files.len(), "stage artifacts counted");
            if stage.name == reference {
                reference_files = files;
            }
        }

        let mut tuples = Vec::with_capacity(reference_files.len());
        for path in &reference_files {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => return Err(CorrelationError::unkeyed_artifact(reference, path)),
            };
            let key = CorrelationKey::parse(name)
                .ok_or_else(|| CorrelationError::unkeyed_artifact(reference, path))?;
            let entry = ctx
                .manifest()
                .get(&key)
                .ok_or_else(|| CorrelationError::unknown_key(reference, key.as_str(), path))?;

            let mut artifacts = vec![StageArtifact {
                stage: reference.to_string(),
                path: path.clone(),
            }];
            for (stage, dir) in &dirs {
                if stage.name == reference {
                    continue;
                }
                let derived =
                    substitute_suffix(name, &reference_spec.suffix_token, &stage.suffix_token)
                        .ok_or_else(|| {
                            CorrelationError::suffix_mismatch(
                                reference,
                                path,
                                &reference_spec.suffix_token,
                            )
                        })?;
                let candidate = dir.join(&derived);
                if !candidate.is_file() {
                    return Err(CorrelationError::missing_artifact(
                        &stage.name,
                        key.as_str(),
                        candidate,
                    ));
                }
                artifacts.push(StageArtifact {
                    stage: stage.name.clone(),
                    path: candidate,
                });
            }

            tuples.push(ComparisonTuple {
                key,
                original_name: entry.original_name.clone(),
                input: entry.staged_path.clone(),
                artifacts,
            });
        }

        info!(tuples = tuples.len(), "correlation complete");
        Ok(Self { tuples })
    }

    /// Returns the tuples in staged input order.
    #[must_use]
    pub fn tuples(&self) -> &[ComparisonTuple] {
        &self.tuples
    }

    /// Returns the number of correlated inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Returns true when nothing was correlated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StagingManifest;
    use crate::store::ArtifactStore;
    use crate::tools::CommandTool;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn test_substitute_suffix_swaps_token() {
        assert_eq!(
            substitute_suffix("k_chip_SwinIR.png", "SwinIR", "BSRGAN").as_deref(),
            Some("k_chip_BSRGAN.png")
        );
    }

    #[test]
    fn test_substitute_suffix_handles_multidot_names() {
        assert_eq!(
            substitute_suffix("k.v2_chip_SwinIR.png", "SwinIR", "realESRGAN").as_deref(),
            Some("k.v2_chip_realESRGAN.png")
        );
    }

    #[test]
    fn test_substitute_suffix_round_trips() {
        let there = substitute_suffix("k_chip_SwinIR.png", "SwinIR", "BSRGAN").unwrap();
        let back = substitute_suffix(&there, "BSRGAN", "SwinIR").unwrap();
        assert_eq!(back, "k_chip_SwinIR.png");
    }

    #[test]
    fn test_substitute_suffix_rejects_wrong_token() {
        assert_eq!(substitute_suffix("k_chip_BSRGAN.png", "SwinIR", "X"), None);
    }

    #[test]
    fn test_substitute_suffix_rejects_extensionless_names() {
        assert_eq!(substitute_suffix("k_chip_SwinIR", "SwinIR", "X"), None);
    }

    fn spec(name: &str) -> StageSpec {
        StageSpec::new(name, name, Arc::new(CommandTool::new(name, ["true"])))
    }

    /// Stages `count` inputs and returns the context.
    fn staged_context(dir: &TempDir, count: usize) -> RunContext {
        let store =
            ArtifactStore::open(dir.path().join("input"), dir.path().join("results")).unwrap();
        let mut sources = Vec::new();
        for i in 0..count {
            let src = dir.path().join(format!("img{i}.png"));
            std::fs::write(&src, b"px").unwrap();
            sources.push(src);
        }
        let manifest = store.stage_inputs(&sources).unwrap();
        RunContext::new(Uuid::new_v4(), store, manifest)
    }

    /// Derives what a tool would name each output and writes those files
    /// into the stage's canonical directory.
    fn fabricate_stage_outputs(ctx: &mut RunContext, stage: &str, token: &str) {
        let dir = ctx.store().stage_dir(stage);
        std::fs::create_dir_all(&dir).unwrap();
        let names: Vec<String> = ctx
            .manifest()
            .entries()
            .iter()
            .map(|entry| {
                let staged = entry.staged_path.file_name().unwrap().to_str().unwrap();
                let stem = staged.rsplit_once('.').unwrap().0;
                format!("{stem}_{token}.png")
            })
            .collect();
        for name in names {
            std::fs::write(dir.join(name), b"out").unwrap();
        }
        ctx.record_stage_dir(stage, dir);
    }

    #[test]
    fn test_builds_tuples_for_all_inputs() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 2);
        fabricate_stage_outputs(&mut ctx, "SwinIR", "SwinIR");
        fabricate_stage_outputs(&mut ctx, "BSRGAN", "BSRGAN");

        let stages = vec![spec("SwinIR"), spec("BSRGAN")];
        let index = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap();

        assert_eq!(index.len(), 2);
        for (tuple, entry) in index.tuples().iter().zip(ctx.manifest().entries()) {
            assert_eq!(tuple.key, entry.key);
            assert_eq!(tuple.original_name, entry.original_name);
            assert_eq!(tuple.input, entry.staged_path);
            assert_eq!(tuple.artifacts.len(), 2);
            assert_eq!(tuple.artifacts[0].stage, "SwinIR");
            assert!(tuple.artifact("BSRGAN").unwrap().is_file());
        }
    }

    #[test]
    fn test_empty_run_correlates_to_empty_index() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 0);
        fabricate_stage_outputs(&mut ctx, "SwinIR", "SwinIR");

        let stages = vec![spec("SwinIR")];
        let index = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_undercount_is_reported_per_stage() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 2);
        fabricate_stage_outputs(&mut ctx, "SwinIR", "SwinIR");
        fabricate_stage_outputs(&mut ctx, "BSRGAN", "BSRGAN");

        // Drop one BSRGAN artifact.
        let victim = ArtifactStore::list_sorted(ctx.stage_dir("BSRGAN").unwrap())
            .unwrap()
            .remove(0);
        std::fs::remove_file(victim).unwrap();

        let stages = vec![spec("SwinIR"), spec("BSRGAN")];
        let err = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap_err();
        match err {
            CorrelationError::CountMismatch {
                stage,
                expected,
                actual,
            } => {
                assert_eq!(stage, "BSRGAN");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected CountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_stray_file_is_an_overcount() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 1);
        fabricate_stage_outputs(&mut ctx, "SwinIR", "SwinIR");

        std::fs::write(
            ctx.stage_dir("SwinIR").unwrap().join("leftover_SwinIR.png"),
            b"stray",
        )
        .unwrap();

        let stages = vec![spec("SwinIR")];
        let err = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap_err();
        assert!(matches!(err, CorrelationError::CountMismatch { actual: 2, .. }));
    }

    #[test]
    fn test_unkeyed_reference_artifact() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 1);
        fabricate_stage_outputs(&mut ctx, "SwinIR", "SwinIR");

        // Swap the keyed artifact for an unkeyed one, keeping the count.
        let keyed = ArtifactStore::list_sorted(ctx.stage_dir("SwinIR").unwrap())
            .unwrap()
            .remove(0);
        std::fs::remove_file(&keyed).unwrap();
        std::fs::write(
            ctx.stage_dir("SwinIR").unwrap().join("stray_chip_SwinIR.png"),
            b"x",
        )
        .unwrap();

        let stages = vec![spec("SwinIR")];
        let err = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap_err();
        assert!(matches!(err, CorrelationError::UnkeyedArtifact { .. }));
    }

    #[test]
    fn test_unknown_key_in_reference_artifact() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 1);
        fabricate_stage_outputs(&mut ctx, "SwinIR", "SwinIR");

        let keyed = ArtifactStore::list_sorted(ctx.stage_dir("SwinIR").unwrap())
            .unwrap()
            .remove(0);
        std::fs::remove_file(&keyed).unwrap();
        std::fs::write(
            ctx.stage_dir("SwinIR")
                .unwrap()
                .join("aaaaaaaa_chip_SwinIR.png"),
            b"x",
        )
        .unwrap();

        let stages = vec![spec("SwinIR")];
        let err = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap_err();
        assert!(matches!(err, CorrelationError::UnknownKey { .. }));
    }

    #[test]
    fn test_missing_sibling_artifact() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 1);
        fabricate_stage_outputs(&mut ctx, "SwinIR", "SwinIR");
        // BSRGAN directory passes the count check but holds a wrongly
        // named file, so the derived sibling path does not exist.
        fabricate_stage_outputs(&mut ctx, "BSRGAN", "WRONG");

        let stages = vec![spec("SwinIR"), spec("BSRGAN")];
        let err = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap_err();
        match err {
            CorrelationError::MissingArtifact { stage, .. } => assert_eq!(stage, "BSRGAN"),
            other => panic!("expected MissingArtifact, got {other:?}"),
        }
    }

    #[test]
    fn test_reference_artifact_without_token() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 1);
        // The reference stage's own files carry a foreign token.
        fabricate_stage_outputs(&mut ctx, "SwinIR", "BSRGAN");
        fabricate_stage_outputs(&mut ctx, "BSRGAN", "BSRGAN");

        let stages = vec![spec("SwinIR"), spec("BSRGAN")];
        let err = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap_err();
        assert!(matches!(err, CorrelationError::SuffixMismatch { .. }));
    }

    #[test]
    fn test_unrun_stage_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut ctx = staged_context(&dir, 1);
        fabricate_stage_outputs(&mut ctx, "SwinIR", "SwinIR");

        let stages = vec![spec("SwinIR"), spec("BSRGAN")];
        let err = CorrelationIndex::build(&ctx, "SwinIR", &stages).unwrap_err();
        match err {
            CorrelationError::StageNotRun { stage } => assert_eq!(stage, "BSRGAN"),
            other => panic!("expected StageNotRun, got {other:?}"),
        }
    }
}
