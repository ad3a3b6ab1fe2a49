//! The artifact store: on-disk layout for inputs and stage outputs.
//!
//! A store owns two locations. The *input directory* is where user images
//! are copied (with a correlation key prefix) so every external tool reads
//! the same set of files. The *results root* collects one canonical
//! directory per stage, named after the stage, plus the composed
//! comparison images.

use crate::context::{CorrelationKey, StagedInput, StagingManifest};
use crate::errors::{RelocationError, StagingError};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory layout for a pipeline run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// The results root.
    root: PathBuf,
    /// The shared input directory tools read from.
    input_dir: PathBuf,
}

impl ArtifactStore {
    /// Opens a store, creating the input directory and results root if
    /// they do not exist yet.
    pub fn open(
        input_dir: impl Into<PathBuf>,
        results_root: impl Into<PathBuf>,
    ) -> Result<Self, StagingError> {
        let input_dir = input_dir.into();
        let root = results_root.into();

        fs::create_dir_all(&input_dir).map_err(|e| StagingError::prepare(&input_dir, e))?;
        fs::create_dir_all(&root).map_err(|e| StagingError::prepare(&root, e))?;
        debug!(
            input_dir = %input_dir.display(),
            results_root = %root.display(),
            "artifact store opened"
        );

        Ok(Self { root, input_dir })
    }

    /// Returns the results root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the shared input directory.
    #[must_use]
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Returns the canonical output directory for a stage.
    ///
    /// The directory is not created here; it appears when the stage's
    /// output is relocated (or written directly) into the store.
    #[must_use]
    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.root.join(stage)
    }

    /// Copies user images into the input directory, assigning each a
    /// fresh correlation key.
    ///
    /// The staged filename is `<key>_<original-name>`, so any suffix a
    /// tool later appends still leaves the key parseable at the front.
    /// A generated key that collides with an earlier one in the same run
    /// is discarded and regenerated.
    pub fn stage_inputs(&self, sources: &[PathBuf]) -> Result<StagingManifest, StagingError> {
        let mut entries = Vec::with_capacity(sources.len());
        let mut used_keys = HashSet::with_capacity(sources.len());

        for source in sources {
            if !source.is_file() {
                return Err(StagingError::source_missing(source));
            }
            let original_name = match source.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => return Err(StagingError::source_missing(source)),
            };

            let mut key = CorrelationKey::generate();
            while !used_keys.insert(key.clone()) {
                key = CorrelationKey::generate();
            }
            let staged_path = self.input_dir.join(key.apply_to(&original_name));
            fs::copy(source, &staged_path)
                .map_err(|e| StagingError::copy(source, &staged_path, e))?;
            debug!(key = %key, staged = %staged_path.display(), "staged input image");

            entries.push(StagedInput {
                key,
                original_name,
                staged_path,
            });
        }

        info!(
            count = entries.len(),
            dir = %self.input_dir.display(),
            "inputs staged"
        );
        StagingManifest::new(entries)
    }

    /// Moves a tool's output directory to the stage's canonical location.
    ///
    /// The move either fully happens or fully fails: the source is checked
    /// first, an existing destination is refused rather than merged, and
    /// the move itself is a single rename.
    pub fn relocate(&self, stage: &str, from: &Path) -> Result<PathBuf, RelocationError> {
        let to = self.stage_dir(stage);

        if !from.is_dir() {
            return Err(RelocationError::source_missing(stage, from));
        }
        if to.exists() {
            return Err(RelocationError::destination_exists(stage, to));
        }

        fs::rename(from, &to).map_err(|e| RelocationError::move_failed(stage, from, &to, e))?;
        info!(
            stage = %stage,
            from = %from.display(),
            to = %to.display(),
            "relocated stage output"
        );
        Ok(to)
    }

    /// Lists the regular files in a directory in lexicographic order.
    ///
    /// Subdirectories and dotfiles are skipped.
    pub fn list_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    continue;
                }
            }
            files.push(path);
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ArtifactStore {
        ArtifactStore::open(dir.path().join("input"), dir.path().join("results")).unwrap()
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.input_dir().is_dir());
        assert!(store.root().is_dir());
        assert_eq!(store.stage_dir("SwinIR"), dir.path().join("results/SwinIR"));
    }

    #[test]
    fn test_stage_inputs_assigns_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&b, b"second").unwrap();

        let manifest = store.stage_inputs(&[a, b]).unwrap();
        assert_eq!(manifest.len(), 2);

        for entry in manifest.entries() {
            assert!(entry.staged_path.is_file());
            let name = entry.staged_path.file_name().unwrap().to_str().unwrap();
            assert_eq!(CorrelationKey::parse(name), Some(entry.key.clone()));
            assert!(name.ends_with(&entry.original_name));
        }

        let originals: Vec<_> = manifest
            .entries()
            .iter()
            .map(|e| e.original_name.as_str())
            .collect();
        assert!(originals.contains(&"a.png"));
        assert!(originals.contains(&"b.png"));
    }

    #[test]
    fn test_stage_missing_source() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let err = store
            .stage_inputs(&[dir.path().join("nope.png")])
            .unwrap_err();
        assert!(matches!(err, StagingError::SourceMissing { .. }));
    }

    #[test]
    fn test_relocate_moves_directory() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let scratch = dir.path().join("scratch_out");
        std::fs::create_dir(&scratch).unwrap();
        std::fs::write(scratch.join("img.png"), b"pixels").unwrap();

        let canonical = store.relocate("BSRGAN", &scratch).unwrap();
        assert_eq!(canonical, store.stage_dir("BSRGAN"));
        assert!(canonical.join("img.png").is_file());
        assert!(!scratch.exists());
    }

    #[test]
    fn test_relocate_missing_source() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let err = store
            .relocate("BSRGAN", &dir.path().join("never_written"))
            .unwrap_err();
        assert!(matches!(err, RelocationError::SourceMissing { .. }));
    }

    #[test]
    fn test_relocate_refuses_existing_destination() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let scratch = dir.path().join("scratch_out");
        std::fs::create_dir(&scratch).unwrap();
        std::fs::create_dir(store.stage_dir("BSRGAN")).unwrap();

        let err = store.relocate("BSRGAN", &scratch).unwrap_err();
        assert!(matches!(err, RelocationError::DestinationExists { .. }));
        // The refused move leaves the source untouched.
        assert!(scratch.is_dir());
    }

    #[test]
    fn test_list_sorted_skips_dirs_and_dotfiles() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.png"), b"b").unwrap();
        std::fs::write(dir.path().join("a.png"), b"a").unwrap();
        std::fs::write(dir.path().join(".hidden"), b"h").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let files = ArtifactStore::list_sorted(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }
}
