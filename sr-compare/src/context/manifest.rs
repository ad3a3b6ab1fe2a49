//! Correlation keys and the staging manifest.

use crate::errors::StagingError;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// A short random key assigned to each input image at staging time.
///
/// The key is prepended to the staged filename (`<key>_<original-name>`)
/// and survives every tool's suffix decoration, so outputs can be matched
/// back to their input without guessing at tool naming schemes. Keys are
/// fixed-width lowercase hex, which keeps a directory's lexicographic
/// order grouped by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Width of a key in characters.
    pub const LEN: usize = 8;

    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(Self::LEN);
        Self(hex)
    }

    /// Extracts the key from a staged or derived filename.
    ///
    /// Returns `None` when the name does not start with a key prefix,
    /// which is how unkeyed stray files in an output directory are
    /// detected.
    #[must_use]
    pub fn parse(file_name: &str) -> Option<Self> {
        let bytes = file_name.as_bytes();
        if bytes.len() < Self::LEN + 1 || bytes[Self::LEN] != b'_' {
            return None;
        }
        if !bytes[..Self::LEN]
            .iter()
            .all(|&b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        Some(Self(file_name[..Self::LEN].to_string()))
    }

    /// Builds the staged filename for an original input name.
    #[must_use]
    pub fn apply_to(&self, original_name: &str) -> String {
        format!("{}_{}", self.0, original_name)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One staged input image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInput {
    /// The correlation key assigned at staging.
    pub key: CorrelationKey,
    /// The filename the image arrived with.
    pub original_name: String,
    /// Where the keyed copy lives in the shared input directory.
    pub staged_path: PathBuf,
}

/// The staging record for a run: which keys exist and what they map to.
///
/// Entries are kept sorted by staged path, matching the order tools see
/// when they scan the input directory.
#[derive(Debug, Clone, Default)]
pub struct StagingManifest {
    entries: Vec<StagedInput>,
    by_key: HashMap<CorrelationKey, usize>,
}

impl StagingManifest {
    /// Builds a manifest from staged entries.
    ///
    /// Entries must carry distinct keys; a collision would let two inputs
    /// resolve to one manifest slot and misalign every comparison built
    /// from it, so it is refused here rather than detected downstream.
    pub fn new(mut entries: Vec<StagedInput>) -> Result<Self, StagingError> {
        entries.sort_by(|a, b| a.staged_path.cmp(&b.staged_path));
        let mut by_key = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            if by_key.insert(entry.key.clone(), idx).is_some() {
                return Err(StagingError::duplicate_key(entry.key.as_str()));
            }
        }
        Ok(Self { entries, by_key })
    }

    /// Returns the number of staged inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the staged entries in staged-path order.
    #[must_use]
    pub fn entries(&self) -> &[StagedInput] {
        &self.entries
    }

    /// Looks up the entry for a key.
    #[must_use]
    pub fn get(&self, key: &CorrelationKey) -> Option<&StagedInput> {
        self.by_key.get(key).map(|&idx| &self.entries[idx])
    }

    /// Iterates over keys in staged-path order.
    pub fn keys(&self) -> impl Iterator<Item = &CorrelationKey> {
        self.entries.iter().map(|entry| &entry.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_produces_fixed_width_hex() {
        for _ in 0..32 {
            let key = CorrelationKey::generate();
            assert_eq!(key.as_str().len(), CorrelationKey::LEN);
            assert!(key
                .as_str()
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        }
    }

    #[test]
    fn test_parse_round_trips_staged_names() {
        let key = CorrelationKey::generate();
        let staged = key.apply_to("chip.png");
        assert_eq!(CorrelationKey::parse(&staged), Some(key));
    }

    #[test]
    fn test_parse_survives_suffix_decoration() {
        let key = CorrelationKey::generate();
        // What a tool output looks like after decorating the stem.
        let derived = format!("{}_chip_SwinIR.png", key);
        assert_eq!(CorrelationKey::parse(&derived), Some(key));
    }

    #[test]
    fn test_parse_rejects_unkeyed_names() {
        assert_eq!(CorrelationKey::parse("chip.png"), None);
        assert_eq!(CorrelationKey::parse("1234567_x.png"), None);
        assert_eq!(CorrelationKey::parse("12345678x.png"), None);
        assert_eq!(CorrelationKey::parse("ABCDEF12_x.png"), None);
        assert_eq!(CorrelationKey::parse(""), None);
    }

    #[test]
    fn test_keys_are_unique_across_generations() {
        let a = CorrelationKey::generate();
        let b = CorrelationKey::generate();
        assert_ne!(a, b);
    }

    fn entry(key_source: &str, name: &str) -> StagedInput {
        let key = CorrelationKey::parse(&format!("{}_x", key_source)).unwrap();
        StagedInput {
            key: key.clone(),
            original_name: name.to_string(),
            staged_path: PathBuf::from("in").join(key.apply_to(name)),
        }
    }

    #[test]
    fn test_manifest_sorts_by_staged_path() {
        let manifest = StagingManifest::new(vec![
            entry("ffffffff", "z.png"),
            entry("00000000", "a.png"),
            entry("aaaaaaaa", "m.png"),
        ])
        .unwrap();

        let names: Vec<_> = manifest
            .entries()
            .iter()
            .map(|e| e.original_name.as_str())
            .collect();
        assert_eq!(names, vec!["a.png", "m.png", "z.png"]);
    }

    #[test]
    fn test_manifest_lookup() {
        let staged = entry("abcd1234", "photo.png");
        let key = staged.key.clone();
        let manifest = StagingManifest::new(vec![staged]).unwrap();

        assert_eq!(manifest.len(), 1);
        assert!(!manifest.is_empty());
        assert_eq!(manifest.get(&key).unwrap().original_name, "photo.png");
        assert!(manifest.get(&CorrelationKey::generate()).is_none());
    }

    #[test]
    fn test_manifest_keys_follow_entry_order() {
        let manifest = StagingManifest::new(vec![
            entry("bbbbbbbb", "b.png"),
            entry("aaaaaaaa", "a.png"),
        ])
        .unwrap();

        let keys: Vec<_> = manifest.keys().map(CorrelationKey::as_str).collect();
        assert_eq!(keys, vec!["aaaaaaaa", "bbbbbbbb"]);
    }

    #[test]
    fn test_manifest_rejects_colliding_keys() {
        let err = StagingManifest::new(vec![
            entry("abcd1234", "cat.png"),
            entry("abcd1234", "dog.png"),
        ])
        .unwrap_err();

        assert!(matches!(err, StagingError::DuplicateKey { .. }));
        assert!(err.to_string().contains("abcd1234"));
    }
}
