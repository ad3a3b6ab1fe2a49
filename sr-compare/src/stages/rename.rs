//! Post-relocation filename rewriting.

use crate::config::RenameRuleConfig;
use crate::errors::ConfigError;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Rewrites tool-chosen filename suffixes inside a directory.
///
/// Needed when two stages share one underlying tool and would otherwise
/// produce identically-suffixed files: the large SwinIR variant writes
/// `*_SwinIR.png` just like the base model. A file is only touched when
/// its name ends with `from` and not already with `to`, so applying a
/// rule a second time changes nothing.
#[derive(Debug, Clone)]
pub struct RenameRule {
    /// Compiled filename filter.
    pattern: Regex,
    /// The glob the filter was compiled from.
    pattern_text: String,
    /// The filename tail to replace.
    from: String,
    /// The replacement tail.
    to: String,
}

impl RenameRule {
    /// Compiles a rename rule from a filename glob and a suffix swap.
    ///
    /// The glob supports `*` wildcards only; every other character is
    /// matched literally.
    pub fn new(
        pattern: &str,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let regex = compile_glob(pattern)?;
        Ok(Self {
            pattern: regex,
            pattern_text: pattern.to_string(),
            from: from.into(),
            to: to.into(),
        })
    }

    /// Builds a rule from its serde form.
    pub fn from_config(config: &RenameRuleConfig) -> Result<Self, ConfigError> {
        Self::new(&config.pattern, &config.from, &config.to)
    }

    /// Returns the glob pattern this rule was built from.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern_text
    }

    /// Returns true when a filename would be rewritten.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
            && file_name.ends_with(&self.from)
            && !file_name.ends_with(&self.to)
    }

    /// Produces the rewritten filename, or `None` when the rule does not
    /// apply.
    #[must_use]
    pub fn rewrite(&self, file_name: &str) -> Option<String> {
        if !self.matches(file_name) {
            return None;
        }
        let stem_len = file_name.len() - self.from.len();
        Some(format!("{}{}", &file_name[..stem_len], self.to))
    }

    /// Applies the rule to every matching file in a directory.
    ///
    /// Returns how many files were renamed.
    pub fn apply(&self, dir: &Path) -> io::Result<usize> {
        let mut renamed = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if let Some(new_name) = self.rewrite(&name) {
                fs::rename(&path, dir.join(&new_name))?;
                debug!(from = %name, to = %new_name, "renamed artifact");
                renamed += 1;
            }
        }
        Ok(renamed)
    }
}

fn compile_glob(pattern: &str) -> Result<Regex, ConfigError> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    let body = escaped.join(".*");
    Regex::new(&format!("^{body}$"))
        .map_err(|e| ConfigError::invalid(format!("invalid rename pattern '{pattern}': {e}")))
}
