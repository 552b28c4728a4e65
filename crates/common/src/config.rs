//! External configuration document and its in-memory form.
//!
//! Follows the split the teacher uses for its wisdom-rule documents: an
//! externally authored JSON file is deserialized into a wrapper type with
//! `serde`, then converted into the struct the rest of the crate actually
//! consumes. A missing file is not an error — defaults apply.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// On-disk shape of the configuration document (`project_config.json`).
///
/// Field names are part of the external contract (SPEC_FULL.md §6); do not
/// rename without a migration story.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub exclude_directories: Vec<String>,
    pub dependency_directories: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub include_dependencies: bool,
    pub max_file_size_mb: u64,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        ConfigDocument {
            exclude_directories: default_exclude_directories(),
            dependency_directories: default_dependency_directories(),
            exclude_patterns: vec!["*.generated.*".to_string()],
            include_dependencies: false,
            max_file_size_mb: 10,
        }
    }
}

fn default_exclude_directories() -> Vec<String> {
    [".git", "build", "cmake-build-debug", "cmake-build-release", ".vscode", ".idea"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_dependency_directories() -> Vec<String> {
    ["third_party", "vendor", "node_modules", "external", "_deps"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The layout configuration actually consulted by the scanner and indexer.
///
/// This is the "scanner-config fingerprint" embedded in [`crate::cache`]'s
/// GlobalCache artifact: a mismatch against a freshly loaded `ConfigDocument`
/// invalidates the stored cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLayoutConfig {
    pub exclude_dirs: HashSet<String>,
    pub dependency_dirs: HashSet<String>,
    pub exclude_patterns: Vec<String>,
    pub include_dependencies: bool,
    pub max_file_size_mb: u64,
}

impl From<ConfigDocument> for SourceLayoutConfig {
    fn from(doc: ConfigDocument) -> Self {
        SourceLayoutConfig {
            exclude_dirs: doc.exclude_directories.into_iter().collect(),
            dependency_dirs: doc.dependency_directories.into_iter().collect(),
            exclude_patterns: doc.exclude_patterns,
            include_dependencies: doc.include_dependencies,
            max_file_size_mb: doc.max_file_size_mb,
        }
    }
}

impl Default for SourceLayoutConfig {
    fn default() -> Self {
        ConfigDocument::default().into()
    }
}

impl SourceLayoutConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Loads `path` if it exists and parses as JSON; falls back to defaults
    /// on any I/O or parse error, logging the reason (SPEC_FULL.md §6: a
    /// malformed config document is never fatal to the facade).
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "using default configuration");
                Self::default()
            }
        }
    }

    /// Strict variant: returns an error instead of silently substituting
    /// defaults. Used by callers that want to surface a `Config` error.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let doc: ConfigDocument = serde_json::from_str(&text)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        Ok(doc.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_yields_defaults() {
        let config = SourceLayoutConfig::load_or_default(Path::new("/no/such/file.json"));
        assert_eq!(config, SourceLayoutConfig::default());
    }

    #[test]
    fn loads_and_overrides_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"exclude_directories": ["build"], "dependency_directories": ["vendor"], "include_dependencies": true, "max_file_size_mb": 5}}"#
        )
        .unwrap();
        let config = SourceLayoutConfig::load(file.path()).unwrap();
        assert!(config.exclude_dirs.contains("build"));
        assert!(config.dependency_dirs.contains("vendor"));
        assert!(config.include_dependencies);
        assert_eq!(config.max_file_size_bytes(), 5 * 1024 * 1024);
    }

    #[test]
    fn malformed_json_falls_back_to_defaults_without_panicking() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let config = SourceLayoutConfig::load_or_default(file.path());
        assert_eq!(config, SourceLayoutConfig::default());
    }
}
