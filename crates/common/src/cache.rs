//! Persisted cache artifacts: per-file ([`FileCache`]) and aggregate
//! ([`GlobalCache`]).
//!
//! Both are UTF-8 JSON on disk (SPEC_FULL.md §6 makes this part of the
//! external contract), written atomically via a temp-file-then-rename, the
//! same durability pattern the teacher's `SymbolRegistry::save` uses for its
//! rkyv artifact.

use crate::config::SourceLayoutConfig;
use crate::error::CoreError;
use crate::paths::file_cache_name;
use crate::types::SymbolRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

fn write_atomically(path: &Path, contents: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

// ---------------------------------------------------------------------
// FileCache
// ---------------------------------------------------------------------

/// On-disk shape of one `files/<hash(path)>.json` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileCacheEntry {
    file_path: String,
    file_hash: String,
    timestamp: u64,
    symbols: Vec<SymbolRecord>,
}

/// Per-file persistent artifact store, rooted at `<cache_root>/files/`.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(cache_root: &Path) -> Self {
        FileCache {
            dir: cache_root.join("files"),
        }
    }

    fn entry_path(&self, file_path: &str) -> PathBuf {
        self.dir.join(file_cache_name(file_path))
    }

    /// Returns the stored records iff an entry exists for `file_path` and its
    /// stored hash equals `expected_hash`. A corrupt entry is treated as
    /// absent (logged, not propagated) so the caller reparses.
    pub fn load(&self, file_path: &str, expected_hash: &str) -> Option<Vec<SymbolRecord>> {
        let path = self.entry_path(file_path);
        let text = fs::read_to_string(&path).ok()?;
        let entry: FileCacheEntry = match serde_json::from_str(&text) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "discarding corrupt file cache entry");
                return None;
            }
        };
        if entry.file_hash == expected_hash {
            Some(entry.symbols)
        } else {
            None
        }
    }

    pub fn store(
        &self,
        file_path: &str,
        hash: &str,
        records: &[SymbolRecord],
        timestamp: u64,
    ) -> Result<(), CoreError> {
        let entry = FileCacheEntry {
            file_path: file_path.to_string(),
            file_hash: hash.to_string(),
            timestamp,
            symbols: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&entry)?;
        write_atomically(&self.entry_path(file_path), &json)
    }

    pub fn evict(&self, file_path: &str) {
        let _ = fs::remove_file(self.entry_path(file_path));
    }
}

// ---------------------------------------------------------------------
// GlobalCache
// ---------------------------------------------------------------------

const GLOBAL_CACHE_VERSION: &str = "2.0";

/// On-disk shape of `cache_info.json`.
///
/// `config_fingerprint` is a supplement to the literal field list in
/// SPEC_FULL.md §6: `include_dependencies` alone cannot detect a change to
/// `exclude_dirs`/`dependency_dirs`/`exclude_patterns`, and §4.5 requires
/// the *whole* scanner-config fingerprint to gate acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalCache {
    pub version: String,
    pub include_dependencies: bool,
    pub class_index: HashMap<String, Vec<SymbolRecord>>,
    pub function_index: HashMap<String, Vec<SymbolRecord>>,
    pub file_hashes: HashMap<String, String>,
    pub indexed_file_count: usize,
    pub timestamp: u64,
    #[serde(default)]
    pub config_fingerprint: String,
}

impl GlobalCache {
    pub fn new(config: &SourceLayoutConfig, timestamp: u64) -> Self {
        GlobalCache {
            version: GLOBAL_CACHE_VERSION.to_string(),
            include_dependencies: config.include_dependencies,
            class_index: HashMap::new(),
            function_index: HashMap::new(),
            file_hashes: HashMap::new(),
            indexed_file_count: 0,
            timestamp,
            config_fingerprint: config_fingerprint(config),
        }
    }

    fn path(cache_root: &Path) -> PathBuf {
        cache_root.join("cache_info.json")
    }

    pub fn save(&self, cache_root: &Path) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomically(&Self::path(cache_root), &json)
    }

    /// Loads the artifact iff it exists, decodes, has the expected version,
    /// and its `config_fingerprint` matches `config`. Any mismatch or
    /// decode failure returns `None` (logged), never an error — a stale or
    /// corrupt global cache is rebuilt, not fatal.
    pub fn load_matching(cache_root: &Path, config: &SourceLayoutConfig) -> Option<Self> {
        let path = Self::path(cache_root);
        let text = fs::read_to_string(&path).ok()?;
        let cache: GlobalCache = match serde_json::from_str(&text) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "rejecting corrupt global cache");
                return None;
            }
        };
        if cache.version != GLOBAL_CACHE_VERSION {
            tracing::info!(found = %cache.version, expected = GLOBAL_CACHE_VERSION, "global cache version mismatch");
            return None;
        }
        if cache.config_fingerprint != config_fingerprint(config) {
            tracing::info!("global cache config fingerprint mismatch, rebuilding");
            return None;
        }
        Some(cache)
    }
}

fn config_fingerprint(config: &SourceLayoutConfig) -> String {
    let mut exclude_dirs: Vec<&String> = config.exclude_dirs.iter().collect();
    exclude_dirs.sort();
    let mut dependency_dirs: Vec<&String> = config.dependency_dirs.iter().collect();
    dependency_dirs.sort();
    let canonical = format!(
        "{:?}|{:?}|{:?}|{}",
        exclude_dirs, dependency_dirs, config.exclude_patterns, config.include_dependencies
    );
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// The most recent `indexing_progress.json` summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub elapsed_seconds: f64,
}

impl ProgressSummary {
    pub fn save(&self, cache_root: &Path) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomically(&cache_root.join("indexing_progress.json"), &json)
    }
}
