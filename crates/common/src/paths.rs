//! Path normalization and cache-root derivation.
//!
//! Mirrors the teacher's `dunce`-based normalization: forward slashes, no
//! `\\?\` prefixes, so a cache built on one platform stays readable on
//! another within the same project.

use std::path::{Path, PathBuf};

/// Normalizes `path` to a canonical, forward-slash string.
///
/// Falls back to a lossy string of the original path if canonicalization
/// fails (e.g. the path does not exist yet).
pub fn normalize_path(path: &Path) -> String {
    let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    canonical.to_string_lossy().replace('\\', "/")
}

/// First 8 hex characters of the blake3 digest of `project_root`'s
/// normalized path — the suffix used in the cache directory name
/// (`<project_name>_<hash(project_root)[:8]>`).
pub fn short_hash(input: &str) -> String {
    let digest = blake3::hash(input.as_bytes());
    digest.to_hex()[..8].to_string()
}

/// Derives the cache root for a project: `<installation>/.mcp_cache/<name>_<hash>/`.
pub fn cache_root(installation: &Path, project_root: &Path) -> PathBuf {
    let normalized = normalize_path(project_root);
    let project_name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project");
    let dir_name = format!("{}_{}", project_name, short_hash(&normalized));
    installation.join(".mcp_cache").join(dir_name)
}

/// Filename used for a per-file cache entry: `<hash(path)>.json`.
pub fn file_cache_name(path: &str) -> String {
    format!("{}.json", short_hash(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hash_is_deterministic() {
        assert_eq!(short_hash("/a/b/c"), short_hash("/a/b/c"));
    }

    #[test]
    fn short_hash_differs_for_different_inputs() {
        assert_ne!(short_hash("/a/b/c"), short_hash("/a/b/d"));
    }

    #[test]
    fn cache_root_embeds_project_name_and_hash_suffix() {
        let root = cache_root(Path::new("/srv"), Path::new("/home/user/my_project"));
        let dir = root.file_name().unwrap().to_str().unwrap();
        assert!(dir.starts_with("my_project_"));
        assert_eq!(dir.len(), "my_project_".len() + 8);
    }

    #[test]
    fn file_cache_name_is_stable_for_same_path() {
        assert_eq!(file_cache_name("/a/b.cpp"), file_cache_name("/a/b.cpp"));
    }
}
