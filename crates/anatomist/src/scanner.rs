//! FileScanner: enumerates candidate C++ source files under a project root,
//! applying the exclusion and dependency-directory rules from
//! [`common::config::SourceLayoutConfig`].

use common::config::SourceLayoutConfig;
use common::paths::normalize_path;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c++", "h", "hpp", "hxx", "h++"];

/// Resource cap from SPEC_FULL.md §5: files above this size are skipped
/// rather than parsed, to bound worst-case memory use on a single
/// pathological input.
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// `true` if `path`'s on-disk size exceeds [`MAX_FILE_SIZE_BYTES`]. A file
/// whose metadata can't be read is treated as not exceeding the limit —
/// the subsequent read attempt will surface the real error.
pub fn exceeds_size_limit(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.len() > MAX_FILE_SIZE_BYTES)
        .unwrap_or(false)
}

/// Enumerates source files under `project_root` per SPEC_FULL.md §4.1.
///
/// A directory is pruned when its name matches `config.exclude_dirs` *and*
/// it is a direct child of `project_root` — deeper matches (e.g. a nested
/// `build/` inside a subproject) are left alone, since the source tree may
/// legitimately contain a directory with that name further down. Symlinks
/// are not followed, which rules out symlink-cycle traversal by
/// construction.
pub fn scan(project_root: &Path, config: &SourceLayoutConfig) -> Vec<PathBuf> {
    let mut results = Vec::new();

    let walker = WalkDir::new(project_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_pruned(entry, project_root, config));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_source_extension(path) {
            continue;
        }
        if !config.include_dependencies && path_contains_dependency_segment(path, config) {
            continue;
        }
        results.push(path.to_path_buf());
    }

    results
}

fn is_pruned(entry: &DirEntry, project_root: &Path, config: &SourceLayoutConfig) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let is_direct_child = entry
        .path()
        .parent()
        .map(|parent| parent == project_root)
        .unwrap_or(false);
    if !is_direct_child {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| config.exclude_dirs.contains(name))
        .unwrap_or(false)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn path_contains_dependency_segment(path: &Path, config: &SourceLayoutConfig) -> bool {
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(|segment| config.dependency_dirs.contains(segment))
            .unwrap_or(false)
    })
}

/// `true` iff `path` lies under `project_root` and contains no
/// `dependency_dirs` segment. The client uses this to restrict searches to
/// code the user wrote, independent of whether the scan itself was run
/// with `include_dependencies = true`.
pub fn is_project_file(path: &Path, project_root: &Path, config: &SourceLayoutConfig) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_root = normalize_path(project_root);
    if !normalized_path.starts_with(&normalized_root) {
        return false;
    }
    !path_contains_dependency_segment(path, config)
}
