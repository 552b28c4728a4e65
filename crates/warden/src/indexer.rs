//! Indexer: orchestrates full and incremental sweeps (SPEC_FULL.md §4.6).
//!
//! Parsing happens on a bounded worker pool; the live [`IndexBundle`] is
//! mutated only by the coordinator thread that drains the workers' result
//! channel, matching the single-writer model in §5 ("Shared mutation").

use crate::indexes::IndexBundle;
use anatomist::parser::TreeSitterCppBackend;
use anatomist::scanner;
use common::cache::{FileCache, GlobalCache, ProgressSummary};
use common::config::SourceLayoutConfig;
use common::types::SymbolRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// One worker's outcome for a single file.
struct ParsedFile {
    path: String,
    hash: String,
    records: Vec<SymbolRecord>,
    from_cache: bool,
    failed: bool,
}

/// Owns the project's live indexes and the two cache tiers.
pub struct Indexer {
    project_root: PathBuf,
    cache_root: PathBuf,
    config: SourceLayoutConfig,
    file_cache: FileCache,
    bundle: RwLock<IndexBundle>,
    /// Normalized path → content hash, mirrored into `GlobalCache.file_hashes`
    /// on every save so the persisted artifact reflects what's actually indexed.
    file_hashes: RwLock<HashMap<String, String>>,
    cancel: Arc<AtomicBool>,
}

/// Outcome of `index_project`/`refresh`.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub elapsed_seconds: f64,
}

fn worker_count() -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (2 * parallelism).min(16).max(1)
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Indexer {
    pub fn new(project_root: PathBuf, cache_root: PathBuf, config: SourceLayoutConfig) -> Self {
        Indexer {
            project_root,
            file_cache: FileCache::new(&cache_root),
            cache_root,
            config,
            bundle: RwLock::new(IndexBundle::new()),
            file_hashes: RwLock::new(HashMap::new()),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn bundle(&self) -> &RwLock<IndexBundle> {
        &self.bundle
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &SourceLayoutConfig {
        &self.config
    }

    /// Sets the cancel flag; checked between files during a sweep. In-flight
    /// parses are not interrupted.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Full sweep. If `force` is false and a matching [`GlobalCache`] loads,
    /// adopts it without touching disk further and returns immediately.
    pub fn index_project(&self, force: bool, on_progress: impl Fn(usize, usize) + Send + Sync) -> IndexReport {
        if !force {
            if let Some(global) = GlobalCache::load_matching(&self.cache_root, &self.config) {
                self.adopt_global_cache(&global);
                return IndexReport {
                    total: global.indexed_file_count,
                    indexed: global.indexed_file_count,
                    failed: 0,
                    cache_hits: global.indexed_file_count,
                    elapsed_seconds: 0.0,
                };
            }
        }

        let started = Instant::now();
        let files = scanner::scan(&self.project_root, &self.config);
        let report = self.parse_all(&files, &on_progress);

        let mut global = GlobalCache::new(&self.config, now_unix());
        {
            let bundle = self.bundle.read().expect("index lock poisoned");
            global.class_index = bundle.by_name_class.clone();
            global.function_index = bundle.by_name_function.clone();
            global.indexed_file_count = bundle.by_file.len();
        }
        global.file_hashes = self.file_hashes.read().expect("hash lock poisoned").clone();
        if !self.cancel.load(Ordering::SeqCst) {
            let _ = global.save(&self.cache_root);
        }

        let summary = ProgressSummary {
            total: report.total,
            indexed: report.indexed,
            failed: report.failed,
            cache_hits: report.cache_hits,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        };
        let _ = summary.save(&self.cache_root);

        IndexReport {
            elapsed_seconds: started.elapsed().as_secs_f64(),
            ..report
        }
    }

    fn adopt_global_cache(&self, global: &GlobalCache) {
        *self.file_hashes.write().expect("hash lock poisoned") = global.file_hashes.clone();
        let mut bundle = self.bundle.write().expect("index lock poisoned");
        for records in global.class_index.values().chain(global.function_index.values()) {
            for record in records {
                if !record.usr.is_empty() {
                    bundle.by_usr.insert(record.usr.clone(), record.clone());
                }
                bundle
                    .by_file
                    .entry(record.file.clone())
                    .or_default()
                    .push(record.clone());
            }
        }
        bundle.by_name_class = global.class_index.clone();
        bundle.by_name_function = global.function_index.clone();
        for records in bundle.by_file.values() {
            for record in records {
                if !record.usr.is_empty() {
                    for callee in &record.calls {
                        bundle.call_graph.add_edge(&record.usr, callee);
                    }
                }
            }
        }
    }

    /// Re-enumerates the project; reparses changed/new files, evicts
    /// records for files that disappeared. Returns the number of files
    /// that changed in any way.
    pub fn refresh(&self) -> usize {
        let files = scanner::scan(&self.project_root, &self.config);
        let mut current: std::collections::HashSet<String> = std::collections::HashSet::new();
        for file in &files {
            current.insert(common::paths::normalize_path(file));
        }

        let mut changed = 0usize;
        let previously_tracked = {
            let bundle = self.bundle.read().expect("index lock poisoned");
            bundle.tracked_files()
        };
        for tracked in previously_tracked {
            if !current.contains(&tracked) {
                let mut bundle = self.bundle.write().expect("index lock poisoned");
                bundle.remove_file(&tracked);
                self.file_cache.evict(&tracked);
                self.file_hashes.write().expect("hash lock poisoned").remove(&tracked);
                changed += 1;
            }
        }

        for file in &files {
            if self.index_file(file, false) {
                changed += 1;
            }
        }

        if changed > 0 {
            let mut global = GlobalCache::new(&self.config, now_unix());
            let bundle = self.bundle.read().expect("index lock poisoned");
            global.class_index = bundle.by_name_class.clone();
            global.function_index = bundle.by_name_function.clone();
            global.indexed_file_count = bundle.by_file.len();
            global.file_hashes = self.file_hashes.read().expect("hash lock poisoned").clone();
            let _ = global.save(&self.cache_root);
        }
        changed
    }

    /// Parses one file and merges it into the bundle, replacing whatever
    /// was previously indexed for it. Returns `true` iff the file's content
    /// hash differed from what was cached (or `force` was set).
    pub fn index_file(&self, path: &Path, force: bool) -> bool {
        let normalized = common::paths::normalize_path(path);
        if scanner::exceeds_size_limit(path) {
            tracing::warn!(file = %normalized, "skipping file exceeding size limit");
            return false;
        }
        let hash = forge::hash_file(path);
        if !force {
            if let Some(records) = self.file_cache.load(&normalized, &hash) {
                let mut bundle = self.bundle.write().expect("index lock poisoned");
                bundle.insert_file(&normalized, records);
                self.file_hashes
                    .write()
                    .expect("hash lock poisoned")
                    .insert(normalized, hash);
                return false;
            }
        }

        let Ok(bytes) = std::fs::read(path) else {
            return false;
        };
        let is_project = scanner::is_project_file(path, &self.project_root, &self.config);
        let backend = TreeSitterCppBackend;
        let outcome = anatomist::parser::parse_file(&backend, path, &bytes, is_project);
        if !outcome.success {
            return false;
        }
        let _ = self.file_cache.store(&normalized, &hash, &outcome.records, now_unix());
        let mut bundle = self.bundle.write().expect("index lock poisoned");
        bundle.insert_file(&normalized, outcome.records);
        self.file_hashes
            .write()
            .expect("hash lock poisoned")
            .insert(normalized, hash);
        true
    }

    fn parse_all(&self, files: &[PathBuf], on_progress: &(impl Fn(usize, usize) + Send + Sync)) -> IndexReport {
        let total = files.len();
        let (tx, rx) = mpsc::channel::<ParsedFile>();
        let next = AtomicUsize::new(0);
        let workers = worker_count().min(total.max(1));

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                let cancel = &self.cancel;
                scope.spawn(move || loop {
                    if cancel.load(Ordering::SeqCst) {
                        break;
                    }
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    let Some(path) = files.get(idx) else {
                        break;
                    };
                    let parsed = self.parse_one(path);
                    if tx.send(parsed).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            let mut report = IndexReport {
                total,
                ..Default::default()
            };
            let mut processed = 0usize;
            for parsed in rx {
                processed += 1;
                if parsed.failed {
                    report.failed += 1;
                } else {
                    report.indexed += 1;
                    if parsed.from_cache {
                        report.cache_hits += 1;
                    }
                    let mut bundle = self.bundle.write().expect("index lock poisoned");
                    bundle.insert_file(&parsed.path, parsed.records);
                    self.file_hashes
                        .write()
                        .expect("hash lock poisoned")
                        .insert(parsed.path, parsed.hash);
                }
                on_progress(processed, total);
            }
            report
        })
    }

    fn parse_one(&self, path: &Path) -> ParsedFile {
        let normalized = common::paths::normalize_path(path);
        if scanner::exceeds_size_limit(path) {
            return ParsedFile {
                path: normalized,
                hash: String::new(),
                records: vec![],
                from_cache: false,
                failed: true,
            };
        }
        let hash = forge::hash_file(path);
        if let Some(records) = self.file_cache.load(&normalized, &hash) {
            return ParsedFile {
                path: normalized,
                hash,
                records,
                from_cache: true,
                failed: false,
            };
        }

        let Ok(bytes) = std::fs::read(path) else {
            return ParsedFile {
                path: normalized,
                hash,
                records: vec![],
                from_cache: false,
                failed: true,
            };
        };
        let is_project = scanner::is_project_file(path, &self.project_root, &self.config);
        let backend = TreeSitterCppBackend;
        let outcome = anatomist::parser::parse_file(&backend, path, &bytes, is_project);
        if !outcome.success {
            return ParsedFile {
                path: normalized,
                hash,
                records: vec![],
                from_cache: false,
                failed: true,
            };
        }
        let _ = self.file_cache.store(&normalized, &hash, &outcome.records, now_unix());
        ParsedFile {
            path: normalized,
            hash,
            records: outcome.records,
            from_cache: false,
            failed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(root: &Path) -> Indexer {
        Indexer::new(root.to_path_buf(), root.join(".cache"), SourceLayoutConfig::default())
    }

    #[test]
    fn index_project_finds_classes_and_functions() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.cpp"), "class A {}; void f() {}").unwrap();
        let indexer = setup(tmp.path());
        let report = indexer.index_project(true, |_, _| {});
        assert_eq!(report.total, 1);
        assert_eq!(report.indexed, 1);
        let bundle = indexer.bundle().read().unwrap();
        assert!(bundle.by_name_class.contains_key("A"));
        assert!(bundle.by_name_function.contains_key("f"));
    }

    #[test]
    fn refresh_removes_records_for_deleted_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.cpp");
        fs::write(&file, "class A {};").unwrap();
        let indexer = setup(tmp.path());
        indexer.index_project(true, |_, _| {});
        fs::remove_file(&file).unwrap();
        let changed = indexer.refresh();
        assert_eq!(changed, 1);
        let bundle = indexer.bundle().read().unwrap();
        assert!(!bundle.by_name_class.contains_key("A"));
    }

    #[test]
    fn index_project_populates_global_cache_file_hashes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.cpp"), "class A {};").unwrap();
        let indexer = setup(tmp.path());
        indexer.index_project(true, |_, _| {});

        let global = common::cache::GlobalCache::load_matching(&tmp.path().join(".cache"), &SourceLayoutConfig::default())
            .expect("global cache should be on disk");
        assert_eq!(global.file_hashes.len(), 1);
        let normalized = common::paths::normalize_path(&tmp.path().join("a.cpp"));
        assert!(global.file_hashes.contains_key(&normalized));
    }

    #[test]
    fn refresh_reparses_modified_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.cpp");
        fs::write(&file, "class A {};").unwrap();
        let indexer = setup(tmp.path());
        indexer.index_project(true, |_, _| {});
        fs::write(&file, "class B {};").unwrap();
        let changed = indexer.refresh();
        assert_eq!(changed, 1);
        let bundle = indexer.bundle().read().unwrap();
        assert!(!bundle.by_name_class.contains_key("A"));
        assert!(bundle.by_name_class.contains_key("B"));
    }
}
