//! QueryFacade: the public operation surface.
//!
//! Validates arguments, dispatches to the Indexer/SearchEngine/HierarchyEngine,
//! and returns a concrete typed result per operation (`Vec<SymbolRecord>`,
//! `HierarchyReport`, `ServerStatus`, ...) rather than an untyped value —
//! each result type derives `Serialize` so a caller can shape it onto the
//! wire however it likes. Every failure is a [`CoreError`]; [`ErrorEnvelope`]
//! gives callers the `{code, message}` shape at the boundary.

use crate::hierarchy::{self, HierarchyNode};
use crate::indexer::Indexer;
use crate::search;
use common::config::SourceLayoutConfig;
use common::types::{SymbolKind, SymbolRecord};
use common::CoreError;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::RwLock;

pub type FacadeResult<T> = Result<T, CoreError>;

/// Owns at most one active project's [`Indexer`]. Every operation other
/// than `set_project_directory` requires one to be set, surfacing
/// [`CoreError::Uninitialized`] otherwise.
pub struct QueryFacade {
    installation_root: PathBuf,
    indexer: RwLock<Option<Indexer>>,
}

/// `{code, message}` — the structured error shape SPEC_FULL.md §7 mandates
/// for anything crossing the transport boundary.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
}

impl From<&CoreError> for ErrorEnvelope {
    fn from(err: &CoreError) -> Self {
        ErrorEnvelope {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl QueryFacade {
    pub fn new(installation_root: PathBuf) -> Self {
        QueryFacade {
            installation_root,
            indexer: RwLock::new(None),
        }
    }

    fn with_indexer<T>(&self, f: impl FnOnce(&Indexer) -> FacadeResult<T>) -> FacadeResult<T> {
        let guard = self.indexer.read().expect("facade lock poisoned");
        match guard.as_ref() {
            Some(indexer) => f(indexer),
            None => Err(CoreError::Uninitialized),
        }
    }

    /// `set_project_directory(path)`. Builds a fresh Indexer rooted at
    /// `path`, loads `project_config.json` if present, and runs a full
    /// index sweep (adopting a matching GlobalCache when one exists).
    pub fn set_project_directory(&self, path: &str) -> FacadeResult<usize> {
        let project_root = PathBuf::from(path);
        if !project_root.is_dir() {
            return Err(CoreError::InvalidArgument(format!("not a directory: {path}")));
        }
        let config = SourceLayoutConfig::load_or_default(&project_root.join("project_config.json"));
        let cache_root = common::paths::cache_root(&self.installation_root, &project_root);
        let indexer = Indexer::new(project_root, cache_root, config);
        let report = indexer.index_project(false, |_, _| {});
        *self.indexer.write().expect("facade lock poisoned") = Some(indexer);
        Ok(report.indexed)
    }

    pub fn search_classes(&self, pattern: &str, project_only: bool) -> FacadeResult<Vec<SymbolRecord>> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            Ok(search::search_classes(&bundle, pattern, project_only))
        })
    }

    pub fn search_functions(
        &self,
        pattern: &str,
        project_only: bool,
        class_name: Option<&str>,
    ) -> FacadeResult<Vec<SymbolRecord>> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            Ok(search::search_functions(&bundle, pattern, project_only, class_name))
        })
    }

    pub fn search_symbols(
        &self,
        pattern: &str,
        project_only: bool,
        kinds: Option<&[SymbolKind]>,
    ) -> FacadeResult<search::SymbolSearchResult> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            Ok(search::search_symbols(&bundle, pattern, project_only, kinds))
        })
    }

    pub fn get_class_info(&self, class_name: &str) -> FacadeResult<search::ClassInfo> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            search::get_class_info(&bundle, class_name)
                .ok_or_else(|| CoreError::NotFound(format!("class {class_name}")))
        })
    }

    pub fn get_function_signature(&self, function_name: &str, class_name: Option<&str>) -> FacadeResult<Vec<String>> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            Ok(search::get_function_signature(&bundle, function_name, class_name))
        })
    }

    pub fn find_in_file(&self, file_path: &str, pattern: &str) -> FacadeResult<Vec<SymbolRecord>> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            let re = regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| CoreError::InvalidArgument(e.to_string()))?;
            let normalized = common::paths::normalize_path(std::path::Path::new(file_path));
            Ok(bundle
                .by_file
                .get(&normalized)
                .into_iter()
                .flatten()
                .filter(|r| re.is_match(&r.name))
                .cloned()
                .collect())
        })
    }

    pub fn get_derived_classes(&self, class_name: &str, project_only: bool) -> FacadeResult<Vec<SymbolRecord>> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            Ok(hierarchy::derived_classes(&bundle, class_name, project_only))
        })
    }

    pub fn get_class_hierarchy(&self, class_name: &str) -> FacadeResult<HierarchyReport> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            let info = hierarchy::hierarchy(&bundle, class_name)
                .ok_or_else(|| CoreError::NotFound(format!("class {class_name}")))?;
            Ok(HierarchyReport {
                class_info: info.record,
                base_classes: info.direct_bases,
                derived_classes: info.direct_derived,
                base_hierarchy: info.ancestors,
                derived_hierarchy: info.descendants,
            })
        })
    }

    pub fn find_callers(&self, function_name: &str, class_name: Option<&str>) -> FacadeResult<Vec<SymbolRecord>> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            let usr = resolve_function_usr(&bundle, function_name, class_name)
                .ok_or_else(|| CoreError::NotFound(format!("function {function_name}")))?;
            Ok(bundle
                .call_graph
                .callers(&usr)
                .into_iter()
                .filter_map(|caller| bundle.by_usr.get(&caller).cloned())
                .collect())
        })
    }

    pub fn find_callees(&self, function_name: &str, class_name: Option<&str>) -> FacadeResult<Vec<SymbolRecord>> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            let usr = resolve_function_usr(&bundle, function_name, class_name)
                .ok_or_else(|| CoreError::NotFound(format!("function {function_name}")))?;
            Ok(bundle
                .call_graph
                .callees(&usr)
                .into_iter()
                .filter_map(|callee| bundle.by_usr.get(&callee).cloned())
                .collect())
        })
    }

    pub fn get_call_path(&self, from_function: &str, to_function: &str, max_depth: usize) -> FacadeResult<Vec<Vec<String>>> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            let from = resolve_function_usr(&bundle, from_function, None)
                .ok_or_else(|| CoreError::NotFound(format!("function {from_function}")))?;
            let to = resolve_function_usr(&bundle, to_function, None)
                .ok_or_else(|| CoreError::NotFound(format!("function {to_function}")))?;
            let usr_paths = bundle.call_graph.paths(&from, &to, max_depth);
            Ok(usr_paths
                .into_iter()
                .map(|path| {
                    path.into_iter()
                        .map(|usr| bundle.by_usr.get(&usr).map(|r| r.name.clone()).unwrap_or(usr))
                        .collect()
                })
                .collect())
        })
    }

    pub fn refresh_project(&self) -> FacadeResult<usize> {
        self.with_indexer(|indexer| Ok(indexer.refresh()))
    }

    pub fn get_server_status(&self) -> FacadeResult<ServerStatus> {
        self.with_indexer(|indexer| {
            let bundle = indexer.bundle().read().expect("index lock poisoned");
            let classes = bundle.by_name_class.values().map(Vec::len).sum();
            let functions = bundle.by_name_function.values().map(Vec::len).sum();
            Ok(ServerStatus {
                parsed_files: bundle.by_file.len(),
                classes,
                functions,
                symbols: bundle.by_usr.len(),
                call_graph_edges: bundle
                    .by_usr
                    .keys()
                    .map(|usr| bundle.call_graph.callees(usr).len())
                    .sum(),
                project_files: bundle.by_file.values().flatten().filter(|r| r.is_project).count(),
            })
        })
    }
}

fn resolve_function_usr(bundle: &crate::indexes::IndexBundle, name: &str, class_name: Option<&str>) -> Option<String> {
    bundle
        .by_name_function
        .get(name)?
        .iter()
        .find(|r| class_name.map(|c| r.parent_class == c).unwrap_or(true))
        .map(|r| r.usr.clone())
}

#[derive(Debug, Serialize)]
pub struct HierarchyReport {
    pub class_info: SymbolRecord,
    pub base_classes: Vec<String>,
    pub derived_classes: Vec<String>,
    pub base_hierarchy: Vec<HierarchyNode>,
    pub derived_hierarchy: Vec<HierarchyNode>,
}

#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub parsed_files: usize,
    pub classes: usize,
    pub functions: usize,
    pub symbols: usize,
    pub call_graph_edges: usize,
    pub project_files: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn operations_before_set_project_directory_are_uninitialized() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = QueryFacade::new(tmp.path().to_path_buf());
        let err = facade.search_classes("A", false).unwrap_err();
        assert_eq!(err.code(), "Uninitialized");
    }

    #[test]
    fn set_project_directory_rejects_non_directory_path() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = QueryFacade::new(tmp.path().to_path_buf());
        let err = facade.set_project_directory(&tmp.path().join("missing").display().to_string()).unwrap_err();
        assert_eq!(err.code(), "InvalidArgument");
    }

    #[test]
    fn full_round_trip_search_and_status() {
        let installation = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        fs::write(project.path().join("a.cpp"), "class A {}; void f() {}").unwrap();

        let facade = QueryFacade::new(installation.path().to_path_buf());
        let indexed = facade.set_project_directory(&project.path().display().to_string()).unwrap();
        assert_eq!(indexed, 1);

        let classes = facade.search_classes("^A$", false).unwrap();
        assert_eq!(classes.len(), 1);

        let status = facade.get_server_status().unwrap();
        assert_eq!(status.parsed_files, 1);
        assert_eq!(status.classes, 1);
        assert_eq!(status.functions, 1);
    }

    #[test]
    fn find_callers_and_callees_resolve_by_name() {
        let installation = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        fs::write(project.path().join("a.cpp"), "void g(){} void f(){ g(); }").unwrap();

        let facade = QueryFacade::new(installation.path().to_path_buf());
        facade.set_project_directory(&project.path().display().to_string()).unwrap();

        let callees = facade.find_callees("f", None).unwrap();
        assert_eq!(callees.len(), 1);
        assert_eq!(callees[0].name, "g");

        let callers = facade.find_callers("g", None).unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].name, "f");
    }

    #[test]
    fn get_call_path_maps_usrs_back_to_names() {
        let installation = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        fs::write(project.path().join("a.cpp"), "void g(){} void f(){ g(); }").unwrap();

        let facade = QueryFacade::new(installation.path().to_path_buf());
        facade.set_project_directory(&project.path().display().to_string()).unwrap();

        let paths = facade.get_call_path("f", "g", 10).unwrap();
        assert_eq!(paths, vec![vec!["f".to_string(), "g".to_string()]]);
    }
}
