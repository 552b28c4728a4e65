//! SearchEngine: regex and exact-match lookups over the live indexes
//! (SPEC_FULL.md §4.8).

use crate::indexes::{kind_allowed, IndexBundle};
use common::types::{SymbolKind, SymbolRecord};
use regex::RegexBuilder;
use serde::Serialize;

/// Result of `search_symbols`: classes and functions/methods matched
/// separately, since callers generally want to render them under distinct
/// headings.
#[derive(Debug, Default, Serialize)]
pub struct SymbolSearchResult {
    pub classes: Vec<SymbolRecord>,
    pub functions: Vec<SymbolRecord>,
}

/// `get_class_info`'s result: the class declaration plus its methods.
#[derive(Debug, Serialize)]
pub struct ClassInfo {
    pub class: SymbolRecord,
    pub methods: Vec<SymbolRecord>,
}

/// Case-insensitive regex over a by-name index's *keys*. An invalid pattern
/// is a recoverable condition — callers get an empty result plus a
/// diagnostic, never a panic or propagated error (§4.8 "Failure mode").
fn compiled(pattern: &str) -> Option<regex::Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(pattern = %pattern, error = %err, "invalid search pattern");
            None
        }
    }
}

pub fn search_classes(bundle: &IndexBundle, pattern: &str, project_only: bool) -> Vec<SymbolRecord> {
    let Some(re) = compiled(pattern) else {
        return Vec::new();
    };
    bundle
        .by_name_class
        .iter()
        .filter(|(name, _)| re.is_match(name))
        .flat_map(|(_, records)| records.iter().cloned())
        .filter(|r| !project_only || r.is_project)
        .collect()
}

pub fn search_functions(
    bundle: &IndexBundle,
    pattern: &str,
    project_only: bool,
    class_name: Option<&str>,
) -> Vec<SymbolRecord> {
    let Some(re) = compiled(pattern) else {
        return Vec::new();
    };
    bundle
        .by_name_function
        .iter()
        .filter(|(name, _)| re.is_match(name))
        .flat_map(|(_, records)| records.iter().cloned())
        .filter(|r| !project_only || r.is_project)
        .filter(|r| class_name.map(|c| r.parent_class == c).unwrap_or(true))
        .collect()
}

pub fn search_symbols(
    bundle: &IndexBundle,
    pattern: &str,
    project_only: bool,
    kinds: Option<&[SymbolKind]>,
) -> SymbolSearchResult {
    let classes = if kind_allowed(SymbolKind::Class, kinds) || kind_allowed(SymbolKind::Struct, kinds) {
        search_classes(bundle, pattern, project_only)
            .into_iter()
            .filter(|r| kind_allowed(r.kind, kinds))
            .collect()
    } else {
        Vec::new()
    };
    let functions = if kind_allowed(SymbolKind::Function, kinds) || kind_allowed(SymbolKind::Method, kinds) {
        search_functions(bundle, pattern, project_only, None)
            .into_iter()
            .filter(|r| kind_allowed(r.kind, kinds))
            .collect()
    } else {
        Vec::new()
    };
    SymbolSearchResult { classes, functions }
}

pub fn get_class_info(bundle: &IndexBundle, name: &str) -> Option<ClassInfo> {
    let class = bundle.by_name_class.get(name)?.first()?.clone();
    let mut methods: Vec<SymbolRecord> = bundle
        .by_name_function
        .values()
        .flatten()
        .filter(|r| r.parent_class == name)
        .cloned()
        .collect();
    methods.sort_by_key(|r| r.line);
    Some(ClassInfo { class, methods })
}

pub fn get_function_signature(bundle: &IndexBundle, name: &str, class_name: Option<&str>) -> Vec<String> {
    bundle
        .by_name_function
        .get(name)
        .into_iter()
        .flatten()
        .filter(|r| class_name.map(|c| r.parent_class == c).unwrap_or(true))
        .map(|r| r.qualified_signature())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::SymbolKind;

    fn record(name: &str, kind: SymbolKind, parent_class: &str, is_project: bool) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            kind,
            file: "a.cpp".to_string(),
            line: 1,
            column: 1,
            signature: "int".to_string(),
            parent_class: parent_class.to_string(),
            base_classes: vec![],
            usr: format!("u-{name}"),
            is_project,
            calls: vec![],
            called_by: vec![],
            access: None,
            namespace: None,
        }
    }

    fn bundle() -> IndexBundle {
        let mut bundle = IndexBundle::new();
        bundle.insert_file(
            "a.cpp",
            vec![
                record("Worker", SymbolKind::Class, "", true),
                record("run", SymbolKind::Method, "Worker", true),
                record("helper", SymbolKind::Function, "", false),
            ],
        );
        bundle
    }

    #[test]
    fn search_classes_matches_case_insensitively() {
        let bundle = bundle();
        let found = search_classes(&bundle, "^worker$", false);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn search_functions_filters_by_class_name() {
        let bundle = bundle();
        let found = search_functions(&bundle, "run", false, Some("Worker"));
        assert_eq!(found.len(), 1);
        let none = search_functions(&bundle, "run", false, Some("Other"));
        assert!(none.is_empty());
    }

    #[test]
    fn project_only_excludes_dependency_records() {
        let bundle = bundle();
        let found = search_functions(&bundle, "helper", true, None);
        assert!(found.is_empty());
        let all = search_functions(&bundle, "helper", false, None);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn invalid_pattern_yields_empty_result_not_panic() {
        let bundle = bundle();
        let found = search_classes(&bundle, "(unterminated", false);
        assert!(found.is_empty());
    }

    #[test]
    fn get_class_info_sorts_methods_by_line() {
        let bundle = bundle();
        let info = get_class_info(&bundle, "Worker").unwrap();
        assert_eq!(info.methods.len(), 1);
        assert_eq!(info.methods[0].name, "run");
    }

    #[test]
    fn get_function_signature_formats_with_parent_class() {
        let bundle = bundle();
        let sigs = get_function_signature(&bundle, "run", Some("Worker"));
        assert_eq!(sigs, vec!["Worker::run(int)".to_string()]);
    }
}
