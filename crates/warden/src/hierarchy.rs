//! HierarchyEngine: ancestor/descendant trees over class base-class edges
//! (SPEC_FULL.md §4.9).

use crate::indexes::IndexBundle;
use common::types::SymbolRecord;
use serde::Serialize;
use std::collections::HashSet;

/// A node in an ancestor or descendant tree. `circular_reference` is set
/// instead of recursing when a name has already been visited on this path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    pub name: String,
    pub circular_reference: bool,
    pub children: Vec<HierarchyNode>,
}

/// Full result of `hierarchy(name)`.
#[derive(Debug)]
pub struct HierarchyInfo {
    pub record: SymbolRecord,
    pub direct_bases: Vec<String>,
    pub direct_derived: Vec<String>,
    pub ancestors: Vec<HierarchyNode>,
    pub descendants: Vec<HierarchyNode>,
}

/// Classes whose `base_classes` contains `base_name`, compared as a plain
/// string — the front-end's base name may or may not carry a namespace
/// prefix, and this match does not attempt to resolve that; documented
/// alongside the parser's USR-collision limitation.
pub fn derived_classes(bundle: &IndexBundle, base_name: &str, project_only: bool) -> Vec<SymbolRecord> {
    bundle
        .by_name_class
        .values()
        .flatten()
        .filter(|r| r.base_classes.iter().any(|b| b == base_name))
        .filter(|r| !project_only || r.is_project)
        .cloned()
        .collect()
}

pub fn hierarchy(bundle: &IndexBundle, name: &str) -> Option<HierarchyInfo> {
    let records = bundle.by_name_class.get(name)?;
    let record = records.first()?.clone();
    let direct_bases: Vec<String> = {
        let mut bases: Vec<String> = records.iter().flat_map(|r| r.base_classes.clone()).collect();
        bases.sort();
        bases.dedup();
        bases
    };
    let direct_derived: Vec<String> = derived_classes(bundle, name, false)
        .into_iter()
        .map(|r| r.name)
        .collect();

    let mut visited = HashSet::new();
    visited.insert(name.to_string());
    let ancestors = direct_bases
        .iter()
        .map(|base| build_ancestor_tree(bundle, base, &mut visited.clone()))
        .collect();

    let mut visited = HashSet::new();
    visited.insert(name.to_string());
    let descendants = direct_derived
        .iter()
        .map(|derived| build_descendant_tree(bundle, derived, &mut visited.clone()))
        .collect();

    Some(HierarchyInfo {
        record,
        direct_bases,
        direct_derived,
        ancestors,
        descendants,
    })
}

fn build_ancestor_tree(bundle: &IndexBundle, name: &str, visited: &mut HashSet<String>) -> HierarchyNode {
    if visited.contains(name) {
        return HierarchyNode {
            name: name.to_string(),
            circular_reference: true,
            children: vec![],
        };
    }
    visited.insert(name.to_string());

    let bases: Vec<String> = bundle
        .by_name_class
        .get(name)
        .into_iter()
        .flatten()
        .flat_map(|r| r.base_classes.clone())
        .collect();
    let children = bases
        .iter()
        .map(|base| build_ancestor_tree(bundle, base, &mut visited.clone()))
        .collect();

    HierarchyNode {
        name: name.to_string(),
        circular_reference: false,
        children,
    }
}

fn build_descendant_tree(bundle: &IndexBundle, name: &str, visited: &mut HashSet<String>) -> HierarchyNode {
    if visited.contains(name) {
        return HierarchyNode {
            name: name.to_string(),
            circular_reference: true,
            children: vec![],
        };
    }
    visited.insert(name.to_string());

    let derived: Vec<String> = derived_classes(bundle, name, false).into_iter().map(|r| r.name).collect();
    let children = derived
        .iter()
        .map(|next| build_descendant_tree(bundle, next, &mut visited.clone()))
        .collect();

    HierarchyNode {
        name: name.to_string(),
        circular_reference: false,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::SymbolKind;

    fn class(name: &str, bases: Vec<&str>) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            kind: SymbolKind::Class,
            file: "a.cpp".to_string(),
            line: 1,
            column: 1,
            signature: String::new(),
            parent_class: String::new(),
            base_classes: bases.into_iter().map(str::to_string).collect(),
            usr: format!("u-{name}"),
            is_project: true,
            calls: vec![],
            called_by: vec![],
            access: None,
            namespace: None,
        }
    }

    fn linear_bundle() -> IndexBundle {
        let mut bundle = IndexBundle::new();
        bundle.insert_file(
            "a.cpp",
            vec![class("Base", vec![]), class("Mid", vec!["Base"]), class("Leaf", vec!["Mid"])],
        );
        bundle
    }

    #[test]
    fn derived_classes_finds_direct_subclass() {
        let bundle = linear_bundle();
        let found = derived_classes(&bundle, "Base", false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Mid");
    }

    #[test]
    fn hierarchy_reports_direct_bases_and_derived() {
        let bundle = linear_bundle();
        let info = hierarchy(&bundle, "Mid").unwrap();
        assert_eq!(info.direct_bases, vec!["Base".to_string()]);
        assert_eq!(info.direct_derived, vec!["Leaf".to_string()]);
    }

    #[test]
    fn hierarchy_ancestor_tree_recurses() {
        let bundle = linear_bundle();
        let info = hierarchy(&bundle, "Leaf").unwrap();
        assert_eq!(info.ancestors.len(), 1);
        assert_eq!(info.ancestors[0].name, "Mid");
        assert_eq!(info.ancestors[0].children[0].name, "Base");
    }

    #[test]
    fn hierarchy_marks_circular_reference_without_infinite_recursion() {
        let mut bundle = IndexBundle::new();
        bundle.insert_file("a.cpp", vec![class("A", vec!["B"]), class("B", vec!["A"])]);
        let info = hierarchy(&bundle, "A").unwrap();
        let b_node = &info.ancestors[0];
        assert_eq!(b_node.name, "B");
        let a_again = &b_node.children[0];
        assert_eq!(a_again.name, "A");
        assert!(a_again.circular_reference);
        assert!(a_again.children.is_empty());
    }

    #[test]
    fn hierarchy_returns_none_for_unknown_class() {
        let bundle = linear_bundle();
        assert!(hierarchy(&bundle, "Nope").is_none());
    }
}
