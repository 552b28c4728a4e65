//! In-memory derived indexes (SPEC_FULL.md §3 "Indexes") plus the call
//! graph, bundled together so the Indexer can merge a file's records into
//! all of them atomically.

use common::types::{SymbolKind, SymbolRecord};
use oracle::CallGraph;
use std::collections::HashMap;

/// `by_name_class`, `by_name_function`, `by_file`, `by_usr`, and the
/// [`CallGraph`] — everything the Indexer mutates and the search/hierarchy
/// engines read.
#[derive(Default)]
pub struct IndexBundle {
    pub by_name_class: HashMap<String, Vec<SymbolRecord>>,
    pub by_name_function: HashMap<String, Vec<SymbolRecord>>,
    pub by_file: HashMap<String, Vec<SymbolRecord>>,
    pub by_usr: HashMap<String, SymbolRecord>,
    pub call_graph: CallGraph,
}

impl IndexBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every record previously indexed under `file`, pruning empty
    /// by-name entries and dropping each removed USR from `by_usr` and the
    /// call graph. Idempotent: a file with no prior records is a no-op.
    pub fn remove_file(&mut self, file: &str) {
        let Some(previous) = self.by_file.remove(file) else {
            return;
        };
        for record in &previous {
            remove_from_name_index(&mut self.by_name_class, &mut self.by_name_function, record);
            if !record.usr.is_empty() {
                self.by_usr.remove(&record.usr);
                self.call_graph.remove_symbol(&record.usr);
            }
        }
    }

    /// Inserts `records` (all belonging to `file`) into every index,
    /// replacing whatever was previously indexed for that file. Matches the
    /// four-step merge rule in SPEC_FULL.md §4.6.
    pub fn insert_file(&mut self, file: &str, records: Vec<SymbolRecord>) {
        self.remove_file(file);
        for record in &records {
            insert_into_name_index(&mut self.by_name_class, &mut self.by_name_function, record);
            if !record.usr.is_empty() {
                self.by_usr.insert(record.usr.clone(), record.clone());
            }
        }
        for record in &records {
            if !record.usr.is_empty() {
                for callee in &record.calls {
                    self.call_graph.add_edge(&record.usr, callee);
                }
            }
        }
        self.by_file.insert(file.to_string(), records);
    }

    pub fn tracked_files(&self) -> Vec<String> {
        self.by_file.keys().cloned().collect()
    }
}

fn insert_into_name_index(
    by_name_class: &mut HashMap<String, Vec<SymbolRecord>>,
    by_name_function: &mut HashMap<String, Vec<SymbolRecord>>,
    record: &SymbolRecord,
) {
    let index = if record.kind.is_type() {
        by_name_class
    } else {
        by_name_function
    };
    index.entry(record.name.clone()).or_default().push(record.clone());
}

fn remove_from_name_index(
    by_name_class: &mut HashMap<String, Vec<SymbolRecord>>,
    by_name_function: &mut HashMap<String, Vec<SymbolRecord>>,
    record: &SymbolRecord,
) {
    let index = if record.kind.is_type() {
        by_name_class
    } else {
        by_name_function
    };
    if let Some(entries) = index.get_mut(&record.name) {
        entries.retain(|r| !(r.file == record.file && r.line == record.line && r.usr == record.usr));
        if entries.is_empty() {
            index.remove(&record.name);
        }
    }
}

/// `true` for kinds the caller wants, given an optional restriction set.
pub fn kind_allowed(kind: SymbolKind, allowed: Option<&[SymbolKind]>) -> bool {
    allowed.map(|kinds| kinds.contains(&kind)).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::SymbolKind;

    fn class_record(file: &str, name: &str, usr: &str) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            kind: SymbolKind::Class,
            file: file.to_string(),
            line: 1,
            column: 1,
            signature: String::new(),
            parent_class: String::new(),
            base_classes: vec![],
            usr: usr.to_string(),
            is_project: true,
            calls: vec![],
            called_by: vec![],
            access: None,
            namespace: None,
        }
    }

    fn function_record(file: &str, name: &str, usr: &str, calls: Vec<String>) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            kind: SymbolKind::Function,
            file: file.to_string(),
            line: 2,
            column: 1,
            signature: String::new(),
            parent_class: String::new(),
            base_classes: vec![],
            usr: usr.to_string(),
            is_project: true,
            calls,
            called_by: vec![],
            access: None,
            namespace: None,
        }
    }

    #[test]
    fn insert_populates_all_indexes() {
        let mut bundle = IndexBundle::new();
        bundle.insert_file("a.cpp", vec![class_record("a.cpp", "A", "u-a")]);
        assert!(bundle.by_name_class.contains_key("A"));
        assert!(bundle.by_usr.contains_key("u-a"));
        assert_eq!(bundle.by_file["a.cpp"].len(), 1);
    }

    #[test]
    fn insert_wires_call_graph_edges() {
        let mut bundle = IndexBundle::new();
        bundle.insert_file(
            "a.cpp",
            vec![
                function_record("a.cpp", "f", "u-f", vec!["u-g".to_string()]),
                function_record("a.cpp", "g", "u-g", vec![]),
            ],
        );
        assert!(bundle.call_graph.callees("u-f").contains("u-g"));
    }

    #[test]
    fn reinsert_replaces_prior_records_for_file() {
        let mut bundle = IndexBundle::new();
        bundle.insert_file("a.cpp", vec![class_record("a.cpp", "A", "u-a")]);
        bundle.insert_file("a.cpp", vec![class_record("a.cpp", "B", "u-b")]);
        assert!(!bundle.by_name_class.contains_key("A"));
        assert!(!bundle.by_usr.contains_key("u-a"));
        assert!(bundle.by_name_class.contains_key("B"));
    }

    #[test]
    fn remove_file_prunes_empty_name_entries() {
        let mut bundle = IndexBundle::new();
        bundle.insert_file("a.cpp", vec![class_record("a.cpp", "A", "u-a")]);
        bundle.remove_file("a.cpp");
        assert!(!bundle.by_name_class.contains_key("A"));
        assert!(!bundle.by_file.contains_key("a.cpp"));
    }

    #[test]
    fn remove_file_prunes_call_graph_edges() {
        let mut bundle = IndexBundle::new();
        bundle.insert_file(
            "a.cpp",
            vec![
                function_record("a.cpp", "f", "u-f", vec!["u-g".to_string()]),
                function_record("a.cpp", "g", "u-g", vec![]),
            ],
        );
        bundle.remove_file("a.cpp");
        assert!(bundle.call_graph.callees("u-f").is_empty());
    }
}
