//! Canonical record types shared by every stage of the index: the parser
//! produces [`SymbolRecord`]s, the indexer owns them, the cache persists
//! them, and the search/hierarchy engines read them back out.

use serde::{Deserialize, Serialize};

/// Discriminates the four declaration shapes this index understands.
///
/// A tagged sum rather than a single record with nullable fields: `class`
/// and `struct` carry `base_classes`, `function` and `method` carry
/// `parent_class`/`signature`/`calls`/`called_by`. Every record still uses
/// one flat struct ([`SymbolRecord`]) for the payload, but call sites switch
/// on `kind` rather than checking which optional fields happen to be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Struct,
    Function,
    Method,
}

impl SymbolKind {
    /// `true` for `Class`/`Struct` — the kinds that carry `base_classes`.
    pub fn is_type(self) -> bool {
        matches!(self, SymbolKind::Class | SymbolKind::Struct)
    }

    /// `true` for `Function`/`Method` — the kinds that carry call edges.
    pub fn is_callable(self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
        }
    }
}

/// One declared entity: a class, struct, function, or method.
///
/// `(usr, file, line)` uniquely identifies a record within a single file's
/// record set. `usr` may be empty for anonymous constructs (e.g. an unnamed
/// struct); such records are reachable only through `by_name_*`/`by_file`,
/// never through `by_usr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Textual type of the declarator as the front-end reported it. Empty
    /// for `class`/`struct`.
    #[serde(default)]
    pub signature: String,
    /// Enclosing class name for a `method`; empty otherwise.
    #[serde(default)]
    pub parent_class: String,
    /// Qualified base type names, leading `class `/`struct ` stripped.
    #[serde(default)]
    pub base_classes: Vec<String>,
    /// Stable identifier; see the crate-level note on USR synthesis in
    /// `anatomist::parser`. Empty for anonymous constructs.
    #[serde(default)]
    pub usr: String,
    pub is_project: bool,
    /// USRs this function/method invokes. Empty for class/struct kinds.
    #[serde(default)]
    pub calls: Vec<String>,
    /// USRs that invoke this function/method; maintained by the call graph,
    /// not by the parser.
    #[serde(default)]
    pub called_by: Vec<String>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl SymbolRecord {
    /// `Class::method(sig)` for methods, `name(sig)` otherwise — the format
    /// `get_function_signature` reports.
    pub fn qualified_signature(&self) -> String {
        if self.parent_class.is_empty() {
            format!("{}({})", self.name, self.signature)
        } else {
            format!("{}::{}({})", self.parent_class, self.name, self.signature)
        }
    }

    /// `true` when this record carries no USR and is therefore reachable
    /// only via the by-name/by-file indexes, never `by_usr`.
    pub fn is_anonymous(&self) -> bool {
        self.usr.is_empty()
    }
}

/// Per-file persisted artifact: a content hash, the records extracted from
/// that file, and when the parse happened.
///
/// Created or replaced whenever the file is (re)parsed; removed outright
/// when the file disappears from a scanner sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub content_hash: String,
    pub records: Vec<SymbolRecord>,
    pub parsed_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(parent_class: &str) -> SymbolRecord {
        SymbolRecord {
            name: "run".into(),
            kind: SymbolKind::Method,
            file: "a.cpp".into(),
            line: 10,
            column: 1,
            signature: "int, int".into(),
            parent_class: parent_class.into(),
            base_classes: vec![],
            usr: "u1".into(),
            is_project: true,
            calls: vec![],
            called_by: vec![],
            access: None,
            namespace: None,
        }
    }

    #[test]
    fn qualified_signature_includes_class_when_present() {
        assert_eq!(sample("Worker").qualified_signature(), "Worker::run(int, int)");
    }

    #[test]
    fn qualified_signature_omits_class_when_absent() {
        assert_eq!(sample("").qualified_signature(), "run(int, int)");
    }

    #[test]
    fn anonymous_detection_follows_empty_usr() {
        let mut r = sample("Worker");
        assert!(!r.is_anonymous());
        r.usr.clear();
        assert!(r.is_anonymous());
    }

    #[test]
    fn symbol_kind_json_round_trip() {
        let json = serde_json::to_string(&SymbolKind::Method).unwrap();
        assert_eq!(json, "\"method\"");
        let back: SymbolKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SymbolKind::Method);
    }
}
