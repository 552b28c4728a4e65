//! The Parser: drives the C++ front-end over one file and emits
//! [`SymbolRecord`]s and call edges (SPEC_FULL.md §4.3).
//!
//! The concrete front-end is `tree-sitter` with the C++ grammar — the Open
//! Question resolution recorded in SPEC_FULL.md §9 and `DESIGN.md`. USRs are
//! synthesized (qualified name, hashed) rather than taken from a libclang
//! binding; see [`synthesize_usr`].

use common::types::{SymbolKind, SymbolRecord};
use std::path::Path;
use std::sync::OnceLock;
use tree_sitter::{Node, Parser as TsParser, Query, QueryCursor, StreamingIterator, Tree};

/// Capability the Indexer depends on: given a path, return either a
/// walkable translation unit or a failure diagnostic. A trait rather than a
/// concrete type so tests can substitute a fixed AST without touching disk,
/// and so a future semantic front-end (libclang, clangd) could stand in
/// without changing any caller.
pub trait ParserBackend {
    fn parse(&self, path: &Path, source: &[u8]) -> Option<ParsedUnit>;
}

/// An owned tree-sitter parse tree plus the source bytes it was built from.
/// `Node`s borrow from both, so they travel together.
pub struct ParsedUnit {
    tree: Tree,
    source: Vec<u8>,
}

impl ParsedUnit {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }
}

/// The tree-sitter-cpp front-end.
#[derive(Default)]
pub struct TreeSitterCppBackend;

impl ParserBackend for TreeSitterCppBackend {
    fn parse(&self, _path: &Path, source: &[u8]) -> Option<ParsedUnit> {
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .expect("tree-sitter-cpp grammar is ABI-compatible with this tree-sitter version");
        let tree = parser.parse(source, None)?;
        Some(ParsedUnit {
            tree,
            source: source.to_vec(),
        })
    }
}

static CALL_QUERY: OnceLock<Query> = OnceLock::new();

/// Matches call expressions so the second walk pass can attribute each one
/// to its enclosing function by byte-range containment, the same technique
/// the teacher used for its reference-graph call sites.
fn call_query() -> &'static Query {
    CALL_QUERY.get_or_init(|| {
        Query::new(
            &tree_sitter_cpp::LANGUAGE.into(),
            r#"
            (call_expression
              function: (_) @call.callee) @call.expr
            "#,
        )
        .expect("call query is a hardcoded literal")
    })
}

/// Result of parsing one file.
pub struct ParseOutcome {
    /// `false` only when the front-end returned no translation unit at all
    /// (SPEC_FULL.md §4.3) — missing headers and empty files still count as
    /// success with an empty or partial record set.
    pub success: bool,
    pub records: Vec<SymbolRecord>,
}

/// Parses `source` (the bytes of `path`) and emits the complete record set
/// for declarations whose primary location lies in this file.
pub fn parse_file(
    backend: &dyn ParserBackend,
    path: &Path,
    source: &[u8],
    is_project: bool,
) -> ParseOutcome {
    let file = path.to_string_lossy().to_string();

    let unit = match backend.parse(path, source) {
        Some(u) => u,
        None => {
            tracing::warn!(file = %file, "front-end returned no translation unit");
            return ParseOutcome {
                success: false,
                records: vec![],
            };
        }
    };

    let mut records = Vec::new();
    collect_declarations(unit.root(), unit.source(), &file, is_project, None, &mut records);

    attribute_calls(&unit, &file, &mut records);

    ParseOutcome {
        success: true,
        records,
    }
}

// ---------------------------------------------------------------------
// Pass 1: declarations
// ---------------------------------------------------------------------

fn collect_declarations(
    node: Node<'_>,
    source: &[u8],
    file: &str,
    is_project: bool,
    current_class: Option<&str>,
    records: &mut Vec<SymbolRecord>,
) {
    match node.kind() {
        "class_specifier" | "struct_specifier" => {
            let kind = if node.kind() == "class_specifier" {
                SymbolKind::Class
            } else {
                SymbolKind::Struct
            };
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = text(name_node, source);
                let base_classes = extract_base_classes(node, source);
                let (line, column) = start_position(name_node);
                let qualified = name.clone();
                records.push(SymbolRecord {
                    name: name.clone(),
                    kind,
                    file: file.to_string(),
                    line,
                    column,
                    signature: String::new(),
                    parent_class: String::new(),
                    base_classes,
                    usr: synthesize_usr(&qualified),
                    is_project,
                    calls: vec![],
                    called_by: vec![],
                    access: None,
                    namespace: None,
                });
                if let Some(body) = node.child_by_field_name("body") {
                    walk_children(body, source, file, is_project, Some(&name), records);
                }
                return;
            }
            // Anonymous class/struct: still descend so nested declarations
            // (e.g. a named member function) are not lost.
            if let Some(body) = node.child_by_field_name("body") {
                walk_children(body, source, file, is_project, current_class, records);
            }
            return;
        }
        "function_definition" => {
            emit_function(node, source, file, is_project, current_class, true, records);
            return;
        }
        "declaration" => {
            if find_function_declarator(node).is_some() {
                emit_function(node, source, file, is_project, current_class, false, records);
            }
        }
        _ => {}
    }

    walk_children(node, source, file, is_project, current_class, records);
}

fn walk_children(
    node: Node<'_>,
    source: &[u8],
    file: &str,
    is_project: bool,
    current_class: Option<&str>,
    records: &mut Vec<SymbolRecord>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_declarations(child, source, file, is_project, current_class, records);
    }
}

fn emit_function(
    node: Node<'_>,
    source: &[u8],
    file: &str,
    is_project: bool,
    current_class: Option<&str>,
    has_body: bool,
    records: &mut Vec<SymbolRecord>,
) {
    let Some(declarator) = find_function_declarator(node) else {
        return;
    };
    let Some(name_node) = declarator.child_by_field_name("declarator") else {
        return;
    };
    let raw_name = text(name_node, source);
    let (parent_class, name) = split_qualified(&raw_name, current_class);
    let signature = declarator
        .child_by_field_name("parameters")
        .map(|p| text(p, source))
        .unwrap_or_default();

    let qualified = if parent_class.is_empty() {
        name.clone()
    } else {
        format!("{parent_class}::{name}")
    };
    let (line, column) = start_position(name_node);

    records.push(SymbolRecord {
        name,
        kind: if parent_class.is_empty() {
            SymbolKind::Function
        } else {
            SymbolKind::Method
        },
        file: file.to_string(),
        line,
        column,
        signature,
        parent_class,
        base_classes: vec![],
        usr: synthesize_usr(&qualified),
        is_project,
        calls: vec![],
        called_by: vec![],
        access: None,
        namespace: None,
    });

    if has_body {
        // Calls inside this body are attributed in `attribute_calls` via
        // byte-range containment against the record's span, so no further
        // recursive bookkeeping is needed here beyond letting the first
        // pass continue past this node (there is nothing else to collect
        // inside a function body for declaration purposes).
        let _ = node.byte_range();
    }
}

/// Finds the `function_declarator` a `function_definition`/`declaration`
/// wraps, looking through pointer/reference declarator wrappers.
fn find_function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        if current.kind() == "function_declarator" {
            return Some(current);
        }
        current = current.child_by_field_name("declarator")?;
    }
}

/// Splits `Class::method` into `(parent_class, method)`. Falls back to
/// `current_class` when the declarator has no explicit qualifier (an
/// in-body method declaration).
fn split_qualified(raw_name: &str, current_class: Option<&str>) -> (String, String) {
    if let Some(idx) = raw_name.rfind("::") {
        let parent = raw_name[..idx].to_string();
        let name = raw_name[idx + 2..].to_string();
        (parent, name)
    } else if let Some(class) = current_class {
        (class.to_string(), raw_name.to_string())
    } else {
        (String::new(), raw_name.to_string())
    }
}

fn extract_base_classes(class_node: Node<'_>, source: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = class_node.walk();
    for child in class_node.children(&mut cursor) {
        if child.kind() != "base_class_clause" {
            continue;
        }
        let mut base_cursor = child.walk();
        for base_child in child.children(&mut base_cursor) {
            if matches!(base_child.kind(), "type_identifier" | "qualified_identifier") {
                let raw = text(base_child, source);
                let stripped = raw
                    .trim_start_matches("class ")
                    .trim_start_matches("struct ")
                    .to_string();
                bases.push(stripped);
            }
        }
    }
    bases
}

// ---------------------------------------------------------------------
// Pass 2: call attribution
// ---------------------------------------------------------------------

/// Byte-offset containment lookup, same technique as the teacher's
/// `find_containing_entity`: walks all function/method records and returns
/// the tightest one whose declarator span contains `byte_offset`.
///
/// Records carry only their declarator's line/column, not a byte span, so
/// this pass re-walks the tree alongside the records rather than comparing
/// against stored ranges; see [`attribute_calls`].
fn attribute_calls(unit: &ParsedUnit, file: &str, records: &mut [SymbolRecord]) {
    let source = unit.source();
    let mut spans = Vec::new();
    collect_function_spans(unit.root(), source, None, &mut spans);

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(call_query(), unit.root(), source);
    while let Some(m) = matches.next() {
        for capture in m.captures {
            let capture_name = call_query().capture_names()[capture.index as usize];
            if capture_name != "call.expr" {
                continue;
            }
            let call_start = capture.node.start_byte();
            let Some((enclosing_usr, enclosing_qualified)) =
                find_enclosing_function(call_start, &spans)
            else {
                continue; // call outside any function body is ignored
            };
            let Some(callee) = capture.node.child_by_field_name("function") else {
                continue;
            };
            let callee_usr = resolve_callee_usr(callee, source, &enclosing_qualified, &spans);
            if let Some(record) = records.iter_mut().find(|r| r.usr == enclosing_usr) {
                if !record.calls.contains(&callee_usr) {
                    record.calls.push(callee_usr);
                }
            }
        }
    }
    let _ = file;
}

struct FunctionSpan {
    usr: String,
    qualified_name: String,
    parent_class: Option<String>,
    start: usize,
    end: usize,
}

fn collect_function_spans(
    node: Node<'_>,
    source: &[u8],
    current_class: Option<&str>,
    spans: &mut Vec<FunctionSpan>,
) {
    match node.kind() {
        "class_specifier" | "struct_specifier" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, source));
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for child in body.children(&mut cursor) {
                    collect_function_spans(child, source, name.as_deref(), spans);
                }
            }
            return;
        }
        "function_definition" => {
            if let Some(declarator) = find_function_declarator(node) {
                if let Some(name_node) = declarator.child_by_field_name("declarator") {
                    let raw_name = text(name_node, source);
                    let (parent_class, name) = split_qualified(&raw_name, current_class);
                    let qualified = if parent_class.is_empty() {
                        name.clone()
                    } else {
                        format!("{parent_class}::{name}")
                    };
                    spans.push(FunctionSpan {
                        usr: synthesize_usr(&qualified),
                        qualified_name: qualified,
                        parent_class: if parent_class.is_empty() {
                            None
                        } else {
                            Some(parent_class)
                        },
                        start: node.start_byte(),
                        end: node.end_byte(),
                    });
                }
            }
        }
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_function_spans(child, source, current_class, spans);
    }
}

fn find_enclosing_function(byte_offset: usize, spans: &[FunctionSpan]) -> Option<(String, String)> {
    spans
        .iter()
        .filter(|s| s.start <= byte_offset && byte_offset < s.end)
        .min_by_key(|s| s.end - s.start)
        .map(|s| (s.usr.clone(), s.qualified_name.clone()))
}

/// Resolves a call-expression callee to a synthesized USR.
///
/// No real overload resolution is performed (Non-goal: no semantic analysis
/// beyond declarations and direct calls). A bare identifier called from
/// inside a method binds to a sibling method of the same class when one
/// exists by that name (covers `this->foo()`/bare `foo()` self-calls); a
/// member-access call (`x.foo()`/`x->foo()`) is resolved by method name
/// alone, since the receiver's static type is not recovered — two unrelated
/// classes with same-named methods will collide under this identifier. This
/// mirrors the documented shallow-matching limitation already accepted for
/// `HierarchyEngine::derived_classes`.
fn resolve_callee_usr(
    callee: Node<'_>,
    source: &[u8],
    enclosing_qualified: &str,
    spans: &[FunctionSpan],
) -> String {
    match callee.kind() {
        "field_expression" => {
            let field_name = callee
                .child_by_field_name("field")
                .map(|n| text(n, source))
                .unwrap_or_default();
            synthesize_usr(&field_name)
        }
        "qualified_identifier" => synthesize_usr(text(callee, source).trim_start_matches("::")),
        _ => {
            let name = text(callee, source);
            let enclosing_class = enclosing_qualified
                .rfind("::")
                .map(|idx| &enclosing_qualified[..idx]);
            if let Some(class) = enclosing_class {
                let sibling = spans.iter().find(|s| {
                    s.parent_class.as_deref() == Some(class)
                        && s.qualified_name.ends_with(&format!("::{name}"))
                });
                if let Some(sibling) = sibling {
                    return sibling.usr.clone();
                }
            }
            synthesize_usr(&name)
        }
    }
}

// ---------------------------------------------------------------------
// USR synthesis
// ---------------------------------------------------------------------

/// Deterministic stand-in for a libclang USR: the qualified name, hashed.
/// Two declarations with the same qualified name collapse to the same
/// identifier — this crate synthesizes identity rather than recovering it
/// from the front-end, since tree-sitter's grammar is syntactic, not
/// semantic (SPEC_FULL.md §9).
pub fn synthesize_usr(qualified_name: &str) -> String {
    forge::hash_bytes(qualified_name.as_bytes())
}

fn text<'a>(node: Node<'a>, source: &'a [u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

fn start_position(node: Node<'_>) -> (u32, u32) {
    let point = node.start_position();
    (point.row as u32 + 1, point.column as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParseOutcome {
        let backend = TreeSitterCppBackend;
        parse_file(&backend, Path::new("a.cpp"), source.as_bytes(), true)
    }

    #[test]
    fn extracts_class_declaration() {
        let outcome = parse("class A {};");
        assert!(outcome.success);
        let class = outcome
            .records
            .iter()
            .find(|r| r.name == "A")
            .expect("class A recorded");
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.line, 1);
    }

    #[test]
    fn extracts_base_classes() {
        let outcome = parse("class Base {}; class Mid : public Base {};");
        let mid = outcome.records.iter().find(|r| r.name == "Mid").unwrap();
        assert_eq!(mid.base_classes, vec!["Base".to_string()]);
    }

    #[test]
    fn extracts_free_function_and_call_edge() {
        let outcome = parse("void g(){} void f(){ g(); }");
        let f = outcome.records.iter().find(|r| r.name == "f").unwrap();
        let g = outcome.records.iter().find(|r| r.name == "g").unwrap();
        assert_eq!(f.kind, SymbolKind::Function);
        assert!(f.calls.contains(&g.usr));
    }

    #[test]
    fn method_recorded_with_parent_class() {
        let outcome = parse("class Worker { void run(); };");
        let method = outcome.records.iter().find(|r| r.name == "run").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.parent_class, "Worker");
    }

    #[test]
    fn empty_file_parses_successfully_with_no_records() {
        let outcome = parse("");
        assert!(outcome.success);
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn usr_is_deterministic_and_distinguishes_names() {
        assert_eq!(synthesize_usr("A::run"), synthesize_usr("A::run"));
        assert_ne!(synthesize_usr("A::run"), synthesize_usr("B::run"));
    }
}
