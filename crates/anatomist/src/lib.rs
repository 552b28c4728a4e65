//! # The Anatomist: C++ parsing and symbol extraction
//!
//! **Role**: Scans a project tree for C++ sources and converts each file into
//! [`common::types::SymbolRecord`]s plus call edges.
//!
//! **Core pieces**:
//! - [`scanner`]: enumerates candidate source files, honoring exclude and
//!   dependency-directory rules.
//! - [`parser`]: drives the tree-sitter-cpp front-end over one file's bytes
//!   and emits its declarations and call edges.

pub mod parser;
pub mod scanner;

pub use parser::{parse_file, ParseOutcome, ParserBackend, ParsedUnit, TreeSitterCppBackend};
pub use scanner::{is_project_file, scan};

/// Errors produced while scanning or parsing a project tree.
#[derive(Debug, thiserror::Error)]
pub enum AnatomistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file exceeds the configured size limit: {0}")]
    FileTooLarge(String),
}
