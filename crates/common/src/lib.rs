pub mod cache;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use error::CoreError;
pub use types::{FileEntry, SymbolKind, SymbolRecord};
