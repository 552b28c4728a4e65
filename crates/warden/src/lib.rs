//! # The Warden: indexing orchestration and query surface
//!
//! Owns the live in-memory indexes and wires the Indexer, SearchEngine,
//! HierarchyEngine, and QueryFacade together over a single project
//! (SPEC_FULL.md §4.6–§4.10).

pub mod facade;
pub mod hierarchy;
pub mod indexer;
pub mod indexes;
pub mod search;

pub use facade::QueryFacade;
pub use indexer::{IndexReport, Indexer};
pub use indexes::IndexBundle;
