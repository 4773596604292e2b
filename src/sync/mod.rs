//! Export/import of the memory store as a single JSON document
//! (SPEC_FULL.md §6), plus the atomic-write helper it's built on.

pub mod export;
pub mod file;
pub mod import;
pub mod types;

pub use export::export_all;
pub use import::import_all;
pub use types::{ExportDocument, ExportedLink, ExportedMemory, ImportStats};
