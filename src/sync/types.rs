//! Wire types for the export/import surface: the v1 JSON document of
//! SPEC_FULL.md §6.

use crate::model::Relationship;
use serde::{Deserialize, Serialize};

/// Export format version. Bumped only on a breaking change to the document
/// shape; `memory_import` rejects any other value.
pub const EXPORT_VERSION: u32 = 1;

/// The single-document export format (SPEC_FULL.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: String,
    pub memories: Vec<ExportedMemory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedMemory {
    pub id: String,
    pub content: String,
    pub category: String,
    pub source: Option<String>,
    pub project_id: Option<String>,
    pub time_created: i64,
    pub time_updated: i64,
    pub access_count: i64,
    pub tags: Vec<String>,
    pub links: Vec<ExportedLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedLink {
    pub target_id: String,
    pub relationship: Relationship,
}

/// Outcome of `memory_import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub inserted: usize,
    pub skipped_existing: usize,
    pub links_restored: usize,
}
