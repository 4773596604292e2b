//! Core domain types for the memory engine.
//!
//! A [`Memory`] is the atomic stored fact; [`Tag`] and [`Link`] are its
//! associations. [`Scope`] selects the visibility partition used by
//! `Store::list` and by the deduplicator's candidate scan.

use serde::{Deserialize, Serialize};

/// Default category set used when no `categories` override is configured.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "decision",
    "pattern",
    "debugging",
    "preference",
    "convention",
    "discovery",
    "anti-pattern",
    "general",
];

/// The atomic stored fact.
///
/// `project_id == None` denotes a *global* memory, visible from every
/// project. IDs are immutable once assigned (invariant 4 of the data model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    pub category: String,
    pub session_id: Option<String>,
    pub project_id: Option<String>,
    pub source: Option<String>,
    pub time_created: i64,
    pub time_updated: i64,
    pub access_count: i64,
    pub time_last_accessed: Option<i64>,
}

/// Input to `Store::insert`.
#[derive(Debug, Clone, Default)]
pub struct MemoryInput {
    pub content: String,
    pub category: Option<String>,
    pub session_id: Option<String>,
    pub project_id: Option<String>,
    pub source: Option<String>,
    pub tags: Vec<String>,
    /// `true` pins `project_id` to `NULL` regardless of `project_id` above.
    pub global: bool,
    /// Bypass the deduplicator entirely.
    pub force: bool,
}

/// A patch applied by `Store::update`.
///
/// Every field uses "unset means leave unchanged" semantics (design note in
/// SPEC_FULL.md §9): `None` leaves the column untouched, `Some(v)` overwrites
/// it. This is distinct from `project_id`, where an explicit `Some(None)`
/// means "make this memory global".
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub session_id: Option<String>,
    /// `Some(None)` clears `project_id` (makes the memory global);
    /// `Some(Some(id))` reassigns it; `None` leaves it unchanged.
    pub project_id: Option<Option<String>>,
}

/// Visibility partition for `Store::list` and dedup candidate scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Exact `project_id` match.
    Project,
    /// `project_id IS NULL` only.
    Global,
    /// Union of project-scoped and global memories.
    #[default]
    All,
}

/// Filter used by `Store::list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub category: Option<String>,
    pub project_id: Option<String>,
    pub session_id: Option<String>,
    pub scope: Scope,
    pub limit: u32,
}

impl ListFilter {
    #[must_use]
    pub fn default_limit() -> u32 {
        20
    }
}

/// Directed typed edge between two memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Related,
    Supersedes,
    Contradicts,
    Extends,
}

impl Relationship {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::Supersedes => "supersedes",
            Self::Contradicts => "contradicts",
            Self::Extends => "extends",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "related" => Some(Self::Related),
            "supersedes" => Some(Self::Supersedes),
            "contradicts" => Some(Self::Contradicts),
            "extends" => Some(Self::Extends),
            _ => None,
        }
    }
}

/// A link as returned by `Store::link_list`: directionality preserved, the
/// *other* endpoint materialized regardless of which side `memory_id` is on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEdge {
    pub other_id: String,
    pub relationship: Relationship,
    /// `true` if `memory_id` was the source of the edge (outgoing),
    /// `false` if it was the target (incoming).
    pub outgoing: bool,
}

/// A tag with its usage count, as returned by `Store::tags_list_all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Aggregate stats returned by `Store::stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: i64,
    pub by_category: std::collections::BTreeMap<String, i64>,
}

/// A single applied schema migration, recorded in `_migrations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub version: i64,
    pub description: String,
    pub applied_at: i64,
}

/// Lowercase and trim a tag string (data model invariant: "Tags are always
/// lowercased and trimmed on entry").
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_round_trips() {
        for rel in [
            Relationship::Related,
            Relationship::Supersedes,
            Relationship::Contradicts,
            Relationship::Extends,
        ] {
            assert_eq!(Relationship::from_str_opt(rel.as_str()), Some(rel));
        }
        assert_eq!(Relationship::from_str_opt("bogus"), None);
    }

    #[test]
    fn normalize_tag_trims_and_lowercases() {
        assert_eq!(normalize_tag("  RustLang  "), "rustlang");
    }
}
