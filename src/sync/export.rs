//! `memory_export`: serialize the whole store into the v1 JSON document.

use crate::error::Result;
use crate::model::{ListFilter, Scope};
use crate::storage::Store;
use crate::sync::types::{EXPORT_VERSION, ExportDocument, ExportedLink, ExportedMemory};
use chrono::Utc;

/// Export every memory, its tags, and its outgoing links into a single
/// document. Only outgoing edges are recorded per memory so a link between
/// two exported memories appears exactly once.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn export_all(store: &Store) -> Result<ExportDocument> {
    let memories = store.list(ListFilter {
        scope: Scope::All,
        limit: u32::MAX,
        ..Default::default()
    })?;

    let mut exported = Vec::with_capacity(memories.len());
    for memory in memories {
        let tags = store.tags_get(&memory.id)?;
        let links = store
            .link_list(&memory.id)?
            .into_iter()
            .filter(|edge| edge.outgoing)
            .map(|edge| ExportedLink {
                target_id: edge.other_id,
                relationship: edge.relationship,
            })
            .collect();

        exported.push(ExportedMemory {
            id: memory.id,
            content: memory.content,
            category: memory.category,
            source: memory.source,
            project_id: memory.project_id,
            time_created: memory.time_created,
            time_updated: memory.time_updated,
            access_count: memory.access_count,
            tags,
            links,
        });
    }

    Ok(ExportDocument {
        version: EXPORT_VERSION,
        exported_at: Utc::now().to_rfc3339(),
        memories: exported,
    })
}
