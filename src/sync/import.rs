//! `memory_import`: restore a v1 JSON document into a store, remapping ids
//! for newly inserted memories and skipping ids that already exist.

use crate::error::Result;
use crate::model::MemoryInput;
use crate::storage::Store;
use crate::sync::types::{ExportDocument, ImportStats};
use std::collections::HashMap;

/// Import every memory in `doc`. Memories whose id already exists in
/// `store` are skipped (counted, not overwritten); everything else is
/// inserted under a freshly generated id, bypassing the deduplicator.
/// Links are restored in a second pass, once every memory has a final id,
/// through the old-id→new-id map; links whose endpoint was skipped because
/// it wasn't re-inserted use the existing id directly.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn import_all(store: &mut Store, doc: &ExportDocument) -> Result<ImportStats> {
    let mut id_map: HashMap<String, String> = HashMap::new();
    let mut stats = ImportStats::default();

    for memory in &doc.memories {
        if store.get(&memory.id)?.is_some() {
            id_map.insert(memory.id.clone(), memory.id.clone());
            stats.skipped_existing += 1;
            continue;
        }

        let inserted = store.insert(MemoryInput {
            content: memory.content.clone(),
            category: Some(memory.category.clone()),
            session_id: None,
            project_id: memory.project_id.clone(),
            source: memory.source.clone(),
            tags: memory.tags.clone(),
            global: false,
            force: true,
        })?;
        id_map.insert(memory.id.clone(), inserted.id);
        stats.inserted += 1;
    }

    for memory in &doc.memories {
        let Some(source_id) = id_map.get(&memory.id).cloned() else {
            continue;
        };
        for link in &memory.links {
            let Some(target_id) = id_map.get(&link.target_id) else {
                continue;
            };
            if store.link_add(&source_id, target_id, link.relationship)? {
                stats.links_restored += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::export::export_all;

    #[test]
    fn round_trip_preserves_content_category_tags_and_links() {
        let mut source = Store::open_in_memory().unwrap();
        let a = source
            .insert(MemoryInput {
                content: "original content".to_string(),
                category: Some("decision".to_string()),
                tags: vec!["important".to_string()],
                ..Default::default()
            })
            .unwrap();
        let b = source
            .insert(MemoryInput {
                content: "second memory".to_string(),
                ..Default::default()
            })
            .unwrap();
        source
            .link_add(&a.id, &b.id, crate::model::Relationship::Supersedes)
            .unwrap();

        let doc = export_all(&source).unwrap();

        let mut dest = Store::open_in_memory().unwrap();
        let stats = import_all(&mut dest, &doc).unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.skipped_existing, 0);
        assert_eq!(stats.links_restored, 1);

        let imported = dest
            .list(crate::model::ListFilter {
                scope: crate::model::Scope::All,
                limit: 10,
                ..Default::default()
            })
            .unwrap();
        let imported_a = imported.iter().find(|m| m.content == "original content").unwrap();
        assert_eq!(imported_a.category, "decision");
        assert_eq!(dest.tags_get(&imported_a.id).unwrap(), vec!["important".to_string()]);

        let links = dest.link_list(&imported_a.id).unwrap();
        assert_eq!(links.len(), 1);
        assert!(links[0].outgoing);
    }

    #[test]
    fn reimporting_the_same_document_skips_existing_ids() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .insert(MemoryInput {
                content: "memory".to_string(),
                ..Default::default()
            })
            .unwrap();
        let doc = export_all(&store).unwrap();

        let stats = import_all(&mut store, &doc).unwrap();
        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.skipped_existing, 1);
    }
}
