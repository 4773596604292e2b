//! The transactional `Store` (SPEC_FULL.md §4.2, §4.7): CRUD over memory
//! entities, tags, and links, plus the search path that stitches together
//! the query normalizer (C), the full-text index, and the ranker (D).

use crate::dedup::{self, DuplicateMatch};
use crate::error::{Error, Result};
use crate::model::{
    LinkEdge, ListFilter, Memory, MemoryInput, MemoryPatch, MemoryStats, Relationship, Scope,
    TagCount, normalize_tag,
};
use crate::query;
use crate::rank::{self, CandidateHit};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Value as SqlValue};
use std::path::Path;

/// Maximum content length (SPEC_FULL.md §3/§8).
pub const MAX_CONTENT_LEN: usize = 10_000;

pub(crate) const MEMORY_COLUMNS: &str = "id, content, category, session_id, project_id, source, \
     time_created, time_updated, access_count, time_last_accessed";

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if necessary) the database at `path` and bring its
    /// schema up to the current version.
    ///
    /// # Errors
    ///
    /// Returns `Error::InitFailed` if the directory cannot be created, the
    /// file cannot be opened, or migrations fail.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::InitFailed(e.to_string()))?;
            }
        }
        let mut conn = Connection::open(path).map_err(|e| Error::InitFailed(e.to_string()))?;
        crate::storage::schema::apply_schema(&mut conn).map_err(|e| Error::InitFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database, primarily for tests.
    ///
    /// # Errors
    ///
    /// Returns `Error::InitFailed` if migrations fail.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        crate::storage::schema::apply_schema(&mut conn).map_err(|e| Error::InitFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Idempotent teardown: run the optimizer pragma and drop the
    /// connection. Errors from the pragma are swallowed (SPEC_FULL.md §4.1).
    pub fn close(self) {
        crate::storage::schema::optimize_on_close(&self.conn);
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    // ── B: Store ──────────────────────────────────────────────

    /// Insert a new memory, short-circuited by the deduplicator unless
    /// `input.force` is set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for empty or overlength content.
    pub fn insert(&mut self, input: MemoryInput) -> Result<Memory> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(Error::Validation("content must not be empty".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_LEN {
            return Err(Error::Validation(format!(
                "content exceeds {MAX_CONTENT_LEN} characters"
            )));
        }

        let project_id = if input.global { None } else { input.project_id.clone() };

        if !input.force {
            match dedup::find_duplicate(&self.conn, content, project_id.as_deref())? {
                DuplicateMatch::Exact(existing) => return self.get_required(&existing.id),
                DuplicateMatch::Near(existing) => {
                    return self.merge_near_duplicate(&existing.id, content, &input);
                }
                DuplicateMatch::None => {}
            }
        }

        self.insert_fresh(content, &input, project_id)
    }

    fn insert_fresh(
        &mut self,
        content: &str,
        input: &MemoryInput,
        project_id: Option<String>,
    ) -> Result<Memory> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Self::now();
        let category = input.category.clone().unwrap_or_else(|| "general".to_string());

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO memory (id, content, category, session_id, project_id, source, \
             time_created, time_updated, access_count, time_last_accessed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 0, NULL)",
            params![
                id,
                content,
                category,
                input.session_id,
                project_id,
                input.source,
                now,
            ],
        )?;
        for tag in &input.tags {
            let tag = normalize_tag(tag);
            tx.execute(
                "INSERT OR IGNORE INTO memory_tags (memory_id, tag) VALUES (?1, ?2)",
                params![id, tag],
            )?;
        }
        tx.commit()?;

        self.get_required(&id)
    }

    fn merge_near_duplicate(&mut self, id: &str, content: &str, input: &MemoryInput) -> Result<Memory> {
        let tx = self.conn.transaction()?;
        let now = Self::now();
        tx.execute(
            "UPDATE memory SET content = ?1, \
             category = COALESCE(?2, category), \
             source = COALESCE(?3, source), \
             time_updated = ?4 \
             WHERE id = ?5",
            params![content, input.category, input.source, now, id],
        )?;
        tx.commit()?;
        self.get_required(id)
    }

    fn get_required(&self, id: &str) -> Result<Memory> {
        self.get(id)?.ok_or_else(|| Error::NotFound {
            kind: "memory",
            id: id.to_string(),
        })
    }

    /// Apply a patch to an existing memory. Returns `None` if `id` is
    /// unknown (never an error: SPEC_FULL.md §7 "not found" kind).
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn update(&mut self, id: &str, patch: MemoryPatch) -> Result<Option<Memory>> {
        if self.get(id)?.is_none() {
            return Ok(None);
        }
        let now = Self::now();
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE memory SET \
             content = COALESCE(?1, content), \
             category = COALESCE(?2, category), \
             source = COALESCE(?3, source), \
             session_id = COALESCE(?4, session_id), \
             project_id = CASE WHEN ?5 THEN ?6 ELSE project_id END, \
             time_updated = ?7 \
             WHERE id = ?8",
            params![
                patch.content,
                patch.category,
                patch.source,
                patch.session_id,
                patch.project_id.is_some(),
                patch.project_id.flatten(),
                now,
                id,
            ],
        )?;
        tx.commit()?;
        self.get(id)
    }

    /// Delete a memory. Tags and links touching it cascade atomically
    /// (data model invariant 1).
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM memory_links WHERE source_id = ?1 OR target_id = ?1", params![id])?;
        let affected = tx.execute("DELETE FROM memory WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(affected > 0)
    }

    /// Delete several memories in one transaction; returns the number
    /// actually removed. Used by `maintenance::{purge, enforce_cap}`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn delete_many(&mut self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut removed = 0usize;
        for id in ids {
            tx.execute("DELETE FROM memory_links WHERE source_id = ?1 OR target_id = ?1", params![id])?;
            removed += tx.execute("DELETE FROM memory WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Fetch a memory by id.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn get(&self, id: &str) -> Result<Option<Memory>> {
        self.conn
            .query_row(
                &format!("SELECT {MEMORY_COLUMNS} FROM memory WHERE id = ?1"),
                params![id],
                row_to_memory,
            )
            .optional()
            .map_err(Error::from)
    }

    /// List memories under a scope/filter, ordered by `time_created DESC`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn list(&self, filter: ListFilter) -> Result<Vec<Memory>> {
        let (clause, mut values) = scope_clause(filter.scope, filter.project_id.as_deref());

        let mut conditions = Vec::new();
        if let Some(clause) = clause {
            conditions.push(clause);
        }
        if let Some(category) = &filter.category {
            conditions.push("category = ?".to_string());
            values.push(SqlValue::Text(category.clone()));
        }
        if let Some(session_id) = &filter.session_id {
            conditions.push("session_id = ?".to_string());
            values.push(SqlValue::Text(session_id.clone()));
        }

        let where_sql = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = if filter.limit == 0 { ListFilter::default_limit() } else { filter.limit };
        values.push(SqlValue::Integer(i64::from(limit)));

        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM memory {where_sql} ORDER BY time_created DESC LIMIT ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), row_to_memory)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Aggregate counts by category.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn stats(&self) -> Result<MemoryStats> {
        let total: i64 = self.conn.query_row("SELECT COUNT(*) FROM memory", [], |r| r.get(0))?;
        let mut by_category = std::collections::BTreeMap::new();
        let mut stmt = self
            .conn
            .prepare("SELECT category, COUNT(*) FROM memory GROUP BY category")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (category, count) = row?;
            by_category.insert(category, count);
        }
        Ok(MemoryStats { total, by_category })
    }

    /// Bump `access_count` by 5 and set `time_last_accessed=now`
    /// (SPEC_FULL.md §4.2). Returns `None` if `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn refresh(&mut self, id: &str) -> Result<Option<Memory>> {
        self.bump_access(id, 5)
    }

    fn bump_access(&mut self, id: &str, amount: i64) -> Result<Option<Memory>> {
        let now = Self::now();
        let affected = self.conn.execute(
            "UPDATE memory SET access_count = access_count + ?1, time_last_accessed = ?2 WHERE id = ?3",
            params![amount, now, id],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        self.get(id)
    }

    // ── C+D: search ───────────────────────────────────────────

    /// Normalize `query_text`, run it against the full-text index within
    /// `scope`/`project_id`, re-rank with time decay and access boost, and
    /// bump `access_count`/`time_last_accessed` on every returned row.
    ///
    /// If the full-text engine raises an error on the (already-sanitized)
    /// query, this logs and returns an empty list rather than propagating.
    ///
    /// # Errors
    ///
    /// Returns an error on unrelated database failure.
    pub fn search(
        &mut self,
        query_text: &str,
        scope: Scope,
        project_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Memory>> {
        let limit = if limit == 0 { 10 } else { limit };
        let normalized = query::normalize(query_text);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let fetch = (limit as usize * 3).min(100);
        let hits = match self.fts_query(&normalized, scope, project_id, fetch) {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(query = %normalized, error = %err, "full-text query failed");
                return Ok(Vec::new());
            }
        };

        let now = Self::now();
        let ranked = rank::rerank(hits, now, limit as usize);

        for hit in &ranked {
            self.bump_access(&hit.memory.id, 1)?;
        }

        Ok(ranked.into_iter().map(|hit| hit.memory).collect())
    }

    /// Raw full-text query: returns candidate rows with their BM25 base
    /// rank, without re-ranking or access bumping. Used by `search` above
    /// and by the deduplicator's near-duplicate candidate scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the full-text query is malformed or the
    /// underlying connection fails.
    pub fn fts_query(
        &self,
        fts_query: &str,
        scope: Scope,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CandidateHit>> {
        let (clause, mut values) = scope_clause(scope, project_id);
        let where_extra = clause.map(|c| format!(" AND {c}")).unwrap_or_default();

        let sql = format!(
            "SELECT {cols}, bm25(memory_fts) AS rank \
             FROM memory JOIN memory_fts ON memory.rowid = memory_fts.rowid \
             WHERE memory_fts MATCH ?{where_extra} \
             ORDER BY rank ASC LIMIT ?",
            cols = MEMORY_COLUMNS,
        );

        let mut params_vec = Vec::with_capacity(values.len() + 2);
        params_vec.push(SqlValue::Text(fts_query.to_string()));
        params_vec.append(&mut values);
        params_vec.push(SqlValue::Integer(limit as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec.iter()), |row| {
            let memory = row_to_memory(row)?;
            let base_rank: f64 = row.get(10)?;
            Ok(CandidateHit { memory, base_rank })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// The `limit` most recently created memories visible under
    /// `scope`/`project_id`. Used by the deduplicator's exact-match scan.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn recent_in_scope(&self, scope: Scope, project_id: Option<&str>, limit: u32) -> Result<Vec<Memory>> {
        self.list(ListFilter {
            category: None,
            project_id: project_id.map(str::to_string),
            session_id: None,
            scope,
            limit,
        })
    }

    // ── G: tags ───────────────────────────────────────────────

    /// Current tags on a memory, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn tags_get(&self, memory_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM memory_tags WHERE memory_id = ?1 ORDER BY tag")?;
        let rows = stmt.query_map(params![memory_id], |r| r.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Idempotently add tags to a memory; returns the full tag set after.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn tags_add(&mut self, memory_id: &str, tags: &[String]) -> Result<Vec<String>> {
        let tx = self.conn.transaction()?;
        for tag in tags {
            let tag = normalize_tag(tag);
            tx.execute(
                "INSERT OR IGNORE INTO memory_tags (memory_id, tag) VALUES (?1, ?2)",
                params![memory_id, tag],
            )?;
        }
        tx.commit()?;
        self.tags_get(memory_id)
    }

    /// Remove tags from a memory; returns the remaining tag set.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn tags_remove(&mut self, memory_id: &str, tags: &[String]) -> Result<Vec<String>> {
        let tx = self.conn.transaction()?;
        for tag in tags {
            let tag = normalize_tag(tag);
            tx.execute(
                "DELETE FROM memory_tags WHERE memory_id = ?1 AND tag = ?2",
                params![memory_id, tag],
            )?;
        }
        tx.commit()?;
        self.tags_get(memory_id)
    }

    /// Replace a memory's tag set atomically (clear then add).
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn tags_set(&mut self, memory_id: &str, tags: &[String]) -> Result<Vec<String>> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM memory_tags WHERE memory_id = ?1", params![memory_id])?;
        for tag in tags {
            let tag = normalize_tag(tag);
            tx.execute(
                "INSERT OR IGNORE INTO memory_tags (memory_id, tag) VALUES (?1, ?2)",
                params![memory_id, tag],
            )?;
        }
        tx.commit()?;
        self.tags_get(memory_id)
    }

    /// Every distinct tag with its usage count, most-used first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn tags_list_all(&self) -> Result<Vec<TagCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT tag, COUNT(*) as c FROM memory_tags GROUP BY tag ORDER BY c DESC, tag ASC",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(TagCount {
                tag: r.get(0)?,
                count: r.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Memories carrying `tag`, optionally scoped to a project, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn search_by_tag(&self, tag: &str, project_id: Option<&str>, limit: u32) -> Result<Vec<Memory>> {
        let tag = normalize_tag(tag);
        let limit = if limit == 0 { 20 } else { limit };

        let sql = if project_id.is_some() {
            format!(
                "SELECT {MEMORY_COLUMNS} FROM memory \
                 JOIN memory_tags ON memory.id = memory_tags.memory_id \
                 WHERE memory_tags.tag = ?1 AND memory.project_id = ?2 \
                 ORDER BY time_created DESC LIMIT ?3"
            )
        } else {
            format!(
                "SELECT {MEMORY_COLUMNS} FROM memory \
                 JOIN memory_tags ON memory.id = memory_tags.memory_id \
                 WHERE memory_tags.tag = ?1 \
                 ORDER BY time_created DESC LIMIT ?2"
            )
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(project_id) = project_id {
            stmt.query_map(params![tag, project_id, limit], row_to_memory)?
                .collect::<rusqlite::Result<Vec<_>>>()
        } else {
            stmt.query_map(params![tag, limit], row_to_memory)?
                .collect::<rusqlite::Result<Vec<_>>>()
        };
        rows.map_err(Error::from)
    }

    // ── G: links ──────────────────────────────────────────────

    /// Upsert a typed edge. Returns `false` (no error) if either id is
    /// missing, `source == target`, or `rel` is not a valid relationship
    /// (validated already by the caller via `Relationship`).
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn link_add(&mut self, source: &str, target: &str, rel: Relationship) -> Result<bool> {
        if source == target {
            return Ok(false);
        }
        if self.get(source)?.is_none() || self.get(target)?.is_none() {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO memory_links (source_id, target_id, relationship) VALUES (?1, ?2, ?3) \
             ON CONFLICT(source_id, target_id) DO UPDATE SET relationship = excluded.relationship",
            params![source, target, rel.as_str()],
        )?;
        Ok(true)
    }

    /// Remove the edge between two ids, if any. Returns whether a row was
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn link_remove(&mut self, source: &str, target: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM memory_links WHERE source_id = ?1 AND target_id = ?2",
            params![source, target],
        )?;
        Ok(affected > 0)
    }

    /// Every edge touching `memory_id` in either direction, with the other
    /// endpoint materialized and directionality preserved.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn link_list(&self, memory_id: &str) -> Result<Vec<LinkEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT target_id AS other, relationship, 1 AS outgoing FROM memory_links WHERE source_id = ?1 \
             UNION ALL \
             SELECT source_id AS other, relationship, 0 AS outgoing FROM memory_links WHERE target_id = ?1",
        )?;
        let rows = stmt.query_map(params![memory_id], |row| {
            let other_id: String = row.get(0)?;
            let relationship: String = row.get(1)?;
            let outgoing: i64 = row.get(2)?;
            Ok((other_id, relationship, outgoing))
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let (other_id, relationship, outgoing) = row?;
            let Some(relationship) = Relationship::from_str_opt(&relationship) else {
                continue;
            };
            edges.push(LinkEdge {
                other_id,
                relationship,
                outgoing: outgoing != 0,
            });
        }
        Ok(edges)
    }

    // ── F: maintenance primitives ─────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the FTS optimize command fails.
    pub fn fts_optimize(&self) -> Result<()> {
        self.conn
            .execute("INSERT INTO memory_fts(memory_fts) VALUES ('optimize')", [])?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `VACUUM` fails.
    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM")?;
        Ok(())
    }

    /// Total row count, used by cap enforcement.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn total_count(&self) -> Result<i64> {
        self.conn.query_row("SELECT COUNT(*) FROM memory", [], |r| r.get(0)).map_err(Error::from)
    }

    /// Ids of memories eligible for age-based purge: older than
    /// `cutoff` and never accessed.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn purge_candidates(&self, cutoff: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM memory WHERE time_created < ?1 AND access_count = 0 AND time_last_accessed IS NULL",
        )?;
        let rows = stmt.query_map(params![cutoff], |r| r.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Ids of the `count` lowest-value rows by `access_count ASC,
    /// time_created ASC`, used by cap enforcement.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn lowest_value_ids(&self, count: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM memory ORDER BY access_count ASC, time_created ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![count], |r| r.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Approximate on-disk size of the database file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn db_size_bytes(&self) -> Result<i64> {
        let page_count: i64 = self.conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
        let page_size: i64 = self.conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;
        Ok(page_count * page_size)
    }

    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn metadata_get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", params![key], |r| r.get(0))
            .optional()
            .map_err(Error::from)
    }

    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn metadata_set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Direct read-only access to the underlying connection, for modules
    /// (dedup, maintenance) that need raw SQL this `Store` doesn't expose
    /// as a method.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Build the SQL fragment (and its bound parameter, if any) for a scope
/// filter (SPEC_FULL.md §4.2's `list` scope semantics).
pub(crate) fn scope_clause(scope: Scope, project_id: Option<&str>) -> (Option<String>, Vec<SqlValue>) {
    match scope {
        Scope::Project => match project_id {
            Some(pid) => (
                Some("project_id = ?".to_string()),
                vec![SqlValue::Text(pid.to_string())],
            ),
            None => (None, Vec::new()),
        },
        Scope::Global => (Some("project_id IS NULL".to_string()), Vec::new()),
        Scope::All => match project_id {
            Some(pid) => (
                Some("(project_id = ? OR project_id IS NULL)".to_string()),
                vec![SqlValue::Text(pid.to_string())],
            ),
            None => (None, Vec::new()),
        },
    }
}

pub(crate) fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<Memory> {
    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        category: row.get(2)?,
        session_id: row.get(3)?,
        project_id: row.get(4)?,
        source: row.get(5)?,
        time_created: row.get(6)?,
        time_updated: row.get(7)?,
        access_count: row.get(8)?,
        time_last_accessed: row.get(9)?,
    })
}
