//! Deduplicator (SPEC_FULL.md §4.5): exact and near-duplicate detection run
//! by `Store::insert` before a new memory is written.

use crate::error::Result;
use crate::model::{Memory, Scope};
use crate::query;
use crate::storage::sqlite::{MEMORY_COLUMNS, row_to_memory, scope_clause};
use rusqlite::{Connection, types::Value as SqlValue};
use std::collections::HashSet;

const EXACT_SCAN_LIMIT: i64 = 100;
const NEAR_DUP_FETCH_LIMIT: i64 = 5;
const JACCARD_THRESHOLD: f64 = 0.6;

/// Outcome of a duplicate check.
pub enum DuplicateMatch {
    Exact(Memory),
    Near(Memory),
    None,
}

/// Lowercase, trim, and collapse internal whitespace runs to single spaces.
fn normalize_content(content: &str) -> String {
    content.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn word_set(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().filter(|t| t.chars().count() > 1).collect()
}

fn jaccard(a: &str, b: &str) -> f64 {
    let set_a = word_set(a);
    let set_b = word_set(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Check `content` against the project+global visible scope for an exact or
/// near duplicate. Never errors on a malformed or failing full-text query:
/// that stage degrades to "no duplicate found" (SPEC_FULL.md §4.5).
///
/// # Errors
///
/// Returns an error only if the initial recency scan (plain SQL, not
/// full-text) fails.
pub fn find_duplicate(
    conn: &Connection,
    content: &str,
    project_id: Option<&str>,
) -> Result<DuplicateMatch> {
    let normalized = normalize_content(content);

    let recent = recent_in_scope(conn, project_id, EXACT_SCAN_LIMIT)?;
    for candidate in &recent {
        if normalize_content(&candidate.content) == normalized {
            return Ok(DuplicateMatch::Exact(candidate.clone()));
        }
    }

    match near_duplicate(conn, content, &normalized, project_id) {
        Ok(Some(memory)) => Ok(DuplicateMatch::Near(memory)),
        Ok(None) => Ok(DuplicateMatch::None),
        Err(err) => {
            tracing::warn!(error = %err, "near-duplicate full-text query failed");
            Ok(DuplicateMatch::None)
        }
    }
}

fn recent_in_scope(conn: &Connection, project_id: Option<&str>, limit: i64) -> Result<Vec<Memory>> {
    let (clause, mut values) = scope_clause(Scope::All, project_id);
    let where_sql = clause.map(|c| format!("WHERE {c}")).unwrap_or_default();
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memory {where_sql} ORDER BY time_created DESC LIMIT ?"
    );
    values.push(SqlValue::Integer(limit));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), row_to_memory)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(crate::error::Error::from)
}

/// Pick the `max(3, ceil(total*0.6))` longest distinctive tokens from the
/// normalizer's output over `content`, then OR them into a single full-text
/// query.
fn distinctive_query(content: &str) -> Option<String> {
    let normalized = query::normalize(content);
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    tokens.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));

    let total = tokens.len();
    let keep = (3usize).max((total as f64 * 0.6).ceil() as usize).min(total);
    let chosen = &tokens[..keep];

    Some(
        chosen
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

fn near_duplicate(
    conn: &Connection,
    content: &str,
    normalized: &str,
    project_id: Option<&str>,
) -> rusqlite::Result<Option<Memory>> {
    let Some(fts_query) = distinctive_query(content) else {
        return Ok(None);
    };

    let (clause, mut values) = scope_clause(Scope::All, project_id);
    let where_extra = clause.map(|c| format!(" AND {c}")).unwrap_or_default();
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memory JOIN memory_fts ON memory.rowid = memory_fts.rowid \
         WHERE memory_fts MATCH ?{where_extra} ORDER BY bm25(memory_fts) ASC LIMIT ?"
    );

    let mut params_vec = Vec::with_capacity(values.len() + 2);
    params_vec.push(SqlValue::Text(fts_query));
    params_vec.append(&mut values);
    params_vec.push(SqlValue::Integer(NEAR_DUP_FETCH_LIMIT));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params_vec.iter()), row_to_memory)?;

    for row in rows {
        let candidate = row?;
        let candidate_normalized = normalize_content(&candidate.content);
        if jaccard(normalized, &candidate_normalized) > JACCARD_THRESHOLD {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    fn conn_with_memory(content: &str) -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_schema(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO memory (id, content, category, time_created, time_updated, access_count) \
             VALUES ('seed', ?1, 'general', 0, 0, 0)",
            rusqlite::params![content],
        )
        .unwrap();
        conn
    }

    #[test]
    fn identical_content_is_an_exact_duplicate() {
        let conn = conn_with_memory("The quick brown fox jumps over the lazy dog");
        let result = find_duplicate(&conn, "  the   QUICK brown fox jumps over the lazy dog  ", None).unwrap();
        assert!(matches!(result, DuplicateMatch::Exact(_)));
    }

    #[test]
    fn highly_overlapping_content_is_a_near_duplicate() {
        let conn = conn_with_memory(
            "authentication module uses JWT tokens with a fifteen minute expiry window",
        );
        let result = find_duplicate(
            &conn,
            "authentication module uses JWT tokens with a fifteen minute expiration window",
            None,
        )
        .unwrap();
        assert!(matches!(result, DuplicateMatch::Near(_)));
    }

    #[test]
    fn unrelated_content_is_not_a_duplicate() {
        let conn = conn_with_memory("the database connection pool has a max size of ten");
        let result = find_duplicate(&conn, "frontend build pipeline uses esbuild for bundling", None).unwrap();
        assert!(matches!(result, DuplicateMatch::None));
    }

    #[test]
    fn jaccard_similarity_is_symmetric_and_bounded() {
        let a = "one two three four";
        let b = "two three four five";
        let sim = jaccard(a, b);
        assert!((0.0..=1.0).contains(&sim));
        assert!((sim - jaccard(b, a)).abs() < f64::EPSILON);
    }
}
