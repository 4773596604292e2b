//! Versioned forward-only schema migrations (SPEC_FULL.md §4.1).
//!
//! Each `up` runs inside its own transaction: commit on success, rollback
//! and abort the whole migration run on any error. `_migrations` tracks
//! which versions have already been applied so migrations are replayed
//! exactly once per database file, and re-running the full list against an
//! already-current database is a no-op.

use rusqlite::Connection;
use std::collections::HashSet;

/// A single forward-only migration.
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

/// The ordered list of migrations making up schema v6 (SPEC_FULL.md §4.1
/// numbers these 1-6; they map directly onto `MIGRATIONS[0..6]`).
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "base memory table, FTS5 index, sync triggers",
        up: "
            CREATE TABLE memory (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'general',
                session_id TEXT,
                project_id TEXT,
                source TEXT,
                time_created INTEGER NOT NULL,
                time_updated INTEGER NOT NULL
            );

            CREATE INDEX idx_memory_session_id ON memory(session_id);
            CREATE INDEX idx_memory_category ON memory(category);
            CREATE INDEX idx_memory_project_id ON memory(project_id);

            CREATE VIRTUAL TABLE memory_fts USING fts5(
                content,
                category,
                source,
                content = 'memory',
                content_rowid = 'rowid',
                tokenize = 'porter unicode61'
            );

            CREATE TRIGGER memory_ai AFTER INSERT ON memory BEGIN
                INSERT INTO memory_fts(rowid, content, category, source)
                VALUES (new.rowid, new.content, new.category, new.source);
            END;

            CREATE TRIGGER memory_ad AFTER DELETE ON memory BEGIN
                INSERT INTO memory_fts(memory_fts, rowid, content, category, source)
                VALUES ('delete', old.rowid, old.content, old.category, old.source);
            END;

            CREATE TRIGGER memory_au AFTER UPDATE ON memory BEGIN
                INSERT INTO memory_fts(memory_fts, rowid, content, category, source)
                VALUES ('delete', old.rowid, old.content, old.category, old.source);
                INSERT INTO memory_fts(rowid, content, category, source)
                VALUES (new.rowid, new.content, new.category, new.source);
            END;
        ",
    },
    Migration {
        version: 2,
        description: "memory_tags association table",
        up: "
            CREATE TABLE memory_tags (
                memory_id TEXT NOT NULL REFERENCES memory(id) ON DELETE CASCADE,
                tag TEXT NOT NULL,
                PRIMARY KEY (memory_id, tag)
            );

            CREATE INDEX idx_memory_tags_tag ON memory_tags(tag);
        ",
    },
    Migration {
        version: 3,
        description: "access-tracking columns on memory",
        up: "
            ALTER TABLE memory ADD COLUMN access_count INTEGER NOT NULL DEFAULT 0;
            ALTER TABLE memory ADD COLUMN time_last_accessed INTEGER;
        ",
    },
    Migration {
        version: 4,
        description: "memory_links typed edges",
        up: "
            CREATE TABLE memory_links (
                source_id TEXT NOT NULL REFERENCES memory(id) ON DELETE CASCADE,
                target_id TEXT NOT NULL REFERENCES memory(id) ON DELETE CASCADE,
                relationship TEXT NOT NULL CHECK (
                    relationship IN ('related', 'supersedes', 'contradicts', 'extends')
                ),
                PRIMARY KEY (source_id, target_id)
            );

            CREATE INDEX idx_memory_links_target_id ON memory_links(target_id);
            CREATE INDEX idx_memory_links_relationship ON memory_links(relationship);
        ",
    },
    Migration {
        version: 5,
        description: "metadata key-value table",
        up: "
            CREATE TABLE metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        ",
    },
    Migration {
        version: 6,
        description: "composite and scalar indexes for list/maintenance queries",
        up: "
            CREATE INDEX idx_memory_project_category ON memory(project_id, category);
            CREATE INDEX idx_memory_time_created ON memory(time_created);
            CREATE INDEX idx_memory_access_count ON memory(access_count);
        ",
    },
];

fn ensure_migrations_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )
}

fn applied_versions(conn: &Connection) -> rusqlite::Result<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT version FROM _migrations")?;
    let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
    rows.collect()
}

/// Apply every migration not yet recorded in `_migrations`, each inside its
/// own transaction. Aborts on the first failing migration, leaving the
/// database at the last successfully-applied version.
///
/// # Errors
///
/// Returns an error if any migration's `up` statement fails.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    ensure_migrations_table(conn)?;
    let applied = applied_versions(conn)?;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_in_order_exactly_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let applied = applied_versions(&conn).unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
    }

    #[test]
    fn fts_tokenizer_is_porter_unicode61() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let sql: String = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE name = 'memory_fts'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(sql.contains("porter unicode61"));
    }

    #[test]
    fn memory_links_rejects_unknown_relationship() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO memory (id, content, category, time_created, time_updated) \
             VALUES ('a', 'x', 'general', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO memory (id, content, category, time_created, time_updated) \
             VALUES ('b', 'y', 'general', 0, 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO memory_links (source_id, target_id, relationship) VALUES ('a', 'b', 'bogus')",
            [],
        );
        assert!(result.is_err());
    }
}
