//! Maintenance (SPEC_FULL.md §4.6): index optimization, vacuum, age-based
//! purge, and cap enforcement, run on a 7-day cadence via `maybe_run`.

use crate::storage::Store;
use chrono::Utc;
use serde::{Deserialize, Serialize};

const MAINTENANCE_INTERVAL_DAYS: i64 = 7;
const METADATA_KEY: &str = "last_maintenance";

/// Outcome of `run`: every step is independently fallible and its failure
/// is reported here rather than raised, per SPEC_FULL.md §4.6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub optimized: bool,
    pub optimize_error: Option<String>,
    pub capped: Option<usize>,
    pub cap_error: Option<String>,
    pub db_size_bytes: Option<i64>,
}

/// Delete memories older than `older_than_days` with zero access history.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn purge(store: &mut Store, older_than_days: i64) -> crate::error::Result<usize> {
    let cutoff = Utc::now().timestamp() - older_than_days * 86_400;
    let ids = store.purge_candidates(cutoff)?;
    store.delete_many(&ids)
}

/// If `max_memories` is configured (>0) and the store is over it, delete the
/// lowest-value rows (`access_count ASC, time_created ASC`) until at cap.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn enforce_cap(store: &mut Store, max_memories: i64) -> crate::error::Result<usize> {
    if max_memories <= 0 {
        return Ok(0);
    }
    let total = store.total_count()?;
    let overflow = total - max_memories;
    if overflow <= 0 {
        return Ok(0);
    }
    let ids = store.lowest_value_ids(overflow)?;
    store.delete_many(&ids)
}

/// Run the full maintenance pass unconditionally: optimize the full-text
/// index, enforce the configured cap, then measure database size. Never
/// raises; failures are recorded as fields on the returned report.
#[must_use]
pub fn run(store: &mut Store, max_memories: i64) -> MaintenanceReport {
    let (optimized, optimize_error) = match store.fts_optimize() {
        Ok(()) => (true, None),
        Err(err) => (false, Some(err.to_string())),
    };

    let (capped, cap_error) = match enforce_cap(store, max_memories) {
        Ok(n) => (Some(n), None),
        Err(err) => (None, Some(err.to_string())),
    };

    let db_size_bytes = store.db_size_bytes().ok();

    MaintenanceReport {
        optimized,
        optimize_error,
        capped,
        cap_error,
        db_size_bytes,
    }
}

/// Run maintenance only if at least `MAINTENANCE_INTERVAL_DAYS` have passed
/// since the last run, stamping `last_maintenance` metadata on success.
/// Returns `None` if skipped.
///
/// # Errors
///
/// Returns an error only if reading/writing the `last_maintenance`
/// metadata key fails; the maintenance pass itself never raises.
pub fn maybe_run(store: &mut Store, max_memories: i64) -> crate::error::Result<Option<MaintenanceReport>> {
    let now = Utc::now().timestamp();
    if let Some(last) = store.metadata_get(METADATA_KEY)? {
        if let Ok(last) = last.parse::<i64>() {
            if now - last < MAINTENANCE_INTERVAL_DAYS * 86_400 {
                return Ok(None);
            }
        }
    }

    let report = run(store, max_memories);
    store.metadata_set(METADATA_KEY, &now.to_string())?;
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryInput;

    fn insert(store: &mut Store, content: &str) -> String {
        store
            .insert(MemoryInput {
                content: content.to_string(),
                ..Default::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn purge_removes_only_untouched_stale_memories() {
        let mut store = Store::open_in_memory().unwrap();
        let stale_id = insert(&mut store, "stale memory");
        store.connection().execute(
            "UPDATE memory SET time_created = ?1 WHERE id = ?2",
            rusqlite::params![Utc::now().timestamp() - 100 * 86_400, stale_id],
        ).unwrap();

        let fresh_id = insert(&mut store, "fresh memory");
        store.refresh(&fresh_id).unwrap();
        store.connection().execute(
            "UPDATE memory SET time_created = ?1 WHERE id = ?2",
            rusqlite::params![Utc::now().timestamp() - 100 * 86_400, fresh_id],
        ).unwrap();

        let purged = purge(&mut store, 30).unwrap();
        assert_eq!(purged, 1);
        assert!(store.get(&stale_id).unwrap().is_none());
        assert!(store.get(&fresh_id).unwrap().is_some());
    }

    #[test]
    fn enforce_cap_is_noop_when_unconfigured() {
        let mut store = Store::open_in_memory().unwrap();
        insert(&mut store, "a");
        insert(&mut store, "b");
        assert_eq!(enforce_cap(&mut store, 0).unwrap(), 0);
    }

    #[test]
    fn enforce_cap_deletes_lowest_value_rows_over_cap() {
        let mut store = Store::open_in_memory().unwrap();
        for i in 0..5 {
            insert(&mut store, &format!("memory {i}"));
        }
        let removed = enforce_cap(&mut store, 3).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.total_count().unwrap(), 3);
    }

    #[test]
    fn maybe_run_skips_within_seven_days_then_runs_after() {
        let mut store = Store::open_in_memory().unwrap();
        insert(&mut store, "one");

        let first = maybe_run(&mut store, 0).unwrap();
        assert!(first.is_some());

        let second = maybe_run(&mut store, 0).unwrap();
        assert!(second.is_none());

        let eight_days_ago = Utc::now().timestamp() - 8 * 86_400;
        store.metadata_set(METADATA_KEY, &eight_days_ago.to_string()).unwrap();
        let third = maybe_run(&mut store, 0).unwrap();
        assert!(third.is_some());
    }
}
