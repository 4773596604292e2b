//! The JSON-in/string-out tool surface (SPEC_FULL.md §6), consumed by host
//! agent runtimes. Every function here takes a JSON request string and
//! returns a JSON response string; nothing panics on bad input, and every
//! error is converted to [`crate::error::Error::to_structured_json`] rather
//! than propagated (SPEC_FULL.md §7: "the tool-layer wraps every call in a
//! catch-all that converts exceptions into a formatted error string").

use crate::config;
use crate::dedup;
use crate::error::{Error, Result};
use crate::filecache;
use crate::maintenance;
use crate::model::{ListFilter, Memory, MemoryInput, MemoryPatch, Relationship, Scope};
use crate::storage::{self, Store};
use crate::sync::{self, ExportDocument};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

fn parse_scope(scope: Option<&str>) -> Scope {
    match scope {
        Some("project") => Scope::Project,
        Some("global") => Scope::Global,
        _ => Scope::All,
    }
}

fn run<T, F>(f: F) -> String
where
    T: Serialize,
    F: FnOnce(&mut Store) -> Result<T>,
{
    let outcome = config::resolve_db_path(None).and_then(|path| storage::with_store(&path, f));
    match outcome {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|err| Error::from(err).to_structured_json().to_string()),
        Err(err) => err.to_structured_json().to_string(),
    }
}

fn parse_request<'a, T: Deserialize<'a>>(input: &'a str) -> Result<T> {
    serde_json::from_str(input).map_err(|e| Error::Validation(format!("invalid request: {e}")))
}

fn dispatch<T, F>(input: &str, f: impl FnOnce(T) -> String) -> String
where
    T: for<'a> Deserialize<'a>,
{
    match parse_request::<T>(input) {
        Ok(request) => f(request),
        Err(err) => err.to_structured_json().to_string(),
    }
}

// ── memory_store ─────────────────────────────────────────────

#[derive(Deserialize)]
struct StoreRequest {
    content: String,
    category: Option<String>,
    session_id: Option<String>,
    project_id: Option<String>,
    source: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    global: bool,
    #[serde(default)]
    force: bool,
}

/// `memory_store`: insert a memory (subject to deduplication unless
/// `force` is set).
#[must_use]
pub fn memory_store(input: &str) -> String {
    dispatch::<StoreRequest, _>(input, |req| {
        run(move |store| {
            store.insert(MemoryInput {
                content: req.content,
                category: req.category,
                session_id: req.session_id,
                project_id: req.project_id,
                source: req.source,
                tags: req.tags,
                global: req.global,
                force: req.force,
            })
        })
    })
}

// ── memory_search ────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    project_id: Option<String>,
    scope: Option<String>,
    /// A non-positive value is ignored and the configured default prevails
    /// (SPEC_FULL.md §8 boundary: `searchLimit = -5` is ignored).
    limit: Option<i64>,
}

/// `memory_search`: normalize, full-text search, and re-rank.
#[must_use]
pub fn memory_search(input: &str) -> String {
    dispatch::<SearchRequest, _>(input, |req| {
        let limit = config::Config::load().effective_search_limit(req.limit);
        run(move |store| store.search(&req.query, parse_scope(req.scope.as_deref()), req.project_id.as_deref(), limit))
    })
}

// ── memory_update ────────────────────────────────────────────

#[derive(Deserialize)]
struct UpdateRequest {
    id: String,
    content: Option<String>,
    category: Option<String>,
    source: Option<String>,
    session_id: Option<String>,
    #[serde(default)]
    project_id: Option<Option<String>>,
}

/// `memory_update`: patch fields on an existing memory. Returns `null` (not
/// an error) for an unknown id.
#[must_use]
pub fn memory_update(input: &str) -> String {
    dispatch::<UpdateRequest, _>(input, |req| {
        run(move |store| {
            store.update(
                &req.id,
                MemoryPatch {
                    content: req.content,
                    category: req.category,
                    source: req.source,
                    session_id: req.session_id,
                    project_id: req.project_id,
                },
            )
        })
    })
}

// ── memory_delete ────────────────────────────────────────────

#[derive(Deserialize)]
struct DeleteRequest {
    id: String,
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

/// `memory_delete`: remove a memory and every tag/link touching it.
#[must_use]
pub fn memory_delete(input: &str) -> String {
    dispatch::<DeleteRequest, _>(input, |req| {
        run(move |store| store.delete(&req.id).map(|deleted| DeleteResponse { deleted }))
    })
}

// ── memory_list ───────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct ListRequest {
    category: Option<String>,
    project_id: Option<String>,
    session_id: Option<String>,
    scope: Option<String>,
    limit: Option<u32>,
}

/// `memory_list`: list memories under a scope/filter.
#[must_use]
pub fn memory_list(input: &str) -> String {
    dispatch::<ListRequest, _>(input, |req| {
        run(move |store| {
            store.list(ListFilter {
                category: req.category,
                project_id: req.project_id,
                session_id: req.session_id,
                scope: parse_scope(req.scope.as_deref()),
                limit: req.limit.unwrap_or_else(ListFilter::default_limit),
            })
        })
    })
}

// ── memory_stats ──────────────────────────────────────────────

/// `memory_stats`: total count and per-category breakdown. Takes no
/// meaningful request fields; `input` may be `"{}"`.
#[must_use]
pub fn memory_stats(_input: &str) -> String {
    run(|store| store.stats())
}

// ── memory_refresh ────────────────────────────────────────────

#[derive(Deserialize)]
struct RefreshRequest {
    id: String,
}

/// `memory_refresh`: bump access tracking on a memory, as if it had been
/// returned by a search.
#[must_use]
pub fn memory_refresh(input: &str) -> String {
    dispatch::<RefreshRequest, _>(input, |req| run(move |store| store.refresh(&req.id)))
}

// ── memory_tag ────────────────────────────────────────────────

#[derive(Deserialize)]
struct TagRequest {
    action: String,
    id: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    tag: Option<String>,
    project_id: Option<String>,
    limit: Option<u32>,
}

fn require_id(id: Option<String>) -> Result<String> {
    id.ok_or_else(|| Error::Validation("id is required".to_string()))
}

fn require_tag(tag: Option<String>) -> Result<String> {
    tag.ok_or_else(|| Error::Validation("tag is required".to_string()))
}

/// `memory_tag`: dispatch on `action` (`add`, `remove`, `list`, `list_all`,
/// `search`). Required fields are validated before the store is touched, so
/// a malformed request never opens the database.
///
/// `tags_set` (replace-wholesale) is deliberately not exposed here: it is
/// reachable only through the CLI's `tag set` subcommand and `filecache`'s
/// internal fingerprint-tag bookkeeping, not through this external contract.
#[must_use]
pub fn memory_tag(input: &str) -> String {
    dispatch::<TagRequest, _>(input, |req| {
        let validated = match req.action.as_str() {
            "add" | "remove" | "list" => require_id(req.id.clone()).map(|_| ()),
            "search" => require_tag(req.tag.clone()).map(|_| ()),
            "list_all" => Ok(()),
            other => Err(Error::Validation(format!("unknown tag action: {other}"))),
        };
        if let Err(err) = validated {
            return err.to_structured_json().to_string();
        }

        match req.action.as_str() {
            "add" => run(move |store| -> Result<Value> { Ok(json!(store.tags_add(&req.id.unwrap(), &req.tags)?)) }),
            "remove" => run(move |store| -> Result<Value> { Ok(json!(store.tags_remove(&req.id.unwrap(), &req.tags)?)) }),
            "list" => run(move |store| -> Result<Value> { Ok(json!(store.tags_get(&req.id.unwrap())?)) }),
            "list_all" => run(|store| -> Result<Value> { Ok(json!(store.tags_list_all()?)) }),
            "search" => run(move |store| -> Result<Value> {
                Ok(json!(store.search_by_tag(&req.tag.unwrap(), req.project_id.as_deref(), req.limit.unwrap_or(20))?))
            }),
            _ => unreachable!("validated above"),
        }
    })
}

// ── memory_link ───────────────────────────────────────────────

#[derive(Deserialize)]
struct LinkRequest {
    action: String,
    source: Option<String>,
    target: Option<String>,
    relationship: Option<String>,
    id: Option<String>,
}

/// `memory_link`: dispatch on `action` (`link`, `unlink`, `list`).
/// Required fields (and, for `link`, the relationship string) are
/// validated before the store is touched.
#[must_use]
pub fn memory_link(input: &str) -> String {
    dispatch::<LinkRequest, _>(input, |req| {
        let validated: Result<()> = match req.action.as_str() {
            "link" => require_id(req.source.clone())
                .and_then(|_| require_id(req.target.clone()))
                .and_then(|_| {
                    req.relationship
                        .as_deref()
                        .and_then(Relationship::from_str_opt)
                        .ok_or_else(|| Error::Validation("unknown link relationship".to_string()))
                })
                .map(|_| ()),
            "unlink" => require_id(req.source.clone()).and_then(|_| require_id(req.target.clone())).map(|_| ()),
            "list" => require_id(req.id.clone()).map(|_| ()),
            other => Err(Error::Validation(format!("unknown link action: {other}"))),
        };
        if let Err(err) = validated {
            return err.to_structured_json().to_string();
        }

        match req.action.as_str() {
            "link" => run(move |store| -> Result<Value> {
                let rel = Relationship::from_str_opt(req.relationship.as_deref().unwrap()).unwrap();
                Ok(json!({ "linked": store.link_add(&req.source.unwrap(), &req.target.unwrap(), rel)? }))
            }),
            "unlink" => run(move |store| -> Result<Value> {
                Ok(json!({ "unlinked": store.link_remove(&req.source.unwrap(), &req.target.unwrap())? }))
            }),
            "list" => run(move |store| -> Result<Value> { Ok(json!(store.link_list(&req.id.unwrap())?)) }),
            _ => unreachable!("validated above"),
        }
    })
}

// ── memory_cleanup ────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct CleanupRequest {
    purge_days: Option<i64>,
    #[serde(default)]
    vacuum: bool,
}

/// `memory_cleanup`: optimize, optionally purge and vacuum, enforce the
/// configured cap.
#[must_use]
pub fn memory_cleanup(input: &str) -> String {
    dispatch::<CleanupRequest, _>(input, |req| {
        run(move |store| -> Result<Value> {
            let cfg = config::Config::load();
            if let Some(days) = req.purge_days {
                maintenance::purge(store, days)?;
            }
            if req.vacuum {
                store.vacuum()?;
            }
            let report = maintenance::run(store, cfg.max_memories);
            Ok(json!(report))
        })
    })
}

// ── memory_export / memory_import ────────────────────────────

/// `memory_export`: the whole store as a single v1 JSON document.
#[must_use]
pub fn memory_export(_input: &str) -> String {
    run(|store| sync::export_all(store))
}

#[derive(Deserialize)]
struct ImportRequest {
    document: ExportDocument,
}

/// `memory_import`: restore a v1 JSON document, remapping ids for newly
/// inserted memories and skipping ids that already exist.
#[must_use]
pub fn memory_import(input: &str) -> String {
    dispatch::<ImportRequest, _>(input, |req| {
        if req.document.version != sync::types::EXPORT_VERSION {
            return Error::Validation(format!("unsupported export version: {}", req.document.version))
                .to_structured_json()
                .to_string();
        }
        run(move |store| sync::import_all(store, &req.document))
    })
}

// ── memory_file_check ────────────────────────────────────────

#[derive(Deserialize)]
struct FileCheckRequest {
    path: String,
    project_id: Option<String>,
}

/// `memory_file_check`: consult the file knowledge cache's freshness check
/// for a single path.
#[must_use]
pub fn memory_file_check(input: &str) -> String {
    dispatch::<FileCheckRequest, _>(input, |req| {
        run(move |store| filecache::check_freshness(store, &req.path, req.project_id.as_deref()))
    })
}
