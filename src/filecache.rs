//! File Knowledge Cache (SPEC_FULL.md §4.8): at most one live memory per
//! absolute file path, fingerprinted by git blob hash and mtime so repeated
//! scans of an unchanged file are no-ops.

use crate::error::Result;
use crate::model::{Memory, MemoryInput, MemoryPatch};
use crate::storage::Store;
use std::collections::HashSet;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Canonical project metadata files considered by `scan_on_startup`.
const CANONICAL_FILES: &[&str] = &[
    "README.md",
    "package.json",
    "Cargo.toml",
    "pyproject.toml",
    "go.mod",
    ".editorconfig",
];

const MAX_SCAN_FILE_BYTES: u64 = 50 * 1024;
const MAX_CHUNKS_PER_FILE: usize = 5;
const MAX_CHUNK_CHARS: usize = 400;
const GIT_TIMEOUT: Duration = Duration::from_secs(3);
const MTIME_FRESH_TOLERANCE_MS: i64 = 1000;

/// Result of `check_freshness`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FreshnessCheck {
    pub fresh: bool,
    pub stored_content: Option<String>,
}

fn filepath_tag(path: &str) -> String {
    format!("filepath:{}", path.to_lowercase())
}

fn is_fingerprint_tag(tag: &str) -> bool {
    tag.starts_with("filepath:") || tag.starts_with("git:") || tag.starts_with("mtime:")
}

/// Current git blob hash for `path`, if the working tree is under git and
/// the lookup completes within `GIT_TIMEOUT`. Silent on any failure.
fn git_hash(path: &Path) -> Option<String> {
    let mut child = Command::new("git")
        .arg("log")
        .arg("-1")
        .arg("--format=%H")
        .arg("--")
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let started = Instant::now();
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            if !status.success() {
                return None;
            }
            let output = child.wait_with_output().ok()?;
            let hash = String::from_utf8(output.stdout).ok()?.trim().to_string();
            return if hash.is_empty() { None } else { Some(hash) };
        }
        if started.elapsed() > GIT_TIMEOUT {
            let _ = child.kill();
            return None;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Filesystem modification time in milliseconds since the epoch. Silent on
/// any failure (missing file, unsupported platform clock).
fn mtime_millis(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let millis = modified.duration_since(UNIX_EPOCH).ok()?.as_millis();
    i64::try_from(millis).ok()
}

fn fingerprint(path: &Path) -> (Option<String>, Option<i64>) {
    (git_hash(path), mtime_millis(path))
}

fn find_by_path(store: &Store, path: &str, project_id: Option<&str>) -> Result<Option<Memory>> {
    let hits = store.search_by_tag(&filepath_tag(path), project_id, 1)?;
    Ok(hits.into_iter().next())
}

/// Compare the current on-disk fingerprint of `path` against the fingerprint
/// stored on its cache memory. Returns `None` if no memory exists yet for
/// this path.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn check_freshness(store: &Store, path: &str, project_id: Option<&str>) -> Result<Option<FreshnessCheck>> {
    let Some(memory) = find_by_path(store, path, project_id)? else {
        return Ok(None);
    };

    let tags = store.tags_get(&memory.id)?;
    let stored_git = tags.iter().find_map(|t| t.strip_prefix("git:").map(str::to_string));
    let stored_mtime: Option<i64> = tags
        .iter()
        .find_map(|t| t.strip_prefix("mtime:").and_then(|v| v.parse().ok()));

    let (current_git, current_mtime) = fingerprint(Path::new(path));

    let fresh = match (&current_git, &stored_git) {
        (Some(current), Some(stored)) => current == stored,
        _ => match (current_mtime, stored_mtime) {
            (Some(current), Some(stored)) => (current - stored).abs() < MTIME_FRESH_TOLERANCE_MS,
            _ => false,
        },
    };

    Ok(Some(FreshnessCheck {
        fresh,
        stored_content: Some(memory.content),
    }))
}

/// Insert or refresh the cache memory for `path`: updates content and
/// fingerprint tags if one exists, preserving any non-fingerprint tags, or
/// inserts a fresh memory bypassing the deduplicator otherwise.
///
/// # Errors
///
/// Returns an error on database failure or invalid content.
pub fn upsert(
    store: &mut Store,
    path: &str,
    content: &str,
    tags: &[String],
    source: Option<&str>,
    session_id: Option<&str>,
    project_id: Option<&str>,
) -> Result<Memory> {
    let (git, mtime) = fingerprint(Path::new(path));
    let mut fingerprint_tags = vec![filepath_tag(path)];
    if let Some(git) = &git {
        fingerprint_tags.push(format!("git:{git}"));
    }
    if let Some(mtime) = mtime {
        fingerprint_tags.push(format!("mtime:{mtime}"));
    }

    if let Some(existing) = find_by_path(store, path, project_id)? {
        store.update(
            &existing.id,
            MemoryPatch {
                content: Some(content.to_string()),
                source: source.map(str::to_string),
                ..Default::default()
            },
        )?;

        let preserved: Vec<String> = store
            .tags_get(&existing.id)?
            .into_iter()
            .filter(|t| !is_fingerprint_tag(t))
            .collect();
        let mut all_tags = fingerprint_tags;
        all_tags.extend(preserved);
        all_tags.extend(tags.iter().cloned());
        store.tags_set(&existing.id, &all_tags)?;

        store.get(&existing.id)?.ok_or_else(|| crate::error::Error::NotFound {
            kind: "memory",
            id: existing.id,
        })
    } else {
        let mut all_tags = fingerprint_tags;
        all_tags.extend(tags.iter().cloned());
        store.insert(MemoryInput {
            content: content.to_string(),
            category: Some("general".to_string()),
            session_id: session_id.map(str::to_string),
            project_id: project_id.map(str::to_string),
            source: source.map(str::to_string),
            tags: all_tags,
            global: false,
            force: true,
        })
    }
}

fn summarize_manifest(file_name: &str, raw: &str) -> String {
    if file_name == "package.json" {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
            let name = value.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
            let version = value.get("version").and_then(|v| v.as_str()).unwrap_or("unknown");
            let deps = value
                .get("dependencies")
                .and_then(|v| v.as_object())
                .map_or(0, serde_json::Map::len);
            return format!("package.json: {name}@{version}, {deps} dependencies");
        }
    }
    raw.chars().take(MAX_CHUNK_CHARS).collect()
}

fn chunk_by_section(raw: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in raw.lines() {
        let starts_new_section = line.starts_with('#') || line.trim().is_empty();
        if starts_new_section && !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(|c| c.chars().take(MAX_CHUNK_CHARS).collect())
        .take(MAX_CHUNKS_PER_FILE)
        .collect()
}

static SCANNED_THIS_RUN: Mutex<Option<HashSet<String>>> = Mutex::new(None);

fn already_scanned_this_run(key: &str) -> bool {
    let mut guard = SCANNED_THIS_RUN.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let set = guard.get_or_insert_with(HashSet::new);
    !set.insert(key.to_string())
}

/// Scan `directory` for a fixed list of canonical project metadata files,
/// upserting a cache memory (or chunked memories) for each file that is
/// missing or stale. Silently skips anything over the size cap, already
/// fresh, or already scanned earlier in this process.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn scan_on_startup(store: &mut Store, directory: &Path, project_id: Option<&str>) -> Result<Vec<Memory>> {
    let mut touched = Vec::new();

    for file_name in CANONICAL_FILES {
        let path = directory.join(file_name);
        let Ok(metadata) = std::fs::metadata(&path) else {
            continue;
        };
        if metadata.len() > MAX_SCAN_FILE_BYTES {
            continue;
        }

        let path_str = path.to_string_lossy().to_string();
        if already_scanned_this_run(&path_str) {
            continue;
        }
        if let Some(freshness) = check_freshness(store, &path_str, project_id)? {
            if freshness.fresh {
                continue;
            }
        }

        let Ok(raw) = std::fs::read_to_string(&path) else {
            continue;
        };

        let is_manifest = matches!(*file_name, "package.json" | "Cargo.toml" | "pyproject.toml" | "go.mod");
        if is_manifest {
            let summary = summarize_manifest(file_name, &raw);
            touched.push(upsert(store, &path_str, &summary, &[], Some("filecache:scan"), None, project_id)?);
        } else {
            for (idx, chunk) in chunk_by_section(&raw).into_iter().enumerate() {
                let chunk_path = format!("{path_str}#chunk{idx}");
                touched.push(upsert(store, &chunk_path, &chunk, &[], Some("filecache:scan"), None, project_id)?);
            }
        }
    }

    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn upsert_then_check_freshness_reports_fresh_at_same_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.md");
        fs::write(&path, "hello world").unwrap();
        let path_str = path.to_string_lossy().to_string();

        let mut store = Store::open_in_memory().unwrap();
        upsert(&mut store, &path_str, "hello world", &[], None, None, None).unwrap();

        let check = check_freshness(&store, &path_str, None).unwrap().unwrap();
        assert!(check.fresh);
        assert_eq!(check.stored_content.as_deref(), Some("hello world"));
    }

    #[test]
    fn upsert_replaces_content_and_preserves_non_fingerprint_tags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.md");
        fs::write(&path, "v1").unwrap();
        let path_str = path.to_string_lossy().to_string();

        let mut store = Store::open_in_memory().unwrap();
        let first = upsert(&mut store, &path_str, "v1", &["keep-me".to_string()], None, None, None).unwrap();

        fs::write(&path, "v2 is different content").unwrap();
        let second = upsert(&mut store, &path_str, "v2 is different content", &[], None, None, None).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "v2 is different content");
        let tags = store.tags_get(&second.id).unwrap();
        assert!(tags.contains(&"keep-me".to_string()));
    }

    #[test]
    fn check_freshness_returns_none_when_no_memory_exists() {
        let store = Store::open_in_memory().unwrap();
        assert!(check_freshness(&store, "/no/such/path", None).unwrap().is_none());
    }

    #[test]
    fn chunk_by_section_bounds_count_and_length() {
        let raw = "# A\n".to_string() + &"x".repeat(1000) + "\n\n# B\ntext\n\n# C\ntext\n\n# D\ntext\n\n# E\ntext\n\n# F\ntext\n";
        let chunks = chunk_by_section(&raw);
        assert!(chunks.len() <= MAX_CHUNKS_PER_FILE);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_CHUNK_CHARS));
    }
}
