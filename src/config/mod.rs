//! Configuration resolution for the memory engine.
//!
//! Layered resolution, narrowest-wins (SPEC_FULL.md §10.3):
//! 1. Explicit CLI flag / explicit argument to a library call.
//! 2. `MNEMEX_DB` environment variable (the "user-data directory override").
//! 3. A `config.json` file under the platform data directory.
//! 4. Built-in defaults.

use crate::model::DEFAULT_CATEGORIES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable honored for the default database path.
pub const DB_PATH_ENV_VAR: &str = "MNEMEX_DB";

/// Environment variable that, when truthy, redirects the default data
/// directory into a `test/` subdirectory instead of `data/`.
const TEST_MODE_ENV_VAR: &str = "MNEMEX_TEST_DB";

/// Default search limit (SPEC_FULL.md §6: "invalid values ignored, keep
/// default 10").
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Recognized configuration keys (SPEC_FULL.md §6/§10.3).
///
/// Unrecognized keys in `config.json` are ignored; invalid values for a
/// recognized key fall back to that key's documented default rather than
/// aborting the load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub categories: Vec<String>,
    pub max_memories: i64,
    pub auto_recall: bool,
    pub auto_extract: bool,
    pub search_limit: u32,
    pub global_memories: bool,
    pub agent_model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|s| (*s).to_string()).collect(),
            max_memories: 0,
            auto_recall: true,
            auto_extract: true,
            search_limit: DEFAULT_SEARCH_LIMIT,
            global_memories: false,
            agent_model: None,
        }
    }
}

impl Config {
    /// Load configuration, applying field-level fallback to defaults for
    /// anything missing or invalid in the on-disk file.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_file_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Self {
        let default = Self::default();
        let Ok(raw) = std::fs::read_to_string(path) else {
            return default;
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
            return default;
        };
        merge_from_json(default, &value)
    }

    /// Persist this configuration as the on-disk `config.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self) -> crate::error::Result<()> {
        let Some(path) = config_file_path() else {
            return Err(crate::error::Error::Other(
                "could not determine config directory".to_string(),
            ));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Validate and clamp `search_limit`: non-positive values are ignored
    /// and the default prevails (boundary behavior of SPEC_FULL.md §8).
    #[must_use]
    pub fn effective_search_limit(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(n) if n > 0 => u32::try_from(n).unwrap_or(DEFAULT_SEARCH_LIMIT),
            _ => {
                if self.search_limit == 0 {
                    DEFAULT_SEARCH_LIMIT
                } else {
                    self.search_limit
                }
            }
        }
    }
}

/// Merge recognized keys from a raw JSON value onto defaults, keeping any
/// field whose JSON value is absent or fails to deserialize at its default.
fn merge_from_json(mut cfg: Config, value: &serde_json::Value) -> Config {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return cfg,
    };

    if let Some(categories) = obj.get("categories").and_then(|v| v.as_array()) {
        let list: Vec<String> = categories
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if !list.is_empty() {
            cfg.categories = list;
        }
    }
    if let Some(n) = obj.get("maxMemories").and_then(serde_json::Value::as_i64) {
        if n >= 0 {
            cfg.max_memories = n;
        }
    }
    if let Some(b) = obj.get("autoRecall").and_then(serde_json::Value::as_bool) {
        cfg.auto_recall = b;
    }
    if let Some(b) = obj.get("autoExtract").and_then(serde_json::Value::as_bool) {
        cfg.auto_extract = b;
    }
    if let Some(n) = obj.get("searchLimit").and_then(serde_json::Value::as_i64) {
        if n > 0 {
            cfg.search_limit = u32::try_from(n).unwrap_or(DEFAULT_SEARCH_LIMIT);
        }
    }
    if let Some(b) = obj.get("globalMemories").and_then(serde_json::Value::as_bool) {
        cfg.global_memories = b;
    }
    if let Some(s) = obj.get("agentModel").and_then(serde_json::Value::as_str) {
        cfg.agent_model = Some(s.to_string());
    }

    cfg
}

/// Whether test-mode redirection (`MNEMEX_TEST_DB`) is active.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var(TEST_MODE_ENV_VAR)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The platform-appropriate data directory root, honoring test mode.
fn data_dir() -> Option<PathBuf> {
    let base = directories::ProjectDirs::from("dev", "mnemex", "mnemex")?;
    let root = base.data_dir().to_path_buf();
    Some(if is_test_mode() { root.join("test") } else { root })
}

/// Path to the `config.json` file under the platform data directory.
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("config.json"))
}

/// Default database path: `<data_dir>/memory.db`.
#[must_use]
pub fn default_db_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("memory.db"))
}

/// Resolve the database path using the priority chain of SPEC_FULL.md
/// §10.3: explicit argument > `MNEMEX_DB` env var > platform default.
///
/// # Errors
///
/// Returns an error if no explicit path, env var, or platform default
/// directory could be determined.
pub fn resolve_db_path(explicit: Option<PathBuf>) -> crate::error::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Ok(path) = std::env::var(DB_PATH_ENV_VAR) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    default_db_path().ok_or_else(|| {
        crate::error::Error::Other(
            "could not determine a default database path; pass --db or set MNEMEX_DB".to_string(),
        )
    })
}
