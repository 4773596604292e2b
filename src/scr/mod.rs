//! Selective Context Reduction pipeline shell (SPEC_FULL.md §4.10).
//!
//! Abstract shape only: a fixed-order list of reducers run synchronously
//! over a transcript and a per-session [`State`], each reducer annotating
//! messages as pruned without deleting them. The pipeline never performs
//! I/O itself; [`persist_state`]/[`load_state`] are the only suspension
//! points, called by the host around a pipeline run, not from within it.

pub mod reducers;

use crate::error::Result;
use crate::sync::file::atomic_write;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One transcript entry. Pruning never removes an entry; it only flips
/// `pruned` so the original transcript stays reconstructable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: String,
    pub content: String,
    pub pruned: bool,
}

/// Per-session pipeline state: counters plus the prune map, persisted to
/// disk keyed by session id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    pub session_id: String,
    pub counters: HashMap<String, i64>,
    /// message id -> whether it has been pruned, mirrored onto the
    /// transcript's own `pruned` flags but kept independently so it
    /// survives across pipeline runs on a transcript the host may have
    /// trimmed.
    pub prune_map: HashMap<String, bool>,
}

impl State {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    fn bump(&mut self, counter: &str) {
        *self.counters.entry(counter.to_string()).or_insert(0) += 1;
    }
}

/// One stage of the pipeline. Reducers are pure with respect to the
/// transcript content; the only mutation besides pruning flags is the
/// counters on `State`. Implementations must not perform I/O.
pub trait Reducer {
    fn name(&self) -> &'static str;
    fn apply(&self, transcript: &mut [Message], state: &mut State);
}

/// The fixed-order pipeline: deduplicate, supersede-writes, purge-errors,
/// then a unified prune pass (SPEC_FULL.md §4.10). Concurrency inside a run
/// is forbidden by construction: reducers run one after another over the
/// same transcript.
pub struct Pipeline {
    reducers: Vec<Box<dyn Reducer>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            reducers: vec![
                Box::new(reducers::Deduplicate),
                Box::new(reducers::SupersedeWrites),
                Box::new(reducers::PurgeErrors),
                Box::new(reducers::UnifiedPrune),
            ],
        }
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(reducers: Vec<Box<dyn Reducer>>) -> Self {
        Self { reducers }
    }

    /// Run every reducer in order over `transcript`, mutating `state`'s
    /// counters and the transcript's `pruned` flags in place. Synchronous;
    /// never suspends.
    pub fn run(&self, transcript: &mut [Message], state: &mut State) {
        for reducer in &self.reducers {
            reducer.apply(transcript, state);
            state.bump(reducer.name());
        }
        for message in transcript.iter() {
            state.prune_map.insert(message.id.clone(), message.pruned);
        }
    }
}

fn state_path(base_dir: &Path, session_id: &str) -> PathBuf {
    base_dir.join(format!("{session_id}.json"))
}

/// Persist `state` to `<base_dir>/<session_id>.json`, atomically.
///
/// # Errors
///
/// Returns an error if the state cannot be serialized or written.
pub fn persist_state(base_dir: &Path, state: &State) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    atomic_write(&state_path(base_dir, &state.session_id), &json)?;
    Ok(())
}

/// Load previously persisted state for `session_id`, or a fresh `State` if
/// none exists yet.
///
/// # Errors
///
/// Returns an error if a state file exists but cannot be parsed.
pub fn load_state(base_dir: &Path, session_id: &str) -> Result<State> {
    let path = state_path(base_dir, session_id);
    if !path.exists() {
        return Ok(State::new(session_id));
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Capability description injected into the host's system prompt, so the
/// host model knows this pipeline runs transparently over its context.
#[must_use]
pub fn capability_description() -> &'static str {
    "This session's context is passed through a selective context reduction pipeline: \
     duplicate tool outputs, superseded file writes, and resolved errors are pruned \
     from context (not deleted) to keep the transcript within budget."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, role: &str, content: &str) -> Message {
        Message {
            id: id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            pruned: false,
        }
    }

    #[test]
    fn pipeline_runs_reducers_in_fixed_order_and_bumps_counters() {
        let pipeline = Pipeline::default();
        let mut transcript = vec![message("1", "tool", "output"), message("2", "tool", "output")];
        let mut state = State::new("session-a");

        pipeline.run(&mut transcript, &mut state);

        assert!(state.counters.contains_key(reducers::Deduplicate.name()));
        assert!(state.counters.contains_key(reducers::SupersedeWrites.name()));
        assert!(state.counters.contains_key(reducers::PurgeErrors.name()));
        assert!(state.counters.contains_key(reducers::UnifiedPrune.name()));
    }

    #[test]
    fn pipeline_persists_prune_map_after_run() {
        let pipeline = Pipeline::default();
        let mut transcript = vec![message("1", "tool", "output"), message("1", "tool", "output")];
        let mut state = State::new("session-b");

        pipeline.run(&mut transcript, &mut state);
        assert!(state.prune_map.contains_key("1"));
    }

    #[test]
    fn persist_and_load_state_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut state = State::new("session-c");
        state.counters.insert("dedup".to_string(), 3);

        persist_state(dir.path(), &state).unwrap();
        let loaded = load_state(dir.path(), "session-c").unwrap();
        assert_eq!(loaded.counters.get("dedup"), Some(&3));
    }

    #[test]
    fn load_state_returns_fresh_state_when_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded = load_state(dir.path(), "never-seen").unwrap();
        assert!(loaded.counters.is_empty());
    }
}
