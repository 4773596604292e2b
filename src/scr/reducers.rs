//! Built-in reducer stages for the [`super::Pipeline`]'s fixed order:
//! deduplicate, supersede-writes, purge-errors, unified prune.

use super::{Message, Reducer, State};
use std::collections::HashMap;

/// Prune exact-content repeats of the same role, keeping the first
/// occurrence live.
pub struct Deduplicate;

impl Reducer for Deduplicate {
    fn name(&self) -> &'static str {
        "deduplicate"
    }

    fn apply(&self, transcript: &mut [Message], state: &mut State) {
        let mut seen: HashMap<(String, String), bool> = HashMap::new();
        for message in transcript.iter_mut() {
            if message.pruned {
                continue;
            }
            let key = (message.role.clone(), message.content.clone());
            if seen.insert(key, true).is_some() {
                message.pruned = true;
                *state.counters.entry("deduplicate.pruned".to_string()).or_insert(0) += 1;
            }
        }
    }
}

/// Prune earlier writes to the same target, keeping only the latest.
/// Targets are recognized by a `"WRITE <target>:"` content prefix; anything
/// else is left alone.
pub struct SupersedeWrites;

fn write_target(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("WRITE ")?;
    rest.split_once(':').map(|(target, _)| target)
}

impl Reducer for SupersedeWrites {
    fn name(&self) -> &'static str {
        "supersede_writes"
    }

    fn apply(&self, transcript: &mut [Message], state: &mut State) {
        let mut latest_index: HashMap<&str, usize> = HashMap::new();
        for (idx, message) in transcript.iter().enumerate() {
            if message.pruned {
                continue;
            }
            if let Some(target) = write_target(&message.content) {
                latest_index.insert(target, idx);
            }
        }

        for (idx, message) in transcript.iter_mut().enumerate() {
            if message.pruned {
                continue;
            }
            let Some(target) = write_target(&message.content) else {
                continue;
            };
            if latest_index.get(target) != Some(&idx) {
                message.pruned = true;
                *state.counters.entry("supersede_writes.pruned".to_string()).or_insert(0) += 1;
            }
        }
    }
}

/// Prune an `"ERROR:"`-prefixed message once a later message in the
/// transcript reports resolution (contains `"resolved"`, case-insensitive).
pub struct PurgeErrors;

impl Reducer for PurgeErrors {
    fn name(&self) -> &'static str {
        "purge_errors"
    }

    fn apply(&self, transcript: &mut [Message], state: &mut State) {
        let resolved_after: Vec<bool> = {
            let mut seen_resolution = false;
            let mut flags = vec![false; transcript.len()];
            for idx in (0..transcript.len()).rev() {
                flags[idx] = seen_resolution;
                if transcript[idx].content.to_lowercase().contains("resolved") {
                    seen_resolution = true;
                }
            }
            flags
        };

        for (idx, message) in transcript.iter_mut().enumerate() {
            if message.pruned || !message.content.starts_with("ERROR:") {
                continue;
            }
            if resolved_after[idx] {
                message.pruned = true;
                *state.counters.entry("purge_errors.pruned".to_string()).or_insert(0) += 1;
            }
        }
    }
}

/// Final consolidation pass: prune whatever is left with empty content.
/// Runs last so earlier stages see the full transcript before this cleanup.
pub struct UnifiedPrune;

impl Reducer for UnifiedPrune {
    fn name(&self) -> &'static str {
        "unified_prune"
    }

    fn apply(&self, transcript: &mut [Message], state: &mut State) {
        for message in transcript.iter_mut() {
            if !message.pruned && message.content.trim().is_empty() {
                message.pruned = true;
                *state.counters.entry("unified_prune.pruned".to_string()).or_insert(0) += 1;
            }
        }
    }
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
    fn deduplicate_keeps_first_occurrence_only() {
        let mut transcript = vec![
            message("1", "tool", "same output"),
            message("2", "tool", "same output"),
        ];
        let mut state = State::new("s");
        Deduplicate.apply(&mut transcript, &mut state);
        assert!(!transcript[0].pruned);
        assert!(transcript[1].pruned);
    }

    #[test]
    fn supersede_writes_keeps_only_the_latest_write_to_a_target() {
        let mut transcript = vec![
            message("1", "tool", "WRITE src/lib.rs: v1"),
            message("2", "tool", "WRITE src/lib.rs: v2"),
            message("3", "tool", "WRITE src/main.rs: v1"),
        ];
        let mut state = State::new("s");
        SupersedeWrites.apply(&mut transcript, &mut state);
        assert!(transcript[0].pruned);
        assert!(!transcript[1].pruned);
        assert!(!transcript[2].pruned);
    }

    #[test]
    fn purge_errors_prunes_only_once_resolution_follows() {
        let mut transcript = vec![
            message("1", "tool", "ERROR: build failed"),
            message("2", "assistant", "investigating"),
            message("3", "tool", "issue resolved"),
        ];
        let mut state = State::new("s");
        PurgeErrors.apply(&mut transcript, &mut state);
        assert!(transcript[0].pruned);
    }

    #[test]
    fn purge_errors_leaves_unresolved_errors_alone() {
        let mut transcript = vec![message("1", "tool", "ERROR: build failed")];
        let mut state = State::new("s");
        PurgeErrors.apply(&mut transcript, &mut state);
        assert!(!transcript[0].pruned);
    }

    #[test]
    fn unified_prune_removes_empty_content() {
        let mut transcript = vec![message("1", "tool", "   ")];
        let mut state = State::new("s");
        UnifiedPrune.apply(&mut transcript, &mut state);
        assert!(transcript[0].pruned);
    }
}
