//! Mistake Extractor (SPEC_FULL.md §4.9): bounded-rate extraction of
//! failure signatures from external tool output, stored as `anti-pattern`
//! memories.

use crate::error::Result;
use crate::model::MemoryInput;
use crate::storage::Store;
use regex::{Regex, RegexSet};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Hard per-session cap on stored mistakes (SPEC_FULL.md §4.9).
pub const MAX_MISTAKES_PER_SESSION: usize = 10;

const CONTEXT_MAX_CHARS: usize = 300;

/// Fixed catalogue of failure-signature patterns. Named and const-style per
/// SPEC_FULL.md §9's "regex error patterns as module-level tables" note;
/// exposed so tests can build an equivalent catalogue without reaching into
/// private state.
pub static ERROR_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\btest(s)?\s+failed\b",
        r"(?i)\bassertionerror\b",
        r"(?i)\bexpected\b.*\breceived\b",
        r"(?i)\berror\[e\d+\]",
        r"(?i)\btype\s?error\b",
        r"(?i)\bsyntax\s?error\b",
        r"(?i)\bcompil(e|ation)\s+(failed|error)\b",
        r"(?i)\bcommand not found\b",
        r"(?i)\bpermission denied\b",
        r"(?i)\bno such file or directory\b",
        r"(?i)\bmerge conflict\b",
        r"(?i)CONFLICT \(",
        r"(?i)\bcould not resolve dependency\b",
        r"(?i)\bmodule not found\b",
        r"(?i)\bunresolved import\b",
    ])
    .expect("static error-pattern catalogue compiles")
});

static FALSE_POSITIVE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([r"(?i)\bwarning\b", r"(?i)\bdeprecated\b", r"(?i)\bdeprecation\b"]).unwrap()
});

static REAL_ERROR_SUBSTRINGS: &[&str] =
    &["error:", "failed", "exception", "conflict", "not found", "permission denied"];

/// A candidate extracted from one line of tool output.
struct Extracted {
    signature: String,
    context: String,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn extract_from_line(lines: &[&str], idx: usize) -> Option<Extracted> {
    let line = lines[idx];
    if !ERROR_PATTERNS.is_match(line) {
        return None;
    }

    if FALSE_POSITIVE_PATTERNS.is_match(line) {
        let has_real_error = REAL_ERROR_SUBSTRINGS.iter().any(|s| line.to_lowercase().contains(s));
        if !has_real_error {
            return None;
        }
    }

    let start = idx.saturating_sub(1);
    let end = (idx + 1).min(lines.len() - 1);
    let context = truncate_chars(&lines[start..=end].join(" "), CONTEXT_MAX_CHARS);

    Some(Extracted {
        signature: line.trim().to_string(),
        context,
    })
}

/// Scan `output` for failure signatures and store at most
/// `MAX_MISTAKES_PER_SESSION` distinct ones (deduplicated by signature
/// within this call) as `anti-pattern` memories.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn extract(
    store: &mut Store,
    tool_name: &str,
    output: &str,
    session_id: Option<&str>,
    project_id: Option<&str>,
    already_stored: usize,
) -> Result<usize> {
    let mut budget = MAX_MISTAKES_PER_SESSION.saturating_sub(already_stored);
    if budget == 0 {
        return Ok(0);
    }

    let lines: Vec<&str> = output.lines().collect();
    if lines.is_empty() {
        return Ok(0);
    }

    let mut seen_signatures = HashSet::new();
    let mut stored = 0usize;

    for idx in 0..lines.len() {
        if budget == 0 {
            break;
        }
        let Some(extracted) = extract_from_line(&lines, idx) else {
            continue;
        };
        if !seen_signatures.insert(extracted.signature.clone()) {
            continue;
        }

        store.insert(MemoryInput {
            content: extracted.context,
            category: Some("anti-pattern".to_string()),
            session_id: session_id.map(str::to_string),
            project_id: project_id.map(str::to_string),
            source: Some(format!("mistake-tracking: {tool_name}")),
            tags: vec!["anti-pattern".to_string(), "mistake".to_string(), tool_name.to_string()],
            global: false,
            force: true,
        })?;

        stored += 1;
        budget -= 1;
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_test_failure_and_compile_error() {
        assert!(ERROR_PATTERNS.is_match("3 tests failed, 2 passed"));
        assert!(ERROR_PATTERNS.is_match("error[E0382]: use of moved value"));
        assert!(ERROR_PATTERNS.is_match("bash: foo: command not found"));
    }

    #[test]
    fn suppresses_plain_warnings() {
        assert!(!ERROR_PATTERNS.is_match("warning: unused variable `x`"));
    }

    #[test]
    fn extract_stores_unique_signatures_and_respects_cap() {
        let mut store = Store::open_in_memory().unwrap();
        let output = (0..15)
            .map(|i| format!("test {i} failed: assertion mismatch"))
            .collect::<Vec<_>>()
            .join("\n");

        let stored = extract(&mut store, "pytest", &output, Some("s1"), None, 0).unwrap();
        assert!(stored <= MAX_MISTAKES_PER_SESSION);
    }

    #[test]
    fn extract_respects_already_stored_budget() {
        let mut store = Store::open_in_memory().unwrap();
        let output = "error[E0001]: first failure\nerror[E0002]: second failure";
        let stored = extract(&mut store, "cargo", output, None, None, MAX_MISTAKES_PER_SESSION - 1).unwrap();
        assert_eq!(stored, 1);
    }

    #[test]
    fn extract_skips_output_with_no_matching_patterns() {
        let mut store = Store::open_in_memory().unwrap();
        let stored = extract(&mut store, "tool", "all good here, nothing to see", None, None, 0).unwrap();
        assert_eq!(stored, 0);
    }

    #[test]
    fn warning_with_embedded_real_error_is_still_stored() {
        let mut store = Store::open_in_memory().unwrap();
        let output = "warning: deprecated api usage, error[E0499]: downstream build failed";
        let stored = extract(&mut store, "build", output, None, None, 0).unwrap();
        assert_eq!(stored, 1);
    }
}
