//! Query Normalizer (SPEC_FULL.md §4.3): turns arbitrary user text into a
//! full-text query string that SQLite's FTS5 `MATCH` operator accepts
//! without throwing on stray operator syntax.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Characters FTS5 would otherwise parse as operators, or that simply have
/// no business in a query term.
const SPECIAL_CHARS: &[char] = &[
    '"', '*', '(', ')', '{', '}', '[', ']', ':', '^', '~', '!', '&', '|', '@', '#', '$', '%', '+',
    '=', '\\', '<', '>', ',', ';', '?', '/', '-', '\'',
];

/// Reserved FTS5 operator words; never allowed to survive as a standalone
/// token.
const OPERATOR_WORDS: &[&str] = &["and", "or", "not", "near"];

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "of", "to", "in", "on", "at", "for", "with", "is", "are", "was", "were",
        "be", "been", "being", "it", "its", "this", "that", "these", "those", "as", "by", "from",
        "into", "about", "than", "then", "there", "here", "so", "but", "if", "do", "does", "did",
        "has", "have", "had", "can", "could", "would", "should", "will", "shall", "may", "might",
        "i", "you", "he", "she", "we", "they", "my", "your", "his", "her", "our", "their",
    ]
    .into_iter()
    .collect()
});

fn strip_special(text: &str) -> String {
    text.chars()
        .map(|c| if SPECIAL_CHARS.contains(&c) { ' ' } else { c })
        .collect()
}

fn is_meaningful(token: &str) -> bool {
    token.chars().count() > 1 && !OPERATOR_WORDS.contains(&token) && !STOP_WORDS.contains(token)
}

/// Normalize `text` into a sanitized FTS5 query string, or an empty string
/// to signal "no query" (SPEC_FULL.md §4.3).
#[must_use]
pub fn normalize(text: &str) -> String {
    let stripped = strip_special(text);
    let lowered = stripped.to_lowercase();

    let tokens: Vec<&str> = lowered.split_whitespace().filter(|t| is_meaningful(t)).collect();
    if !tokens.is_empty() {
        return tokens.join(" ");
    }

    // Fallback: keep tokens of length >1 that aren't reserved operators,
    // even if they're stop words (step 5).
    let fallback: Vec<&str> = lowered
        .split_whitespace()
        .filter(|t| t.chars().count() > 1 && !OPERATOR_WORDS.contains(t))
        .collect();
    if !fallback.is_empty() {
        return fallback.join(" ");
    }

    // Last resort: alphanumeric-whitespace residue of the original.
    lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_special_characters() {
        let out = normalize("auth:module (JWT) [tokens]*");
        assert!(!out.contains(':'));
        assert!(!out.contains('('));
        assert!(out.contains("auth"));
        assert!(out.contains("jwt"));
    }

    #[test]
    fn drops_stop_words_and_operators() {
        let out = normalize("the AND a or NOT near module");
        assert_eq!(out, "module");
    }

    #[test]
    fn drops_single_character_tokens() {
        let out = normalize("a b c authentication");
        assert_eq!(out, "authentication");
    }

    #[test]
    fn falls_back_when_all_tokens_are_stop_words() {
        let out = normalize("the of to");
        assert_eq!(out, "the of to");
    }

    #[test]
    fn never_emits_a_bare_operator_word() {
        for text in ["and", "or not near", "AND OR"] {
            let out = normalize(text);
            assert!(out.split_whitespace().all(|t| !OPERATOR_WORDS.contains(&t)));
        }
    }

    #[test]
    fn empty_input_normalizes_to_empty_string() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }
}
