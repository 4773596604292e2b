//! Error types for the memory engine.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes, used only by the CLI binary's `main()`
//! - Retryability flags for agent self-correction
//! - Structured JSON output for the `--json` CLI surface and the tool layer
//!
//! The five kinds below correspond 1:1 to the error kinds of the memory
//! engine's design: Validation, Not found, Init failure, Query failure, and
//! Transient I/O. Not-found conditions are handled internally as
//! `Option::None`/`bool` at almost every call site (per the design:
//! "update/delete/refresh/link on an unknown id -> null or false, never
//! thrown"); `Error::NotFound` exists for the few callers — direct `get`
//! by id in the CLI — that want a proper error instead of a silent `None`.

use thiserror::Error;

/// Result type alias for memory engine operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Validation,
    NotFound,
    InitFailed,
    QueryFailed,
    Io,
    Database,
    Json,
    Internal,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::NotFound => "NOT_FOUND",
            Self::InitFailed => "INIT_FAILED",
            Self::QueryFailed => "QUERY_FAILED",
            Self::Io => "IO_ERROR",
            Self::Database => "DATABASE_ERROR",
            Self::Json => "JSON_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code, used only by the CLI binary.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::InitFailed | Self::Database => 2,
            Self::NotFound => 3,
            Self::Validation => 4,
            Self::QueryFailed => 5,
            Self::Io | Self::Json => 6,
        }
    }

    /// Whether an agent should retry with corrected input.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Validation | Self::QueryFailed)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in memory engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty/overlength content, unknown link relationship, missing link
    /// endpoint, or any other caller-input problem surfaced to the caller.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Used for the rare call site (direct `get`-by-id) that wants a proper
    /// error instead of the usual `Option::None`/`bool` not-found contract.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Migration or database-open failure. Latched process-wide: once this
    /// happens, every subsequent request must fail fast with the same error
    /// rather than retrying the migration (see `storage::sqlite::Handle`).
    #[error("Database unavailable: {0}")]
    InitFailed(String),

    /// A malformed full-text query raised by the full-text engine. Most
    /// call sites log this and degrade to an empty result set rather than
    /// propagate it; this variant exists for callers that want to know why.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InitFailed(_) => ErrorCode::InitFailed,
            Self::QueryFailed(_) => ErrorCode::QueryFailed,
            Self::Database(_) => ErrorCode::Database,
            Self::Io(_) => ErrorCode::Io,
            Self::Json(_) => ErrorCode::Json,
            Self::Other(_) => ErrorCode::Internal,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`. Only the
    /// CLI binary's `main()` consults this; the library never exits.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint for agents and humans.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Validation(msg) => {
                if msg.contains("content") {
                    Some("Content must be non-empty and at most 10,000 characters.".to_string())
                } else if msg.contains("relationship") {
                    Some("Valid relationships: related, supersedes, contradicts, extends.".to_string())
                } else {
                    None
                }
            }
            Self::InitFailed(_) => Some(
                "The database failed to open or migrate in this process. \
                 Check the configured db path and restart the process."
                    .to_string(),
            ),
            Self::NotFound { kind, id } => Some(format!("No {kind} with id '{id}'.")),
            Self::QueryFailed(_) | Self::Database(_) | Self::Io(_) | Self::Json(_) | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption: the
    /// tool-surface functions of §6 and the `--json` CLI format both use
    /// this instead of returning the raw `Display` string.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_exit_code_four() {
        let err = Error::Validation("content is empty".to_string());
        assert_eq!(err.exit_code(), 4);
        assert!(err.error_code().is_retryable());
    }

    #[test]
    fn init_failed_is_not_retryable() {
        let err = Error::InitFailed("migration v3 failed".to_string());
        assert!(!err.error_code().is_retryable());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn structured_json_has_expected_shape() {
        let err = Error::NotFound {
            kind: "memory",
            id: "abc".to_string(),
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].is_string());
    }
}
