//! Error types for bundlescout.
//!
//! Library crates use [`BundlescoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// One failed fetch candidate: the URL tried and what went wrong.
///
/// Attempts are recorded in the order the fetcher walked its candidate
/// list and surfaced only through the composed
/// [`BundlescoutError::Unavailable`] message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// Candidate URL that was tried.
    pub url: String,
    /// HTTP status line or transport error recorded for it.
    pub error: String,
}

/// Top-level error type for all bundlescout operations.
#[derive(Debug, thiserror::Error)]
pub enum BundlescoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Caller-supplied input rejected before any I/O happens.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// HTTP client construction or other non-candidate network error.
    #[error("network error: {0}")]
    Network(String),

    /// Every fetch candidate for a resource failed.
    #[error("{resource}: all {} fetch candidates failed{}", .attempts.len(), format_attempts(.attempts))]
    Unavailable {
        resource: String,
        attempts: Vec<FetchAttempt>,
    },

    /// A structured id payload was present in the page but not parsable.
    #[error("malformed bundle id payload ({context}): {source}")]
    Payload {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BundlescoutError>;

impl BundlescoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an invalid-input error from any displayable message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render the numbered attempt trail appended to `Unavailable` messages.
fn format_attempts(attempts: &[FetchAttempt]) -> String {
    let mut out = String::new();
    for (i, attempt) in attempts.iter().enumerate() {
        out.push_str(&format!("\n  {}. {} => {}", i + 1, attempt.url, attempt.error));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BundlescoutError::config("missing home directory");
        assert_eq!(err.to_string(), "config error: missing home directory");

        let err = BundlescoutError::invalid_input("subject id must not be blank");
        assert!(err.to_string().contains("must not be blank"));
    }

    #[test]
    fn unavailable_renders_numbered_trail() {
        let err = BundlescoutError::Unavailable {
            resource: "bundle 8216".into(),
            attempts: vec![
                FetchAttempt {
                    url: "https://store.example/bundle/8216/".into(),
                    error: "HTTP 403 Forbidden".into(),
                },
                FetchAttempt {
                    url: "https://proxy.example/https://store.example/bundle/8216/".into(),
                    error: "connection refused".into(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.starts_with("bundle 8216: all 2 fetch candidates failed"));
        assert!(msg.contains("\n  1. https://store.example/bundle/8216/ => HTTP 403 Forbidden"));
        assert!(msg.contains("\n  2. https://proxy.example/"));
    }

    #[test]
    fn payload_error_keeps_parse_cause() {
        let cause = serde_json::from_str::<Vec<u64>>("[1, oops]").unwrap_err();
        let err = BundlescoutError::Payload {
            context: "data-ds-bundleids".into(),
            source: cause,
        };
        assert!(err.to_string().contains("data-ds-bundleids"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
