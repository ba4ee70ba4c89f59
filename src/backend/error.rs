//! Error types for retrieval backends.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

/// Broad category of a retrieval failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalErrorKind {
    /// The backend could not locate a playable stream.
    ExtractionFailed,
    /// Connectivity, DNS, HTTP or timeout problem.
    NetworkError,
    /// No handler exists for this source (or the URL is not retrievable at all).
    Unsupported,
    /// Anything else, including backend crashes.
    Other,
}

impl RetrievalErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtractionFailed => "extraction failed",
            Self::NetworkError => "network error",
            Self::Unsupported => "unsupported",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RetrievalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed retrieval: a kind plus a human-readable reason.
///
/// Per-task errors never cross the worker boundary; the dispatcher stores
/// them inside the task's result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RetrievalError {
    kind: RetrievalErrorKind,
    message: String,
}

impl RetrievalError {
    pub fn new(kind: RetrievalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn extraction_failed(message: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::ExtractionFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::NetworkError, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::Unsupported, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(RetrievalErrorKind::Other, message)
    }

    /// A retrieval that exceeded the per-task time limit.
    #[must_use]
    pub fn timeout(limit: Duration) -> Self {
        Self::network(format!("timed out after {limit:?}"))
    }

    #[must_use]
    pub fn kind(&self) -> RetrievalErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while setting up a backend (not per task).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend executable is not on `PATH`.
    #[error("backend executable '{name}' not found on PATH")]
    NotFound { name: String },

    /// An explicitly configured executable does not exist.
    #[error("backend executable {path} does not exist")]
    MissingExecutable { path: PathBuf },
}

#[allow(clippy::expect_used)]
static UNSUPPORTED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)unsupported url|no suitable extractor|is not a valid url")
        .expect("unsupported pattern is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static NETWORK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)http error \d{3}|unable to download webpage|connection (refused|reset|aborted)|timed out|name or service not known|getaddrinfo|temporary failure in name resolution|network is unreachable|ssl|certificate",
    )
    .expect("network pattern is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static EXTRACTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)requested format is not available|no video formats found|unable to extract|video unavailable|this video is (private|unavailable)|drm protected",
    )
    .expect("extraction pattern is valid") // Static pattern, safe to panic
});

/// Classifies backend diagnostic output into a [`RetrievalErrorKind`].
///
/// Unsupported sources are checked first because the backend often also
/// prints generic download errors for them.
#[must_use]
pub fn classify_backend_output(stderr: &str) -> RetrievalErrorKind {
    if UNSUPPORTED_PATTERN.is_match(stderr) {
        RetrievalErrorKind::Unsupported
    } else if EXTRACTION_PATTERN.is_match(stderr) {
        RetrievalErrorKind::ExtractionFailed
    } else if NETWORK_PATTERN.is_match(stderr) {
        RetrievalErrorKind::NetworkError
    } else {
        RetrievalErrorKind::Other
    }
}

/// Picks the most useful line of backend diagnostics for a failure message.
///
/// Prefers the last `ERROR:` line, then the last non-empty line.
#[must_use]
pub fn summarize_backend_output(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map_or_else(
            || "backend exited without diagnostics".to_string(),
            |line| line.trim_start_matches("ERROR:").trim().to_string(),
        )
}
