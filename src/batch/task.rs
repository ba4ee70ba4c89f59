//! Units of work and their outcomes.

use std::fmt;
use std::time::Duration;

use crate::backend::{MediaInfo, RetrievalError};
use crate::policy::ConfigOverlay;
use crate::source::is_supported_url;

/// One URL plus its caller overrides, the unit of concurrent execution.
///
/// Tasks are not validated on construction: a malformed URL is still
/// submitted and comes back as a failed [`RetrievalResult`], so that every
/// submitted item is accounted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalTask {
    url: String,
    options: ConfigOverlay,
}

impl RetrievalTask {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_options(url, ConfigOverlay::default())
    }

    /// Creates a task whose `options` are applied above every policy layer.
    #[must_use]
    pub fn with_options(url: impl Into<String>, options: ConfigOverlay) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }

    /// Builds one task per URL, preserving order.
    #[must_use]
    pub fn from_urls<I, S>(urls: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        urls.into_iter().map(Self::new).collect()
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn options(&self) -> &ConfigOverlay {
        &self.options
    }

    /// Checks that the URL is non-empty and uses a retrievable scheme.
    ///
    /// # Errors
    ///
    /// Returns an `Unsupported` [`RetrievalError`] describing the problem.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.url.trim().is_empty() {
            return Err(RetrievalError::unsupported("empty URL"));
        }
        if !is_supported_url(&self.url) {
            return Err(RetrievalError::unsupported(format!(
                "URL must start with http:// or https://: {}",
                self.url
            )));
        }
        Ok(())
    }
}

/// Identifies the executor that produced a result.
///
/// Workers are numbered from 1. [`WorkerId::DISPATCHER`] marks results the
/// dispatcher produced itself, for tasks left behind by a worker that died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(usize);

impl WorkerId {
    pub const DISPATCHER: Self = Self(0);

    #[must_use]
    pub fn new(number: usize) -> Self {
        Self(number)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DISPATCHER {
            f.write_str("dispatcher")
        } else {
            write!(f, "worker-{}", self.0)
        }
    }
}

/// Outcome of exactly one task. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    url: String,
    index: usize,
    duration: Duration,
    worker: WorkerId,
    outcome: Result<MediaInfo, RetrievalError>,
}

impl RetrievalResult {
    #[must_use]
    pub fn succeeded(
        url: impl Into<String>,
        index: usize,
        duration: Duration,
        worker: WorkerId,
        info: MediaInfo,
    ) -> Self {
        Self {
            url: url.into(),
            index,
            duration,
            worker,
            outcome: Ok(info),
        }
    }

    #[must_use]
    pub fn failed(
        url: impl Into<String>,
        index: usize,
        duration: Duration,
        worker: WorkerId,
        error: RetrievalError,
    ) -> Self {
        Self {
            url: url.into(),
            index,
            duration,
            worker,
            outcome: Err(error),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Position of the task in the submitted sequence.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Wall time spent on the task, including config resolution.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    #[must_use]
    pub fn error(&self) -> Option<&RetrievalError> {
        self.outcome.as_ref().err()
    }

    #[must_use]
    pub fn info(&self) -> Option<&MediaInfo> {
        self.outcome.as_ref().ok()
    }
}
