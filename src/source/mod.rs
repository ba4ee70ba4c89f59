//! URL source: turns URL-list text into an ordered, validated URL sequence.
//!
//! One URL per line. Blank lines and `#` comments are ignored; a line is
//! accepted only if it starts with `http://` or `https://`. Everything else
//! is recorded in [`UrlList::skipped`] and logged, never submitted.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Default batch file name.
pub const DEFAULT_BATCH_FILE: &str = "addresses.txt";

/// Schemes a URL line must start with.
const ACCEPTED_PREFIXES: [&str; 2] = ["http://", "https://"];

/// Fatal errors while building the task list. The batch does not start.
#[derive(Debug, Error)]
pub enum BatchSubmissionError {
    /// The URL file does not exist.
    #[error("URL file not found: {path}")]
    NotFound { path: PathBuf },

    /// The URL file exists but could not be read.
    #[error("failed to read URL file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source contained no valid URL.
    #[error("no valid URLs found in {origin} ({skipped} invalid lines skipped)")]
    NoValidUrls { origin: String, skipped: usize },
}

/// A line that was rejected as a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    pub content: String,
}

impl fmt::Display for SkippedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.content)
    }
}

/// URLs accepted from a source, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlList {
    pub urls: Vec<String>,
    pub skipped: Vec<SkippedLine>,
}

impl UrlList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Fails with [`BatchSubmissionError::NoValidUrls`] when nothing was accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the list holds no URLs.
    pub fn require_non_empty(self, origin: &str) -> Result<Self, BatchSubmissionError> {
        if self.is_empty() {
            return Err(BatchSubmissionError::NoValidUrls {
                origin: origin.to_string(),
                skipped: self.skipped_count(),
            });
        }
        Ok(self)
    }
}

impl fmt::Display for UrlList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} URLs ({} skipped)",
            self.urls.len(),
            self.skipped.len()
        )
    }
}

/// Returns true if `candidate` starts with an accepted scheme.
#[must_use]
pub fn is_supported_url(candidate: &str) -> bool {
    ACCEPTED_PREFIXES
        .iter()
        .any(|prefix| candidate.starts_with(prefix))
}

/// Parses URL-list text.
#[must_use]
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
pub fn parse_url_list(text: &str) -> UrlList {
    let mut list = UrlList::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line_number = index + 1;
        if is_supported_url(line) {
            debug!(line = line_number, url = %line, "accepted URL");
            list.urls.push(line.to_string());
        } else {
            warn!(line = line_number, content = %line, "skipping invalid URL line");
            list.skipped.push(SkippedLine {
                line: line_number,
                content: line.to_string(),
            });
        }
    }

    list
}

/// Reads and parses a URL-list file.
///
/// # Errors
///
/// Returns [`BatchSubmissionError::NotFound`] if the file does not exist and
/// [`BatchSubmissionError::Read`] for any other IO failure.
pub fn read_url_file(path: &Path) -> Result<UrlList, BatchSubmissionError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            BatchSubmissionError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            BatchSubmissionError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let list = parse_url_list(&text);
    info!(
        path = %path.display(),
        urls = list.len(),
        skipped = list.skipped_count(),
        "loaded URL file"
    );
    Ok(list)
}
