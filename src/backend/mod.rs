//! Retrieval backend boundary.
//!
//! The orchestrator never extracts media itself. It hands each URL and its
//! [`ResolvedConfig`] to a [`RetrievalBackend`] and gets back either
//! [`MediaInfo`] or a [`RetrievalError`].
//!
//! # Architecture
//!
//! - [`RetrievalBackend`] - async trait the dispatcher calls, one URL per call
//! - [`YtDlpBackend`] - adapter driving the `yt-dlp` executable as a child process
//! - [`RetrievalError`] - per-task failure with a [`RetrievalErrorKind`]

mod error;
mod ytdlp;

pub use error::{
    BackendError, RetrievalError, RetrievalErrorKind, classify_backend_output,
    summarize_backend_output,
};
pub use ytdlp::{DEFAULT_OUTPUT_TEMPLATE, YTDLP_BINARY, YtDlpBackend, build_retrieve_args};

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::policy::ResolvedConfig;

/// Descriptive metadata reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    /// Upload date as reported by the source (usually `YYYYMMDD`).
    #[serde(default)]
    pub upload_date: Option<String>,
    /// Number of formats the source offers; 0 when unknown.
    #[serde(default, rename = "formats", deserialize_with = "count_formats")]
    pub format_count: usize,
    #[serde(default)]
    pub resolution: Option<String>,
    /// Size in bytes, when the source reports it.
    #[serde(default)]
    pub filesize: Option<u64>,
}

impl MediaInfo {
    /// Parses the JSON document the backend prints for one media item.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the document is malformed.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Labelled fields for display, in a stable order.
    #[must_use]
    pub fn display_fields(&self) -> Vec<(&'static str, String)> {
        fn or_unknown<T: fmt::Display>(value: Option<&T>) -> String {
            value.map_or_else(|| "Unknown".to_string(), ToString::to_string)
        }

        vec![
            ("Title", or_unknown(self.title.as_ref())),
            ("Duration", or_unknown(self.duration.as_ref())),
            ("Uploader", or_unknown(self.uploader.as_ref())),
            ("View Count", or_unknown(self.view_count.as_ref())),
            ("Upload Date", or_unknown(self.upload_date.as_ref())),
            ("Formats", self.format_count.to_string()),
            ("Resolution", or_unknown(self.resolution.as_ref())),
            ("Filesize", or_unknown(self.filesize.as_ref())),
        ]
    }
}

fn count_formats<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let formats: Option<Vec<serde::de::IgnoredAny>> = Option::deserialize(deserializer)?;
    Ok(formats.map_or(0, |formats| formats.len()))
}

/// An engine able to retrieve media for one URL at a time.
///
/// Implementations must be safe to call from several workers at once with
/// independent configurations; no mutable state may be shared between calls.
///
/// # Object Safety
///
/// Uses `async_trait` so the dispatcher can hold an `Arc<dyn RetrievalBackend>`.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    /// Short backend name for logs (e.g. `"yt-dlp"`).
    fn name(&self) -> &str;

    /// Retrieves the media at `url` using `config`, writing the artifact to
    /// the backend's output location.
    async fn retrieve(&self, url: &str, config: &ResolvedConfig)
    -> Result<MediaInfo, RetrievalError>;

    /// Fetches metadata for `url` without writing any artifact.
    async fn inspect(&self, url: &str) -> Result<MediaInfo, RetrievalError>;
}
