//! Mediafetch Core Library
//!
//! Batch media retrieval: resolves per-site retrieval options for each URL
//! and runs the retrievals concurrently through an external backend, with
//! per-task failure isolation and an aggregated report.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`policy`] - Layered per-domain retrieval configuration
//! - [`backend`] - Retrieval backend trait and the `yt-dlp` adapter
//! - [`batch`] - Worker pool, result aggregation and batch observers
//! - [`source`] - URL list parsing from text and files

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod batch;
pub mod policy;
pub mod source;

// Re-export commonly used types
pub use backend::{
    BackendError, MediaInfo, RetrievalBackend, RetrievalError, RetrievalErrorKind, YtDlpBackend,
};
pub use batch::{
    BatchDispatcher, BatchObserver, BatchReport, DispatcherOptions, ResultAggregator,
    RetrievalResult, RetrievalTask,
};
pub use policy::{ConfigOverlay, PolicyError, PolicyResolver, PolicyTable, ResolvedConfig};
pub use source::{BatchSubmissionError, UrlList, parse_url_list, read_url_file};
