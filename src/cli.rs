//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use mediafetch_core::policy::QualityPreset;
use mediafetch_core::source::DEFAULT_BATCH_FILE;

/// Retrieve media from video sites, one URL or a whole batch at a time.
///
/// Site-specific retrieval options come from a policy table; the actual
/// extraction is done by yt-dlp.
#[derive(Parser, Debug)]
#[command(name = "mediafetch")]
#[command(author, version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "batch"])))]
pub struct Args {
    /// URL of a single media item
    pub url: Option<String>,

    /// Read URLs from a file, one per line (default: addresses.txt)
    #[arg(
        short,
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_BATCH_FILE
    )]
    pub batch: Option<PathBuf>,

    /// Output directory, created if missing [default: downloads]
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of parallel workers, clamped to 1-5 [default: 3]
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Print media metadata without downloading
    #[arg(short, long)]
    pub info_only: bool,

    /// Custom format selector, overrides --quality and site policies
    #[arg(short, long, value_name = "SELECTOR")]
    pub format: Option<String>,

    /// Quality preset: best, high, medium, low, audio-only
    #[arg(long, value_name = "PRESET")]
    pub quality: Option<QualityPreset>,

    /// JSON policy table replacing the built-in site policies
    #[arg(long, value_name = "FILE")]
    pub policies: Option<PathBuf>,

    /// Per-item timeout in seconds, 0 disables [default: 1800]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to the yt-dlp executable (default: found on PATH)
    #[arg(long = "yt-dlp", value_name = "PATH")]
    pub yt_dlp: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
