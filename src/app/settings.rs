//! Effective run settings: CLI flag, then config file, then built-in default.

use std::path::PathBuf;
use std::time::Duration;

use mediafetch_core::batch::{DEFAULT_TASK_TIMEOUT, DEFAULT_WORKERS, DispatcherOptions};
use mediafetch_core::policy::{ConfigOverlay, QualityPreset};

use super::config_file::FileConfig;
use crate::cli::Args;

/// Output directory used when neither the CLI nor the config file names one.
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Where the URLs for this run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputSource {
    Single(String),
    BatchFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSettings {
    pub input: InputSource,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub task_timeout: Option<Duration>,
    pub info_only: bool,
    pub format: Option<String>,
    pub quality: Option<QualityPreset>,
    pub policies_file: Option<PathBuf>,
    pub yt_dlp_path: Option<PathBuf>,
}

impl RunSettings {
    pub(crate) fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();

        let input = match (&args.url, &args.batch) {
            (Some(url), _) => InputSource::Single(url.clone()),
            (None, Some(path)) => InputSource::BatchFile(path.clone()),
            // clap's input group guarantees one of the two.
            (None, None) => InputSource::BatchFile(PathBuf::from(
                mediafetch_core::source::DEFAULT_BATCH_FILE,
            )),
        };

        let task_timeout = match args.timeout.or(file.task_timeout_secs) {
            Some(secs) => DispatcherOptions::from_timeout_secs(secs).task_timeout,
            None => Some(DEFAULT_TASK_TIMEOUT),
        };

        Self {
            input,
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            workers: args.workers.or(file.workers).unwrap_or(DEFAULT_WORKERS),
            task_timeout,
            info_only: args.info_only,
            format: args.format.clone().or(file.format),
            quality: args.quality.or(file.quality),
            policies_file: args.policies.clone().or(file.policies_file),
            yt_dlp_path: args.yt_dlp.clone().or(file.yt_dlp_path),
        }
    }

    pub(crate) fn dispatcher_options(&self) -> DispatcherOptions {
        DispatcherOptions {
            task_timeout: self.task_timeout,
        }
    }

    /// Caller overrides for every URL. An explicit format beats a preset.
    pub(crate) fn caller_overrides(&self) -> ConfigOverlay {
        match (&self.format, self.quality) {
            (Some(format), _) => ConfigOverlay::with_format(format.clone()),
            (None, Some(preset)) => preset.overlay(),
            (None, None) => ConfigOverlay::default(),
        }
    }
}
