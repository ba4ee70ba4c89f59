//! `yt-dlp` adapter: drives the external executable as a child process.
//!
//! Every host goes through the same code path. Site differences (headers,
//! tolerance flags, extractor arguments) arrive only through the
//! [`ResolvedConfig`] and are translated into command-line flags.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::error::{BackendError, classify_backend_output, summarize_backend_output};
use super::{MediaInfo, RetrievalBackend, RetrievalError};
use crate::policy::ResolvedConfig;

/// Executable name searched on `PATH`.
pub const YTDLP_BINARY: &str = "yt-dlp";

/// Filename template used for downloaded artifacts.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Retrieval backend backed by the `yt-dlp` executable.
///
/// Each call spawns its own child process, so concurrent calls share nothing
/// but the immutable paths held here.
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    binary: PathBuf,
    output_dir: PathBuf,
    template: String,
}

impl YtDlpBackend {
    /// Creates a backend with an explicit executable path.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
            template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
        }
    }

    /// Locates `yt-dlp` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if the executable is not on `PATH`.
    pub fn from_path(output_dir: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let binary = which::which(YTDLP_BINARY).map_err(|_| BackendError::NotFound {
            name: YTDLP_BINARY.to_string(),
        })?;
        Ok(Self::new(binary, output_dir))
    }

    /// Uses an explicitly configured executable, checking that it exists.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::MissingExecutable`] if nothing exists at `binary`.
    pub fn with_executable(
        binary: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, BackendError> {
        let binary = binary.into();
        if !binary.exists() {
            return Err(BackendError::MissingExecutable { path: binary });
        }
        Ok(Self::new(binary, output_dir))
    }

    /// Replaces the filename template (relative to the output directory).
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Full output template: `<output_dir>/<template>`.
    #[must_use]
    pub fn output_template(&self) -> PathBuf {
        self.output_dir.join(&self.template)
    }

    async fn run(
        &self,
        url: &str,
        args: Vec<OsString>,
        require_metadata: bool,
    ) -> Result<MediaInfo, RetrievalError> {
        debug!(binary = %self.binary.display(), arg_count = args.len(), "spawning backend");

        let output = Command::new(&self.binary)
            .args(args)
            .arg("--")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                RetrievalError::other(format!(
                    "failed to execute {}: {e}",
                    self.binary.display()
                ))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let kind = classify_backend_output(&stderr);
            let reason = summarize_backend_output(&stderr);
            debug!(status = ?output.status.code(), %kind, %reason, "backend reported failure");
            return Err(RetrievalError::new(kind, reason));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match last_json_line(&stdout).map(MediaInfo::from_json) {
            Some(Ok(info)) => Ok(info),
            Some(Err(e)) if require_metadata => Err(RetrievalError::other(format!(
                "backend printed unreadable metadata: {e}"
            ))),
            None if require_metadata => Err(RetrievalError::other(
                "backend printed no metadata".to_string(),
            )),
            Some(Err(e)) => {
                warn!(%url, error = %e, "retrieval succeeded but metadata was unreadable");
                Ok(MediaInfo::default())
            }
            None => Ok(MediaInfo::default()),
        }
    }
}

#[async_trait]
impl RetrievalBackend for YtDlpBackend {
    fn name(&self) -> &str {
        YTDLP_BINARY
    }

    #[instrument(skip(self, config), fields(backend = YTDLP_BINARY, format = config.format()))]
    async fn retrieve(
        &self,
        url: &str,
        config: &ResolvedConfig,
    ) -> Result<MediaInfo, RetrievalError> {
        let mut args = build_retrieve_args(config, &self.output_template());
        args.extend(
            ["--dump-json", "--no-simulate", "--no-progress"]
                .into_iter()
                .map(OsString::from),
        );
        self.run(url, args, false).await
    }

    #[instrument(skip(self), fields(backend = YTDLP_BINARY))]
    async fn inspect(&self, url: &str) -> Result<MediaInfo, RetrievalError> {
        let args = ["--quiet", "--no-warnings", "--dump-json", "--skip-download"]
            .into_iter()
            .map(OsString::from)
            .collect();
        self.run(url, args, true).await
    }
}

/// Translates a resolved configuration into `yt-dlp` flags.
///
/// The URL itself is not included.
#[must_use]
pub fn build_retrieve_args(config: &ResolvedConfig, output_template: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--format".into(),
        config.format().into(),
        "--output".into(),
        output_template.as_os_str().to_os_string(),
    ];

    for (name, value) in config.http_headers() {
        args.push("--add-header".into());
        args.push(format!("{name}:{value}").into());
    }

    let tolerance = config.tolerance();
    push_if(&mut args, tolerance.ignore_errors, "--ignore-errors");
    push_if(&mut args, tolerance.no_warnings, "--no-warnings");
    push_if(
        &mut args,
        tolerance.allow_unplayable_formats,
        "--allow-unplayable-formats",
    );

    let artifacts = config.artifacts();
    push_if(&mut args, artifacts.write_info_json, "--write-info-json");
    push_if(&mut args, artifacts.write_subtitles, "--write-subs");
    push_if(&mut args, artifacts.write_auto_subs, "--write-auto-subs");
    push_if(&mut args, artifacts.write_thumbnail, "--write-thumbnail");
    push_if(&mut args, artifacts.write_description, "--write-description");
    push_if(&mut args, artifacts.embed_subs, "--embed-subs");

    if let Some(limit) = config.age_limit() {
        args.push("--age-limit".into());
        args.push(limit.to_string().into());
    }

    for (extractor, values) in config.extractor_args() {
        if values.is_empty() {
            continue;
        }
        let joined = values
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(";");
        args.push("--extractor-args".into());
        args.push(format!("{extractor}:{joined}").into());
    }

    args
}

fn push_if(args: &mut Vec<OsString>, enabled: bool, flag: &str) {
    if enabled {
        args.push(flag.into());
    }
}

fn last_json_line(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
}
