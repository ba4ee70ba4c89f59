//! Optional config file holding CLI defaults.
//!
//! The file is a flat list of `key = value` lines at
//! `$XDG_CONFIG_HOME/mediafetch/config.toml` (or `$HOME/.config/...`).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mediafetch_core::batch::{MAX_WORKERS, MIN_WORKERS};
use mediafetch_core::policy::QualityPreset;

/// Longest per-item timeout accepted from the file (one day).
const MAX_TASK_TIMEOUT_SECS: u64 = 86_400;

/// Defaults read from the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    /// 0 disables the per-item timeout.
    pub task_timeout_secs: Option<u64>,
    pub format: Option<String>,
    pub quality: Option<QualityPreset>,
    pub policies_file: Option<PathBuf>,
    pub yt_dlp_path: Option<PathBuf>,
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers
            && !(MIN_WORKERS..=MAX_WORKERS).contains(&workers)
        {
            bail!("Invalid `workers` value {workers}: expected {MIN_WORKERS}..={MAX_WORKERS}");
        }
        if let Some(secs) = self.task_timeout_secs
            && secs > MAX_TASK_TIMEOUT_SECS
        {
            bail!("Invalid `task_timeout_secs` value {secs}: expected 0..={MAX_TASK_TIMEOUT_SECS}");
        }
        if let Some(format) = &self.format
            && format.trim().is_empty()
        {
            bail!("Invalid config value for `format`: must not be empty");
        }
        Ok(())
    }
}

/// Verbosity labels accepted in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log level this setting stands for.
    pub(crate) fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Resolves the config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/mediafetch/config.toml`
/// 2. `$HOME/.config/mediafetch/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    let config_home = match env_dir("XDG_CONFIG_HOME") {
        Some(dir) => dir,
        None => env_dir("HOME")?.join(".config"),
    };
    Some(config_home.join("mediafetch").join("config.toml"))
}

/// Directory named by an environment variable; unset and empty are the same.
fn env_dir(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Loads the config file if one exists at the default path.
pub(crate) fn load_default_file_config() -> Result<Option<(PathBuf, FileConfig)>> {
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let config = load_file_config(&path)?;
    Ok(Some((path, config)))
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

pub(crate) fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = without_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_number = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    unquote(value).with_context(context)?,
                ));
            }
            "workers" => {
                let parsed = parse_count(value).with_context(context)?;
                cfg.workers = Some(usize::try_from(parsed).with_context(context)?);
            }
            "task_timeout_secs" => {
                cfg.task_timeout_secs = Some(parse_count(value).with_context(context)?);
            }
            "format" => {
                cfg.format = Some(unquote(value).with_context(context)?);
            }
            "quality" => {
                let parsed = unquote(value).with_context(context)?;
                cfg.quality = Some(parsed.parse::<QualityPreset>().with_context(context)?);
            }
            "policies_file" => {
                cfg.policies_file = Some(PathBuf::from(
                    unquote(value).with_context(context)?,
                ));
            }
            "yt_dlp_path" => {
                cfg.yt_dlp_path = Some(PathBuf::from(
                    unquote(value).with_context(context)?,
                ));
            }
            "verbosity" => {
                let parsed = unquote(value).with_context(context)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(context)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Cuts a line at the first `#` outside a quoted value.
fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut chars = line.char_indices();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' if quoted => {
                chars.next();
            }
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..index],
            _ => {}
        }
    }
    line
}

/// Value of a double-quoted string. `\"` and `\\` are unescaped; any other
/// backslash is kept as written, so Windows paths need no doubling.
fn unquote(raw: &str) -> Result<String> {
    let Some(inner) = raw.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) else {
        bail!("Expected a double-quoted string, found `{raw}`");
    };

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let escaped = chars.next_if(|next| matches!(next, '"' | '\\'));
                value.push(escaped.unwrap_or(ch));
            }
            '"' => bail!("Unescaped quote inside string `{raw}`"),
            _ => value.push(ch),
        }
    }
    Ok(value)
}

fn parse_count(raw: &str) -> Result<u64> {
    let token = raw.trim();
    if token.starts_with('-') {
        bail!("Expected a non-negative integer, found `{token}`");
    }
    token
        .parse::<u64>()
        .with_context(|| format!("Expected a non-negative integer, found `{token}`"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}
