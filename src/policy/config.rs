//! Resolved retrieval configuration and the overlays it is built from.
//!
//! A [`ResolvedConfig`] is never edited in place. It is produced by a
//! [`ConfigBuilder`] that applies [`ConfigOverlay`] layers in order; each
//! layer only touches the keys it defines, and map-valued keys merge
//! entry by entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Format selector used when no layer provides one.
pub const FALLBACK_FORMAT: &str = "best";

/// Extractor arguments keyed by extractor name, then argument name.
pub type ExtractorArgs = BTreeMap<String, BTreeMap<String, String>>;

/// A partial set of retrieval options.
///
/// Every field is optional; `None` (or an empty map) means "leave the lower
/// layer alone". Overlays are used for the baseline defaults, for each site
/// policy, and for per-task caller overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverlay {
    /// Format selector passed to the backend (e.g. `best[ext=mp4]/best`).
    pub format: Option<String>,
    /// Extra HTTP headers, merged by header name.
    pub http_headers: BTreeMap<String, String>,
    /// Continue past non-fatal extraction errors.
    pub ignore_errors: Option<bool>,
    /// Suppress backend warnings.
    pub no_warnings: Option<bool>,
    /// Accept formats with unusual or unplayable extensions.
    pub allow_unplayable_formats: Option<bool>,
    /// Write a `.info.json` metadata file next to the media.
    pub write_info_json: Option<bool>,
    /// Write uploaded subtitle files.
    pub write_subtitles: Option<bool>,
    /// Write automatically generated subtitle files.
    pub write_auto_subs: Option<bool>,
    /// Write the thumbnail image.
    pub write_thumbnail: Option<bool>,
    /// Write the description to a `.description` file.
    pub write_description: Option<bool>,
    /// Embed subtitles into the media container.
    pub embed_subs: Option<bool>,
    /// Age limit to declare to the extractor.
    pub age_limit: Option<u8>,
    /// Extractor-specific arguments, merged per extractor and key.
    pub extractor_args: ExtractorArgs,
}

impl ConfigOverlay {
    /// Creates an overlay that defines no keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an overlay that only sets the format selector.
    #[must_use]
    pub fn with_format(format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            ..Self::default()
        }
    }

    /// Adds (or replaces) one HTTP header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_headers.insert(name.into(), value.into());
        self
    }

    /// Adds (or replaces) one extractor argument.
    #[must_use]
    pub fn extractor_arg(
        mut self,
        extractor: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.extractor_args
            .entry(extractor.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Returns true if the overlay defines no keys at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Flags controlling how tolerant the backend is of problems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorTolerance {
    pub ignore_errors: bool,
    pub no_warnings: bool,
    pub allow_unplayable_formats: bool,
}

/// Side artifacts written alongside the media file.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactOptions {
    pub write_info_json: bool,
    pub write_subtitles: bool,
    pub write_auto_subs: bool,
    pub write_thumbnail: bool,
    pub write_description: bool,
    pub embed_subs: bool,
}

/// Fully resolved configuration for one retrieval.
///
/// Built once per task and never mutated afterwards, so workers can read it
/// without synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    format: String,
    http_headers: BTreeMap<String, String>,
    tolerance: ErrorTolerance,
    artifacts: ArtifactOptions,
    age_limit: Option<u8>,
    extractor_args: ExtractorArgs,
    policy: Option<String>,
}

impl ResolvedConfig {
    /// Starts a builder with no layers applied.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    #[must_use]
    pub fn http_headers(&self) -> &BTreeMap<String, String> {
        &self.http_headers
    }

    #[must_use]
    pub fn tolerance(&self) -> ErrorTolerance {
        self.tolerance
    }

    #[must_use]
    pub fn artifacts(&self) -> ArtifactOptions {
        self.artifacts
    }

    #[must_use]
    pub fn age_limit(&self) -> Option<u8> {
        self.age_limit
    }

    #[must_use]
    pub fn extractor_args(&self) -> &ExtractorArgs {
        &self.extractor_args
    }

    /// Pattern of the site policy that contributed to this config, if any.
    #[must_use]
    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }
}

/// Applies [`ConfigOverlay`] layers in order to produce a [`ResolvedConfig`].
///
/// Later layers win key by key:
///
/// ```
/// use mediafetch_core::policy::{ConfigOverlay, ResolvedConfig};
///
/// let base = ConfigOverlay::with_format("best").header("User-Agent", "a");
/// let site = ConfigOverlay::new().header("Referer", "https://example.com/");
/// let config = ResolvedConfig::builder().apply(&base).apply(&site).build();
///
/// assert_eq!(config.format(), "best");
/// assert_eq!(config.http_headers().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: ResolvedConfig,
}

impl ConfigBuilder {
    /// Creates a builder holding the empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ResolvedConfig {
                format: FALLBACK_FORMAT.to_string(),
                http_headers: BTreeMap::new(),
                tolerance: ErrorTolerance::default(),
                artifacts: ArtifactOptions::default(),
                age_limit: None,
                extractor_args: BTreeMap::new(),
                policy: None,
            },
        }
    }

    /// Applies one overlay on top of everything applied so far.
    #[must_use]
    pub fn apply(mut self, overlay: &ConfigOverlay) -> Self {
        let config = &mut self.config;

        if let Some(format) = &overlay.format {
            config.format.clone_from(format);
        }
        for (name, value) in &overlay.http_headers {
            config.http_headers.insert(name.clone(), value.clone());
        }

        set_flag(&mut config.tolerance.ignore_errors, overlay.ignore_errors);
        set_flag(&mut config.tolerance.no_warnings, overlay.no_warnings);
        set_flag(
            &mut config.tolerance.allow_unplayable_formats,
            overlay.allow_unplayable_formats,
        );

        set_flag(&mut config.artifacts.write_info_json, overlay.write_info_json);
        set_flag(&mut config.artifacts.write_subtitles, overlay.write_subtitles);
        set_flag(&mut config.artifacts.write_auto_subs, overlay.write_auto_subs);
        set_flag(&mut config.artifacts.write_thumbnail, overlay.write_thumbnail);
        set_flag(
            &mut config.artifacts.write_description,
            overlay.write_description,
        );
        set_flag(&mut config.artifacts.embed_subs, overlay.embed_subs);

        if overlay.age_limit.is_some() {
            config.age_limit = overlay.age_limit;
        }

        for (extractor, args) in &overlay.extractor_args {
            let merged = config.extractor_args.entry(extractor.clone()).or_default();
            for (key, value) in args {
                merged.insert(key.clone(), value.clone());
            }
        }

        self
    }

    /// Records which site policy contributed a layer.
    #[must_use]
    pub fn policy(mut self, pattern: impl Into<String>) -> Self {
        self.config.policy = Some(pattern.into());
        self
    }

    /// Finishes the build.
    #[must_use]
    pub fn build(self) -> ResolvedConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn set_flag(target: &mut bool, value: Option<bool>) {
    if let Some(value) = value {
        *target = value;
    }
}
