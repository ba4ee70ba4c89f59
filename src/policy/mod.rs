//! Per-domain retrieval policy resolution.
//!
//! Maps a URL to a [`ResolvedConfig`] by layering three overlays:
//!
//! 1. the baseline defaults ([`baseline_overlay`]),
//! 2. the first [`SitePolicy`] whose pattern occurs in the URL host,
//! 3. caller overrides (quality preset, `--format`, per-task options).
//!
//! Resolution never fails. A URL whose host cannot be parsed simply gets the
//! baseline configuration.
//!
//! # Example
//!
//! ```
//! use mediafetch_core::policy::{ConfigOverlay, PolicyResolver, PolicyTable, SitePolicy};
//!
//! let table = PolicyTable::new(vec![SitePolicy::new(
//!     "example.com",
//!     ConfigOverlay::with_format("mp4"),
//! )]);
//! let resolver = PolicyResolver::new(table);
//!
//! let config = resolver.resolve("https://sub.example.com/v/1");
//! assert_eq!(config.format(), "mp4");
//! assert_eq!(config.policy(), Some("example.com"));
//! ```

mod config;
mod presets;

pub use config::{
    ArtifactOptions, ConfigBuilder, ConfigOverlay, ErrorTolerance, ExtractorArgs,
    FALLBACK_FORMAT, ResolvedConfig,
};
pub use presets::{
    DEFAULT_FORMAT, QualityPreset, USER_AGENT_CHROME, UnknownPreset, baseline_overlay,
    builtin_site_policies,
};

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

/// Errors raised while loading a policy table from disk.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The policy file is not valid JSON or has unknown option keys.
    #[error("invalid policy table: {0}")]
    Parse(#[from] serde_json::Error),

    /// A policy entry has a blank domain pattern, which would match every host.
    #[error("policy entry {index} has an empty domain pattern")]
    EmptyPattern { index: usize },
}

/// An option overlay applied to hosts that contain `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SitePolicy {
    pattern: String,
    #[serde(default, rename = "options")]
    overlay: ConfigOverlay,
}

impl SitePolicy {
    /// Creates a policy. The pattern is matched case-insensitively.
    #[must_use]
    pub fn new(pattern: impl Into<String>, overlay: ConfigOverlay) -> Self {
        Self {
            pattern: pattern.into().trim().to_ascii_lowercase(),
            overlay,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn overlay(&self) -> &ConfigOverlay {
        &self.overlay
    }

    /// Returns true if this policy applies to the (lowercased) host.
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        host.contains(self.pattern.as_str())
    }
}

/// Ordered, read-only list of site policies. First match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    policies: Vec<SitePolicy>,
}

impl PolicyTable {
    /// Creates a table; declaration order is match priority.
    #[must_use]
    pub fn new(policies: Vec<SitePolicy>) -> Self {
        Self { policies }
    }

    /// The table shipped with the tool.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_site_policies())
    }

    /// Parses a JSON array of `{"pattern": ..., "options": {...}}` entries.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] for malformed JSON or unknown option keys
    /// and [`PolicyError::EmptyPattern`] for blank patterns.
    pub fn from_json_str(raw: &str) -> Result<Self, PolicyError> {
        let entries: Vec<SitePolicy> = serde_json::from_str(raw)?;
        let mut policies = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let policy = SitePolicy::new(entry.pattern, entry.overlay);
            if policy.pattern.is_empty() {
                return Err(PolicyError::EmptyPattern { index });
            }
            policies.push(policy);
        }
        Ok(Self::new(policies))
    }

    /// Loads a table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Read`] if the file cannot be read, otherwise the
    /// errors of [`Self::from_json_str`].
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SitePolicy> {
        self.policies.iter()
    }

    /// First policy matching `host`, in declaration order.
    #[must_use]
    pub fn find(&self, host: &str) -> Option<&SitePolicy> {
        self.policies.iter().find(|policy| policy.matches_host(host))
    }
}

/// Which layer decided the configuration for a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyMatch {
    /// A site policy matched; holds its pattern.
    Site(String),
    /// The host parsed but no policy matched.
    Baseline,
    /// The host could not be parsed; baseline applied as a fallback.
    Fallback,
}

/// Resolves URLs to layered retrieval configurations.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    baseline: ConfigOverlay,
    table: PolicyTable,
    overrides: ConfigOverlay,
}

impl PolicyResolver {
    /// Creates a resolver over `table` with the built-in baseline.
    #[must_use]
    pub fn new(table: PolicyTable) -> Self {
        Self::with_baseline(baseline_overlay(), table)
    }

    /// Creates a resolver with a custom baseline layer.
    #[must_use]
    pub fn with_baseline(baseline: ConfigOverlay, table: PolicyTable) -> Self {
        Self {
            baseline,
            table,
            overrides: ConfigOverlay::default(),
        }
    }

    /// Sets caller overrides applied to every URL, above the site layer.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverlay) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    /// Reports which layer applies to `url`.
    #[must_use]
    pub fn match_policy(&self, url: &str) -> PolicyMatch {
        match host_of(url) {
            Some(host) => self
                .table
                .find(&host)
                .map_or(PolicyMatch::Baseline, |policy| {
                    PolicyMatch::Site(policy.pattern().to_string())
                }),
            None => PolicyMatch::Fallback,
        }
    }

    /// Resolves the configuration for `url` with the resolver-wide overrides.
    #[must_use]
    pub fn resolve(&self, url: &str) -> ResolvedConfig {
        self.resolve_with(url, &ConfigOverlay::default())
    }

    /// Resolves the configuration for `url`, applying `task_overrides` last.
    #[must_use]
    #[tracing::instrument(level = "trace", skip(self, task_overrides))]
    pub fn resolve_with(&self, url: &str, task_overrides: &ConfigOverlay) -> ResolvedConfig {
        let mut builder = ResolvedConfig::builder().apply(&self.baseline);

        match host_of(url) {
            Some(host) => {
                if let Some(policy) = self.table.find(&host) {
                    trace!(%host, pattern = policy.pattern(), "site policy matched");
                    builder = builder.apply(policy.overlay()).policy(policy.pattern());
                }
            }
            None => debug!(%url, "host unparsable; falling back to baseline config"),
        }

        builder.apply(&self.overrides).apply(task_overrides).build()
    }
}

impl Default for PolicyResolver {
    fn default() -> Self {
        Self::new(PolicyTable::builtin())
    }
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}
