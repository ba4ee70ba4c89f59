//! Built-in option sets: baseline defaults, site policies, quality presets.

use std::fmt;
use std::str::FromStr;

use super::{ConfigOverlay, SitePolicy};

/// Default format selector: best quality, preferring MP4.
pub const DEFAULT_FORMAT: &str = "best[ext=mp4]/best";

pub const USER_AGENT_CHROME: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The baseline layer applied under every resolved config.
///
/// Conservative error handling: errors are not ignored and warnings stay on.
#[must_use]
pub fn baseline_overlay() -> ConfigOverlay {
    ConfigOverlay {
        format: Some(DEFAULT_FORMAT.to_string()),
        ignore_errors: Some(false),
        no_warnings: Some(false),
        allow_unplayable_formats: Some(true),
        write_info_json: Some(true),
        write_subtitles: Some(true),
        write_auto_subs: Some(true),
        write_thumbnail: Some(true),
        write_description: Some(true),
        embed_subs: Some(true),
        ..ConfigOverlay::default()
    }
    .extractor_arg("videa", "allow_unplayable_formats", "true")
}

/// Site policies shipped with the tool, in match priority order.
#[must_use]
pub fn builtin_site_policies() -> Vec<SitePolicy> {
    vec![
        SitePolicy::new(
            "videa.hu",
            ConfigOverlay {
                format: Some(DEFAULT_FORMAT.to_string()),
                ignore_errors: Some(true),
                no_warnings: Some(true),
                allow_unplayable_formats: Some(true),
                ..ConfigOverlay::default()
            }
            .header("User-Agent", USER_AGENT_CHROME)
            .header("Referer", "https://videa.hu/"),
        ),
        SitePolicy::new("youtube.com", ConfigOverlay::with_format(DEFAULT_FORMAT)),
        SitePolicy::new("vimeo.com", ConfigOverlay::with_format(DEFAULT_FORMAT)),
    ]
}

/// Named quality levels mapped to format selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    Best,
    High,
    Medium,
    Low,
    AudioOnly,
}

impl QualityPreset {
    pub const ALL: [Self; 5] = [
        Self::Best,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::AudioOnly,
    ];

    /// Format selector for this preset.
    #[must_use]
    pub fn format_selector(self) -> &'static str {
        match self {
            Self::Best => DEFAULT_FORMAT,
            Self::High => "best[height<=1080][ext=mp4]/best[height<=1080]",
            Self::Medium => "best[height<=720][ext=mp4]/best[height<=720]",
            Self::Low => "best[height<=480][ext=mp4]/best[height<=480]",
            Self::AudioOnly => "bestaudio[ext=m4a]/bestaudio",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::AudioOnly => "audio-only",
        }
    }

    /// Caller overlay selecting this preset's format.
    #[must_use]
    pub fn overlay(self) -> ConfigOverlay {
        ConfigOverlay::with_format(self.format_selector())
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a preset name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quality preset '{0}' (expected best, high, medium, low or audio-only)")]
pub struct UnknownPreset(pub String);

impl FromStr for QualityPreset {
    type Err = UnknownPreset;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "audio-only" | "audio_only" | "audio" => Ok(Self::AudioOnly),
            _ => Err(UnknownPreset(value.to_string())),
        }
    }
}
