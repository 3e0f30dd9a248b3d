//! Configuration loading and parsing.
//!
//! Parses `typeplay.toml` (or an override path provided by the binary). Every
//! section and field is optional and falls back to its default; unknown fields
//! are ignored so older binaries tolerate newer files. A file that fails to
//! parse is logged and replaced by defaults wholesale.
//!
//! ```toml
//! [playback]
//! interval_ms = 40
//!
//! [motion]
//! reduced = "auto"   # "auto" | "on" | "off"
//!
//! [visibility]
//! threshold = 0.6
//! initial_ratio = 1.0
//!
//! [highlight]
//! theme = "base16-ocean.dark"
//! timeout_ms = 2000
//! cache_entries = 64
//!
//! [surface]
//! title = "typeplay"
//! indicator = true
//! blink_ms = 500
//! ```

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "typeplay.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Milliseconds between reveal ticks. Not clamped: a non-positive value is
    /// rejected when playback starts.
    #[serde(default = "PlaybackConfig::default_interval_ms")]
    pub interval_ms: i64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
        }
    }
}

impl PlaybackConfig {
    const fn default_interval_ms() -> i64 {
        40
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MotionSetting {
    /// Follow the host preference.
    #[default]
    Auto,
    On,
    Off,
}

impl MotionSetting {
    /// Resolve to a concrete flag; `host` is only consulted for `Auto`.
    pub fn resolve(self, host: impl FnOnce() -> bool) -> bool {
        match self {
            MotionSetting::Auto => host(),
            MotionSetting::On => true,
            MotionSetting::Off => false,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct MotionConfig {
    #[serde(default)]
    pub reduced: MotionSetting,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VisibilityConfig {
    #[serde(default = "VisibilityConfig::default_threshold")]
    pub threshold: f32,
    /// Visible ratio assumed at startup, before any focus report arrives.
    #[serde(default = "VisibilityConfig::default_initial_ratio")]
    pub initial_ratio: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            initial_ratio: Self::default_initial_ratio(),
        }
    }
}

impl VisibilityConfig {
    const fn default_threshold() -> f32 {
        0.6
    }
    const fn default_initial_ratio() -> f32 {
        1.0
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HighlightConfig {
    #[serde(default = "HighlightConfig::default_theme")]
    pub theme: String,
    #[serde(default = "HighlightConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "HighlightConfig::default_cache_entries")]
    pub cache_entries: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: Self::default_theme(),
            timeout_ms: Self::default_timeout_ms(),
            cache_entries: Self::default_cache_entries(),
        }
    }
}

impl HighlightConfig {
    fn default_theme() -> String {
        "base16-ocean.dark".to_string()
    }
    const fn default_timeout_ms() -> u64 {
        2000
    }
    const fn default_cache_entries() -> usize {
        64
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SurfaceConfig {
    #[serde(default = "SurfaceConfig::default_title")]
    pub title: String,
    /// Draw the blinking cursor indicator while playing.
    #[serde(default = "SurfaceConfig::default_indicator")]
    pub indicator: bool,
    #[serde(default = "SurfaceConfig::default_blink_ms")]
    pub blink_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            indicator: Self::default_indicator(),
            blink_ms: Self::default_blink_ms(),
        }
    }
}

impl SurfaceConfig {
    fn default_title() -> String {
        "typeplay".to_string()
    }
    const fn default_indicator() -> bool {
        true
    }
    const fn default_blink_ms() -> u64 {
        500
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub path: Option<PathBuf>,
    pub file: ConfigFile, // parsed (or default) data
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub interval_ms: Option<i64>,
    pub reduced_motion: bool,
    pub theme: Option<String>,
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("typeplay").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_absent_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            let mut cfg = Config {
                raw: Some(content),
                path: Some(path),
                file,
            };
            cfg.normalize();
            Ok(cfg)
        }
        Err(e) => {
            warn!(
                target: "config",
                path = %path.display(),
                error = %e,
                "config_parse_failed_using_defaults"
            );
            Ok(Config::default())
        }
    }
}

fn clamp_ratio(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

impl Config {
    /// Clamp ratio fields into `[0, 1]`. Returns whether anything changed.
    pub fn normalize(&mut self) -> bool {
        let vis = &mut self.file.visibility;
        let (raw_threshold, raw_initial) = (vis.threshold, vis.initial_ratio);
        vis.threshold = clamp_ratio(raw_threshold, VisibilityConfig::default_threshold());
        vis.initial_ratio = clamp_ratio(raw_initial, VisibilityConfig::default_initial_ratio());
        let changed = vis.threshold.to_bits() != raw_threshold.to_bits()
            || vis.initial_ratio.to_bits() != raw_initial.to_bits();
        if changed {
            info!(
                target: "config",
                raw_threshold,
                threshold = vis.threshold,
                raw_initial,
                initial_ratio = vis.initial_ratio,
                "visibility_ratio_clamped"
            );
        }
        changed
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(ms) = overrides.interval_ms {
            info!(target: "config", interval_ms = ms, "override_interval");
            self.file.playback.interval_ms = ms;
        }
        if overrides.reduced_motion {
            info!(target: "config", "override_reduced_motion");
            self.file.motion.reduced = MotionSetting::On;
        }
        if let Some(theme) = &overrides.theme {
            info!(target: "config", theme = %theme, "override_theme");
            self.file.highlight.theme = theme.clone();
        }
    }
}
