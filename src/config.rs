use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::pitch::Method;
use crate::error::PitchtrailError;
use crate::gesture::GestureEvent;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub gestures: Vec<GestureEvent>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default)]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    #[serde(default = "default_min_lag")]
    pub min_lag: usize,
    #[serde(default)]
    pub method: Method,
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default = "default_min_frequency")]
    pub min_frequency_hz: f32,
    #[serde(default = "default_max_frequency")]
    pub max_frequency_hz: f32,
    #[serde(default = "default_min_pitch_class")]
    pub min_pitch_class: i32,
    #[serde(default = "default_max_pitch_class")]
    pub max_pitch_class: i32,
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_pan_sensitivity")]
    pub pan_sensitivity: f32,
    #[serde(default = "default_zoom_min")]
    pub zoom_min: f32,
    #[serde(default = "default_zoom_max")]
    pub zoom_max: f32,
    #[serde(default = "default_horizontal_zoom")]
    pub horizontal_zoom: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            font: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            silence_threshold: default_silence_threshold(),
            min_lag: default_min_lag(),
            method: Method::default(),
            normalize: true,
            min_frequency_hz: default_min_frequency(),
            max_frequency_hz: default_max_frequency(),
            min_pitch_class: default_min_pitch_class(),
            max_pitch_class: default_max_pitch_class(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            pan_sensitivity: default_pan_sensitivity(),
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            horizontal_zoom: default_horizontal_zoom(),
        }
    }
}

fn default_width() -> u32 { 900 }
fn default_height() -> u32 { 380 }
fn default_fps() -> u32 { 60 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_window_size() -> usize { 2048 }
fn default_silence_threshold() -> f32 { crate::audio::pitch::DEFAULT_SILENCE_THRESHOLD }
fn default_min_lag() -> usize { crate::audio::pitch::DEFAULT_MIN_LAG }
fn default_true() -> bool { true }
fn default_min_frequency() -> f32 { 75.0 }
fn default_max_frequency() -> f32 { 1200.0 }
fn default_min_pitch_class() -> i32 { 24 }
fn default_max_pitch_class() -> i32 { 84 }
fn default_capacity() -> usize { crate::history::DEFAULT_CAPACITY }
fn default_pan_sensitivity() -> f32 { 0.7 }
fn default_zoom_min() -> f32 { 0.5 }
fn default_zoom_max() -> f32 { 4.0 }
fn default_horizontal_zoom() -> f32 { 1.0 }

impl Config {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PitchtrailError> {
        let invalid = |msg: String| Err(PitchtrailError::InvalidConfig(msg));

        if self.output.width == 0 || self.output.height == 0 {
            return invalid(format!(
                "surface size must be non-zero, got {}x{}",
                self.output.width, self.output.height
            ));
        }
        if self.output.fps == 0 {
            return invalid("fps must be at least 1".into());
        }
        if self.analysis.window_size < 2 * self.analysis.min_lag.max(1) {
            return invalid(format!(
                "window_size {} cannot hold lags from {}",
                self.analysis.window_size, self.analysis.min_lag
            ));
        }
        if self.analysis.min_frequency_hz > self.analysis.max_frequency_hz {
            return invalid("min_frequency_hz is above max_frequency_hz".into());
        }
        if self.analysis.min_pitch_class > self.analysis.max_pitch_class {
            return invalid("min_pitch_class is above max_pitch_class".into());
        }
        if self.history.capacity == 0 {
            return invalid("history capacity must be at least 1".into());
        }
        let vp = &self.viewport;
        if !(vp.zoom_min > 0.0 && vp.zoom_min <= vp.zoom_max) {
            return invalid(format!(
                "vertical zoom range {}..{} is empty or non-positive",
                vp.zoom_min, vp.zoom_max
            ));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, else `pitchtrail.toml` in the working directory, else the
/// per-user config file.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("pitchtrail.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("pitchtrail").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("pitchtrail").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}
