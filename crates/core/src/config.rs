//! Engine configuration for gestures, marker styling and export.
//!
//! Configuration can be loaded from a TOML file, environment variables, or
//! created programmatically with the `with_*` builders. Screen-space values
//! (strokes, arrow sizes, fonts, offsets) are divided by the current zoom
//! when markers are built so they look the same at every zoom level.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Configuration for the measurement engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum gesture length in screen pixels
    pub min_gesture_px: f32,
    /// Base stroke width of measurement and annotation lines (screen px)
    pub measure_stroke: f32,
    /// Base stroke width of calibration lines (screen px)
    pub scale_stroke: f32,
    /// Dash pattern of calibration lines (screen px)
    pub scale_dash: Vec<f32>,
    /// Stroke multiplier applied to dimension annotations
    pub annotation_stroke_factor: f32,
    /// Arrowhead size (screen px)
    pub arrow_size_base: f32,
    /// Marker label font size (screen px)
    pub label_font_size: f32,
    /// Distance of the label above the segment midpoint (screen px)
    pub label_offset: f32,
    /// Free text font size (screen px)
    pub text_font_size: f32,
    /// Scale at which source pages are rendered to obtain native pixels
    pub render_scale: f32,
    /// Pixels per inch used to size exported document pages
    pub export_dpi: f32,
    /// Pre-filled value of the calibration prompt
    pub default_calibration_meters: String,
    /// File name prefix of exported artifacts
    pub artifact_prefix: String,
    /// Initial drawing color as `#rrggbb`
    pub default_color: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_gesture_px: 10.0,
            measure_stroke: 3.0,
            scale_stroke: 2.0,
            scale_dash: vec![10.0, 6.0],
            annotation_stroke_factor: 1.5,
            arrow_size_base: 14.0,
            label_font_size: 14.0,
            label_offset: 18.0,
            text_font_size: 18.0,
            render_scale: 3.0,
            export_dpi: 216.0,
            default_calibration_meters: "1.00".to_string(),
            artifact_prefix: "mesures-terrain".to_string(),
            default_color: "#ef4444".to_string(),
        }
    }
}

impl EngineConfig {
    /// Sets the minimum gesture length in screen pixels.
    pub fn with_min_gesture_px(mut self, px: f32) -> Self {
        self.min_gesture_px = px;
        self
    }

    /// Sets the document render scale.
    pub fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale;
        self
    }

    /// Sets the export DPI.
    pub fn with_export_dpi(mut self, dpi: f32) -> Self {
        self.export_dpi = dpi;
        self
    }

    /// Sets the exported file name prefix.
    pub fn with_artifact_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.artifact_prefix = prefix.into();
        self
    }

    /// Sets the initial drawing color.
    pub fn with_default_color(mut self, color: impl Into<String>) -> Self {
        self.default_color = color.into();
        self
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `FIELDPLAN_MIN_GESTURE_PX`: minimum gesture length (default: 10)
    /// - `FIELDPLAN_RENDER_SCALE`: document render scale (default: 3)
    /// - `FIELDPLAN_EXPORT_DPI`: export DPI (default: 216)
    /// - `FIELDPLAN_ARTIFACT_PREFIX`: export file prefix
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Applies environment overrides to this configuration.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var("FIELDPLAN_MIN_GESTURE_PX") {
            self.min_gesture_px = parse_positive("FIELDPLAN_MIN_GESTURE_PX", &val)?;
        }

        if let Ok(val) = std::env::var("FIELDPLAN_RENDER_SCALE") {
            self.render_scale = parse_positive("FIELDPLAN_RENDER_SCALE", &val)?;
        }

        if let Ok(val) = std::env::var("FIELDPLAN_EXPORT_DPI") {
            self.export_dpi = parse_positive("FIELDPLAN_EXPORT_DPI", &val)?;
        }

        if let Ok(val) = std::env::var("FIELDPLAN_ARTIFACT_PREFIX") {
            if val.trim().is_empty() {
                return Err(ConfigError::InvalidValue("FIELDPLAN_ARTIFACT_PREFIX".to_string()));
            }
            self.artifact_prefix = val;
        }

        Ok(self)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Missing keys keep their defaults; unknown keys are ignored.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path.as_ref(), toml)?;
        Ok(())
    }

    /// Checks that every numeric setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positives = [
            ("min_gesture_px", self.min_gesture_px),
            ("measure_stroke", self.measure_stroke),
            ("scale_stroke", self.scale_stroke),
            ("annotation_stroke_factor", self.annotation_stroke_factor),
            ("arrow_size_base", self.arrow_size_base),
            ("label_font_size", self.label_font_size),
            ("text_font_size", self.text_font_size),
            ("render_scale", self.render_scale),
            ("export_dpi", self.export_dpi),
        ];
        for (key, value) in positives {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue(key.to_string()));
            }
        }
        if self.scale_dash.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(ConfigError::InvalidValue("scale_dash".to_string()));
        }
        if crate::annotation::Color::from_hex(&self.default_color).is_none() {
            return Err(ConfigError::InvalidValue("default_color".to_string()));
        }
        Ok(())
    }
}

fn parse_positive(key: &str, value: &str) -> Result<f32, ConfigError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| ConfigError::InvalidValue(key.to_string()))
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("Invalid value for configuration key: {0}")]
    InvalidValue(String),
    /// I/O error reading or writing configuration file
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    /// Malformed TOML
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(String),
}
