//! Pixel to metric scale model
//!
//! A page scale is a single pixels-per-meter ratio in canvas space. It is
//! either unset or strictly positive, and is only ever replaced as a whole.

use crate::geometry::is_too_short;
use tracing::debug;

/// Meters per inch
const METERS_PER_INCH: f32 = 0.0254;

/// PDF points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Where the current scale came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleSource {
    /// Traced by the user over a segment of known length
    #[default]
    Manual,
    /// Inferred from a `1:N` notation printed on the plan
    Detected,
}

/// Errors raised by scale operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScaleError {
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("no scale has been set for this page")]
    ScaleNotSet,
}

pub type ScaleResult<T> = Result<T, ScaleError>;

/// Current pixels-per-meter ratio of a page
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawScale")]
pub struct ScaleModel {
    pixels_per_meter: Option<f32>,
    source: ScaleSource,
}

/// Saved form of a [`ScaleModel`], checked before use
#[derive(serde::Deserialize)]
struct RawScale {
    pixels_per_meter: Option<f32>,
    #[serde(default)]
    source: ScaleSource,
}

impl TryFrom<RawScale> for ScaleModel {
    type Error = ScaleError;

    fn try_from(raw: RawScale) -> ScaleResult<Self> {
        if let Some(ppm) = raw.pixels_per_meter {
            if !(ppm.is_finite() && ppm > 0.0) {
                return Err(ScaleError::InvalidCalibration(format!(
                    "saved pixels per meter must be positive, got {ppm}"
                )));
            }
        }
        Ok(Self {
            pixels_per_meter: raw.pixels_per_meter,
            source: raw.source,
        })
    }
}

impl ScaleModel {
    /// Create an unset scale
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the scale from a traced calibration segment
    ///
    /// `zoom` and `min_gesture_px` define the short-gesture threshold the
    /// segment has to clear. On error the previous value is kept.
    pub fn set_from_calibration(
        &mut self,
        pixel_distance: f32,
        real_meters: f32,
        zoom: f32,
        min_gesture_px: f32,
    ) -> ScaleResult<f32> {
        if !(real_meters.is_finite() && real_meters > 0.0) {
            return Err(ScaleError::InvalidCalibration(format!(
                "real distance must be positive, got {real_meters}"
            )));
        }
        if !pixel_distance.is_finite() || is_too_short(pixel_distance, zoom, min_gesture_px) {
            return Err(ScaleError::InvalidCalibration(format!(
                "segment of {pixel_distance:.1} px is too short"
            )));
        }

        let ppm = pixel_distance / real_meters;
        self.pixels_per_meter = Some(ppm);
        self.source = ScaleSource::Manual;
        debug!(pixels_per_meter = ppm, "scale calibrated");
        Ok(ppm)
    }

    /// Store the scale implied by a detected `1:ratio` plan notation
    ///
    /// Canvas pixels are document points rendered at `render_scale`, so one
    /// real meter spans `72 * render_scale / (0.0254 * ratio)` pixels.
    pub fn set_detected(&mut self, ratio: f32, render_scale: f32) -> ScaleResult<f32> {
        if !(ratio.is_finite() && ratio > 0.0 && render_scale.is_finite() && render_scale > 0.0) {
            return Err(ScaleError::InvalidCalibration(format!(
                "cannot derive a scale from 1:{ratio} at render scale {render_scale}"
            )));
        }
        let ppm = POINTS_PER_INCH * render_scale / (METERS_PER_INCH * ratio);
        self.pixels_per_meter = Some(ppm);
        self.source = ScaleSource::Detected;
        debug!(ratio, pixels_per_meter = ppm, "scale detected");
        Ok(ppm)
    }

    /// Convert a canvas pixel distance to meters
    pub fn to_meters(&self, pixel_distance: f32) -> ScaleResult<f32> {
        self.pixels_per_meter
            .map(|ppm| pixel_distance / ppm)
            .ok_or(ScaleError::ScaleNotSet)
    }

    /// Convert meters to a canvas pixel distance
    pub fn to_pixels(&self, meters: f32) -> ScaleResult<f32> {
        self.pixels_per_meter
            .map(|ppm| meters * ppm)
            .ok_or(ScaleError::ScaleNotSet)
    }

    pub fn has_scale(&self) -> bool {
        self.pixels_per_meter.is_some()
    }

    pub fn pixels_per_meter(&self) -> Option<f32> {
        self.pixels_per_meter
    }

    pub fn source(&self) -> Option<ScaleSource> {
        self.pixels_per_meter.map(|_| self.source)
    }

    /// Approximate plan ratio `N` of `1:N` implied by the current scale
    pub fn drawing_ratio(&self, render_scale: f32) -> Option<f32> {
        let ppm = self.pixels_per_meter?;
        Some(POINTS_PER_INCH * render_scale / (METERS_PER_INCH * ppm))
    }

    /// Forget the scale
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
