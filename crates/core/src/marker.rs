//! Marker construction
//!
//! A marker is the composite drawn for a calibration line, a measurement or
//! a dimension annotation: the segment itself, an open arrowhead at each end
//! pointing outward, and a label plate above the midpoint. Sizes given in
//! screen pixels by [`EngineConfig`] are divided by the zoom at build time so
//! markers look the same at every zoom level.

use crate::annotation::Color;
use crate::config::EngineConfig;
use crate::geometry::{angle_degrees, normalize_degrees, CanvasPoint};
use crate::scene::{LabelOrigin, SceneObject, Shape, StrokeSpec};

/// Smallest arrowhead, in canvas pixels
const MIN_ARROW_SIZE: f32 = 6.0;

/// Label plate padding (screen px)
const LABEL_PADDING: f32 = 4.0;

/// Free text plate padding (screen px)
const TEXT_PADDING: f32 = 6.0;

/// Visual style of a marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub color: Color,
    /// Stroke width before the factor and zoom are applied (screen px)
    pub base_stroke: f32,
    /// Dash pattern (screen px), empty for solid
    pub dash: Vec<f32>,
    pub stroke_factor: f32,
}

impl MarkerStyle {
    /// Solid line in the drawing color
    pub fn measurement(config: &EngineConfig, color: Color) -> Self {
        Self {
            color,
            base_stroke: config.measure_stroke,
            dash: Vec::new(),
            stroke_factor: 1.0,
        }
    }

    /// Thicker solid line for manually declared dimensions
    pub fn dimension(config: &EngineConfig, color: Color) -> Self {
        Self {
            stroke_factor: config.annotation_stroke_factor,
            ..Self::measurement(config, color)
        }
    }

    /// Grey dashed line used while and after calibrating
    pub fn calibration(config: &EngineConfig) -> Self {
        Self {
            color: Color::SLATE,
            base_stroke: config.scale_stroke,
            dash: config.scale_dash.clone(),
            stroke_factor: 1.0,
        }
    }

    /// Stroke at the given zoom
    fn stroke(&self, zoom: f32) -> StrokeSpec {
        StrokeSpec {
            color: self.color,
            width: self.base_stroke * self.stroke_factor / zoom,
            dash: self.dash.iter().map(|d| d / zoom).collect(),
        }
    }
}

/// Format a metric value as a label (`"1.50 m"`)
pub fn format_meters(value: f32) -> String {
    format!("{value:.2} m")
}

fn safe_zoom(zoom: f32) -> f32 {
    if zoom > 0.0 && zoom.is_finite() {
        zoom
    } else {
        1.0
    }
}

/// Build the composite marker for segment `p1`-`p2`
///
/// The object's origin is the segment midpoint. Only the group is
/// selectable.
pub fn build_marker(
    p1: CanvasPoint,
    p2: CanvasPoint,
    label: &str,
    style: &MarkerStyle,
    zoom: f32,
    config: &EngineConfig,
) -> SceneObject {
    let zoom = safe_zoom(zoom);
    let mid = p1.midpoint(&p2);
    let start = CanvasPoint::new(p1.x - mid.x, p1.y - mid.y);
    let end = CanvasPoint::new(p2.x - mid.x, p2.y - mid.y);

    let heading = angle_degrees(&p1, &p2);
    let stroke = style.stroke(zoom);
    let arrow_stroke = StrokeSpec {
        dash: Vec::new(),
        ..stroke.clone()
    };
    let arrow_size = (config.arrow_size_base / zoom).max(MIN_ARROW_SIZE);

    let shapes = vec![
        Shape::Segment { start, end, stroke },
        Shape::ArrowHead {
            tip: start,
            heading: normalize_degrees(heading + 180.0),
            size: arrow_size,
            stroke: arrow_stroke.clone(),
        },
        Shape::ArrowHead {
            tip: end,
            heading,
            size: arrow_size,
            stroke: arrow_stroke,
        },
        Shape::Label {
            anchor: CanvasPoint::new(0.0, -config.label_offset / zoom),
            text: label.to_string(),
            font_size: config.label_font_size / zoom,
            fill: Color::WHITE,
            background: Some(Color::BLACK.with_alpha(191)),
            padding: LABEL_PADDING / zoom,
            origin: LabelOrigin::CenterBottom,
        },
    ];

    SceneObject::new(mid, shapes, true)
}

/// Build a free text object centered on `point`
pub fn build_text(
    point: CanvasPoint,
    text: &str,
    color: Color,
    zoom: f32,
    config: &EngineConfig,
) -> SceneObject {
    let zoom = safe_zoom(zoom);
    let label = Shape::Label {
        anchor: CanvasPoint::new(0.0, 0.0),
        text: text.to_string(),
        font_size: config.text_font_size / zoom,
        fill: color,
        background: Some(Color::BLACK.with_alpha(179)),
        padding: TEXT_PADDING / zoom,
        origin: LabelOrigin::Center,
    };
    SceneObject::new(point, vec![label], true)
}

/// Build the live preview segment shown while a gesture is armed
pub fn build_preview(
    start: CanvasPoint,
    end: CanvasPoint,
    style: &MarkerStyle,
    zoom: f32,
) -> SceneObject {
    let segment = Shape::Segment {
        start: CanvasPoint::new(0.0, 0.0),
        end: CanvasPoint::new(end.x - start.x, end.y - start.y),
        stroke: style.stroke(safe_zoom(zoom)),
    };
    SceneObject::new(start, vec![segment], false)
}

/// Move the free end of a preview segment to `end`
pub fn update_preview(preview: &mut SceneObject, end: CanvasPoint) {
    let local = CanvasPoint::new(end.x - preview.position.x, end.y - preview.position.y);
    for shape in &mut preview.shapes {
        if let Shape::Segment { end, .. } = shape {
            *end = local;
        }
    }
}
