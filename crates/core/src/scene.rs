//! Retained scene model and the canvas capability
//!
//! A [`SceneObject`] is an atomic, selectable group of shapes. Shape
//! coordinates are local to the object's `position` and stretched by its
//! per-axis `scale`; stroke widths are absolute canvas pixels and are not
//! affected by `scale`.
//!
//! [`Canvas`] is the surface the engine talks to. [`Scene`] is the in-memory
//! implementation used by tools, the export compositor and tests.

use crate::annotation::Color;
use crate::geometry::{CanvasPoint, ScreenPoint};

/// Unique identifier for a scene object
pub type ObjectId = uuid::Uuid;

/// Stroke parameters for a shape
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrokeSpec {
    pub color: Color,
    /// Width in canvas pixels
    pub width: f32,
    /// Dash/gap lengths in canvas pixels (empty for solid)
    #[serde(default)]
    pub dash: Vec<f32>,
}

impl StrokeSpec {
    /// Multiply width and dash lengths by `factor`
    pub fn scaled(&self, factor: f32) -> StrokeSpec {
        StrokeSpec {
            color: self.color,
            width: self.width * factor,
            dash: self.dash.iter().map(|d| d * factor).collect(),
        }
    }
}

/// How a label box sits on its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOrigin {
    CenterBottom,
    Center,
}

/// Primitive shapes a scene object is made of
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// Straight segment
    Segment {
        start: CanvasPoint,
        end: CanvasPoint,
        stroke: StrokeSpec,
    },
    /// Open "V" arrowhead whose tip sits at `tip` and points along `heading`
    ArrowHead {
        tip: CanvasPoint,
        /// Degrees, in (-180, 180]
        heading: f32,
        /// Arm length in local units
        size: f32,
        stroke: StrokeSpec,
    },
    /// Text on an optional background plate
    Label {
        anchor: CanvasPoint,
        text: String,
        font_size: f32,
        fill: Color,
        background: Option<Color>,
        padding: f32,
        origin: LabelOrigin,
    },
}

/// Half-opening angle of arrowhead arms
pub const ARROW_ARM_DEGREES: f32 = 30.0;

impl Shape {
    /// Arm end points of an arrowhead, in local coordinates
    pub fn arrow_arms(tip: CanvasPoint, heading: f32, size: f32) -> [CanvasPoint; 2] {
        let arm = |delta: f32| {
            let angle = (heading + 180.0 + delta).to_radians();
            tip.offset(size * angle.cos(), size * angle.sin())
        };
        [arm(-ARROW_ARM_DEGREES), arm(ARROW_ARM_DEGREES)]
    }

    fn stroke_mut(&mut self) -> Option<&mut StrokeSpec> {
        match self {
            Shape::Segment { stroke, .. } | Shape::ArrowHead { stroke, .. } => Some(stroke),
            Shape::Label { .. } => None,
        }
    }
}

/// Atomic group of shapes placed on the canvas
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    /// Origin of the local coordinate system, in canvas space
    pub position: CanvasPoint,
    /// Per-axis stretch applied to local coordinates
    pub scale: [f32; 2],
    pub shapes: Vec<Shape>,
    /// Whether the group can be picked and moved as a whole
    pub selectable: bool,
}

impl SceneObject {
    /// Create an object with a fresh id and unit scale
    pub fn new(position: CanvasPoint, shapes: Vec<Shape>, selectable: bool) -> Self {
        Self {
            id: ObjectId::new_v4(),
            position,
            scale: [1.0, 1.0],
            shapes,
            selectable,
        }
    }

    /// Map a local point to canvas space
    pub fn to_canvas(&self, local: CanvasPoint) -> CanvasPoint {
        CanvasPoint::new(
            self.position.x + local.x * self.scale[0],
            self.position.y + local.y * self.scale[1],
        )
    }

    /// Multiply every stroke width (and dash length) by `factor`
    pub fn scale_strokes(&mut self, factor: f32) {
        for shape in &mut self.shapes {
            if let Some(stroke) = shape.stroke_mut() {
                *stroke = stroke.scaled(factor);
            }
        }
    }

    /// Stroke widths of all stroked shapes, in shape order
    pub fn stroke_widths(&self) -> Vec<f32> {
        self.shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Segment { stroke, .. } | Shape::ArrowHead { stroke, .. } => {
                    Some(stroke.width)
                }
                Shape::Label { .. } => None,
            })
            .collect()
    }
}

/// Rendering surface the engine drives
///
/// Implemented by the host's canvas widget; [`Scene`] is the in-memory
/// implementation.
pub trait Canvas {
    /// Add an object on top of the stack
    fn add(&mut self, object: SceneObject);
    /// Remove an object, returning it if present
    fn remove(&mut self, id: ObjectId) -> Option<SceneObject>;
    fn get(&self, id: ObjectId) -> Option<&SceneObject>;
    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject>;
    /// Current zoom factor (screen px per canvas px)
    fn zoom(&self) -> f32;
    /// Convert a pointer position to canvas space, honoring pan and zoom
    fn screen_to_canvas(&self, point: ScreenPoint) -> CanvasPoint;
    /// Make an object the active selection
    fn set_active(&mut self, id: ObjectId);
    /// Clear the active selection
    fn discard_selection(&mut self);
    /// Schedule a redraw
    fn request_render(&mut self);
}

/// In-memory retained scene with a pan/zoom viewport
#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<SceneObject>,
    zoom: f32,
    pan: [f32; 2],
    active: Option<ObjectId>,
    render_requests: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene at zoom 1 with no pan
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            zoom: 1.0,
            pan: [0.0, 0.0],
            active: None,
            render_requests: 0,
        }
    }

    /// Set the zoom factor; non-positive values are ignored
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom > 0.0 && zoom.is_finite() {
            self.zoom = zoom;
        }
    }

    /// Set the viewport pan in screen pixels
    pub fn set_pan(&mut self, x: f32, y: f32) {
        self.pan = [x, y];
    }

    /// Objects in stacking order
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Currently selected object
    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    /// Number of redraws requested so far
    pub fn render_requests(&self) -> u64 {
        self.render_requests
    }

    /// Drop every object and the selection
    pub fn clear(&mut self) {
        self.objects.clear();
        self.active = None;
    }
}

impl Canvas for Scene {
    fn add(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Some(self.objects.remove(index))
    }

    fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }

    fn screen_to_canvas(&self, point: ScreenPoint) -> CanvasPoint {
        CanvasPoint::new((point.x - self.pan[0]) / self.zoom, (point.y - self.pan[1]) / self.zoom)
    }

    fn set_active(&mut self, id: ObjectId) {
        if self.get(id).is_some() {
            self.active = Some(id);
        }
    }

    fn discard_selection(&mut self) {
        self.active = None;
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::distance;

    fn segment_object() -> SceneObject {
        SceneObject::new(
            CanvasPoint::new(100.0, 50.0),
            vec![Shape::Segment {
                start: CanvasPoint::new(-10.0, 0.0),
                end: CanvasPoint::new(10.0, 0.0),
                stroke: StrokeSpec { color: Color::RED, width: 2.0, dash: vec![4.0, 2.0] },
            }],
            true,
        )
    }

    #[test]
    fn test_screen_to_canvas_honors_pan_and_zoom() {
        let mut scene = Scene::new();
        scene.set_zoom(2.0);
        scene.set_pan(20.0, 10.0);
        let p = scene.screen_to_canvas(ScreenPoint::new(220.0, 110.0));
        assert_eq!(p, CanvasPoint::new(100.0, 50.0));
    }

    #[test]
    fn test_invalid_zoom_is_ignored() {
        let mut scene = Scene::new();
        scene.set_zoom(0.0);
        scene.set_zoom(f32::NAN);
        assert_eq!(scene.zoom(), 1.0);
    }

    #[test]
    fn test_add_remove_and_selection() {
        let mut scene = Scene::new();
        let object = segment_object();
        let id = object.id;
        scene.add(object);
        scene.set_active(id);
        assert_eq!(scene.active(), Some(id));

        let removed = scene.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(scene.active(), None);
        assert!(scene.remove(id).is_none());
    }

    #[test]
    fn test_set_active_ignores_unknown_ids() {
        let mut scene = Scene::new();
        scene.set_active(ObjectId::new_v4());
        assert_eq!(scene.active(), None);
    }

    #[test]
    fn test_to_canvas_applies_scale() {
        let mut object = segment_object();
        object.scale = [2.0, 3.0];
        assert_eq!(object.to_canvas(CanvasPoint::new(-10.0, 1.0)), CanvasPoint::new(80.0, 53.0));
    }

    #[test]
    fn test_scale_strokes_scales_dash() {
        let mut object = segment_object();
        object.scale_strokes(2.0);
        match &object.shapes[0] {
            Shape::Segment { stroke, .. } => {
                assert_eq!(stroke.width, 4.0);
                assert_eq!(stroke.dash, vec![8.0, 4.0]);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_arrow_arms_trail_behind_tip() {
        let tip = CanvasPoint::new(0.0, 0.0);
        let arms = Shape::arrow_arms(tip, 0.0, 10.0);
        for arm in arms {
            // heading 0 points along +x, so arms sit at negative x
            assert!(arm.x < 0.0);
            assert!((distance(&tip, &arm) - 10.0).abs() < 1e-4);
        }
        assert!((arms[0].y + arms[1].y).abs() < 1e-4);
    }
}
