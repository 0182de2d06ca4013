//! Point types and plane geometry helpers
//!
//! Canvas coordinates are document pixels: the space the plan background is
//! laid out in before pan and zoom are applied. Screen coordinates are raw
//! pointer positions on the viewport.

/// Point in canvas (document) space
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanvasPoint {
    pub x: f32,
    pub y: f32,
}

impl CanvasPoint {
    /// Create a new canvas point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &CanvasPoint) -> CanvasPoint {
        CanvasPoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Offset this point by a vector
    pub fn offset(&self, dx: f32, dy: f32) -> CanvasPoint {
        CanvasPoint::new(self.x + dx, self.y + dy)
    }
}

/// Raw pointer position in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two canvas points
pub fn distance(p1: &CanvasPoint, p2: &CanvasPoint) -> f32 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// Heading from `p1` to `p2` in degrees, in (-180, 180]
///
/// Canvas y grows downward, so 90 degrees points down the page.
pub fn angle_degrees(p1: &CanvasPoint, p2: &CanvasPoint) -> f32 {
    normalize_degrees((p2.y - p1.y).atan2(p2.x - p1.x).to_degrees())
}

/// Wrap an angle into (-180, 180]
pub fn normalize_degrees(angle: f32) -> f32 {
    let mut wrapped = angle % 360.0;
    if wrapped <= -180.0 {
        wrapped += 360.0;
    } else if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Whether a canvas-space distance is too short to count as a gesture
///
/// The threshold is a screen-space length, so at zoom 2 a 6 px canvas drag
/// is 12 screen px long.
pub fn is_too_short(pixel_distance: f32, zoom: f32, min_gesture_px: f32) -> bool {
    let zoom = if zoom > 0.0 { zoom } else { 1.0 };
    pixel_distance < min_gesture_px / zoom
}
