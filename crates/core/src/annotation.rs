//! Annotation data model
//!
//! Committed page objects are a tagged variant: calibration lines,
//! measurements, dimension annotations and free text. Each one owns the
//! scene object that draws it, so the page is the single owner of both the
//! semantic record and its visual.

use crate::geometry::{distance, CanvasPoint};
use crate::scene::SceneObject;

/// Unique identifier for an annotation
///
/// Shared with the scene object that draws it, so removing by id removes both.
pub type AnnotationId = uuid::Uuid;

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with a different alpha
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not opaque
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Common annotation colors
impl Color {
    pub const RED: Color = Color { r: 239, g: 68, b: 68, a: 255 };
    pub const SLATE: Color = Color { r: 100, g: 116, b: 139, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Semantic kind of a committed annotation
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Reference segment used to set the page scale
    Calibration {
        /// Declared real-world length
        meters: f32,
    },
    /// Segment whose length is derived from the page scale
    Measurement {
        /// Derived real-world length
        meters: f32,
    },
    /// Segment labelled with a manually declared dimension
    Dimension {
        /// Declared value, independent of the scale
        value: f32,
    },
    /// Free-standing text
    FreeText,
}

impl AnnotationKind {
    /// Short tag used in summaries and logs
    pub fn tag(&self) -> &'static str {
        match self {
            AnnotationKind::Calibration { .. } => "calibration",
            AnnotationKind::Measurement { .. } => "measurement",
            AnnotationKind::Dimension { .. } => "dimension",
            AnnotationKind::FreeText => "text",
        }
    }

    /// Numeric value carried by the kind, if any
    pub fn value(&self) -> Option<f32> {
        match self {
            AnnotationKind::Calibration { meters } | AnnotationKind::Measurement { meters } => {
                Some(*meters)
            }
            AnnotationKind::Dimension { value } => Some(*value),
            AnnotationKind::FreeText => None,
        }
    }
}

/// Where an annotation is anchored on the canvas
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationAnchor {
    /// Two-point segment
    Segment { start: CanvasPoint, end: CanvasPoint },
    /// Single point (text center)
    Point(CanvasPoint),
}

impl AnnotationAnchor {
    /// Length of the anchor in canvas pixels (0 for points)
    pub fn length(&self) -> f32 {
        match self {
            AnnotationAnchor::Segment { start, end } => distance(start, end),
            AnnotationAnchor::Point(_) => 0.0,
        }
    }

    /// Same anchor moved by `(dx, dy)`
    pub fn translated(&self, dx: f32, dy: f32) -> AnnotationAnchor {
        match self {
            AnnotationAnchor::Segment { start, end } => AnnotationAnchor::Segment {
                start: start.offset(dx, dy),
                end: end.offset(dx, dy),
            },
            AnnotationAnchor::Point(point) => AnnotationAnchor::Point(point.offset(dx, dy)),
        }
    }
}

/// A committed page annotation
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    kind: AnnotationKind,
    anchor: AnnotationAnchor,
    color: Color,
    label: String,
    object: SceneObject,
}

impl Annotation {
    /// Create a new annotation around an already built scene object
    pub fn new(
        kind: AnnotationKind,
        anchor: AnnotationAnchor,
        color: Color,
        label: impl Into<String>,
        object: SceneObject,
    ) -> Self {
        Self {
            kind,
            anchor,
            color,
            label: label.into(),
            object,
        }
    }

    /// Get the annotation ID
    pub fn id(&self) -> AnnotationId {
        self.object.id
    }

    /// Get the semantic kind
    pub fn kind(&self) -> &AnnotationKind {
        &self.kind
    }

    /// Get the canvas anchor
    pub fn anchor(&self) -> &AnnotationAnchor {
        &self.anchor
    }

    /// Get the display color
    pub fn color(&self) -> Color {
        self.color
    }

    /// Get the label text
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get the scene object that draws this annotation
    pub fn object(&self) -> &SceneObject {
        &self.object
    }

    /// Replace the drawn object with its live canvas version
    ///
    /// The anchor follows the object's move. Ignored when the ids differ.
    pub(crate) fn sync_object(&mut self, object: &SceneObject) {
        if object.id != self.object.id {
            return;
        }
        let dx = object.position.x - self.object.position.x;
        let dy = object.position.y - self.object.position.y;
        self.anchor = self.anchor.translated(dx, dy);
        self.object = object.clone();
    }

    pub fn is_calibration(&self) -> bool {
        matches!(self.kind, AnnotationKind::Calibration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_round_trip() {
        let color = Color::from_hex("#ef4444").unwrap();
        assert_eq!(color, Color::RED);
        assert_eq!(color.to_hex(), "#ef4444");

        let translucent = Color::from_hex("#000000b3").unwrap();
        assert_eq!(translucent.a, 0xb3);
        assert_eq!(translucent.to_hex(), "#000000b3");
    }

    #[test]
    fn test_color_rejects_garbage() {
        assert!(Color::from_hex("ef4444").is_none());
        assert!(Color::from_hex("#ef44").is_none());
        assert!(Color::from_hex("#gg4444").is_none());
        assert!(Color::from_hex("#éé4444").is_none());
    }

    #[test]
    fn test_color_serializes_as_hex() {
        let json = serde_json::to_string(&Color::SLATE).unwrap();
        assert_eq!(json, "\"#64748b\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::SLATE);
    }

    #[test]
    fn test_kind_values() {
        assert_eq!(AnnotationKind::Measurement { meters: 1.5 }.value(), Some(1.5));
        assert_eq!(AnnotationKind::Dimension { value: 0.2 }.value(), Some(0.2));
        assert_eq!(AnnotationKind::FreeText.value(), None);
        assert_eq!(AnnotationKind::Calibration { meters: 2.0 }.tag(), "calibration");
    }

    #[test]
    fn test_kind_serializes_with_type_tag() {
        let json = serde_json::to_value(AnnotationKind::Measurement { meters: 1.5 }).unwrap();
        assert_eq!(json["type"], "measurement");
        assert_eq!(json["meters"], 1.5);
    }

    #[test]
    fn test_anchor_length() {
        let seg = AnnotationAnchor::Segment {
            start: CanvasPoint::new(0.0, 0.0),
            end: CanvasPoint::new(0.0, 150.0),
        };
        assert_eq!(seg.length(), 150.0);
        assert_eq!(AnnotationAnchor::Point(CanvasPoint::new(1.0, 1.0)).length(), 0.0);
    }

    #[test]
    fn test_sync_object_moves_anchor() {
        let object = SceneObject::new(CanvasPoint::new(50.0, 0.0), Vec::new(), true);
        let mut annotation = Annotation::new(
            AnnotationKind::Measurement { meters: 1.0 },
            AnnotationAnchor::Segment {
                start: CanvasPoint::new(0.0, 0.0),
                end: CanvasPoint::new(100.0, 0.0),
            },
            Color::RED,
            "1.00 m",
            object.clone(),
        );

        let mut moved = object;
        moved.position = CanvasPoint::new(60.0, -5.0);
        annotation.sync_object(&moved);

        assert_eq!(annotation.object().position, CanvasPoint::new(60.0, -5.0));
        assert_eq!(
            annotation.anchor(),
            &AnnotationAnchor::Segment {
                start: CanvasPoint::new(10.0, -5.0),
                end: CanvasPoint::new(110.0, -5.0),
            }
        );
        assert_eq!(annotation.anchor().length(), 100.0);

        // a different object leaves the annotation alone
        annotation.sync_object(&SceneObject::new(CanvasPoint::new(0.0, 0.0), Vec::new(), true));
        assert_eq!(annotation.object().position, CanvasPoint::new(60.0, -5.0));
    }
}
