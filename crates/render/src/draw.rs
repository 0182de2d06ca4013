//! Draw command model
//!
//! Commands are expressed in the pixel space of the target raster. Stroke
//! widths are final pixel widths; nothing downstream rescales them.

/// Straight RGBA color used by the rasterizer (not premultiplied)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RgbaColor {
    pub const WHITE: RgbaColor = RgbaColor { r: 255, g: 255, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Stroke parameters for lines and open paths
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: RgbaColor,
    /// Width in target pixels
    pub width: f32,
    /// Alternating dash/gap lengths in target pixels (empty = solid)
    pub dash: Vec<f32>,
}

impl StrokeStyle {
    pub fn solid(color: RgbaColor, width: f32) -> Self {
        Self { color, width, dash: Vec::new() }
    }
}

/// Where a label's anchor sits relative to its box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAlign {
    /// Anchor is the bottom-center of the box (measurement labels)
    CenterBottom,
    /// Anchor is the center of the box (free text)
    Center,
}

/// A single drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        from: [f32; 2],
        to: [f32; 2],
        stroke: StrokeStyle,
    },
    Polyline {
        points: Vec<[f32; 2]>,
        stroke: StrokeStyle,
    },
    Label {
        anchor: [f32; 2],
        text: String,
        font_size: f32,
        color: RgbaColor,
        background: Option<RgbaColor>,
        padding: f32,
        align: LabelAlign,
    },
}
