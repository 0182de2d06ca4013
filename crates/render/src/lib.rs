//! Field Plan Render Library
//!
//! Offscreen rasterizer for exported plans. Consumes flat draw commands in
//! absolute pixel space and produces an RGBA raster.

pub mod draw;
pub mod font;
pub mod raster;

pub use draw::{DrawCommand, LabelAlign, RgbaColor, StrokeStyle};
pub use font::{label_font, text_extent};
pub use raster::{rasterize, RenderError, RenderResult, RgbaImage};
