//! Offscreen rasterization
//!
//! Paints an optional background raster and a list of draw commands into a
//! fresh pixmap of the requested size using tiny-skia.

use crate::draw::{DrawCommand, LabelAlign, RgbaColor, StrokeStyle};
use crate::font::{label_font, text_extent};
use image::{ImageBuffer, Rgba};
use rusttype::{point, Scale};
use tiny_skia::{
    ColorU8, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, StrokeDash, Transform,
};
use tracing::debug;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Errors raised while rasterizing a scene
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid raster size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("background is {actual_width}x{actual_height}, expected {width}x{height}")]
    BackgroundMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Rasterize `commands` over `background` into a `width` x `height` image
///
/// When no background is given the canvas starts white. A background must
/// already match the target size.
pub fn rasterize(
    width: u32,
    height: u32,
    background: Option<&RgbaImage>,
    commands: &[DrawCommand],
) -> RenderResult<RgbaImage> {
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;

    match background {
        Some(image) => {
            if image.width() != width || image.height() != height {
                return Err(RenderError::BackgroundMismatch {
                    width,
                    height,
                    actual_width: image.width(),
                    actual_height: image.height(),
                });
            }
            for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
                *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
            }
        }
        None => pixmap.fill(tiny_skia::Color::WHITE),
    }

    for command in commands {
        match command {
            DrawCommand::Line { from, to, stroke } => {
                stroke_points(&mut pixmap, &[*from, *to], stroke);
            }
            DrawCommand::Polyline { points, stroke } => {
                stroke_points(&mut pixmap, points, stroke);
            }
            DrawCommand::Label {
                anchor,
                text,
                font_size,
                color,
                background,
                padding,
                align,
            } => draw_label(&mut pixmap, *anchor, text, *font_size, *color, *background, *padding, *align),
        }
    }

    debug!(width, height, commands = commands.len(), "rasterized scene");

    let mut output = RgbaImage::new(width, height);
    for (dst, src) in output.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Ok(output)
}

fn paint_for(color: RgbaColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn stroke_points(pixmap: &mut Pixmap, points: &[[f32; 2]], style: &StrokeStyle) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    if rest.is_empty() || style.width <= 0.0 {
        return;
    }

    let mut pb = PathBuilder::new();
    pb.move_to(first[0], first[1]);
    for p in rest {
        pb.line_to(p[0], p[1]);
    }
    let Some(path) = pb.finish() else {
        return;
    };

    let stroke = Stroke {
        width: style.width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        dash: if style.dash.is_empty() {
            None
        } else {
            StrokeDash::new(style.dash.clone(), 0.0)
        },
        ..Default::default()
    };

    pixmap.stroke_path(&path, &paint_for(style.color), &stroke, Transform::identity(), None);
}

#[allow(clippy::too_many_arguments)]
fn draw_label(
    pixmap: &mut Pixmap,
    anchor: [f32; 2],
    text: &str,
    font_size: f32,
    color: RgbaColor,
    background: Option<RgbaColor>,
    padding: f32,
    align: LabelAlign,
) {
    if font_size <= 0.0 {
        return;
    }

    let (text_width, text_height) = text_extent(text, font_size);
    let box_width = text_width + padding * 2.0;
    let box_height = text_height + padding * 2.0;
    let left = anchor[0] - box_width / 2.0;
    let top = match align {
        LabelAlign::CenterBottom => anchor[1] - box_height,
        LabelAlign::Center => anchor[1] - box_height / 2.0,
    };

    if let Some(bg) = background {
        if let Some(rect) = Rect::from_xywh(left, top, box_width, box_height) {
            pixmap.fill_rect(rect, &paint_for(bg), Transform::identity(), None);
        }
    }

    let Some(font) = label_font() else {
        return;
    };

    let scale = Scale::uniform(font_size);
    let v_metrics = font.v_metrics(scale);
    let origin = point(left + padding, top + padding + v_metrics.ascent);
    let width = pixmap.width() as i32;
    let height = pixmap.height() as i32;

    for glyph in font.layout(text, scale, origin) {
        let Some(bbox) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = gx as i32 + bbox.min.x;
            let py = gy as i32 + bbox.min.y;
            if px < 0 || py < 0 || px >= width || py >= height {
                return;
            }
            let idx = (py * width + px) as usize;
            if let Some(dst) = pixmap.pixels_mut().get_mut(idx) {
                *dst = blend_over(*dst, color, coverage);
            }
        });
    }
}

/// Source-over blend of a straight color with partial coverage onto a
/// premultiplied destination pixel
fn blend_over(
    dst: tiny_skia::PremultipliedColorU8,
    color: RgbaColor,
    coverage: f32,
) -> tiny_skia::PremultipliedColorU8 {
    let src_a = (color.a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    let inv = 1.0 - src_a;
    let channel = |src: u8, dst: u8| -> u8 {
        (src as f32 * src_a + dst as f32 * inv).round().clamp(0.0, 255.0) as u8
    };
    let r = channel(color.r, dst.red());
    let g = channel(color.g, dst.green());
    let b = channel(color.b, dst.blue());
    let a = (src_a * 255.0 + dst.alpha() as f32 * inv).round().clamp(0.0, 255.0) as u8;
    // channels never exceed alpha after a source-over blend of valid inputs
    tiny_skia::PremultipliedColorU8::from_rgba(r.min(a), g.min(a), b.min(a), a).unwrap_or(dst)
}
