//! Export compositor
//!
//! Rebuilds a page's annotations in an offscreen scene sized to the page's
//! native pixel resolution, rasterizes it over the page background and
//! writes PNG or PDF artifacts. Annotations are re-projected from the canvas
//! layout of the background into native pixels with one factor per axis;
//! stroke widths use the smaller factor so lines keep their weight without
//! distortion.

use crate::annotation::Color;
use crate::document::Page;
use crate::pdf_export::encode_pdf;
use crate::scene::{Canvas, LabelOrigin, Scene, SceneObject, Shape};
use crate::source::{PageSource, SourceError};
use fieldplan_render::{
    rasterize, DrawCommand, LabelAlign, RenderError, RgbaColor, RgbaImage, StrokeStyle,
};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors raised while exporting a page
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("page {0} does not exist")]
    NoPage(usize),
    #[error("page background has no usable size ({width}x{height})")]
    InvalidBackground { width: u32, height: u32 },
    #[error("background: {0}")]
    Source(#[from] SourceError),
    #[error("render: {0}")]
    Render(#[from] RenderError),
    #[error("PNG encoding: {0}")]
    Png(#[from] image::ImageError),
    #[error("PDF encoding: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Native-over-display ratio for each axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFactors {
    pub x: f32,
    pub y: f32,
}

impl AxisFactors {
    /// Factor applied to stroke widths
    pub fn stroke(&self) -> f32 {
        self.x.min(self.y)
    }
}

/// Per-axis factors mapping the page's canvas layout to native pixels
pub fn axis_factors(page: &Page) -> ExportResult<AxisFactors> {
    let bg = page.background();
    for (width, height) in [
        (bg.native_width, bg.native_height),
        (bg.display_width, bg.display_height),
    ] {
        if width == 0 || height == 0 {
            return Err(ExportError::InvalidBackground { width, height });
        }
    }
    Ok(AxisFactors {
        x: bg.native_width as f32 / bg.display_width as f32,
        y: bg.native_height as f32 / bg.display_height as f32,
    })
}

/// Clone `object` into native pixel space
pub fn reproject(object: &SceneObject, factors: AxisFactors) -> SceneObject {
    let mut clone = object.clone();
    clone.position.x *= factors.x;
    clone.position.y *= factors.y;
    clone.scale[0] *= factors.x;
    clone.scale[1] *= factors.y;
    clone.scale_strokes(factors.stroke());
    clone
}

/// Offscreen scene holding re-projected clones of every annotation
pub fn offscreen_scene(page: &Page) -> ExportResult<Scene> {
    let factors = axis_factors(page)?;
    let mut scene = Scene::new();
    for annotation in page.annotations() {
        scene.add(reproject(annotation.object(), factors));
    }
    Ok(scene)
}

fn rgba(color: Color) -> RgbaColor {
    RgbaColor::new(color.r, color.g, color.b, color.a)
}

/// Flatten a scene object into absolute draw commands
pub fn draw_commands(object: &SceneObject) -> Vec<DrawCommand> {
    let text_scale = object.scale[0].abs().min(object.scale[1].abs());
    object
        .shapes
        .iter()
        .map(|shape| match shape {
            Shape::Segment { start, end, stroke } => {
                let (from, to) = (object.to_canvas(*start), object.to_canvas(*end));
                DrawCommand::Line {
                    from: [from.x, from.y],
                    to: [to.x, to.y],
                    stroke: StrokeStyle {
                        color: rgba(stroke.color),
                        width: stroke.width,
                        dash: stroke.dash.clone(),
                    },
                }
            }
            Shape::ArrowHead {
                tip,
                heading,
                size,
                stroke,
            } => {
                let [left, right] = Shape::arrow_arms(*tip, *heading, *size);
                let points = [left, *tip, right]
                    .iter()
                    .map(|p| {
                        let p = object.to_canvas(*p);
                        [p.x, p.y]
                    })
                    .collect();
                DrawCommand::Polyline {
                    points,
                    stroke: StrokeStyle::solid(rgba(stroke.color), stroke.width),
                }
            }
            Shape::Label {
                anchor,
                text,
                font_size,
                fill,
                background,
                padding,
                origin,
            } => {
                let anchor = object.to_canvas(*anchor);
                DrawCommand::Label {
                    anchor: [anchor.x, anchor.y],
                    text: text.clone(),
                    font_size: font_size * text_scale,
                    color: rgba(*fill),
                    background: background.map(rgba),
                    padding: padding * text_scale,
                    align: match origin {
                        LabelOrigin::CenterBottom => LabelAlign::CenterBottom,
                        LabelOrigin::Center => LabelAlign::Center,
                    },
                }
            }
        })
        .collect()
}

/// Render the page at its native resolution
///
/// Works on clones; the page itself is never modified.
pub fn render_page(page: &Page, source: &dyn PageSource) -> ExportResult<RgbaImage> {
    let scene = offscreen_scene(page)?;
    let bg = page.background();
    let (width, height) = (bg.native_width, bg.native_height);

    let background = source.render(width, height)?;
    let commands: Vec<DrawCommand> = scene.objects().iter().flat_map(draw_commands).collect();
    debug!(page = page.index(), width, height, objects = scene.objects().len(), "rendering export");
    Ok(rasterize(width, height, Some(&background), &commands)?)
}

/// File name of an exported artifact
pub fn artifact_name(prefix: &str, page_index: usize, format: ExportFormat) -> String {
    format!("{prefix}-page-{page_index}.{}", format.extension())
}

/// Encode a rendered page
pub fn encode(image: &RgbaImage, format: ExportFormat, dpi: f32) -> ExportResult<Vec<u8>> {
    match format {
        ExportFormat::Png => {
            let mut cursor = Cursor::new(Vec::new());
            image.write_to(&mut cursor, image::ImageFormat::Png)?;
            Ok(cursor.into_inner())
        }
        ExportFormat::Pdf => Ok(encode_pdf(image, dpi)?),
    }
}

/// Render, encode and write a page to `dir`
///
/// The file is written next to its destination and renamed into place, so
/// a failure never leaves a partial artifact.
pub fn export_page(
    page: &Page,
    source: &dyn PageSource,
    format: ExportFormat,
    dir: &Path,
    prefix: &str,
    dpi: f32,
) -> ExportResult<PathBuf> {
    let image = render_page(page, source)?;
    let bytes = encode(&image, format, dpi)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(artifact_name(prefix, page.index(), format));
    write_atomic(&path, &bytes)?;

    info!(page = page.index(), path = %path.display(), bytes = bytes.len(), "exported page");
    Ok(path)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".part");
    let temp_path = path.with_file_name(temp_name);

    let result = fs::write(&temp_path, bytes).and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
