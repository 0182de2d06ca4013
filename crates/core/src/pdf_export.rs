//! Single-page PDF output for exported rasters
//!
//! The page is sized from the raster's pixel dimensions at a fixed DPI and
//! the raster fills it exactly, stored as an uncompressed RGB image.

use fieldplan_render::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const MM_PER_INCH: f32 = 25.4;
const POINTS_PER_INCH: f32 = 72.0;

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Physical page size derived from a raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width_mm: f32,
    pub height_mm: f32,
    pub orientation: Orientation,
}

impl PageLayout {
    /// Size of a `width` x `height` pixel raster printed at `dpi`
    pub fn from_pixels(width: u32, height: u32, dpi: f32) -> Self {
        let width_mm = width as f32 / dpi * MM_PER_INCH;
        let height_mm = height as f32 / dpi * MM_PER_INCH;
        let orientation = if width_mm > height_mm {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        Self {
            width_mm,
            height_mm,
            orientation,
        }
    }

    pub fn width_pt(&self) -> f32 {
        self.width_mm / MM_PER_INCH * POINTS_PER_INCH
    }

    pub fn height_pt(&self) -> f32 {
        self.height_mm / MM_PER_INCH * POINTS_PER_INCH
    }
}

/// Byte length of an 8-bit RGB buffer, computed without `u32` overflow
fn rgb_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Encode `image` as a one-page PDF sized for `dpi`
pub fn encode_pdf(image: &RgbaImage, dpi: f32) -> lopdf::Result<Vec<u8>> {
    let (px_width, px_height) = image.dimensions();
    let layout = PageLayout::from_pixels(px_width, px_height, dpi);
    let (width, height) = (layout.width_pt(), layout.height_pt());

    // alpha is dropped; exported rasters are opaque
    let mut rgb = Vec::with_capacity(rgb_len(px_width, px_height));
    for pixel in image.pixels() {
        rgb.extend_from_slice(&[pixel[0], pixel[1], pixel[2]]);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_width as i64,
            "Height" => px_height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb,
    )
    .with_compression(false);
    let image_id = doc.add_object(image_stream);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    height.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id =
        doc.add_object(Stream::new(dictionary! {}, content.encode()?).with_compression(false));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
