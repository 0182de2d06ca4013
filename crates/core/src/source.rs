//! Page background sources
//!
//! The export compositor asks a [`PageSource`] for the page background at the
//! page's native pixel size. Decoding vector documents is left to the host;
//! raster plans are handled by [`ImagePageSource`].

use fieldplan_render::RgbaImage;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors raised while producing a page background
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid background size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Renders a page background at an exact pixel size
pub trait PageSource {
    fn render(&self, width: u32, height: u32) -> SourceResult<RgbaImage>;
}

/// White background
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankPageSource;

impl PageSource for BlankPageSource {
    fn render(&self, width: u32, height: u32) -> SourceResult<RgbaImage> {
        check_size(width, height)?;
        Ok(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }
}

/// Background decoded from a raster plan
#[derive(Debug, Clone)]
pub struct ImagePageSource {
    image: DynamicImage,
}

impl ImagePageSource {
    /// Decode a PNG or JPEG plan
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| SourceError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded plan");
        Ok(Self { image })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Size of the decoded plan
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

impl PageSource for ImagePageSource {
    fn render(&self, width: u32, height: u32) -> SourceResult<RgbaImage> {
        check_size(width, height)?;
        if self.dimensions() == (width, height) {
            return Ok(self.image.to_rgba8());
        }
        Ok(self
            .image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgba8())
    }
}

fn check_size(width: u32, height: u32) -> SourceResult<()> {
    if width == 0 || height == 0 {
        return Err(SourceError::InvalidSize { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_source() {
        let image = BlankPageSource.render(3, 2).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert!(BlankPageSource.render(0, 2).is_err());
    }

    #[test]
    fn test_image_source_resizes() {
        let plan = RgbaImage::from_pixel(4, 6, Rgba([20, 40, 60, 255]));
        let source = ImagePageSource::from_image(DynamicImage::ImageRgba8(plan));
        let image = source.render(8, 12).unwrap();
        assert_eq!(image.dimensions(), (8, 12));
        assert_eq!(image.get_pixel(4, 6).0, [20, 40, 60, 255]);
    }

    #[test]
    fn test_image_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.png");
        RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 255])).save(&path).unwrap();

        let source = ImagePageSource::open(&path).unwrap();
        assert_eq!(source.dimensions(), (5, 5));
        assert!(matches!(
            ImagePageSource::open(dir.path().join("missing.png")),
            Err(SourceError::Decode { .. })
        ));
    }
}
