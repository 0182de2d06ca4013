//! Document and page model
//!
//! A document is an ordered list of pages. Each page knows the native pixel
//! size of its background (the source page rendered at the document render
//! scale), the size that background is laid out at on the canvas, its saved
//! scale and its committed annotations.

use crate::annotation::{Annotation, AnnotationId};
use crate::scale::ScaleModel;
use std::path::PathBuf;

/// Background raster of a page
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageBackground {
    /// Width of the source page rendered at the document render scale
    pub native_width: u32,
    pub native_height: u32,
    /// Width of the background image as laid out on the canvas
    pub display_width: u32,
    pub display_height: u32,
    /// Raster plan file, when the background comes from one
    #[serde(default)]
    pub source: Option<PathBuf>,
}

impl PageBackground {
    /// Background displayed at its native size
    pub fn native(width: u32, height: u32) -> Self {
        Self {
            native_width: width,
            native_height: height,
            display_width: width,
            display_height: height,
            source: None,
        }
    }

    /// Background laid out at a different size than its native one
    pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
        self.display_width = width;
        self.display_height = height;
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// One page of a loaded document
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Page {
    index: usize,
    background: PageBackground,
    #[serde(default)]
    scale: ScaleModel,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

impl Page {
    pub fn new(index: usize, background: PageBackground) -> Self {
        Self {
            index,
            background,
            scale: ScaleModel::new(),
            annotations: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn background(&self) -> &PageBackground {
        &self.background
    }

    /// Scale saved with this page
    pub fn scale(&self) -> &ScaleModel {
        &self.scale
    }

    pub fn set_scale(&mut self, scale: ScaleModel) {
        self.scale = scale;
    }

    /// Committed annotations in stacking order
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    pub(crate) fn annotation_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id() == id)
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id() == id)?;
        Some(self.annotations.remove(index))
    }

    /// The page's calibration line, if one was committed
    pub fn calibration_line(&self) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.is_calibration())
    }

    /// Count annotations per kind tag
    pub fn counts_by_kind(&self) -> std::collections::BTreeMap<&'static str, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for annotation in &self.annotations {
            *counts.entry(annotation.kind().tag()).or_insert(0) += 1;
        }
        counts
    }
}

/// Errors raised by document operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("no document is loaded")]
    NotLoaded,
    #[error("page {0} does not exist")]
    NoPage(usize),
    #[error("page indices must be unique, {0} appears twice")]
    DuplicatePage(usize),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Pages of the loaded document
#[derive(Debug, Clone, Default)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    /// Create a document from its pages, ordered by index
    pub fn new(mut pages: Vec<Page>) -> DocumentResult<Self> {
        pages.sort_by_key(|p| p.index);
        if let Some(pair) = pages.windows(2).find(|w| w[0].index == w[1].index) {
            return Err(DocumentError::DuplicatePage(pair[0].index));
        }
        Ok(Self { pages })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> DocumentResult<&Page> {
        self.pages
            .iter()
            .find(|p| p.index == index)
            .ok_or(DocumentError::NoPage(index))
    }

    pub fn page_mut(&mut self, index: usize) -> DocumentResult<&mut Page> {
        self.pages
            .iter_mut()
            .find(|p| p.index == index)
            .ok_or(DocumentError::NoPage(index))
    }

    /// Index of the first page
    pub fn first_index(&self) -> Option<usize> {
        self.pages.first().map(|p| p.index)
    }
}
