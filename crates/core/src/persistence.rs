//! Page persistence
//!
//! The editor saves the current page after every committed mutation through
//! a [`PageStore`]. [`JsonPageStore`] keeps one `page-<index>.json` file per
//! page under a root directory.

use crate::document::Page;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Error types for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Page could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for persistence operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Sink for saved pages
pub trait PageStore {
    /// Persist the given page, replacing any previous save
    fn save_page(&mut self, page: &Page) -> StoreResult<()>;
}

/// Store that keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPageStore;

impl PageStore for NullPageStore {
    fn save_page(&mut self, _page: &Page) -> StoreResult<()> {
        Ok(())
    }
}

/// JSON files under a root directory
#[derive(Debug, Clone)]
pub struct JsonPageStore {
    root: PathBuf,
}

impl JsonPageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a page is saved to
    pub fn page_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("page-{index}.json"))
    }

    /// Load a saved page, or `None` if it was never saved
    pub fn load_page(&self, index: usize) -> StoreResult<Option<Page>> {
        let path = self.page_path(index);
        if !path.exists() {
            return Ok(None);
        }
        load_page_file(&path).map(Some)
    }

    /// Indices of all saved pages, ascending
    pub fn list_pages(&self) -> StoreResult<Vec<usize>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut indices: Vec<usize> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                name.to_str()?
                    .strip_prefix("page-")?
                    .strip_suffix(".json")?
                    .parse()
                    .ok()
            })
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }
}

impl PageStore for JsonPageStore {
    fn save_page(&mut self, page: &Page) -> StoreResult<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.page_path(page.index());
        let json = serde_json::to_string_pretty(page)?;

        // Write to file atomically using a temporary file
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

/// Read a page from any JSON file
pub fn load_page_file(path: &Path) -> StoreResult<Page> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
