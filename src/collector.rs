//! Source folder collection.
//!
//! Lists the page images of a volume folder, or the volume folders of a series root, in
//! reading order. Hidden entries are skipped and files are ordered by the last number in
//! their name, so `2.jpg` comes before `10.jpg`.

use std::path::{Path, PathBuf};

use tokio::fs::read_dir;

use crate::error::{Error, Result};
use crate::path_utils::{compare_paths_by_number, is_hidden_file};
use crate::types::{SourceImage, is_supported_source};

/// Collects volumes and their page images from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collector;

impl Collector {
    pub fn new() -> Self {
        Self
    }

    /// Collects the supported image files directly inside `directory`, in reading order.
    ///
    /// # Returns
    ///
    /// * `Result<Vec<SourceImage>>` - Ordered page images; empty if the folder has none
    pub async fn collect_volume_images(&self, directory: &Path) -> Result<Vec<SourceImage>> {
        let mut files = Self::collect_entries(directory, false).await?;
        files.retain(|p| is_supported_source(p));
        files.sort_by(|a, b| compare_paths_by_number(a, b));
        Ok(files.into_iter().map(SourceImage::new).collect())
    }

    /// Collects the subfolders of `root`, each one a volume, in reading order.
    pub async fn collect_volume_dirs(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Self::collect_entries(root, true).await?;
        dirs.sort_by(|a, b| compare_paths_by_number(a, b));
        Ok(dirs)
    }

    /// Lists non-hidden directory entries.
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory to scan
    /// * `only_dirs` - When true, only directories are collected; when false, only files
    async fn collect_entries(directory: &Path, only_dirs: bool) -> Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = Vec::new();

        let mut paths = read_dir(directory).await.map_err(|e| {
            Error::InvalidPath(
                directory.to_path_buf(),
                format!("Failed to read directory: {}", e),
            )
        })?;

        while let Some(entry) = paths.next_entry().await? {
            let path = entry.path();
            if is_hidden_file(&path) {
                continue;
            }

            let is_dir = entry.file_type().await?.is_dir();
            if only_dirs != is_dir {
                continue;
            }

            entries.push(path);
        }

        Ok(entries)
    }
}
