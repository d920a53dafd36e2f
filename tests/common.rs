//! Common test utilities and constants for the Mihiraki crate.
//!
//! Provides functions for setting up test directories, writing synthetic page images of a
//! given size, and inspecting the EPUB archives produced by a conversion.

use image::{Rgb, RgbImage};
use mihiraki::error::{Error, Result};
use rand::{Rng, distributions::Alphanumeric};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const LONG_TEST_TIMEOUT: Duration = Duration::from_secs(120); // Full conversions encode many JPEGs

/// Base, source, target and scratch directories of one test.
#[allow(dead_code)]
pub struct TestDirs {
    pub base_dir: PathBuf,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub work_dir: PathBuf,
}

/// Creates a fresh, uniquely named test directory with source, target and work subdirectories.
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let base_dir = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if base_dir.exists() {
        fs::remove_dir_all(&base_dir).await.unwrap();
    }
    let dirs = TestDirs {
        source_dir: base_dir.join("source"),
        target_dir: base_dir.join("target"),
        work_dir: base_dir.join("work"),
        base_dir,
    };

    fs::create_dir_all(&dirs.source_dir).await.unwrap();
    fs::create_dir_all(&dirs.target_dir).await.unwrap();
    fs::create_dir_all(&dirs.work_dir).await.unwrap();
    dirs
}

/// Writes a solid-color image of `width` x `height` pixels. The format follows the extension.
#[allow(dead_code)]
pub async fn create_image(path: &Path, width: u32, height: u32, color: Rgb<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let img = RgbImage::from_pixel(width, height, color);
    let path_clone = path.to_path_buf();
    tokio::task::spawn_blocking(move || img.save(path_clone))
        .await
        .map_err(|e| Error::AsyncTaskError(e.to_string()))?
        .map_err(Error::Image)?;
    Ok(())
}

/// Writes a portrait page image.
#[allow(dead_code)]
pub async fn create_page(path: &Path, width: u32, height: u32) -> Result<()> {
    create_image(path, width, height, Rgb([240, 240, 240])).await
}

/// Writes a spread whose left half is red and whose right half is blue.
#[allow(dead_code)]
pub async fn create_spread(path: &Path, width: u32, height: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let half = width / 2;
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x < half {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    });
    let path_clone = path.to_path_buf();
    tokio::task::spawn_blocking(move || img.save(path_clone))
        .await
        .map_err(|e| Error::AsyncTaskError(e.to_string()))?
        .map_err(Error::Image)?;
    Ok(())
}

/// Opens an EPUB (or any ZIP) file for inspection.
#[allow(dead_code)]
pub fn open_archive(path: &Path) -> zip::ZipArchive<std::fs::File> {
    assert!(path.is_file(), "Output archive does not exist: {:?}", path);
    let file = std::fs::File::open(path).unwrap();
    zip::ZipArchive::new(file).unwrap()
}

/// Entry names in archive order.
#[allow(dead_code)]
pub fn entry_names(path: &Path) -> Vec<String> {
    let mut archive = open_archive(path);
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Reads one archive entry as text.
#[allow(dead_code)]
pub fn read_entry(path: &Path, name: &str) -> String {
    let mut archive = open_archive(path);
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

/// Reads one archive entry as raw bytes.
#[allow(dead_code)]
pub fn read_entry_bytes(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = open_archive(path);
    let mut file = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    content
}

/// The spine `itemref` lines of the package document, in order.
#[allow(dead_code)]
pub fn spine_items(path: &Path) -> Vec<String> {
    read_entry(path, "OEBPS/content.opf")
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("<itemref "))
        .map(str::to_string)
        .collect()
}

/// Number of `<item>` entries in the package manifest.
#[allow(dead_code)]
pub fn manifest_item_count(path: &Path) -> usize {
    read_entry(path, "OEBPS/content.opf")
        .lines()
        .filter(|line| line.trim_start().starts_with("<item "))
        .count()
}
