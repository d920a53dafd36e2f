//! Core data types, enums, and reports for the Mihiraki conversion library.
//!
//! This module defines the data that flows through one volume's conversion:
//! - Input descriptors (`SourceImage`, `VolumeSource`)
//! - Intermediate stage outputs (`NormalizedImage`, `ClassifiedImage`, `CanonicalSize`, `LogicalItem`)
//! - The final reading order (`PageRecord`, `Placement`, `Volume`)
//! - Reports handed back to the caller (`VolumeReport`, `BatchReport`)

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result};
use crate::path_utils::get_file_name_lossy;

/// Image file extensions accepted as source pages.
pub const SUPPORTED_SOURCE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"];

/// Immutable descriptor of one discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceImage {
    pub path: PathBuf,
    pub file_name: String,
}

impl SourceImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = get_file_name_lossy(&path);
        Self { path, file_name }
    }
}

/// A source image after decode and re-encode to the intermediate JPEG format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub source_path: PathBuf,
    /// Location of the re-encoded bytes inside the volume scratch directory
    pub local_path: PathBuf,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub file_name: String,
}

impl NormalizedImage {
    pub fn size(&self) -> CanonicalSize {
        CanonicalSize::new(self.pixel_width, self.pixel_height)
    }
}

/// Page numbers recovered from a file name such as `002_003.jpg` or `005L.jpg`.
///
/// Always stored as `(low, high)` regardless of the order found in the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpreadPairHint {
    pub low: u32,
    pub high: u32,
}

impl SpreadPairHint {
    /// Builds a hint from two page numbers in any order.
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }
}

/// Result of classifying one file name and measured pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_wide_aspect: bool,
    pub spread_hint: Option<SpreadPairHint>,
}

impl Classification {
    /// Whether the item goes through the spread splitter.
    pub fn is_spread(&self) -> bool {
        self.spread_hint.is_some() || self.is_wide_aspect
    }
}

/// A normalized image together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedImage {
    pub image: NormalizedImage,
    pub is_wide_aspect: bool,
    pub spread_hint: Option<SpreadPairHint>,
}

impl ClassifiedImage {
    pub fn new(image: NormalizedImage, classification: Classification) -> Self {
        Self {
            image,
            is_wide_aspect: classification.is_wide_aspect,
            spread_hint: classification.spread_hint,
        }
    }

    /// The classification this image was built from.
    pub fn classification(&self) -> Classification {
        Classification {
            is_wide_aspect: self.is_wide_aspect,
            spread_hint: self.spread_hint,
        }
    }

    pub fn is_spread(&self) -> bool {
        self.classification().is_spread()
    }
}

/// The single page size every emitted page image of a volume is normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanonicalSize {
    pub width: u32,
    pub height: u32,
}

impl CanonicalSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for CanonicalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which branch of canonical size resolution produced the size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizePolicy {
    /// Most frequent size among single pages
    MostFrequent,
    /// No single pages; size of the first processed image
    FallbackFirst,
    /// No images at all; fixed default size
    FallbackDefault,
}

impl fmt::Display for SizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizePolicy::MostFrequent => "most-frequent",
            SizePolicy::FallbackFirst => "fallback-first",
            SizePolicy::FallbackDefault => "fallback-default",
        };
        f.write_str(name)
    }
}

/// One unit handed to the page sequencer.
///
/// A spread carries its halves as `(right, left)`, both already sized to the canonical size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalItem<T = PathBuf> {
    Single(T),
    Spread(T, T),
}

/// Where a page sits when the reader opens a two-page view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Placement {
    Single,
    Right,
    Left,
}

impl Placement {
    /// The spine `itemref` property for this placement, if any.
    pub fn spine_property(&self) -> Option<&'static str> {
        match self {
            Placement::Single => None,
            Placement::Right => Some("page-spread-right"),
            Placement::Left => Some("page-spread-left"),
        }
    }
}

/// One page of the final reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord<T = PathBuf> {
    pub image: T,
    pub placement: Placement,
}

impl<T> PageRecord<T> {
    pub fn new(image: T, placement: Placement) -> Self {
        Self { image, placement }
    }
}

/// Free-text book metadata supplied by the caller.
///
/// Empty author or publisher strings are written as a placeholder by the packager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookMetadata {
    pub author: String,
    pub publisher: String,
    /// BCP 47 language tag, e.g. "ja"
    pub language: String,
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self {
            author: String::new(),
            publisher: String::new(),
            language: "ja".to_string(),
        }
    }
}

impl BookMetadata {
    pub fn new(author: impl Into<String>, publisher: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            publisher: publisher.into(),
            ..Default::default()
        }
    }
}

/// Everything the archive packager needs to write one book.
#[derive(Debug, Clone)]
pub struct Volume {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub language: String,
    pub page_records: Vec<PageRecord>,
    pub canonical_size: CanonicalSize,
    pub output_path: PathBuf,
}

/// One volume to convert: an ordered, deduplicated list of readable image paths.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeSource {
    pub title: String,
    pub images: Vec<PathBuf>,
    pub output_path: PathBuf,
}

impl VolumeSource {
    pub fn new(
        title: impl Into<String>,
        images: Vec<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            images,
            output_path: output_path.into(),
        }
    }
}

/// Summary of one successfully written volume.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeReport {
    pub title: String,
    pub output_path: PathBuf,
    pub page_count: usize,
    pub spread_count: usize,
    pub canonical_size: CanonicalSize,
    pub size_policy: SizePolicy,
}

/// A volume that failed during a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeFailure {
    pub title: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of a batch run: one entry per volume, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchReport {
    pub succeeded: Vec<VolumeReport>,
    pub failed: Vec<VolumeFailure>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Specifies the intended starting point for a conversion.
/// Used by `MihirakiConfig::preflight_check` to tailor validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionMode {
    /// One volume built from a caller-supplied path list.
    FromPaths,
    /// One volume collected from a source folder.
    FromSource,
    /// One volume per subfolder of a root folder.
    FromBatchSource,
}

/// Utility function: Determines the archive extension and MIME type of a page image.
///
/// # Supported formats
///
/// - JPEG/JPG: image/jpeg
/// - PNG: image/png
pub fn get_file_info(image_path: &Path) -> Result<(&'static str, &'static str)> {
    let extension = image_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => Ok(("jpg", "image/jpeg")),
        Some("png") => Ok(("png", "image/png")),
        _ => Err(Error::Packaging(format!(
            "Unsupported page image format {:?} for '{}'",
            extension,
            image_path.display()
        ))),
    }
}

/// Whether a path has one of the [`SUPPORTED_SOURCE_EXTENSIONS`].
pub fn is_supported_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_SOURCE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}
