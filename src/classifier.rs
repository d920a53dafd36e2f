//! Single page vs. spread classification.
//!
//! An image is treated as a two-page spread when its aspect ratio is wide enough, or when its
//! file name carries a page pair such as `002_003.jpg` or `005L.jpg`. File name matching sits
//! behind the [`SpreadHintMatcher`] trait so other naming schemes can be plugged in without
//! touching the splitter or the sequencer.

use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;

use crate::types::{Classification, ClassifiedImage, NormalizedImage, SpreadPairHint};

/// Width / height ratio at or above which an image is considered a spread.
pub const WIDE_ASPECT_THRESHOLD: f64 = 1.2;

lazy_static! {
    /// Two numeric groups joined by `-` or `_`, e.g. "002_003".
    pub static ref PAIRED_NUMBERS_REGEX: Regex = Regex::new(r"(\d+)[-_](\d+)").unwrap();
    /// A numeric group immediately followed by an L/R side marker, e.g. "001R".
    pub static ref SIDE_MARKER_REGEX: Regex = Regex::new(r"(\d+)[LlRr]").unwrap();
}

/// Recovers a page pair from a file name.
pub trait SpreadHintMatcher: Send + Sync {
    fn match_hint(&self, file_name: &str) -> Option<SpreadPairHint>;
}

/// Default file name heuristics, tried in order:
///
/// 1. Two numbers joined by `-`/`_` that differ: `(min, max)`.
/// 2. A number followed by `L`/`R`: `(n, n + 1)`.
///
/// The second rule only approximates the partner page; a lone `005L.jpg` cannot say whether
/// its partner is page 4 or page 6.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenamePairMatcher;

impl FilenamePairMatcher {
    pub fn new() -> Self {
        Self
    }

    fn paired_numbers(stem: &str) -> Option<SpreadPairHint> {
        let caps = PAIRED_NUMBERS_REGEX.captures(stem)?;
        let a = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let b = caps.get(2)?.as_str().parse::<u32>().ok()?;
        (a != b).then(|| SpreadPairHint::new(a, b))
    }

    fn side_marker(stem: &str) -> Option<SpreadPairHint> {
        let caps = SIDE_MARKER_REGEX.captures(stem)?;
        let n = caps.get(1)?.as_str().parse::<u32>().ok()?;
        n.checked_add(1).map(|next| SpreadPairHint::new(n, next))
    }
}

impl SpreadHintMatcher for FilenamePairMatcher {
    fn match_hint(&self, file_name: &str) -> Option<SpreadPairHint> {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self::paired_numbers(&stem).or_else(|| Self::side_marker(&stem))
    }
}

/// Whether `width / height` reaches [`WIDE_ASPECT_THRESHOLD`].
pub fn is_wide_aspect(width: u32, height: u32) -> bool {
    height > 0 && width as f64 / height as f64 >= WIDE_ASPECT_THRESHOLD
}

/// Classifies images independently of each other.
#[derive(Clone)]
pub struct AssetClassifier {
    matcher: Arc<dyn SpreadHintMatcher>,
}

impl Default for AssetClassifier {
    fn default() -> Self {
        Self::new(Arc::new(FilenamePairMatcher::new()))
    }
}

impl std::fmt::Debug for AssetClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetClassifier").finish_non_exhaustive()
    }
}

impl AssetClassifier {
    pub fn new(matcher: Arc<dyn SpreadHintMatcher>) -> Self {
        Self { matcher }
    }

    /// Classifies one image from its file name and measured size. Pure.
    pub fn classify(&self, file_name: &str, pixel_width: u32, pixel_height: u32) -> Classification {
        Classification {
            is_wide_aspect: is_wide_aspect(pixel_width, pixel_height),
            spread_hint: self.matcher.match_hint(file_name),
        }
    }

    /// Classifies a whole volume in parallel, keeping input order.
    pub fn classify_all(&self, images: Vec<NormalizedImage>) -> Vec<ClassifiedImage> {
        images
            .into_par_iter()
            .map(|image| {
                let classification =
                    self.classify(&image.file_name, image.pixel_width, image.pixel_height);
                ClassifiedImage::new(image, classification)
            })
            .collect()
    }
}

/// Classifies with the default file name heuristics.
pub fn classify(file_name: &str, pixel_width: u32, pixel_height: u32) -> Classification {
    AssetClassifier::default().classify(file_name, pixel_width, pixel_height)
}
