//! Spread splitting and page image rendering at the canonical size.
//!
//! A spread is cut at its vertical midpoint into a left and a right half. Odd-width spreads
//! first lose their rightmost column so both halves are whole pixels wide; without that, some
//! readers draw a one pixel seam down the middle of the opened spread. Each half is then
//! resized to the canonical size, which is the only place upscaling happens.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::codec::ImageCodec;
use crate::error::{Error, Result};
use crate::types::{CanonicalSize, ClassifiedImage, LogicalItem, SpreadPairHint};

/// Even source width and half width used to split a spread `width` pixels wide.
pub fn split_geometry(width: u32) -> Result<(u32, u32)> {
    if width <= 1 {
        return Err(Error::UnsupportedGeometry(format!(
            "cannot split an image {} pixel(s) wide",
            width
        )));
    }
    let even_width = width - (width % 2);
    Ok((even_width, even_width / 2))
}

/// Splits a spread into `(right, left)` halves, both resized to exactly `canonical`.
pub fn split(
    codec: &dyn ImageCodec,
    spread: &DynamicImage,
    canonical: CanonicalSize,
) -> Result<(DynamicImage, DynamicImage)> {
    let (_, half) = split_geometry(spread.width())?;
    let height = spread.height();
    if height == 0 {
        return Err(Error::UnsupportedGeometry(
            "cannot split an image 0 pixels tall".to_string(),
        ));
    }

    let left = codec.crop(spread, 0, 0, half, height);
    let right = codec.crop(spread, half, 0, half, height);

    Ok((
        codec.resize(&right, canonical.width, canonical.height),
        codec.resize(&left, canonical.width, canonical.height),
    ))
}

/// File name stem of a spread half, without the side suffix.
///
/// `index` is the 1-based position of the source image in the volume; it keeps names unique
/// when two files produce the same page pair.
pub fn spread_file_stem(index: usize, hint: Option<SpreadPairHint>) -> String {
    match hint {
        Some(h) => format!("spread_{:04}_{:03}-{:03}", index, h.low, h.high),
        None => format!("spread_{:04}", index),
    }
}

/// Turns classified images into sequencer input, writing page images into `output_dir`.
pub struct PageRenderer<'a> {
    codec: &'a dyn ImageCodec,
    canonical: CanonicalSize,
    output_dir: &'a Path,
    quality: u8,
}

impl<'a> PageRenderer<'a> {
    pub fn new(
        codec: &'a dyn ImageCodec,
        canonical: CanonicalSize,
        output_dir: &'a Path,
        quality: u8,
    ) -> Self {
        Self {
            codec,
            canonical,
            output_dir,
            quality,
        }
    }

    /// Renders the image at 1-based position `index` into a [`LogicalItem`].
    ///
    /// Singles already at the canonical size are passed through untouched.
    pub fn render(&self, index: usize, classified: &ClassifiedImage) -> Result<LogicalItem> {
        if classified.is_spread() {
            self.render_spread(index, classified)
        } else {
            self.render_single(index, classified)
        }
    }

    fn render_single(&self, index: usize, classified: &ClassifiedImage) -> Result<LogicalItem> {
        let normalized = &classified.image;
        if normalized.size() == self.canonical {
            return Ok(LogicalItem::Single(normalized.local_path.clone()));
        }

        let image = self.codec.decode(&normalized.local_path)?;
        let resized = self
            .codec
            .resize(&image, self.canonical.width, self.canonical.height);
        let path = self.write(&format!("single_{:04}", index), &resized)?;
        Ok(LogicalItem::Single(path))
    }

    fn render_spread(&self, index: usize, classified: &ClassifiedImage) -> Result<LogicalItem> {
        let image = self.codec.decode(&classified.image.local_path)?;
        let (right, left) = split(self.codec, &image, self.canonical).map_err(|e| match e {
            Error::UnsupportedGeometry(reason) => Error::UnsupportedGeometry(format!(
                "'{}': {}",
                classified.image.file_name, reason
            )),
            other => other,
        })?;

        let stem = spread_file_stem(index, classified.spread_hint);
        let right_path = self.write(&format!("{}_R", stem), &right)?;
        let left_path = self.write(&format!("{}_L", stem), &left)?;
        Ok(LogicalItem::Spread(right_path, left_path))
    }

    fn write(&self, stem: &str, image: &DynamicImage) -> Result<PathBuf> {
        let bytes = self.codec.encode(image, self.quality)?;
        let path = self
            .output_dir
            .join(format!("{}.{}", stem, self.codec.extension()));
        std::fs::write(&path, bytes).map_err(|e| {
            Error::EncodeFailure(format!(
                "Failed to write page image '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(path)
    }
}
