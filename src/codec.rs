//! Image decode, resize, crop and encode behind a single trait.
//!
//! The pipeline never touches an image format directly: it asks an [`ImageCodec`] to decode
//! a file into a [`DynamicImage`], to reshape pixel buffers, and to encode a buffer into the
//! bytes of the intermediate page format. [`JpegCodec`] is the production implementation.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::error::{Error, Result};

/// File extension of images produced by [`JpegCodec::encode`].
pub const JPEG_EXTENSION: &str = "jpg";

/// Image operations the conversion pipeline depends on.
pub trait ImageCodec: Send + Sync {
    /// Decodes the file at `path`. Fails with [`Error::UnreadableImage`].
    fn decode(&self, path: &Path) -> Result<DynamicImage>;

    /// Resizes to exactly `width` x `height`, ignoring aspect ratio.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Copies the `width` x `height` region whose top-left corner is at (`x`, `y`).
    fn crop(&self, image: &DynamicImage, x: u32, y: u32, width: u32, height: u32) -> DynamicImage;

    /// Encodes into the lossy page format. Fails with [`Error::EncodeFailure`].
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>>;

    /// Extension (without dot) of files written from [`ImageCodec::encode`] output.
    fn extension(&self) -> &'static str;
}

/// [`ImageCodec`] backed by the `image` crate, writing baseline JPEG.
///
/// Resizing uses the Lanczos3 filter so upscaled spread halves stay sharp.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl JpegCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for JpegCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        ImageReader::open(path)
            .map_err(|e| Error::UnreadableImage(path.to_path_buf(), e.to_string()))?
            .with_guessed_format()
            .map_err(|e| Error::UnreadableImage(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| Error::UnreadableImage(path.to_path_buf(), e.to_string()))
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, FilterType::Lanczos3)
    }

    fn crop(&self, image: &DynamicImage, x: u32, y: u32, width: u32, height: u32) -> DynamicImage {
        image.crop_imm(x, y, width, height)
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder).map_err(|e| {
            Error::EncodeFailure(format!(
                "JPEG encode of {}x{} image failed: {}",
                image.width(),
                image.height(),
                e
            ))
        })?;
        Ok(bytes)
    }

    fn extension(&self) -> &'static str {
        JPEG_EXTENSION
    }
}
