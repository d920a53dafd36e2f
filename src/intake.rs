//! Intake: decoding source files into the intermediate page format.
//!
//! Every source image is decoded once and re-encoded as JPEG into the volume's scratch
//! directory, so later stages only ever read one well-known format.

use std::path::Path;

use crate::codec::ImageCodec;
use crate::error::{Error, Result};
use crate::types::{NormalizedImage, SourceImage};

/// Decodes `source` and writes the re-encoded copy as `src_<index>.<ext>` into `output_dir`.
///
/// `index` is the 1-based position of the image in the volume.
pub fn normalize(
    codec: &dyn ImageCodec,
    source: &SourceImage,
    index: usize,
    output_dir: &Path,
    quality: u8,
) -> Result<NormalizedImage> {
    let image = codec.decode(&source.path)?;
    let (pixel_width, pixel_height) = (image.width(), image.height());
    if pixel_width == 0 || pixel_height == 0 {
        return Err(Error::UnsupportedGeometry(format!(
            "'{}' is {}x{} pixels",
            source.file_name, pixel_width, pixel_height
        )));
    }

    let bytes = codec.encode(&image, quality)?;
    let local_path = output_dir.join(format!("src_{:04}.{}", index, codec.extension()));
    std::fs::write(&local_path, bytes).map_err(|e| {
        Error::EncodeFailure(format!(
            "Failed to write normalized copy of '{}': {}",
            source.file_name, e
        ))
    })?;

    Ok(NormalizedImage {
        source_path: source.path.clone(),
        local_path,
        pixel_width,
        pixel_height,
        file_name: source.file_name.clone(),
    })
}
