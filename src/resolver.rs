//! Canonical page size resolution for one volume.

use std::collections::HashMap;

use crate::types::{CanonicalSize, ClassifiedImage, SizePolicy};

/// Page size used when a volume has no images at all.
pub const DEFAULT_CANONICAL_SIZE: CanonicalSize = CanonicalSize::new(1600, 2400);

/// Picks the one page size every emitted image of the volume is normalized to.
///
/// The most frequent exact size among single pages wins. Ties go to the size whose first
/// occurrence comes earliest in input order. With no single pages the first image's size is
/// used, and with no images at all [`DEFAULT_CANONICAL_SIZE`].
pub fn resolve(images: &[ClassifiedImage]) -> (CanonicalSize, SizePolicy) {
    let (size, policy) = resolve_quiet(images);
    log::info!("Canonical page size {} ({})", size, policy);
    (size, policy)
}

fn resolve_quiet(images: &[ClassifiedImage]) -> (CanonicalSize, SizePolicy) {
    let singles: Vec<CanonicalSize> = images
        .iter()
        .filter(|c| !c.is_spread())
        .map(|c| c.image.size())
        .collect();

    if let Some(size) = most_frequent(&singles) {
        return (size, SizePolicy::MostFrequent);
    }

    match images.first() {
        Some(first) => (first.image.size(), SizePolicy::FallbackFirst),
        None => (DEFAULT_CANONICAL_SIZE, SizePolicy::FallbackDefault),
    }
}

/// Most frequent size, first-seen among equals.
fn most_frequent(sizes: &[CanonicalSize]) -> Option<CanonicalSize> {
    let mut counts: HashMap<CanonicalSize, usize> = HashMap::new();
    for size in sizes {
        *counts.entry(*size).or_insert(0) += 1;
    }

    let max = counts.values().copied().max()?;
    sizes.iter().copied().find(|size| counts[size] == max)
}
