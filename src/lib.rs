//! Mihiraki - Manga Spread to Fixed-Layout EPUB Library
//!
//! This crate converts an ordered set of manga page images into a right-to-left,
//! fixed-layout EPUB3 book. Wide images are detected as two-page spreads and cut into their
//! right and left halves, every page is normalized to one canonical pixel size, and the pages
//! are sequenced so that spreads open side by side in a two-page reader view.
//!
//! # Getting Started
//!
//! Configure a conversion with [`MihirakiConfig::builder`], then run one of the
//! `convert_*` entry points.
//!
//! ```rust,no_run
//! use mihiraki::prelude::*;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> mihiraki::error::Result<()> {
//!     let progress: Arc<dyn ProgressSink> = Arc::new(|fraction: f32| {
//!         println!("{:>5.1}%", fraction * 100.0);
//!     });
//!
//!     let config = MihirakiConfig::builder()
//!         .metadata(BookMetadata::new("Jane Doe", "Example Press"))
//!         .target_path(PathBuf::from("./converted_ebooks"))
//!         .jpeg_quality(90u8)
//!         .progress(progress)
//!         .build()?;
//!
//!     // Optional: Run a pre-flight check for the intended mode
//!     config.preflight_check(ExecutionMode::FromBatchSource)?;
//!
//!     // Every subfolder of the root becomes one book.
//!     let report = config
//!         .convert_batch_from_source(&PathBuf::from("./my_manga_collection/series_a"))
//!         .await?;
//!     println!(
//!         "{} written, {} failed",
//!         report.success_count(),
//!         report.failure_count()
//!     );
//!
//!     Ok(())
//! }
//! ```
//!
//! Logging goes through the [`log`] facade; install any logger to see stage decisions and
//! per-volume failures.

pub mod classifier;
pub mod codec;
pub mod collector;
pub mod error;
pub mod generator;
pub mod intake;
pub mod mihiraki;
pub mod path_utils;
pub mod progress;
pub mod resolver;
pub mod sequencer;
pub mod splitter;
pub mod types;

// Publicly expose the main `MihirakiConfig` struct and its builder
pub use mihiraki::MihirakiConfig;
pub use mihiraki::MihirakiConfigBuilder;

// Re-export error and core types for direct access
pub use types::{
    BatchReport, BookMetadata, CanonicalSize, ExecutionMode, LogicalItem, PageRecord, Placement,
    SizePolicy, SpreadPairHint, VolumeFailure, VolumeReport, VolumeSource,
};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and traits, allowing you to
/// import everything you need with a single `use mihiraki::prelude::*;` statement.
pub mod prelude {
    pub use super::{
        BatchReport, BookMetadata, CanonicalSize, ExecutionMode, LogicalItem, MihirakiConfig,
        MihirakiConfigBuilder, PageRecord, Placement, SizePolicy, SpreadPairHint, VolumeFailure,
        VolumeReport, VolumeSource, error, generator, types,
    };
    pub use crate::classifier::{FilenamePairMatcher, SpreadHintMatcher};
    pub use crate::codec::{ImageCodec, JpegCodec};
    pub use crate::collector::Collector;
    pub use crate::error::ErrorKind;
    pub use crate::progress::ProgressSink;
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
    pub use std::sync::atomic::AtomicBool;
}
