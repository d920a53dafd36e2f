use futures::stream::{FuturesOrdered, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;

use crate::classifier::{AssetClassifier, FilenamePairMatcher, SpreadHintMatcher};
use crate::codec::{ImageCodec, JpegCodec};
use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::generator::epub;
use crate::intake;
use crate::path_utils::{get_file_name_lossy, sanitize_filename, validate_path};
use crate::progress::{ProgressSink, ProgressTracker, Stage};
use crate::resolver;
use crate::sequencer;
use crate::splitter::PageRenderer;
use crate::types::{
    BatchReport, BookMetadata, ExecutionMode, LogicalItem, SourceImage, Volume, VolumeFailure,
    VolumeReport, VolumeSource,
};

/// The main Mihiraki conversion configuration, built declaratively using the builder pattern.
///
/// This struct holds everything that stays the same across the volumes of one run: book
/// metadata, output and scratch locations, encoding settings, and the collaborators used for
/// image handling, spread detection and progress reporting. Once configured, it converts
/// volumes through one of four entry points:
///
/// - [`convert_volume`](MihirakiConfig::convert_volume): One volume from an explicit path list
/// - [`convert_from_source`](MihirakiConfig::convert_from_source): One volume from a folder
/// - [`convert_batch`](MihirakiConfig::convert_batch): Several volumes, one after another
/// - [`convert_batch_from_source`](MihirakiConfig::convert_batch_from_source): One volume per subfolder
///
/// ## Builder Pattern
///
/// ```rust,no_run
/// # use mihiraki::prelude::*;
/// # use std::path::PathBuf;
/// let config = MihirakiConfig::builder()
///     .metadata(BookMetadata::new("Author", "Publisher"))
///     .target_path(PathBuf::from("./output"))
///     .jpeg_quality(85u8)
///     .build()
///     .expect("Invalid configuration");
/// ```
#[derive(Clone, derive_builder::Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
pub struct MihirakiConfig {
    // --- Book Settings ---
    /// Author, publisher and language written into every generated book.
    ///
    /// Empty author or publisher strings are written as "Unknown".
    #[builder(default)]
    pub metadata: BookMetadata,

    /// Directory where books produced by the `*_from_source` entry points are written.
    ///
    /// Each book is saved as `target_path/<sanitized volume title>.epub`. The directory is
    /// created if it does not exist.
    #[builder(default)]
    pub target_path: PathBuf,

    // --- Processing Settings ---
    /// Root under which each volume gets its own scratch directory.
    ///
    /// Defaults to the operating system's temp directory. Scratch directories are removed
    /// when their volume finishes, whether it succeeded or not.
    #[builder(default)]
    pub work_dir: Option<PathBuf>,

    /// JPEG quality (1-100) used for every re-encoded page image.
    #[builder(default = "90")]
    pub jpeg_quality: u8,

    /// Maximum number of images decoded or encoded at the same time.
    #[builder(default = "num_cpus::get().max(1)")]
    pub max_concurrency: usize,

    // --- Collaborators ---
    /// Image decode/resize/crop/encode implementation.
    #[builder(default = "Arc::new(JpegCodec::new())")]
    pub codec: Arc<dyn ImageCodec>,

    /// Strategy that recovers spread page pairs from file names.
    #[builder(default = "Arc::new(FilenamePairMatcher::new())")]
    pub spread_matcher: Arc<dyn SpreadHintMatcher>,

    /// Receives a non-decreasing fraction in `[0, 1]` as volumes advance.
    ///
    /// For batches, volume `i` of `N` reports inside `[i/N, (i+1)/N]`.
    #[builder(default)]
    pub progress: Option<Arc<dyn ProgressSink>>,

    /// When raised, the current volume stops before its next stage with [`Error::Cancelled`].
    ///
    /// The flag is only read between stages, so a stage that has started always finishes
    /// or fails on its own.
    #[builder(default)]
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for MihirakiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MihirakiConfig")
            .field("metadata", &self.metadata)
            .field("target_path", &self.target_path)
            .field("work_dir", &self.work_dir)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_concurrency", &self.max_concurrency)
            .field("spread_matcher", &"Arc<dyn SpreadHintMatcher>")
            .field(
                "progress",
                if self.progress.is_some() {
                    &"Some(Sink)"
                } else {
                    &"None"
                },
            )
            .field("cancel_flag", &self.cancel_flag)
            .finish_non_exhaustive()
    }
}

impl MihirakiConfig {
    /// Creates a new builder for configuring `MihirakiConfig`.
    pub fn builder() -> MihirakiConfigBuilder {
        MihirakiConfigBuilder::default()
    }

    /// Performs validation checks on the configuration for a specific execution mode.
    ///
    /// No files are read or written. Every `convert_*` entry point calls this first, so
    /// calling it manually is only useful for reporting problems early.
    ///
    /// # Arguments
    ///
    /// * `mode` - The intended execution mode:
    ///   - [`ExecutionMode::FromPaths`]: Checks the scratch root
    ///   - [`ExecutionMode::FromSource`] and [`ExecutionMode::FromBatchSource`]: Also checks
    ///     that `target_path` is set and is not a file
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use mihiraki::prelude::*;
    /// # use std::path::PathBuf;
    /// # fn main() -> mihiraki::error::Result<()> {
    /// let config = MihirakiConfig::builder()
    ///     .target_path(PathBuf::from("./output"))
    ///     .build()?;
    ///
    /// config.preflight_check(ExecutionMode::FromBatchSource)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn preflight_check(&self, mode: ExecutionMode) -> Result<&Self> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Other(
                "JPEG quality must be between 1 and 100.".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(Error::Other(
                "Maximum concurrency must be at least 1.".to_string(),
            ));
        }

        if let Some(work_dir) = &self.work_dir {
            validate_path(work_dir)?;
            if work_dir.is_file() {
                return Err(Error::InvalidPath(
                    work_dir.clone(),
                    "Work directory is a file.".to_string(),
                ));
            }
        }

        match mode {
            ExecutionMode::FromPaths => {
                // Output paths arrive with each `VolumeSource` and are checked per volume.
            }
            ExecutionMode::FromSource | ExecutionMode::FromBatchSource => {
                if self.target_path.as_os_str().is_empty() {
                    return Err(Error::Other(format!(
                        "`target_path` must be set for `{:?}` execution mode.",
                        mode
                    )));
                }
                validate_path(&self.target_path)?;
                if self.target_path.is_file() {
                    return Err(Error::InvalidPath(
                        self.target_path.clone(),
                        "Target path is a file.".to_string(),
                    ));
                }
            }
        }

        Ok(self)
    }

    /// Converts one volume described by an explicit, ordered list of image paths.
    ///
    /// # Returns
    ///
    /// * `Ok(VolumeReport)` - The book was written to `source.output_path`
    /// * `Err(Error)` - The first failure; nothing is left at the output path
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use mihiraki::prelude::*;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> mihiraki::error::Result<()> {
    /// let config = MihirakiConfig::builder().build()?;
    /// let source = VolumeSource::new(
    ///     "Volume 1",
    ///     vec![PathBuf::from("001.jpg"), PathBuf::from("002_003.jpg")],
    ///     "./out/Volume 1.epub",
    /// );
    /// let report = config.convert_volume(source).await?;
    /// println!("{} pages at {}", report.page_count, report.canonical_size);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn convert_volume(&self, source: VolumeSource) -> Result<VolumeReport> {
        self.preflight_check(ExecutionMode::FromPaths)?;
        let progress = ProgressTracker::new(self.progress.clone());
        self.run_volume(source, &progress).await
    }

    /// Converts the images directly inside `directory` into one book.
    ///
    /// The folder name becomes the title and the book is written to
    /// `target_path/<sanitized title>.epub`.
    pub async fn convert_from_source(&self, directory: &Path) -> Result<VolumeReport> {
        self.preflight_check(ExecutionMode::FromSource)?;
        Self::validate_source_dir(directory)?;
        let source = match self.volume_source_from_dir(directory).await {
            Ok(source) => source,
            Err(e) => {
                Self::log_failure(&get_file_name_lossy(directory), &e);
                return Err(e);
            }
        };
        let progress = ProgressTracker::new(self.progress.clone());
        self.run_volume(source, &progress).await
    }

    /// Converts several volumes one after another.
    ///
    /// A failing volume is logged and recorded in the report; the remaining volumes still run.
    /// A volume whose output path was already used by an earlier volume of the batch fails with
    /// [`Error::InvalidPath`] instead of overwriting that book.
    pub async fn convert_batch(&self, sources: Vec<VolumeSource>) -> Result<BatchReport> {
        self.preflight_check(ExecutionMode::FromPaths)?;

        let total = sources.len();
        let mut report = BatchReport::default();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for (i, source) in sources.into_iter().enumerate() {
            let title = source.title.clone();
            let result = if claimed.insert(source.output_path.clone()) {
                let progress = ProgressTracker::sliced(self.progress.clone(), i, total);
                self.run_volume(source, &progress).await
            } else {
                let e = Error::InvalidPath(
                    source.output_path,
                    "Output path is already used by another volume of this batch.".to_string(),
                );
                Self::log_failure(&title, &e);
                Err(e)
            };
            Self::record(&mut report, title, result);
        }

        Self::log_batch(&report);
        Ok(report)
    }

    /// Converts every non-hidden subfolder of `root` into its own book.
    ///
    /// Subfolders are processed in the order of the last number in their names. Folders whose
    /// sanitized names collide get a numbered suffix, e.g. `Vol-1 (2).epub`.
    pub async fn convert_batch_from_source(&self, root: &Path) -> Result<BatchReport> {
        self.preflight_check(ExecutionMode::FromBatchSource)?;
        Self::validate_source_dir(root)?;

        let directories = Collector::new().collect_volume_dirs(root).await?;
        if directories.is_empty() {
            return Err(Error::NoImagesFound(format!(
                "no volume folders inside '{}'",
                root.display()
            )));
        }

        let total = directories.len();
        let mut report = BatchReport::default();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for (i, directory) in directories.iter().enumerate() {
            let title = get_file_name_lossy(directory);
            let progress = ProgressTracker::sliced(self.progress.clone(), i, total);
            let result = match self.volume_source_from_dir(directory).await {
                Ok(mut source) => {
                    source.output_path =
                        Self::unclaimed_output_path(&mut claimed, &title, &source.output_path);
                    self.run_volume(source, &progress).await
                }
                Err(e) => {
                    Self::log_failure(&title, &e);
                    Err(e)
                }
            };
            Self::record(&mut report, title, result);
        }

        Self::log_batch(&report);
        Ok(report)
    }

    fn validate_source_dir(directory: &Path) -> Result<()> {
        validate_path(directory)?;
        if !directory.exists() {
            return Err(Error::InvalidPath(
                directory.to_path_buf(),
                "Source path does not exist.".to_string(),
            ));
        }
        if !directory.is_dir() {
            return Err(Error::InvalidPath(
                directory.to_path_buf(),
                "Source path is not a directory.".to_string(),
            ));
        }
        Ok(())
    }

    async fn volume_source_from_dir(&self, directory: &Path) -> Result<VolumeSource> {
        let title = get_file_name_lossy(directory);
        let images = Collector::new()
            .collect_volume_images(directory)
            .await?
            .into_iter()
            .map(|image| image.path)
            .collect();
        let output_path = self
            .target_path
            .join(format!("{}.epub", sanitize_filename(&title)));
        Ok(VolumeSource::new(title, images, output_path))
    }

    /// Returns `output_path`, or the first free `<stem> (n).<ext>` sibling if an earlier volume
    /// of the batch already claimed it.
    fn unclaimed_output_path(
        claimed: &mut HashSet<PathBuf>,
        title: &str,
        output_path: &Path,
    ) -> PathBuf {
        if claimed.insert(output_path.to_path_buf()) {
            return output_path.to_path_buf();
        }

        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = output_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let mut n = 2;
        loop {
            let candidate = output_path.with_file_name(format!("{} ({}){}", stem, n, extension));
            if claimed.insert(candidate.clone()) {
                log::warn!(
                    "Output name of '{}' collides with an earlier volume, writing {}",
                    title,
                    candidate.display()
                );
                return candidate;
            }
            n += 1;
        }
    }

    fn log_failure(title: &str, error: &Error) {
        log::error!("Volume '{}' failed ({:?}): {}", title, error.kind(), error);
    }

    fn record(report: &mut BatchReport, title: String, result: Result<VolumeReport>) {
        match result {
            Ok(volume) => report.succeeded.push(volume),
            Err(e) => {
                report.failed.push(VolumeFailure {
                    title,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn log_batch(report: &BatchReport) {
        if report.is_complete_success() {
            log::info!("Batch finished: {} volume(s) written", report.success_count());
        } else {
            log::warn!(
                "Batch finished: {} volume(s) written, {} failed",
                report.success_count(),
                report.failure_count()
            );
        }
    }

    fn check_cancelled(&self, stage: Stage) -> Result<()> {
        match &self.cancel_flag {
            Some(flag) if flag.load(Ordering::SeqCst) => {
                Err(Error::Cancelled(stage.name().to_string()))
            }
            _ => Ok(()),
        }
    }

    fn create_scratch_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("mihiraki-");
        let scratch = match &self.work_dir {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(scratch)
    }

    /// Runs one volume and logs its failure, if any.
    async fn run_volume(
        &self,
        source: VolumeSource,
        progress: &ProgressTracker,
    ) -> Result<VolumeReport> {
        let title = source.title.clone();
        let result = self.run_stages(source, progress).await;
        if let Err(e) = &result {
            Self::log_failure(&title, e);
        }
        result
    }

    /// Drives one volume through its five stages, strictly in order.
    async fn run_stages(
        &self,
        source: VolumeSource,
        progress: &ProgressTracker,
    ) -> Result<VolumeReport> {
        if source.images.is_empty() {
            return Err(Error::NoImagesFound(format!(
                "volume '{}' has no images",
                source.title
            )));
        }
        validate_path(&source.output_path)?;
        log::info!(
            "Converting '{}' from {} image(s)",
            source.title,
            source.images.len()
        );

        // Removed on drop, on success and on every error path.
        let scratch = self.create_scratch_dir()?;
        let normalized_dir = scratch.path().join("normalized");
        let pages_dir = scratch.path().join("pages");
        fs::create_dir_all(&normalized_dir).await?;
        fs::create_dir_all(&pages_dir).await?;

        // --- Stage 1: intake + classification ---
        self.check_cancelled(Stage::Intake)?;
        let codec = Arc::clone(&self.codec);
        let quality = self.jpeg_quality;
        let sources: Vec<SourceImage> = source
            .images
            .iter()
            .map(|path| SourceImage::new(path.as_path()))
            .collect();
        let normalized = self
            .run_per_file(sources, Stage::Intake, progress, move |index, image| {
                intake::normalize(codec.as_ref(), &image, index + 1, &normalized_dir, quality)
            })
            .await?;

        let classifier = AssetClassifier::new(Arc::clone(&self.spread_matcher));
        let classified =
            tokio::task::spawn_blocking(move || classifier.classify_all(normalized)).await?;
        progress.stage(Stage::Intake, 1.0);

        // --- Stage 2: canonical size ---
        self.check_cancelled(Stage::SizeResolution)?;
        let (canonical_size, size_policy) = resolver::resolve(&classified);
        progress.stage(Stage::SizeResolution, 1.0);

        // --- Stage 3: splitting and resizing ---
        self.check_cancelled(Stage::Splitting)?;
        let codec = Arc::clone(&self.codec);
        let items = self
            .run_per_file(classified, Stage::Splitting, progress, move |index, image| {
                PageRenderer::new(codec.as_ref(), canonical_size, &pages_dir, quality)
                    .render(index + 1, &image)
            })
            .await?;

        // --- Stage 4: sequencing ---
        self.check_cancelled(Stage::Sequencing)?;
        let spread_count = items
            .iter()
            .filter(|item| matches!(item, LogicalItem::Spread(..)))
            .count();
        let page_records = sequencer::sequence(items);
        progress.stage(Stage::Sequencing, 1.0);

        // --- Stage 5: packaging ---
        self.check_cancelled(Stage::Packaging)?;
        let volume = Volume {
            title: source.title.clone(),
            author: self.metadata.author.clone(),
            publisher: self.metadata.publisher.clone(),
            language: self.metadata.language.clone(),
            page_records,
            canonical_size,
            output_path: source.output_path.clone(),
        };
        let page_count = volume.page_records.len();
        let work_dir = scratch.path().to_path_buf();
        let output_path =
            tokio::task::spawn_blocking(move || epub::build(&volume, &work_dir)).await??;
        progress.complete();

        log::info!(
            "Wrote '{}' to {} ({} pages, {} spreads, {} {})",
            source.title,
            output_path.display(),
            page_count,
            spread_count,
            canonical_size,
            size_policy
        );

        Ok(VolumeReport {
            title: source.title,
            output_path,
            page_count,
            spread_count,
            canonical_size,
            size_policy,
        })
    }

    /// Runs `work` over every input on the blocking pool, at most `max_concurrency` at a time.
    ///
    /// Results come back in input order. The first failure stops new work from starting; jobs
    /// already running are awaited before it is returned, so none of them outlives the volume's
    /// scratch directory.
    async fn run_per_file<I, O, F>(
        &self,
        inputs: Vec<I>,
        stage: Stage,
        progress: &ProgressTracker,
        work: F,
    ) -> Result<Vec<O>>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(usize, I) -> Result<O> + Send + Sync + 'static,
    {
        let total = inputs.len();
        let limit = self.max_concurrency.max(1);
        let work = Arc::new(work);
        let mut pending = inputs.into_iter().enumerate();
        let mut in_flight = FuturesOrdered::new();
        let mut outputs = Vec::with_capacity(total);
        let mut failure: Option<Error> = None;

        loop {
            while failure.is_none() && in_flight.len() < limit {
                let Some((index, input)) = pending.next() else {
                    break;
                };
                let work = Arc::clone(&work);
                in_flight.push_back(tokio::task::spawn_blocking(move || work(index, input)));
            }

            let Some(joined) = in_flight.next().await else {
                break;
            };
            if failure.is_some() {
                continue;
            }
            match joined.map_err(Error::from).and_then(|result| result) {
                Ok(output) => {
                    outputs.push(output);
                    progress.stage(stage, outputs.len() as f32 / total as f32);
                }
                Err(e) => failure = Some(e),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }
}

impl MihirakiConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(quality) = self.jpeg_quality {
            if !(1..=100).contains(&quality) {
                return Err("JPEG quality must be between 1 and 100.".to_string());
            }
        }

        if let Some(concurrency) = self.max_concurrency {
            if concurrency == 0 {
                return Err("Maximum concurrency must be at least 1.".to_string());
            }
        }

        Ok(())
    }
}
