use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use memmap2::MmapOptions;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::generator::documents::{BookDocuments, PageEntry};
use crate::generator::{DISPLAY_OPTIONS_PATH, EPUB_MIMETYPE, PACKAGE_ROOT};
use crate::path_utils::{path_to_string_lossy, staging_path_for};
use crate::types::{Volume, get_file_info};

/// Builds a fixed-layout EPUB3 file from a fully sequenced [`Volume`].
///
/// Documents and images are first laid out as a directory tree under `work_dir`, then archived
/// into a staging file next to the output path, which is finally moved over the output path.
/// A failure at any step leaves no file at the output path.
pub struct EpubPackager<'a> {
    volume: &'a Volume,
    tree_root: PathBuf,
    /// Archive entry names in the order they were written; `mimetype` is always first.
    entries: Vec<String>,
}

fn packaging_error(context: impl std::fmt::Display, error: impl std::fmt::Display) -> Error {
    Error::Packaging(format!("{}: {}", context, error))
}

impl<'a> EpubPackager<'a> {
    /// Creates a packager that lays out its tree in `work_dir/epub`.
    pub fn new(volume: &'a Volume, work_dir: &Path) -> Self {
        Self {
            volume,
            tree_root: work_dir.join("epub"),
            entries: Vec::new(),
        }
    }

    /// Writes the book to `volume.output_path`, replacing any existing file.
    pub fn build(mut self) -> Result<PathBuf> {
        if self.volume.page_records.is_empty() {
            return Err(Error::Packaging(format!(
                "volume '{}' has no pages to package",
                self.volume.title
            )));
        }

        if self.tree_root.exists() {
            std::fs::remove_dir_all(&self.tree_root)
                .map_err(|e| packaging_error("clearing scratch tree", e))?;
        }

        self.write_tree()?;
        self.write_archive()?;

        log::debug!(
            "Packaged {} entries into '{}'",
            self.entries.len(),
            path_to_string_lossy(&self.volume.output_path)
        );
        Ok(self.volume.output_path.clone())
    }

    fn write_tree(&mut self) -> Result<()> {
        self.write_entry("mimetype", EPUB_MIMETYPE.as_bytes())?;
        self.write_entry("META-INF/container.xml", BookDocuments::container_xml().as_bytes())?;
        self.write_entry(
            DISPLAY_OPTIONS_PATH,
            BookDocuments::display_options_xml().as_bytes(),
        )?;

        let volume = self.volume;
        let pages = self.page_entries()?;
        let identifier = uuid::Uuid::new_v4().to_string();
        let modified = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let documents = BookDocuments {
            title: &volume.title,
            author: &volume.author,
            publisher: &volume.publisher,
            language: &volume.language,
            identifier: &identifier,
            modified: &modified,
            canonical_size: volume.canonical_size,
            pages: &pages,
        };

        for (page, record) in pages.iter().zip(&volume.page_records) {
            self.copy_entry(
                &format!("{}/{}", PACKAGE_ROOT, page.image_href()),
                &record.image,
            )?;
            self.write_entry(
                &format!("{}/{}", PACKAGE_ROOT, page.page_href()),
                documents.page_xhtml(page).as_bytes(),
            )?;
        }

        self.write_entry(
            &format!("{}/nav.xhtml", PACKAGE_ROOT),
            documents.nav_xhtml().as_bytes(),
        )?;
        self.write_entry(
            &format!("{}/toc.ncx", PACKAGE_ROOT),
            documents.toc_ncx().as_bytes(),
        )?;
        self.write_entry(
            &format!("{}/content.opf", PACKAGE_ROOT),
            documents.content_opf().as_bytes(),
        )?;
        Ok(())
    }

    fn page_entries(&self) -> Result<Vec<PageEntry>> {
        self.volume
            .page_records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let (image_extension, image_mime) = get_file_info(&record.image)?;
                Ok(PageEntry {
                    number: i + 1,
                    placement: record.placement,
                    image_extension,
                    image_mime,
                })
            })
            .collect()
    }

    fn tree_path(&self, name: &str) -> PathBuf {
        name.split('/')
            .fold(self.tree_root.clone(), |path, part| path.join(part))
    }

    fn prepare_parent(&self, path: &Path, name: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| packaging_error(format!("creating directory for '{}'", name), e))?;
        }
        Ok(())
    }

    fn write_entry(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        let path = self.tree_path(name);
        self.prepare_parent(&path, name)?;
        std::fs::write(&path, contents)
            .map_err(|e| packaging_error(format!("writing '{}'", name), e))?;
        self.entries.push(name.to_string());
        Ok(())
    }

    fn copy_entry(&mut self, name: &str, source: &Path) -> Result<()> {
        let path = self.tree_path(name);
        self.prepare_parent(&path, name)?;
        std::fs::copy(source, &path).map_err(|e| {
            packaging_error(
                format!("copying '{}' to '{}'", path_to_string_lossy(source), name),
                e,
            )
        })?;
        self.entries.push(name.to_string());
        Ok(())
    }

    fn write_archive(&self) -> Result<()> {
        let output_path = &self.volume.output_path;
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| packaging_error("creating output directory", e))?;
        }

        let staging_path = staging_path_for(output_path);
        let result = self
            .zip_tree(&staging_path)
            .and_then(|_| Self::move_into_place(&staging_path, output_path));

        if result.is_err() && staging_path.exists() {
            let _ = std::fs::remove_file(&staging_path);
        }
        result
    }

    fn zip_tree(&self, staging_path: &Path) -> Result<()> {
        let file = File::create(staging_path).map_err(|e| {
            packaging_error(
                format!("creating '{}'", path_to_string_lossy(staging_path)),
                e,
            )
        })?;
        let mut zip = ZipWriter::new(file);

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (i, name) in self.entries.iter().enumerate() {
            // Readers sniff the container type from the first, uncompressed entry.
            let options = if i == 0 { stored } else { deflated };
            zip.start_file(name.as_str(), options)
                .map_err(|e| packaging_error(format!("adding '{}'", name), e))?;

            let path = self.tree_path(name);
            let source = File::open(&path)
                .map_err(|e| packaging_error(format!("opening '{}'", name), e))?;
            let len = source
                .metadata()
                .map_err(|e| packaging_error(format!("reading '{}'", name), e))?
                .len();
            if len == 0 {
                continue;
            }

            let mmap = unsafe { MmapOptions::new().map(&source) }
                .map_err(|e| packaging_error(format!("mapping '{}'", name), e))?;
            zip.write_all(&mmap[..])
                .map_err(|e| packaging_error(format!("archiving '{}'", name), e))?;
        }

        let file = zip
            .finish()
            .map_err(|e| packaging_error("finishing archive", e))?;
        file.sync_all()
            .map_err(|e| packaging_error("flushing archive", e))?;
        Ok(())
    }

    fn move_into_place(staging_path: &Path, output_path: &Path) -> Result<()> {
        if std::fs::rename(staging_path, output_path).is_ok() {
            return Ok(());
        }

        // Some platforms refuse to rename over an existing file.
        if output_path.exists() {
            std::fs::remove_file(output_path)
                .map_err(|e| packaging_error("replacing existing output", e))?;
        }
        std::fs::rename(staging_path, output_path).map_err(|e| {
            packaging_error(
                format!("moving archive to '{}'", path_to_string_lossy(output_path)),
                e,
            )
        })
    }
}

/// Writes `volume` to its output path using `work_dir` as scratch space.
pub fn build(volume: &Volume, work_dir: &Path) -> Result<PathBuf> {
    EpubPackager::new(volume, work_dir).build()
}
