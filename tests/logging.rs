//! Log output of failing conversions.
//!
//! Runs in its own test binary because a `log` logger can only be installed once per process.

use log::{Level, LevelFilter, Log, Metadata, Record};
use mihiraki::error::Result;
use mihiraki::prelude::*;
use std::sync::Mutex;

mod common;
use common::{TestDirs, create_page, setup_test_dirs};

struct CapturingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.lines
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    lines: Mutex::new(Vec::new()),
};

fn install_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Error lines mentioning the volume `title`.
fn error_lines_for(title: &str) -> Vec<String> {
    let needle = format!("Volume '{}' failed", title);
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, line)| *level == Level::Error && line.contains(&needle))
        .map(|(_, line)| line.clone())
        .collect()
}

fn test_config(dirs: &TestDirs) -> Result<MihirakiConfig> {
    Ok(MihirakiConfig::builder()
        .target_path(dirs.target_dir.clone())
        .work_dir(dirs.work_dir.clone())
        .max_concurrency(2usize)
        .build()?)
}

#[tokio::test]
async fn test_single_volume_failure_is_logged() -> Result<()> {
    install_logger();
    let dirs = setup_test_dirs("log_single_failure").await;
    let broken = dirs.source_dir.join("001.jpg");
    tokio::fs::write(&broken, b"not an image").await?;

    let config = test_config(&dirs)?;
    let err = config
        .convert_volume(VolumeSource::new(
            "Broken Single",
            vec![broken],
            dirs.target_dir.join("Broken Single.epub"),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnreadableImage);
    let lines = error_lines_for("Broken Single");
    assert_eq!(lines.len(), 1, "{:?}", lines);
    assert!(lines[0].contains("UnreadableImage"));
    Ok(())
}

#[tokio::test]
async fn test_from_source_failure_is_logged() -> Result<()> {
    install_logger();
    let dirs = setup_test_dirs("log_from_source_failure").await;
    let volume_dir = dirs.source_dir.join("Empty Folder Volume");
    tokio::fs::create_dir_all(&volume_dir).await?;

    let config = test_config(&dirs)?;
    let err = config.convert_from_source(&volume_dir).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoImagesFound);
    assert_eq!(error_lines_for("Empty Folder Volume").len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_batch_failures_are_logged_once() -> Result<()> {
    install_logger();
    let dirs = setup_test_dirs("log_batch_failure").await;
    let good = dirs.source_dir.join("good.jpg");
    create_page(&good, 60, 90).await?;
    let broken = dirs.source_dir.join("broken.jpg");
    tokio::fs::write(&broken, b"garbage").await?;

    let config = test_config(&dirs)?;
    let report = config
        .convert_batch(vec![
            VolumeSource::new("Logged Good", vec![good], dirs.target_dir.join("good.epub")),
            VolumeSource::new(
                "Logged Broken",
                vec![broken],
                dirs.target_dir.join("broken.epub"),
            ),
        ])
        .await?;

    assert_eq!(report.failure_count(), 1);
    assert_eq!(error_lines_for("Logged Broken").len(), 1);
    assert!(error_lines_for("Logged Good").is_empty());
    Ok(())
}
