//! Path utilities for safe and robust file path handling.
//!
//! Helpers for turning paths into display strings, building safe output file names
//! from free-text titles, and ordering page files by the numbers in their names.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
    /// Matches each run of ASCII digits in a file name.
    static ref NUMBER_TOKEN_REGEX: Regex = Regex::new(r"\d+").unwrap();
}

/// Gets the file name from a path with fallback to lossy conversion.
pub fn get_file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Checks if a file name starts with a dot (hidden file).
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Rejects output paths containing characters that break file systems or archive tools.
///
/// # Arguments
///
/// * `path` - The path to validate
///
/// # Returns
///
/// * `Result<()>` - Ok if the path is usable, or an error describing the issue
pub fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            "Path is empty".to_string(),
        ));
    }

    let path_str = path_to_string_lossy(path);
    if path_str
        .chars()
        .any(|c| matches!(c, '<' | '>' | '"' | '|' | '?' | '*'))
    {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            "Path contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Sanitizes a title by replacing characters that are invalid in file names.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | '"' | '|' | '?' | '*' => '-',
            ':' => '-',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extracts the last run of digits in a file name as an integer.
///
/// The last number is usually the page number ("vol1_012.jpg" -> 12).
pub fn extract_last_number(path: &Path) -> Option<u64> {
    let file_name = get_file_name_lossy(path);
    NUMBER_TOKEN_REGEX
        .find_iter(&file_name)
        .last()
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Orders paths by the last number in their file name, then by file name.
///
/// Names without any number sort after numbered ones.
pub fn compare_paths_by_number(a: &Path, b: &Path) -> Ordering {
    let a_num = extract_last_number(a);
    let b_num = extract_last_number(b);

    let by_number = match (a_num, b_num) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_number.then_with(|| get_file_name_lossy(a).cmp(&get_file_name_lossy(b)))
}

/// Builds the sibling path used to stage an output file before it is moved into place.
pub fn staging_path_for(output_path: &Path) -> PathBuf {
    let file_name = get_file_name_lossy(output_path);
    let staged_name = format!(".{}.partial", file_name);
    match output_path.parent() {
        Some(parent) => parent.join(staged_name),
        None => PathBuf::from(staged_name),
    }
}
