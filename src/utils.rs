//! Utility functions for text normalisation, dates and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Title-casing for transliterated names
//! - Year derivation from free-form missing dates
//! - String truncation for logging
//! - Directory helpers shared by the downloader, cleaner and partitioner

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:\D|$)").expect("valid year regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Title-case a string the way names are conventionally capitalised.
///
/// A cased letter is upper-cased when the previous character is not a cased
/// letter, and lower-cased otherwise. Uncased scripts (Arabic) and digits
/// start a new word for the following Latin letter.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(title_case("mhmd ali"), "Mhmd Ali");
/// assert_eq!(title_case("O'NEIL"), "O'Neil");
/// ```
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        let cased = c.is_lowercase() || c.is_uppercase();
        if cased {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
        } else {
            out.push(c);
        }
        prev_cased = cased;
    }
    out
}

/// Replace Eastern Arabic and Persian digits with ASCII digits.
pub fn normalize_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => {
                char::from_digit(c as u32 - 0x0660, 10).unwrap_or(c)
            }
            '\u{06F0}'..='\u{06F9}' => {
                char::from_digit(c as u32 - 0x06F0, 10).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Derive the year from a missing-date string.
///
/// Tries the usual date layouts first, then falls back to the first
/// standalone 19xx/20xx number in the text.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_year("2015-03-12"), Some(2015));
/// assert_eq!(parse_year("١٢/٠٣/٢٠١٥"), Some(2015));
/// assert_eq!(parse_year("غير معروف"), None);
/// ```
pub fn parse_year(missing_date: &str) -> Option<i32> {
    let normalized = normalize_digits(missing_date.trim());
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Some(date.year());
        }
    }
    YEAR_RE
        .captures(&normalized)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Collapse line breaks and surrounding whitespace in scraped text.
pub fn clean_text(s: &str) -> String {
    s.replace('\n', "").trim().to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last char boundary before `max` bytes with
/// an ellipsis and byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Directory holding one person's images.
///
/// The Arabic name is the directory name. Path separators become `_`, and a
/// name that is empty or only dots (`.`, `..`) becomes underscores, so the
/// result is always a single normal component directly under `root`.
pub fn person_dir(root: &Path, name_arabic: &str) -> PathBuf {
    let mut safe: String = name_arabic
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if safe.chars().all(|c| c == '.') {
        safe = "_".repeat(safe.len().max(1));
    }
    root.join(safe)
}

/// Sorted names of the regular files directly inside `dir`.
///
/// Temporary `.part` files left by an interrupted download are skipped.
pub fn list_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".part") {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Sorted names of the subdirectories directly inside `dir`.
pub fn list_dirs(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Remove a directory tree; a missing directory is not an error.
///
/// Returns `true` when something was deleted.
pub fn remove_dir_if_exists(dir: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(path = %dir.display(), "Removed directory");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Recursively copy `from` into a new directory `to`.
///
/// Returns the number of files copied.
#[instrument(level = "info", skip_all, fields(from = %from.display(), to = %to.display()))]
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<usize> {
    fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a scratch file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    tokio::fs::create_dir_all(path).await?;
    let check_path = path.join("..__write_check__");
    tokio::fs::File::create(&check_path).await?;
    let _ = tokio::fs::remove_file(&check_path).await;
    info!("Output directory is writable");
    Ok(())
}
