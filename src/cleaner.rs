//! Dataset cleaning: filter records and their image directories in lockstep.
//!
//! # Passes
//!
//! [`run`] applies the passes of a [`CleanPlan`] in this fixed order:
//!
//! 1. [`remove_by_count`] for each configured count
//! 2. [`drop_duplicates`]
//! 3. [`remove_before_year`]
//! 4. [`reindex`], exactly once, after every drop pass
//! 5. [`check_consistency`], which only logs
//!
//! Every pass that drops a record also deletes the record's directory, so
//! the JSON snapshot and the image tree never drift apart. A directory still
//! joined to a surviving record (same Arabic name) is left alone.

use crate::error::CleanError;
use crate::models::{Dataset, PersonRecord};
use crate::utils::{copy_tree, list_dirs, list_files, person_dir, remove_dir_if_exists};
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Which drop passes to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanPlan {
    /// Remove people whose image count equals each of these, in order.
    pub remove_counts: Vec<usize>,
    pub drop_duplicates: bool,
    /// Remove people missing in or before this year.
    pub before_year: Option<i32>,
}

/// What a cleaning run changed.
#[derive(Debug, Default)]
pub struct CleanReport {
    pub removed_by_count: usize,
    pub duplicates_removed: usize,
    pub duplicate_files_removed: usize,
    pub removed_before_year: usize,
    pub remaining: usize,
    pub consistency: Option<ConsistencyWarning>,
}

/// Image tree and dataset disagree after cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    pub directories: usize,
    pub records: usize,
    /// `(name, files on disk, number_of_images)` for records whose counts differ.
    pub count_mismatches: Vec<(String, usize, usize)>,
    /// Records with no directory at all.
    pub missing_directories: Vec<String>,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} person directories vs {} records; {} image-count mismatches; {} records without a directory",
            self.directories,
            self.records,
            self.count_mismatches.len(),
            self.missing_directories.len()
        )
    }
}

/// Duplicate removal outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateReport {
    pub records: usize,
    pub files: usize,
}

fn io_error(path: &Path, source: std::io::Error) -> CleanError {
    CleanError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Delete the directories of `dropped` records unless a kept record still joins to them.
fn delete_dirs(
    dropped: &[PersonRecord],
    kept: &[PersonRecord],
    images_root: &Path,
) -> Result<(), CleanError> {
    let still_used: HashSet<&str> = kept.iter().map(|r| r.name_arabic.as_str()).collect();
    for record in dropped {
        if still_used.contains(record.name_arabic.as_str()) {
            debug!(name = %record.name_arabic, "Directory still used by a kept record");
            continue;
        }
        let dir = person_dir(images_root, &record.name_arabic);
        remove_dir_if_exists(&dir).map_err(|e| io_error(&dir, e))?;
    }
    Ok(())
}

/// Drop records matching `predicate` and delete their directories.
fn drop_where<P>(dataset: &mut Dataset, images_root: &Path, predicate: P) -> Result<usize, CleanError>
where
    P: Fn(&PersonRecord) -> bool,
{
    let (dropped, kept): (Vec<PersonRecord>, Vec<PersonRecord>) =
        dataset.records.drain(..).partition(|r| predicate(r));
    dataset.records = kept;
    delete_dirs(&dropped, &dataset.records, images_root)?;
    Ok(dropped.len())
}

/// Copy the raw image tree to a fresh working tree before cleaning.
pub fn prepare_working_tree(source: &Path, working: &Path) -> Result<usize, CleanError> {
    if working.exists() {
        return Err(CleanError::WorkingTreeExists(working.to_path_buf()));
    }
    let copied = copy_tree(source, working).map_err(|e| io_error(source, e))?;
    info!(copied, from = %source.display(), to = %working.display(), "Copied image tree");
    Ok(copied)
}

/// Remove every person with exactly `count` images.
#[instrument(level = "info", skip(dataset, images_root))]
pub fn remove_by_count(
    dataset: &mut Dataset,
    count: usize,
    images_root: &Path,
) -> Result<usize, CleanError> {
    let t0 = Instant::now();
    let removed = drop_where(dataset, images_root, |r| r.number_of_images == count)?;
    info!(
        removed,
        elapsed_ms = t0.elapsed().as_millis(),
        "Removed people by image count"
    );
    Ok(removed)
}

/// Keep the first record of every Arabic name and drop the rest.
///
/// The directory shared by a duplicated name is then de-duplicated by file
/// suffix (`<prefix>_<suffix>`): the first file of each suffix, in name
/// order, survives. The kept record is re-synchronised with what is left.
#[instrument(level = "info", skip_all)]
pub fn drop_duplicates(
    dataset: &mut Dataset,
    images_root: &Path,
) -> Result<DuplicateReport, CleanError> {
    let duplicated: Vec<String> = dataset
        .records
        .iter()
        .map(|r| r.name_arabic.clone())
        .duplicates()
        .collect();

    let before = dataset.len();
    let mut seen = HashSet::new();
    dataset.records.retain(|r| seen.insert(r.name_arabic.clone()));
    let mut report = DuplicateReport {
        records: before - dataset.len(),
        files: 0,
    };

    for name in &duplicated {
        let dir = person_dir(images_root, name);
        if !dir.is_dir() {
            continue;
        }
        let mut suffixes = HashSet::new();
        for file in list_files(&dir).map_err(|e| io_error(&dir, e))? {
            let suffix = file.rsplit('_').next().unwrap_or(&file).to_string();
            if !suffixes.insert(suffix) {
                let path = dir.join(&file);
                fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
                report.files += 1;
            }
        }
        if let Some(record) = dataset.records.iter_mut().find(|r| &r.name_arabic == name) {
            resync_with_dir(record, &dir)?;
        }
    }

    info!(
        records = report.records,
        files = report.files,
        "Dropped duplicate people"
    );
    Ok(report)
}

/// Point a record's image fields at exactly the files in `dir`.
fn resync_with_dir(record: &mut PersonRecord, dir: &Path) -> Result<(), CleanError> {
    let files = list_files(dir).map_err(|e| io_error(dir, e))?;
    if let Some(first) = files.first() {
        record.image_ref = first.clone();
    }
    record.number_of_images = files.len();
    record.image_ref_extra = files;
    Ok(())
}

/// Remove every person whose missing year is `year` or earlier.
///
/// Records with an unknown year are kept.
#[instrument(level = "info", skip(dataset, images_root))]
pub fn remove_before_year(
    dataset: &mut Dataset,
    year: i32,
    images_root: &Path,
) -> Result<usize, CleanError> {
    let t0 = Instant::now();
    let removed = drop_where(dataset, images_root, |r| r.year.is_some_and(|y| y <= year))?;
    info!(
        removed,
        elapsed_ms = t0.elapsed().as_millis(),
        "Removed people missing before year"
    );
    Ok(removed)
}

/// Renumber ids as the dense sequence `0..len` in row order.
pub fn reindex(dataset: &mut Dataset) {
    for (index, record) in dataset.records.iter_mut().enumerate() {
        record.id = index as u64;
    }
}

/// Compare the image tree with the dataset. Logs and returns any disagreement.
#[instrument(level = "info", skip_all)]
pub fn check_consistency(
    dataset: &Dataset,
    images_root: &Path,
) -> Result<Option<ConsistencyWarning>, CleanError> {
    let directories = if images_root.is_dir() {
        list_dirs(images_root).map_err(|e| io_error(images_root, e))?.len()
    } else {
        0
    };

    let mut count_mismatches = Vec::new();
    let mut missing_directories = Vec::new();
    for record in &dataset.records {
        let dir = person_dir(images_root, &record.name_arabic);
        if !dir.is_dir() {
            missing_directories.push(record.name_arabic.clone());
            continue;
        }
        let on_disk = list_files(&dir).map_err(|e| io_error(&dir, e))?.len();
        if on_disk != record.number_of_images {
            count_mismatches.push((record.name_arabic.clone(), on_disk, record.number_of_images));
        }
    }

    info!(directories, records = dataset.len(), "Consistency check");
    if directories == dataset.len() && count_mismatches.is_empty() && missing_directories.is_empty() {
        info!("Images and dataset are consistent");
        return Ok(None);
    }

    let warning = ConsistencyWarning {
        directories,
        records: dataset.len(),
        count_mismatches,
        missing_directories,
    };
    warn!(%warning, "Images and dataset are not consistent");
    Ok(Some(warning))
}

/// Run the cleaning passes of `plan` over `dataset`, in order.
#[instrument(level = "info", skip_all, fields(images_root = %images_root.display()))]
pub fn run(
    dataset: &mut Dataset,
    plan: &CleanPlan,
    images_root: &Path,
) -> Result<CleanReport, CleanError> {
    let mut report = CleanReport::default();

    for &count in &plan.remove_counts {
        report.removed_by_count += remove_by_count(dataset, count, images_root)?;
    }
    if plan.drop_duplicates {
        let dups = drop_duplicates(dataset, images_root)?;
        report.duplicates_removed = dups.records;
        report.duplicate_files_removed = dups.files;
    }
    if let Some(year) = plan.before_year {
        report.removed_before_year = remove_before_year(dataset, year, images_root)?;
    }
    reindex(dataset);

    report.remaining = dataset.len();
    report.consistency = check_consistency(dataset, images_root)?;
    info!(remaining = report.remaining, "Cleaning finished");
    Ok(report)
}

/// Rename each person directory from its Arabic name to its id.
///
/// Returns the number of directories renamed.
#[instrument(level = "info", skip_all)]
pub fn rename_dirs_to_ids(dataset: &Dataset, images_root: &Path) -> Result<usize, CleanError> {
    let mut renamed = 0;
    for record in &dataset.records {
        let from = person_dir(images_root, &record.name_arabic);
        let to = images_root.join(record.id.to_string());
        if !from.is_dir() {
            warn!(name = %record.name_arabic, "No directory to rename");
            continue;
        }
        fs::rename(&from, &to).map_err(|e| io_error(&from, e))?;
        renamed += 1;
    }
    info!(renamed, "Renamed person directories to ids");
    Ok(renamed)
}
