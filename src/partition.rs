//! Train/test partitioning of the per-person image tree.
//!
//! ```text
//! source/                 dest/
//! ├── 0/                  ├── train/
//! │   ├── 0000_0.jpg      │   ├── 0/ ...
//! │   └── 0000_1.jpg      │   └── 1/ ...
//! └── 1/ ...              └── test/
//!                             ├── 0/ ...
//!                             └── 1/ ...
//! ```
//!
//! Files are copied, never moved. Each person's files are listed in name
//! order, then shuffled with the caller's random source, so a seeded RNG
//! gives a reproducible split.

use crate::error::SplitError;
use crate::utils::{list_dirs, list_files};
use rand::Rng;
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// How many of a person's images go to the training set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitRule {
    /// Fraction of each person's images held out for testing.
    Ratio(f64),
    /// Fixed number of training images per person (k-shot).
    Shots(usize),
}

impl SplitRule {
    /// Training-set size for a person with `total` images.
    ///
    /// A ratio keeps `floor(total * (1 - ratio))` for training. A k-shot rule
    /// keeps `k`, or everything when the person has fewer than `k` images.
    pub fn train_count(&self, total: usize) -> usize {
        match *self {
            SplitRule::Ratio(ratio) => ((total as f64) * (1.0 - ratio)).floor() as usize,
            SplitRule::Shots(k) => k.min(total),
        }
    }

    fn validate(&self) -> Result<(), SplitError> {
        match *self {
            SplitRule::Ratio(ratio) if !(0.0..=1.0).contains(&ratio) => {
                Err(SplitError::InvalidRatio(ratio))
            }
            _ => Ok(()),
        }
    }
}

/// Counts of what a split copied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SplitReport {
    pub people: usize,
    pub train: usize,
    pub test: usize,
}

fn io_error(path: &Path, source: std::io::Error) -> SplitError {
    SplitError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn copy_into(files: &[String], from: &Path, to: &Path) -> Result<(), SplitError> {
    fs::create_dir_all(to).map_err(|e| io_error(to, e))?;
    for name in files {
        let src = from.join(name);
        fs::copy(&src, to.join(name)).map_err(|e| io_error(&src, e))?;
    }
    Ok(())
}

/// Split every person directory under `source` into `dest/train` and `dest/test`.
///
/// # Errors
///
/// [`SplitError::InvalidRatio`] for a ratio outside `0.0..=1.0`, and
/// [`SplitError::DestinationExists`] when either output tree is already there.
#[instrument(level = "info", skip_all, fields(source = %source.display(), dest = %dest.display(), ?rule))]
pub fn split<R: Rng + ?Sized>(
    source: &Path,
    dest: &Path,
    rule: SplitRule,
    rng: &mut R,
) -> Result<SplitReport, SplitError> {
    rule.validate()?;
    let train_root = dest.join("train");
    let test_root = dest.join("test");
    for root in [&train_root, &test_root] {
        if root.exists() {
            return Err(SplitError::DestinationExists(root.clone()));
        }
    }

    let t0 = Instant::now();
    let mut report = SplitReport::default();
    for person in list_dirs(source).map_err(|e| io_error(source, e))? {
        let from = source.join(&person);
        let mut files = list_files(&from).map_err(|e| io_error(&from, e))?;
        files.shuffle(rng);

        let (train, test) = files.split_at(rule.train_count(files.len()));
        copy_into(train, &from, &train_root.join(&person))?;
        copy_into(test, &from, &test_root.join(&person))?;
        debug!(%person, train = train.len(), test = test.len(), "Split person");

        report.people += 1;
        report.train += train.len();
        report.test += test.len();
    }

    info!(
        people = report.people,
        train = report.train,
        test = report.test,
        ?rule,
        elapsed_ms = t0.elapsed().as_millis(),
        "Split images"
    );
    Ok(report)
}
