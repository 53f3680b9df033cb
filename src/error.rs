//! Error types for the scrape, clean and split pipelines.
//!
//! Each stage has its own enum so callers can decide per stage whether a
//! failure skips one record or aborts the run:
//!
//! | Error | Scope | Policy |
//! |-------|-------|--------|
//! | [`TransportError`] | one HTTP call | retried on connect failures, then surfaced |
//! | [`ExtractionError`] | one record | logged, record skipped |
//! | [`TranslationError`] | one name | logged, offline mapping used instead |
//! | [`DatasetError`] | whole run | fatal |

use std::path::PathBuf;

/// Network failure while talking to the source site.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established. The only retried kind.
    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// The request was sent but failed for another reason (timeout, TLS, redirect loop).
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The response body could not be read to the end.
    #[error("reading body of {url} failed: {reason}")]
    Body { url: String, reason: String },
}

/// An expected element was missing from a fetched page.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("{url}: missing {what}")]
    MissingElement { url: String, what: &'static str },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The external translation service refused or failed.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    /// Daily quota used up or rate limited.
    #[error("translation throttled: {0}")]
    Throttled(String),

    #[error("translation failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A photo could not be saved.
///
/// Aborts the remaining downloads of that record only.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The settings file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// The persisted dataset could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("dataset {path} is valid JSON but not an array of records")]
    NotAnArray { path: PathBuf },

    #[error("dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing dataset failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DatasetError {
    /// True for the two variants that mean the file exists but holds no usable array.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::NotAnArray { .. })
    }
}

/// Failure inside the cleaning pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("working image tree {0} already exists; delete it to run the copy again")]
    WorkingTreeExists(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Failure inside the train/test partitioner.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("test ratio {0} is outside 0.0..=1.0")]
    InvalidRatio(f64),

    #[error("destination {0} already exists")]
    DestinationExists(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
