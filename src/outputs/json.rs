//! The persisted dataset: a single JSON array of records.
//!
//! # Format
//!
//! UTF-8, pretty-printed with four-space indentation, non-ASCII text written
//! as-is (Arabic names stay readable in the file).
//!
//! # Scalability
//!
//! Appending is read-modify-write of the whole array, so the dataset must fit
//! in memory. Each write lands in a sibling temporary file that is renamed
//! over the original, so a crash mid-write leaves the previous version.

use crate::error::DatasetError;
use crate::models::{Dataset, PersonRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

fn io_error(path: &Path, source: std::io::Error) -> DatasetError {
    DatasetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a JSON array of `T` from `path`.
///
/// # Errors
///
/// [`DatasetError::Corrupt`] when the file is not JSON or its elements do not
/// match `T`, [`DatasetError::NotAnArray`] when the top level is not an array.
pub async fn load_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DatasetError> {
    let content = fs::read_to_string(path).await.map_err(|e| io_error(path, e))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| DatasetError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    if !value.is_array() {
        return Err(DatasetError::NotAnArray {
            path: path.to_path_buf(),
        });
    }
    serde_json::from_value(value).map_err(|source| DatasetError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `items` as the whole content of `path`.
pub async fn write_array<T: Serialize>(path: &Path, items: &[T]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|e| io_error(parent, e))?;
    }

    let mut json = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut json, PrettyFormatter::with_indent(b"    "));
    items.serialize(&mut ser)?;
    json.push(b'\n');

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    fs::write(tmp, &json).await.map_err(|e| io_error(tmp, e))?;
    fs::rename(tmp, path).await.map_err(|e| io_error(path, e))?;
    Ok(())
}

/// Append `new_items` to the array stored at `path`, keeping prior entries.
///
/// A missing file starts as `[]`. Returns the total number of entries.
#[instrument(level = "info", skip_all, fields(path = %path.display(), new = new_items.len()))]
pub async fn append_records<T>(new_items: &[T], path: &Path) -> Result<usize, DatasetError>
where
    T: Serialize + DeserializeOwned + Clone,
{
    if !fs::try_exists(path).await.map_err(|e| io_error(path, e))? {
        write_array::<T>(path, &[]).await?;
        info!("Initialised empty dataset");
    }
    let mut items: Vec<T> = load_array(path).await?;
    items.extend_from_slice(new_items);
    write_array(path, &items).await?;
    info!(total = items.len(), "Appended records");
    Ok(items.len())
}

/// Load the person dataset snapshot.
pub async fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    let records: Vec<PersonRecord> = load_array(path).await?;
    info!(path = %path.display(), count = records.len(), "Loaded dataset");
    Ok(Dataset::new(records))
}

/// Persist the person dataset snapshot, replacing the file.
pub async fn save_dataset(dataset: &Dataset, path: &Path) -> Result<(), DatasetError> {
    write_array(path, &dataset.records).await?;
    info!(path = %path.display(), count = dataset.len(), "Saved dataset");
    Ok(())
}
