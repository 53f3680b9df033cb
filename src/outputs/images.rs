//! Photo downloads into the per-person image tree.
//!
//! # Layout
//!
//! ```text
//! images_root/
//! └── <name_arabic>/
//!     ├── 0007_0.jpg
//!     └── 0007_1.jpg
//! ```
//!
//! The prefix is the record id zero-padded to four digits; the suffix is the
//! zero-based index of the photo.
//!
//! # Duplicate photos
//!
//! The site embeds every photo twice at different resolutions, so only the
//! first half of the URL list is downloaded (rounded up for odd counts). This
//! is an approximation: it assumes the duplicates form the second half of
//! the list, and it is kept as-is because existing datasets were built with it.

use crate::error::DownloadError;
use crate::fetch::Fetch;
use crate::models::PersonRecord;
use crate::utils::person_dir;
use futures::stream::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Zero-padded filename prefix for a record id.
pub fn image_prefix(id: u64) -> String {
    format!("{id:04}")
}

/// Local filename of photo `index` of record `id`.
pub fn image_filename(id: u64, index: usize) -> String {
    format!("{}_{}.jpg", image_prefix(id), index)
}

/// How many of `url_count` photo URLs are downloaded.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(download_count(5), 3);
/// assert_eq!(download_count(4), 2);
/// ```
pub fn download_count(url_count: usize) -> usize {
    url_count.div_ceil(2)
}

/// Stream one URL into `path`.
///
/// Bytes go to `<path>.part` first and are renamed into place only after the
/// whole body arrived, so an interrupted download never leaves a truncated
/// `.jpg` behind.
pub(crate) async fn save_image<F: Fetch>(fetcher: &F, url: &str, path: &Path) -> Result<u64, DownloadError> {
    let fetched = fetcher.fetch(url, true).await?;
    if !fetched.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: fetched.status,
        });
    }

    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    let io_err = |source| DownloadError::Io {
        path: part.clone(),
        source,
    };

    let result: Result<u64, DownloadError> = async {
        let mut file = fs::File::create(&part).await.map_err(io_err)?;
        let mut chunks = fetched.into_chunks();
        let mut written = 0u64;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        Ok::<u64, DownloadError>(written)
    }
    .await;

    match result {
        Ok(written) => {
            fs::rename(&part, path).await.map_err(|source| DownloadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(written)
        }
        Err(e) => {
            let _ = fs::remove_file(&part).await;
            Err(e)
        }
    }
}

/// Download a record's photos into `images_root/<name_arabic>/`.
///
/// Fills `image_ref`, `image_ref_extra` and `number_of_images` as files land,
/// so the record always describes exactly what is on disk. The first failure
/// stops the remaining downloads of this record; files already written stay.
#[instrument(level = "info", skip_all, fields(id = record.id, name = %record.name_arabic))]
pub async fn download_images<F: Fetch>(
    fetcher: &F,
    record: &mut PersonRecord,
    images_root: &Path,
) -> Result<usize, DownloadError> {
    let dir = person_dir(images_root, &record.name_arabic);
    fs::create_dir_all(&dir)
        .await
        .map_err(|source| DownloadError::Io {
            path: dir.clone(),
            source,
        })?;

    record.image_ref = image_filename(record.id, 0);
    record.image_ref_extra.clear();
    record.number_of_images = 0;

    let planned = download_count(record.image_urls.len());
    let urls: Vec<String> = record.image_urls.iter().take(planned).cloned().collect();
    for (index, url) in urls.iter().enumerate() {
        let filename = image_filename(record.id, index);
        let bytes = save_image(fetcher, url, &dir.join(&filename)).await?;
        debug!(%filename, bytes, "Saved image");
        record.image_ref_extra.push(filename);
        record.number_of_images += 1;
    }

    info!(
        written = record.number_of_images,
        available = record.image_urls.len(),
        "Downloaded images"
    );
    Ok(record.number_of_images)
}
