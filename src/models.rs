//! Data models for scraped records and the persisted dataset.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ListingEntry`]: One row of a paginated listing page (id + detail link)
//! - [`PersonRecord`]: A fully extracted missing-person record
//! - [`Dataset`]: The in-memory snapshot of the persisted JSON array
//! - [`AlbumPost`]: A record recovered from a captured photo-album post
//!
//! Field names are snake_case on disk as well, so the JSON written by the
//! scraper is the same JSON the cleaner reads back.

use serde::{Deserialize, Serialize};

/// A link to one record's detail page, as found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Site-assigned record id (`data-id`).
    pub id: u64,
    /// Absolute URL of the detail page.
    pub detail_url: String,
}

/// A missing-person record.
///
/// `name_arabic` is the join key between this record and its image
/// directory. After any cleaning pass, the number of files under that
/// directory equals `number_of_images`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonRecord {
    /// Unique within the dataset. Site id at scrape time, dense row index after cleaning.
    pub id: u64,
    /// Detail page the record was extracted from.
    pub url: String,
    pub name_arabic: String,
    /// Derived from `name_arabic` by transliteration or translation.
    pub name_english: String,
    pub government_arabic: String,
    /// `"Null"` when no government matched.
    pub government_english: String,
    pub missing_date: String,
    pub current_age: String,
    /// Remote photo URLs, in page order.
    pub image_urls: Vec<String>,
    /// Primary local image filename (`<prefix>_0.jpg`).
    pub image_ref: String,
    /// Every local filename written for this record, in order.
    pub image_ref_extra: Vec<String>,
    pub number_of_images: usize,
    /// Year of `missing_date`, when one could be read.
    pub year: Option<i32>,
}

/// The whole dataset held in memory.
///
/// Exactly one snapshot exists per pipeline run. The driver owns it and
/// lends it to each pass by mutable reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<PersonRecord>,
}

impl Dataset {
    pub fn new(records: Vec<PersonRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A record recovered from a captured photo-album post.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlbumPost {
    pub name_arabic: String,
    pub name_english: String,
    /// Filesystem-safe form of `name_english`, used as the directory name.
    pub name_dir: String,
    pub government_arabic: String,
    pub government_english: String,
    /// First CDN image on the post, if any.
    pub image_url: Option<String>,
    /// Where the post was captured from.
    pub post_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_record_defaults_missing_fields() {
        let json = r#"{"id": 3, "name_arabic": "محمد", "number_of_images": 2}"#;
        let record: PersonRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.name_arabic, "محمد");
        assert_eq!(record.number_of_images, 2);
        assert_eq!(record.year, None);
        assert!(record.image_urls.is_empty());
    }

    #[test]
    fn test_person_record_serialization_keeps_field_names() {
        let record = PersonRecord {
            id: 7,
            name_arabic: "محمد".to_string(),
            year: Some(2015),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"name_arabic\":\"محمد\""));
        assert!(json.contains("\"year\":2015"));
        assert!(json.contains("\"image_ref_extra\":[]"));
    }

    #[test]
    fn test_dataset_len() {
        let dataset = Dataset::new(vec![PersonRecord::default(), PersonRecord::default()]);
        assert_eq!(dataset.len(), 2);
        assert!(!dataset.is_empty());
        assert!(Dataset::default().is_empty());
    }
}
