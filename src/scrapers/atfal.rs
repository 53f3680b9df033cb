//! Missing-persons site scraper.
//!
//! The site publishes a paginated "seen him" listing. Each listing page holds
//! buttons carrying the record id (`data-id`) and a relative detail link
//! (`data-url`); each detail page holds the name, a "date of loss" block and
//! the subject's photos.
//!
//! # URL Pattern
//!
//! ```text
//! {site}/{language}/seen-him?page={n}&per-page={per_page}
//! ```

use crate::error::{ExtractionError, TransportError};
use crate::fetch::Fetch;
use crate::mapping::find_government;
use crate::models::{ListingEntry, PersonRecord};
use crate::outputs::images::download_images;
use crate::translate::{english_name, NameSource, NamingStrategy, Translate};
use crate::utils::{clean_text, parse_year};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

static LISTING_BUTTON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r##"button.btn.ebtn-4.ebtn-sm.p-1[data-target="#modal_persons_missing"]"##)
        .expect("valid listing selector")
});
static PERSON_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2.person_name").expect("valid name selector"));
static DATE_LOSS_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.date_loss").expect("valid date-of-loss selector"));
static DATE_LOSS_FIELDS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h4.date_loss").expect("valid date-of-loss field selector"));
static PERSON_IMAGES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img.img-fluid").expect("valid image selector"));

/// Per-run options for [`scrape_page`].
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub site: Url,
    pub naming: NamingStrategy,
    /// Pause after each record, to stay polite with the site.
    pub record_delay: Duration,
}

/// Build the listing URL for a 1-based page number.
pub fn listing_url(site: &Url, language: &str, page: u32, per_page: u32) -> String {
    format!(
        "{}/{}/seen-him?page={}&per-page={}",
        site.as_str().trim_end_matches('/'),
        language,
        page,
        per_page
    )
}

/// Parse a listing page into detail links, in document order.
///
/// Buttons with a missing or non-numeric id, or a missing link, are skipped.
pub fn parse_listing(html: &str, site: &Url) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();
    for button in document.select(&LISTING_BUTTON) {
        let element = button.value();
        let (Some(raw_id), Some(href)) = (element.attr("data-id"), element.attr("data-url")) else {
            debug!("Listing button without data-id/data-url");
            continue;
        };
        let Ok(id) = raw_id.trim().parse::<u64>() else {
            warn!(raw_id, "Listing button with non-numeric id");
            continue;
        };
        match site.join(href.trim()) {
            Ok(detail) => entries.push(ListingEntry {
                id,
                detail_url: detail.to_string(),
            }),
            Err(e) => warn!(href, error = %e, "Unresolvable detail link"),
        }
    }
    entries
}

/// Fetch a listing page and return its entries.
///
/// A page past the end of the listing yields no entries. A transport
/// failure here is fatal for the run.
#[instrument(level = "info", skip(fetcher, site))]
pub async fn extract_listing<F: Fetch>(
    fetcher: &F,
    page_url: &str,
    site: &Url,
) -> Result<Vec<ListingEntry>, TransportError> {
    let fetched = fetcher.fetch(page_url, false).await?;
    if !fetched.is_success() {
        warn!(status = fetched.status, "Listing page returned an error status");
    }
    let html = fetched.text().await?;
    let entries = parse_listing(&html, site);
    info!(count = entries.len(), "Indexed listing page");
    Ok(entries)
}

/// Extract the record fields from a detail page.
///
/// `name_english` is left empty; the caller fills it with the configured
/// [`NamingStrategy`].
pub fn parse_record(
    html: &str,
    entry: &ListingEntry,
    site: &Url,
) -> Result<PersonRecord, ExtractionError> {
    let document = Html::parse_document(html);
    let missing = |what| ExtractionError::MissingElement {
        url: entry.detail_url.clone(),
        what,
    };

    let name_arabic = document
        .select(&PERSON_NAME)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| missing("person name"))?;

    let loss_text = document
        .select(&DATE_LOSS_BLOCK)
        .next()
        .map(|e| e.text().collect::<String>())
        .ok_or_else(|| missing("date-of-loss block"))?;
    let (government_arabic, government_english) = find_government(&loss_text);

    let fields: Vec<String> = document
        .select(&DATE_LOSS_FIELDS)
        .map(|e| clean_text(&e.text().collect::<String>()))
        .collect();
    let [missing_date, current_age, ..] = fields.as_slice() else {
        return Err(missing("missing date and current age"));
    };

    let image_urls = document
        .select(&PERSON_IMAGES)
        .filter(|img| img.value().attr("alt").map(str::trim) == Some(name_arabic.as_str()))
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| site.join(src.trim()).ok())
        .map(|u| u.to_string())
        .collect::<Vec<_>>();

    Ok(PersonRecord {
        id: entry.id,
        url: entry.detail_url.clone(),
        name_arabic,
        name_english: String::new(),
        government_arabic: government_arabic.to_string(),
        government_english: government_english.to_string(),
        year: parse_year(missing_date),
        missing_date: missing_date.clone(),
        current_age: current_age.clone(),
        image_urls,
        ..Default::default()
    })
}

/// Fetch and parse one detail page.
#[instrument(level = "info", skip(fetcher, entry, site), fields(id = entry.id, url = %entry.detail_url))]
pub async fn extract_record<F: Fetch>(
    fetcher: &F,
    entry: &ListingEntry,
    site: &Url,
) -> Result<PersonRecord, ExtractionError> {
    let html = fetcher.fetch(&entry.detail_url, false).await?.text().await?;
    parse_record(&html, entry, site)
}

/// One scraped listing page.
#[derive(Debug, Default)]
pub struct ScrapedPage {
    /// Entries found on the listing. Zero means the listing has ended.
    pub listed: usize,
    pub records: Vec<PersonRecord>,
}

/// Extract, name and download one record. `None` when the detail page is unusable.
async fn scrape_record<F: Fetch, T: Translate>(
    fetcher: &F,
    translator: Option<&T>,
    opts: &PageOptions,
    entry: &ListingEntry,
    images_root: &Path,
) -> Option<PersonRecord> {
    let mut record = match extract_record(fetcher, entry, &opts.site).await {
        Ok(record) => record,
        Err(e) => {
            error!(error = %e, id = entry.id, "Record extraction failed; skipping");
            return None;
        }
    };

    let name = english_name(&record.name_arabic, opts.naming, translator).await;
    if let NameSource::Fallback(e) = &name.source {
        debug!(error = %e, "Used letter mapping after translation failure");
    }
    record.name_english = name.text;
    info!(
        id = record.id,
        name_english = %record.name_english,
        name_arabic = %record.name_arabic,
        "Extracted record"
    );

    if let Err(e) = download_images(fetcher, &mut record, images_root).await {
        warn!(
            id = record.id,
            written = record.number_of_images,
            error = %e,
            "Image download stopped early"
        );
    }
    Some(record)
}

/// Scrape one listing page: index it, extract every record, name it and
/// download its photos into `images_root`.
///
/// Records are handled one after another, with `record_delay` after each
/// detail page whether or not it could be used. A broken detail page is
/// logged and skipped; a failed listing fetch aborts with an error. A record
/// whose download stopped part-way is kept with the files that were written.
#[instrument(level = "info", skip(fetcher, translator, opts, images_root))]
pub async fn scrape_page<F: Fetch, T: Translate>(
    fetcher: &F,
    translator: Option<&T>,
    opts: &PageOptions,
    page_url: &str,
    images_root: &Path,
) -> Result<ScrapedPage, TransportError> {
    let entries = extract_listing(fetcher, page_url, &opts.site).await?;
    let listed = entries.len();

    let records: Vec<PersonRecord> = stream::iter(entries)
        .then(|entry| async move {
            let record = scrape_record(fetcher, translator, opts, &entry, images_root).await;
            if !opts.record_delay.is_zero() {
                sleep(opts.record_delay).await;
            }
            record
        })
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(listed, count = records.len(), "Scraped page records");
    Ok(ScrapedPage { listed, records })
}
