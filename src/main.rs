//! # mafqud_scrape
//!
//! Collects missing-person records from atfalmafkoda.com (and, secondarily,
//! from captured photo-album posts) into a JSON dataset plus a per-person
//! image tree, then cleans and partitions that tree for face-recognition
//! training.
//!
//! ## Usage
//!
//! ```sh
//! mafqud_scrape scrape -s ./data --pages 90
//! mafqud_scrape clean -j ./data/missing_people.json -i ./Data/images \
//!     --source-images ./data/images -o ./Data/missing_people_final.json \
//!     --remove-counts 0 --drop-duplicates --before-year 2010
//! mafqud_scrape split --source ./Data/images --dest ./Data --test-ratio 0.2
//! ```
//!
//! ## Architecture
//!
//! 1. **Scrape**: for each listing page, extract every record, name it,
//!    download its photos, append the page to the dataset, then cool down
//! 2. **Clean**: filter the dataset and image tree in lockstep, renumber ids,
//!    check that both still agree
//! 3. **Split**: copy each person's photos into `train/` and `test/`

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use scraper::Selector;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};
use url::Url;

mod cleaner;
mod cli;
mod config;
mod error;
mod fetch;
mod mapping;
mod models;
mod outputs;
mod partition;
mod scrapers;
mod translate;
mod utils;

use cleaner::CleanPlan;
use cli::{AlbumArgs, CleanArgs, Cli, Command, ScrapeArgs, SplitArgs};
use config::Settings;
use error::DatasetError;
use fetch::{HttpFetcher, RetryFetch};
use outputs::json;
use partition::SplitRule;
use scrapers::album::{self, AlbumOptions};
use scrapers::atfal::{self, PageOptions};
use translate::{MyMemoryTranslator, NamingStrategy};
use utils::ensure_writable_dir;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("mafqud_scrape starting up");

    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");
    let settings = Settings::load(args.config.as_deref())?;

    let result = match args.command {
        Command::Scrape(a) => run_scrape(a, settings).await,
        Command::Album(a) => run_album(a, settings).await,
        Command::Clean(a) => run_clean(a).await,
        Command::Split(a) => run_split(a),
    };

    match &result {
        Ok(()) => info!(
            elapsed_secs = start_time.elapsed().as_secs(),
            "mafqud_scrape finished"
        ),
        Err(e) => error!(error = %e, "mafqud_scrape failed"),
    }
    result
}

/// Point at a dataset file that cannot be read back as a record array.
fn flag_corrupt(e: &DatasetError) {
    if e.is_corrupt() {
        error!(error = %e, "Dataset file is unreadable; fix or move it before rerunning");
    }
}

fn build_fetcher(settings: &Settings) -> Result<RetryFetch<HttpFetcher>, Box<dyn Error>> {
    let http = HttpFetcher::new(&settings.http.user_agent, settings.http.timeout())?;
    Ok(RetryFetch::new(http, settings.http.retry_policy()))
}

#[instrument(level = "info", skip_all, fields(save_dir = %args.save_dir.display()))]
async fn run_scrape(args: ScrapeArgs, mut settings: Settings) -> Result<(), Box<dyn Error>> {
    let scrape = &mut settings.scrape;
    if let Some(pages) = args.pages {
        scrape.pages = pages;
    }
    if let Some(naming) = args.naming {
        scrape.naming = naming;
    }
    if let Some(secs) = args.record_delay {
        scrape.record_delay_secs = secs;
    }
    if let Some(secs) = args.page_delay {
        scrape.page_delay_secs = secs;
    }
    if args.translation_email.is_some() {
        scrape.translation_email = args.translation_email.clone();
    }

    if let Err(e) = ensure_writable_dir(&args.save_dir).await {
        error!(
            path = %args.save_dir.display(),
            error = %e,
            "Save directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    let images_root = args.save_dir.join("images");
    let json_path = args.save_dir.join(&args.json_name);

    let fetcher = build_fetcher(&settings)?;
    let scrape = &settings.scrape;
    let translator = match scrape.naming {
        NamingStrategy::Translating => Some(MyMemoryTranslator::new(
            &fetcher,
            scrape.translation_endpoint.clone(),
            scrape.translation_email.clone(),
        )),
        NamingStrategy::Mapping => None,
    };
    let opts = PageOptions {
        site: Url::parse(&scrape.site_url)?,
        naming: scrape.naming,
        record_delay: Duration::from_secs(scrape.record_delay_secs),
    };
    let page_delay = Duration::from_secs(scrape.page_delay_secs);

    let last_page = args.start_page + scrape.pages.saturating_sub(1);
    info!(
        first = args.start_page,
        last = last_page,
        naming = ?scrape.naming,
        "Scraping listing pages"
    );

    for page in args.start_page..=last_page {
        let url = atfal::listing_url(&opts.site, &scrape.language, page, scrape.per_page);
        let scraped =
            atfal::scrape_page(&fetcher, translator.as_ref(), &opts, &url, &images_root).await?;

        if scraped.listed == 0 {
            info!(page, "Listing has no entries; stopping");
            break;
        }
        if scraped.records.is_empty() {
            warn!(page, listed = scraped.listed, "No usable records on page");
        } else {
            let total = json::append_records(&scraped.records, &json_path)
                .await
                .inspect_err(flag_corrupt)?;
            info!(page, added = scraped.records.len(), total, "Saved page");
        }

        if page < last_page && !page_delay.is_zero() {
            debug!(secs = page_delay.as_secs(), "Cooling down between pages");
            tokio::time::sleep(page_delay).await;
        }
    }
    Ok(())
}

#[instrument(level = "info", skip_all, fields(posts = %args.posts.display()))]
async fn run_album(args: AlbumArgs, settings: Settings) -> Result<(), Box<dyn Error>> {
    let caption = Selector::parse(&settings.album.caption_selector)
        .map_err(|e| format!("invalid caption selector: {e:?}"))?;
    let opts = AlbumOptions {
        caption,
        cdn_prefix: settings.album.cdn_prefix.clone(),
        post_delay: Duration::from_secs(args.post_delay.unwrap_or(settings.album.post_delay_secs)),
    };

    let posts = album::load_posts(&args.posts)?;
    let fetcher = build_fetcher(&settings)?;
    let parsed = album::ingest(&fetcher, &posts, &args.images, &opts).await?;
    let total = json::append_records(&parsed, &args.json)
        .await
        .inspect_err(flag_corrupt)?;
    info!(added = parsed.len(), total, "Saved album posts");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(json = %args.json.display()))]
async fn run_clean(args: CleanArgs) -> Result<(), Box<dyn Error>> {
    if let Some(source) = &args.source_images {
        cleaner::prepare_working_tree(source, &args.images)?;
    }

    let mut dataset = json::load_dataset(&args.json)
        .await
        .inspect_err(flag_corrupt)?;
    if dataset.is_empty() {
        warn!("Dataset has no records; exporting an empty array");
    }
    let plan = CleanPlan {
        remove_counts: args.remove_counts,
        drop_duplicates: args.drop_duplicates,
        before_year: args.before_year,
    };
    let report = cleaner::run(&mut dataset, &plan, &args.images)?;
    json::save_dataset(&dataset, &args.output).await?;
    info!(
        removed_by_count = report.removed_by_count,
        duplicates = report.duplicates_removed,
        removed_before_year = report.removed_before_year,
        remaining = report.remaining,
        output = %args.output.display(),
        "Exported cleaned dataset"
    );

    if args.rename_to_id {
        cleaner::rename_dirs_to_ids(&dataset, &args.images)?;
    }
    Ok(())
}

#[instrument(level = "info", skip_all, fields(source = %args.source.display()))]
fn run_split(args: SplitArgs) -> Result<(), Box<dyn Error>> {
    let rule = match (args.test_ratio, args.shots) {
        (Some(ratio), None) => SplitRule::Ratio(ratio),
        (None, Some(k)) => SplitRule::Shots(k),
        _ => return Err("exactly one of --test-ratio or --shots is required".into()),
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let report = partition::split(&args.source, &args.dest, rule, &mut rng)?;
    info!(
        train = %args.dest.join("train").display(),
        test = %args.dest.join("test").display(),
        people = report.people,
        "Split finished"
    );
    Ok(())
}
