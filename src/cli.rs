//! Command-line interface definitions for mafqud_scrape.
//!
//! This module defines the subcommands and their options using the `clap`
//! crate. Options left unset fall back to the settings file given with
//! `--config`, then to built-in defaults.

use crate::translate::NamingStrategy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for mafqud_scrape.
///
/// # Examples
///
/// ```sh
/// # Scrape the first five listing pages
/// mafqud_scrape scrape -s ./data --pages 5
///
/// # Clean a copy of the raw images, dropping ghosts and duplicates
/// mafqud_scrape clean -j ./data/missing_people.json -i ./Data/images \
///     --source-images ./data/images --remove-counts 0 --drop-duplicates \
///     -o ./Data/missing_people_final.json
///
/// # One-shot split with a fixed seed
/// mafqud_scrape split --source ./Data/images --dest ./Data --shots 1 --seed 42
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "MAFQUD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl the missing-persons site into a JSON dataset and image tree
    Scrape(ScrapeArgs),
    /// Ingest captured photo-album post pages
    Album(AlbumArgs),
    /// Filter the dataset and its image tree in lockstep
    Clean(CleanArgs),
    /// Partition the cleaned image tree into train and test sets
    Split(SplitArgs),
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Directory receiving the JSON dataset and the `images/` tree
    #[arg(short, long)]
    pub save_dir: PathBuf,

    /// Dataset file name inside the save directory
    #[arg(long, default_value = "missing_people.json")]
    pub json_name: String,

    /// Number of listing pages to crawl
    #[arg(short, long)]
    pub pages: Option<u32>,

    /// First listing page (1-based)
    #[arg(long, default_value_t = 1)]
    pub start_page: u32,

    /// How English names are derived
    #[arg(short, long, value_enum)]
    pub naming: Option<NamingStrategy>,

    /// Seconds to wait after each record
    #[arg(long)]
    pub record_delay: Option<u64>,

    /// Seconds to wait after each page
    #[arg(long)]
    pub page_delay: Option<u64>,

    /// Contact email sent to the translation service
    #[arg(long, env = "MYMEMORY_EMAIL")]
    pub translation_email: Option<String>,
}

#[derive(Args, Debug)]
pub struct AlbumArgs {
    /// Directory of captured post pages (`*.html`)
    #[arg(long)]
    pub posts: PathBuf,

    /// Directory receiving one sub-directory per post photo
    #[arg(short, long)]
    pub images: PathBuf,

    /// JSON file the posts are appended to
    #[arg(short, long)]
    pub json: PathBuf,

    /// Seconds to wait after each photo download
    #[arg(long)]
    pub post_delay: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Scraped dataset to clean
    #[arg(short, long)]
    pub json: PathBuf,

    /// Working image tree the cleaning passes operate on
    #[arg(short, long)]
    pub images: PathBuf,

    /// Where the cleaned dataset is written
    #[arg(short, long)]
    pub output: PathBuf,

    /// Copy this raw image tree to the working tree first
    #[arg(long)]
    pub source_images: Option<PathBuf>,

    /// Remove people with exactly this many images (comma separated, applied in order)
    #[arg(long, value_delimiter = ',')]
    pub remove_counts: Vec<usize>,

    /// Keep only the first person of each Arabic name
    #[arg(long)]
    pub drop_duplicates: bool,

    /// Remove people missing in or before this year
    #[arg(long)]
    pub before_year: Option<i32>,

    /// Rename person directories to their new ids after export
    #[arg(long)]
    pub rename_to_id: bool,
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Cleaned image tree, one directory per person
    #[arg(long)]
    pub source: PathBuf,

    /// Directory receiving `train/` and `test/`
    #[arg(long)]
    pub dest: PathBuf,

    /// Fraction of each person's images held out for testing
    #[arg(long, conflicts_with = "shots", required_unless_present = "shots")]
    pub test_ratio: Option<f64>,

    /// Fixed number of training images per person
    #[arg(long)]
    pub shots: Option<usize>,

    /// Seed for a reproducible shuffle
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_scrape_parsing() {
        let cli = Cli::parse_from([
            "mafqud_scrape",
            "scrape",
            "--save-dir",
            "./data",
            "--pages",
            "3",
            "--naming",
            "translating",
        ]);

        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.save_dir, PathBuf::from("./data"));
        assert_eq!(args.pages, Some(3));
        assert_eq!(args.start_page, 1);
        assert_eq!(args.naming, Some(NamingStrategy::Translating));
        assert_eq!(args.json_name, "missing_people.json");
        assert_eq!(args.record_delay, None);
    }

    #[test]
    fn test_clean_short_flags_and_counts() {
        let cli = Cli::parse_from([
            "mafqud_scrape",
            "-c",
            "settings.yaml",
            "clean",
            "-j",
            "in.json",
            "-i",
            "/tmp/images",
            "-o",
            "out.json",
            "--remove-counts",
            "0,1,2",
            "--drop-duplicates",
            "--before-year",
            "2010",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("settings.yaml")));
        let Command::Clean(args) = cli.command else {
            panic!("expected clean");
        };
        assert_eq!(args.remove_counts, vec![0, 1, 2]);
        assert!(args.drop_duplicates);
        assert_eq!(args.before_year, Some(2010));
        assert!(!args.rename_to_id);
        assert_eq!(args.source_images, None);
    }

    #[test]
    fn test_split_requires_exactly_one_rule() {
        let ok = Cli::try_parse_from([
            "mafqud_scrape", "split", "--source", "a", "--dest", "b", "--shots", "1", "--seed", "42",
        ]);
        assert!(ok.is_ok());

        let both = Cli::try_parse_from([
            "mafqud_scrape", "split", "--source", "a", "--dest", "b", "--shots", "1",
            "--test-ratio", "0.2",
        ]);
        assert!(both.is_err());

        let neither =
            Cli::try_parse_from(["mafqud_scrape", "split", "--source", "a", "--dest", "b"]);
        assert!(neither.is_err());
    }
}
