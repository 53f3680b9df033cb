//! Photo-album ingestion from captured post pages.
//!
//! The album lives behind a login, so posts are captured by an external
//! browser session and saved as `.html` files. This module reads those
//! files, recovers the name, government and photo link of each post, and
//! downloads the photo.
//!
//! # Output Structure
//!
//! ```text
//! images_root/
//! ├── Mhmd_Ali_Hsn/
//! │   └── Mhmd_Ali_Hsn.jpg
//! └── Mhmd_Ali_Hsn0/          # same safe name seen twice
//!     └── Mhmd_Ali_Hsn0.jpg
//! ```

use crate::error::{DownloadError, ExtractionError};
use crate::fetch::Fetch;
use crate::mapping::{find_album_government, government_english, transliterate};
use crate::models::AlbumPost;
use crate::outputs::images::save_image;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Caption `<span>` of a post, as rendered when the album was captured.
pub const DEFAULT_CAPTION_SELECTOR: &str = "span[class='d2edcug0 hpfvmrgz qv66sw1b c1et5uql lr9zc1uh a8c37x1j keod5gw0 nxhoafnm aigsh9s9 d3f4x2em fe6kdd0r mau55g9w c8b282yb iv3no6db gfeo3gy3 a3bd9o3v b1v8xokw oo9gr5id']";

/// Host prefix of the full-size photo among the many images of a post.
pub const DEFAULT_CDN_PREFIX: &str = "https://scontent.fcai21";

/// Characters that cannot appear in a directory name.
const UNSAFE_FRAGMENTS: [&str; 8] = [".", ":", "?", "*", "/", "\\", "<", ">"];

static OG_URL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:url"]"#).expect("valid og:url selector"));
static IMAGES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("valid image selector"));

/// A post page saved to disk.
#[derive(Debug, Clone)]
pub struct CapturedPost {
    pub source: PathBuf,
    pub html: String,
}

/// How to read captured posts.
#[derive(Debug, Clone)]
pub struct AlbumOptions {
    pub caption: Selector,
    pub cdn_prefix: String,
    /// Pause after each photo download.
    pub post_delay: Duration,
}

/// Read every `*.html` file in `dir`, in file-name order.
pub fn load_posts(dir: &Path) -> io::Result<Vec<CapturedPost>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "html"))
        .collect();
    paths.sort();

    let mut posts = Vec::with_capacity(paths.len());
    for source in paths {
        let html = std::fs::read_to_string(&source)?;
        posts.push(CapturedPost { source, html });
    }
    info!(count = posts.len(), dir = %dir.display(), "Loaded captured posts");
    Ok(posts)
}

/// Recover one album post from its captured HTML.
///
/// The caption's text up to its first inner tag is the Arabic name. The
/// government is the first album spelling found anywhere in the caption.
/// `fallback_link` is used when the page carries no `og:url`.
pub fn parse_post(
    html: &str,
    fallback_link: &str,
    opts: &AlbumOptions,
) -> Result<AlbumPost, ExtractionError> {
    let doc = Html::parse_document(html);

    let caption = doc
        .select(&opts.caption)
        .next()
        .ok_or_else(|| ExtractionError::MissingElement {
            url: fallback_link.to_string(),
            what: "post caption",
        })?
        .inner_html();
    let name_arabic = caption.split('<').next().unwrap_or_default().trim().to_string();

    let government_arabic = find_album_government(&caption);
    let government_english = match government_english(government_arabic) {
        Some(english) => english.to_string(),
        None => {
            debug!(government = %government_arabic, "No English spelling; keeping Arabic");
            government_arabic.to_string()
        }
    };

    let image_url = doc
        .select(&IMAGES)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| src.starts_with(&opts.cdn_prefix))
        .map(str::to_string);

    let post_link = doc
        .select(&OG_URL)
        .filter_map(|meta| meta.value().attr("content"))
        .next()
        .unwrap_or(fallback_link)
        .to_string();

    Ok(AlbumPost {
        name_english: transliterate(&name_arabic),
        name_arabic,
        name_dir: String::new(),
        government_arabic: government_arabic.to_string(),
        government_english,
        image_url,
        post_link,
    })
}

/// Turn English names into directory names.
///
/// Unsafe characters are stripped and the first three (or two) words are
/// joined with `_`. A single-word name gets a running counter, starting at 1,
/// shared by the whole list.
///
/// # Examples
///
/// ```ignore
/// let names = vec!["Mhmd Ali Hsn Ahmd".into(), "Sarh Ali".into(), "Mhmd".into(), "Ali".into()];
/// assert_eq!(safe_dir_names(&names), ["Mhmd_Ali_Hsn", "Sarh_Ali", "Mhmd1", "Ali2"]);
/// ```
pub fn safe_dir_names(names: &[String]) -> Vec<String> {
    let mut counter = 1;
    names
        .iter()
        .map(|name| {
            let cleaned = UNSAFE_FRAGMENTS
                .iter()
                .fold(name.clone(), |acc, fragment| acc.replace(fragment, ""));
            let words: Vec<&str> = cleaned.split(' ').collect();
            match words.as_slice() {
                [a, b, c, ..] => format!("{a}_{b}_{c}"),
                [a, b] => format!("{a}_{b}"),
                _ => {
                    let single = format!("{cleaned}{counter}");
                    counter += 1;
                    single
                }
            }
        })
        .collect()
}

/// Create `root/<name>`, or `root/<name>N` with the first free N from 0.
async fn claim_dir(root: &Path, name: &str) -> io::Result<String> {
    let mut candidate = name.to_string();
    let mut suffix = 0;
    loop {
        match tokio::fs::create_dir(root.join(&candidate)).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate = format!("{name}{suffix}");
                suffix += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Parse captured posts and download each one's photo into `images_root`.
///
/// Posts whose caption cannot be found are skipped. A post without a CDN
/// photo, whose directory cannot be created, or whose download fails, is
/// kept without a local image.
#[instrument(level = "info", skip_all, fields(posts = posts.len(), images_root = %images_root.display()))]
pub async fn ingest<F: Fetch>(
    fetcher: &F,
    posts: &[CapturedPost],
    images_root: &Path,
    opts: &AlbumOptions,
) -> Result<Vec<AlbumPost>, DownloadError> {
    tokio::fs::create_dir_all(images_root)
        .await
        .map_err(|source| DownloadError::Io {
            path: images_root.to_path_buf(),
            source,
        })?;

    let mut parsed: Vec<AlbumPost> = posts
        .iter()
        .filter_map(|post| {
            let fallback = post.source.display().to_string();
            match parse_post(&post.html, &fallback, opts) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(error = %e, "Skipping post");
                    None
                }
            }
        })
        .collect();

    let names: Vec<String> = parsed.iter().map(|p| p.name_english.clone()).collect();
    for (post, safe) in parsed.iter_mut().zip(safe_dir_names(&names)) {
        post.name_dir = safe;
    }

    let mut saved = 0;
    for post in &mut parsed {
        let Some(url) = post.image_url.clone() else {
            info!(name = %post.name_arabic, link = %post.post_link, "Post has no photo link");
            continue;
        };

        let claimed = match claim_dir(images_root, &post.name_dir).await {
            Ok(claimed) => claimed,
            Err(e) => {
                warn!(
                    name = %post.name_dir,
                    error = %e,
                    "Cannot create photo directory; skipping photo"
                );
                continue;
            }
        };
        let path = images_root.join(&claimed).join(format!("{claimed}.jpg"));
        post.name_dir = claimed;

        match save_image(fetcher, &url, &path).await {
            Ok(bytes) => {
                saved += 1;
                debug!(name = %post.name_dir, bytes, "Saved album photo");
            }
            Err(e) => warn!(name = %post.name_dir, error = %e, "Album photo download failed"),
        }

        if !opts.post_delay.is_zero() {
            sleep(opts.post_delay).await;
        }
    }

    info!(parsed = parsed.len(), saved, "Album ingestion finished");
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{MockFetch, Reply};

    fn options() -> AlbumOptions {
        AlbumOptions {
            caption: Selector::parse("span.caption").unwrap(),
            cdn_prefix: DEFAULT_CDN_PREFIX.to_string(),
            post_delay: Duration::ZERO,
        }
    }

    fn post_html(caption: &str, img: &str) -> String {
        format!(
            r#"<html><head><meta property="og:url" content="https://fb.example/p/1"></head>
            <body>
              <img src="https://static.example/emoji.png">
              <img src="{img}">
              <span class="caption">{caption}</span>
            </body></html>"#
        )
    }

    #[test]
    fn test_default_caption_selector_parses() {
        assert!(Selector::parse(DEFAULT_CAPTION_SELECTOR).is_ok());
    }

    #[test]
    fn test_parse_post_fields() {
        let html = post_html(
            "محمد علي حسن<br>من محافظة القاهرة",
            "https://scontent.fcai21-1.example/photo.jpg",
        );
        let post = parse_post(&html, "post.html", &options()).unwrap();

        assert_eq!(post.name_arabic, "محمد علي حسن");
        assert_eq!(post.name_english, "Mhmd Ali Hsn");
        assert_eq!(post.government_arabic, "القاهرة");
        assert_eq!(post.government_english, "Cairo");
        assert_eq!(
            post.image_url.as_deref(),
            Some("https://scontent.fcai21-1.example/photo.jpg")
        );
        assert_eq!(post.post_link, "https://fb.example/p/1");
    }

    #[test]
    fn test_parse_post_without_government_or_photo() {
        let html = post_html("سارة", "https://static.example/other.jpg");
        let post = parse_post(&html, "post.html", &options()).unwrap();

        assert_eq!(post.name_arabic, "سارة");
        assert_eq!(post.government_arabic, "مفقود");
        assert_eq!(post.government_english, "Null");
        assert_eq!(post.image_url, None);
    }

    #[test]
    fn test_parse_post_missing_caption() {
        let err = parse_post("<html><body></body></html>", "post.html", &options()).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::MissingElement { what: "post caption", .. }
        ));
    }

    #[test]
    fn test_safe_dir_names() {
        let names: Vec<String> = ["Mhmd Ali Hsn Ahmd", "Sarh Ali", "Mhmd", "A.l:i?"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            safe_dir_names(&names),
            vec!["Mhmd_Ali_Hsn", "Sarh_Ali", "Mhmd1", "Ali2"]
        );
    }

    #[test]
    fn test_load_posts_sorted_html_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.html"), "b").unwrap();
        std::fs::write(dir.path().join("a.html"), "a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let posts = load_posts(dir.path()).unwrap();
        let bodies: Vec<&str> = posts.iter().map(|p| p.html.as_str()).collect();
        assert_eq!(bodies, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_ingest_downloads_with_collision_suffix() {
        let photo = "https://scontent.fcai21-1.example/one.jpg";
        let posts = vec![
            CapturedPost {
                source: PathBuf::from("1.html"),
                html: post_html("محمد علي<br>الجيزة", photo),
            },
            CapturedPost {
                source: PathBuf::from("2.html"),
                html: post_html("محمد علي<br>الجيزة", photo),
            },
            CapturedPost {
                source: PathBuf::from("3.html"),
                html: post_html("علي", "https://static.example/x.jpg"),
            },
        ];
        let mock = MockFetch::new().on(photo, vec![Reply::Ok(200, b"jpeg".to_vec())]);
        let root = tempfile::tempdir().unwrap();

        let parsed = ingest(&mock, &posts, root.path(), &options()).await.unwrap();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].name_dir, "Mhmd_Ali");
        assert_eq!(parsed[1].name_dir, "Mhmd_Ali0");
        assert_eq!(parsed[2].name_dir, "Ali1");
        assert_eq!(
            std::fs::read(root.path().join("Mhmd_Ali").join("Mhmd_Ali.jpg")).unwrap(),
            b"jpeg"
        );
        assert!(root.path().join("Mhmd_Ali0").join("Mhmd_Ali0.jpg").is_file());
        assert!(!root.path().join("Ali1").exists());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_ingest_bad_directory_does_not_stop_batch() {
        let photo = "https://scontent.fcai21-1.example/one.jpg";
        let too_long = "م".repeat(300);
        let posts = vec![
            CapturedPost {
                source: PathBuf::from("1.html"),
                html: post_html(&too_long, photo),
            },
            CapturedPost {
                source: PathBuf::from("2.html"),
                html: post_html("سارة/علي", photo),
            },
            CapturedPost {
                source: PathBuf::from("3.html"),
                html: post_html("محمد علي", photo),
            },
        ];
        let mock = MockFetch::new().on(photo, vec![Reply::Ok(200, b"jpeg".to_vec())]);
        let root = tempfile::tempdir().unwrap();

        let parsed = ingest(&mock, &posts, root.path(), &options()).await.unwrap();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].name_dir, "SarhAli2");
        assert!(root.path().join("SarhAli2").join("SarhAli2.jpg").is_file());
        assert!(root.path().join("Mhmd_Ali").join("Mhmd_Ali.jpg").is_file());
        // The over-long name never got a directory or a request.
        assert!(!root.path().join(&parsed[0].name_dir).exists());
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_safe_dir_names_strip_single_slash() {
        let names = vec!["Sarh/Ali".to_string(), "A\\b Mhmd".to_string()];
        assert_eq!(safe_dir_names(&names), vec!["SarhAli1", "Ab_Mhmd"]);
    }
}
