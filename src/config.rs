//! Run settings, loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! Command-line flags override whatever is loaded here.
//!
//! ```yaml
//! http:
//!   user_agent: "Mozilla/5.0"
//!   max_retries: 3
//! scrape:
//!   pages: 10
//!   naming: translating
//!   translation_email: someone@example.com
//! album:
//!   post_delay_secs: 5
//! ```

use crate::error::ConfigError;
use crate::fetch::RetryPolicy;
use crate::scrapers::album::{DEFAULT_CAPTION_SELECTOR, DEFAULT_CDN_PREFIX};
use crate::translate::{NamingStrategy, MYMEMORY_ENDPOINT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub scrape: ScrapeSettings,
    pub album: AlbumSettings,
}

/// Connection pool and retry behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Retries of a connection failure before giving up.
    pub max_retries: usize,
    pub backoff_factor: u32,
    pub base_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("mafqud_scrape/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 60,
            max_retries: 3,
            backoff_factor: 5,
            base_delay_ms: 1000,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_factor: self.backoff_factor,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

/// Missing-persons site crawl.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub site_url: String,
    pub language: String,
    pub per_page: u32,
    pub pages: u32,
    pub record_delay_secs: u64,
    pub page_delay_secs: u64,
    pub naming: NamingStrategy,
    pub translation_endpoint: String,
    /// Raises the translation service's daily quota when set.
    pub translation_email: Option<String>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            site_url: "https://atfalmafkoda.com".to_string(),
            language: "ar".to_string(),
            per_page: 18,
            pages: 90,
            record_delay_secs: 20,
            page_delay_secs: 100,
            naming: NamingStrategy::Mapping,
            translation_endpoint: MYMEMORY_ENDPOINT.to_string(),
            translation_email: None,
        }
    }
}

/// Captured photo-album posts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlbumSettings {
    pub caption_selector: String,
    pub cdn_prefix: String,
    pub post_delay_secs: u64,
}

impl Default for AlbumSettings {
    fn default() -> Self {
        Self {
            caption_selector: DEFAULT_CAPTION_SELECTOR.to_string(),
            cdn_prefix: DEFAULT_CDN_PREFIX.to_string(),
            post_delay_secs: 0,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // serde_yaml reads an empty document as null, not an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.scrape.site_url, "https://atfalmafkoda.com");
        assert_eq!(s.scrape.per_page, 18);
        assert_eq!(s.scrape.pages, 90);
        assert_eq!(s.scrape.record_delay_secs, 20);
        assert_eq!(s.scrape.page_delay_secs, 100);
        assert_eq!(s.scrape.naming, NamingStrategy::Mapping);
        let policy = s.http.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff_factor, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = "scrape:\n  pages: 4\n  naming: translating\nhttp:\n  max_retries: 1\n";
        let s = Settings::from_yaml(yaml).unwrap();
        assert_eq!(s.scrape.pages, 4);
        assert_eq!(s.scrape.naming, NamingStrategy::Translating);
        assert_eq!(s.scrape.per_page, 18);
        assert_eq!(s.http.max_retries, 1);
        assert_eq!(s.http.backoff_factor, 5);
        assert_eq!(s.album, AlbumSettings::default());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }

    #[test]
    fn test_load_reports_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "scrape: [not, a, map]").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(ConfigError::Yaml { .. })
        ));
        assert!(matches!(
            Settings::load(Some(&dir.path().join("missing.yaml"))),
            Err(ConfigError::Io { .. })
        ));
    }
}
