//! Arabic name to English: offline transliteration or delegated translation.
//!
//! Two strategies are interchangeable:
//! - [`NamingStrategy::Mapping`]: the deterministic letter table in
//!   [`crate::mapping`]; never touches the network.
//! - [`NamingStrategy::Translating`]: the MyMemory public translation API.
//!   The free tier has a daily quota, so every failure falls back to the
//!   letter table and the failure is returned next to the name.

use crate::error::TranslationError;
use crate::fetch::Fetch;
use crate::mapping::transliterate;
use crate::utils::truncate_for_log;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Public MyMemory endpoint.
pub const MYMEMORY_ENDPOINT: &str = "https://api.mymemory.translated.net/get";

/// How English names are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    #[default]
    Mapping,
    Translating,
}

/// Trait for a text translation service.
pub trait Translate {
    async fn translate(&self, text: &str, from: &str, to: &str)
    -> Result<String, TranslationError>;
}

/// Where an English name came from.
#[derive(Debug)]
pub enum NameSource {
    Mapped,
    Translated,
    /// Translation was attempted, failed, and the letter table was used.
    Fallback(TranslationError),
}

/// An English name together with how it was produced.
#[derive(Debug)]
pub struct EnglishName {
    pub text: String,
    pub source: NameSource,
}

/// Derive the English form of `name_arabic` with the chosen strategy.
#[instrument(level = "debug", skip(translator))]
pub async fn english_name<T: Translate>(
    name_arabic: &str,
    strategy: NamingStrategy,
    translator: Option<&T>,
) -> EnglishName {
    let translator = match (strategy, translator) {
        (NamingStrategy::Translating, Some(t)) => t,
        _ => {
            return EnglishName {
                text: transliterate(name_arabic),
                source: NameSource::Mapped,
            };
        }
    };

    match translator.translate(name_arabic, "ar", "en").await {
        Ok(text) => EnglishName {
            text,
            source: NameSource::Translated,
        },
        Err(e) => {
            warn!(error = %e, name = %name_arabic, "Translation failed; using letter mapping");
            EnglishName {
                text: transliterate(name_arabic),
                source: NameSource::Fallback(e),
            }
        }
    }
}

/// Client for the MyMemory translation API, over any [`Fetch`].
#[derive(Debug)]
pub struct MyMemoryTranslator<'a, F> {
    fetcher: &'a F,
    endpoint: String,
    /// Registered address; raises the daily quota.
    email: Option<String>,
}

impl<'a, F: Fetch> MyMemoryTranslator<'a, F> {
    pub fn new(fetcher: &'a F, endpoint: impl Into<String>, email: Option<String>) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
            email,
        }
    }

    fn request_url(&self, text: &str, from: &str, to: &str) -> String {
        let mut url = format!(
            "{}?q={}&langpair={}",
            self.endpoint,
            urlencoding::encode(text),
            urlencoding::encode(&format!("{from}|{to}"))
        );
        if let Some(email) = &self.email {
            url.push_str("&de=");
            url.push_str(&urlencoding::encode(email));
        }
        url
    }
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: MyMemoryData,
    #[serde(rename = "responseStatus", default)]
    response_status: serde_json::Value,
    #[serde(rename = "responseDetails", default)]
    response_details: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText", default)]
    translated_text: Option<String>,
}

/// Interpret a MyMemory JSON body.
///
/// The service reports quota exhaustion either with status 429 or with a
/// `MYMEMORY WARNING` text in place of the translation.
fn parse_response(body: &str) -> Result<String, TranslationError> {
    let parsed: MyMemoryResponse = serde_json::from_str(body)
        .map_err(|e| TranslationError::Failed(format!("unreadable response: {e}")))?;

    let status = match &parsed.response_status {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .unwrap_or(200);
    let details = match &parsed.response_details {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if status == 429 {
        return Err(TranslationError::Throttled(details));
    }
    if status != 200 {
        return Err(TranslationError::Failed(format!("status {status}: {details}")));
    }

    let text = parsed
        .response_data
        .translated_text
        .unwrap_or_default()
        .trim()
        .to_string();
    if text.to_uppercase().starts_with("MYMEMORY WARNING") {
        return Err(TranslationError::Throttled(text));
    }
    if text.is_empty() {
        return Err(TranslationError::Failed("empty translation".to_string()));
    }
    Ok(text)
}

impl<F: Fetch> Translate for MyMemoryTranslator<'_, F> {
    async fn translate(
        &self,
        text: &str,
        from: &str,
        to: &str,
    ) -> Result<String, TranslationError> {
        let url = self.request_url(text, from, to);
        let fetched = self.fetcher.fetch(&url, false).await?;
        let status = fetched.status;
        let body = fetched.text().await?;
        debug!(status, bytes = body.len(), "Translation response");
        if status == 429 {
            return Err(TranslationError::Throttled(format!("HTTP {status}")));
        }
        if !(200..300).contains(&status) {
            return Err(TranslationError::Failed(format!("HTTP {status}")));
        }
        parse_response(&body).inspect_err(|e| {
            debug!(error = %e, body = %truncate_for_log(&body, 300), "Unusable translation response");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{MockFetch, Reply};

    struct FixedTranslator(Result<&'static str, &'static str>);

    impl Translate for FixedTranslator {
        async fn translate(
            &self,
            _text: &str,
            _from: &str,
            _to: &str,
        ) -> Result<String, TranslationError> {
            match self.0 {
                Ok(s) => Ok(s.to_string()),
                Err(s) => Err(TranslationError::Throttled(s.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_mapping_strategy_ignores_translator() {
        let t = FixedTranslator(Ok("Mohamed"));
        let name = english_name("محمد", NamingStrategy::Mapping, Some(&t)).await;
        assert_eq!(name.text, "Mhmd");
        assert!(matches!(name.source, NameSource::Mapped));
    }

    #[tokio::test]
    async fn test_translating_strategy_uses_translator() {
        let t = FixedTranslator(Ok("Mohamed"));
        let name = english_name("محمد", NamingStrategy::Translating, Some(&t)).await;
        assert_eq!(name.text, "Mohamed");
        assert!(matches!(name.source, NameSource::Translated));
    }

    #[tokio::test]
    async fn test_translation_failure_falls_back_to_mapping() {
        let t = FixedTranslator(Err("quota"));
        let name = english_name("محمد", NamingStrategy::Translating, Some(&t)).await;
        assert_eq!(name.text, "Mhmd");
        assert!(matches!(
            name.source,
            NameSource::Fallback(TranslationError::Throttled(_))
        ));
    }

    #[tokio::test]
    async fn test_translating_without_translator_maps() {
        let name = english_name::<FixedTranslator>("علي", NamingStrategy::Translating, None).await;
        assert_eq!(name.text, "Ali");
        assert!(matches!(name.source, NameSource::Mapped));
    }

    #[test]
    fn test_parse_response_ok() {
        let body = r#"{"responseData":{"translatedText":"Mohamed Ali","match":1},"responseStatus":200,"responseDetails":""}"#;
        assert_eq!(parse_response(body).unwrap(), "Mohamed Ali");
    }

    #[test]
    fn test_parse_response_quota_warning() {
        let body = r#"{"responseData":{"translatedText":"MYMEMORY WARNING: YOU USED ALL AVAILABLE FREE TRANSLATIONS FOR TODAY."},"responseStatus":"429","responseDetails":"quota"}"#;
        assert!(matches!(
            parse_response(body),
            Err(TranslationError::Throttled(_))
        ));
        let body = r#"{"responseData":{"translatedText":"MYMEMORY WARNING: YOU USED ALL"},"responseStatus":200}"#;
        assert!(matches!(
            parse_response(body),
            Err(TranslationError::Throttled(_))
        ));
    }

    #[test]
    fn test_parse_response_garbage() {
        assert!(matches!(
            parse_response("<html>"),
            Err(TranslationError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_mymemory_request_roundtrip() {
        let mock = MockFetch::new();
        let translator = MyMemoryTranslator::new(&mock, "https://mt.example/get", None);
        let url = translator.request_url("محمد", "ar", "en");
        assert!(url.starts_with("https://mt.example/get?q=%D9%85"));
        assert!(url.ends_with("&langpair=ar%7Cen"));

        let mock = MockFetch::new().ok_text(
            &url,
            r#"{"responseData":{"translatedText":"Mohamed"},"responseStatus":200}"#,
        );
        let translator = MyMemoryTranslator::new(&mock, "https://mt.example/get", None);
        assert_eq!(
            translator.translate("محمد", "ar", "en").await.unwrap(),
            "Mohamed"
        );
    }

    #[tokio::test]
    async fn test_mymemory_http_429_is_throttled() {
        let blank = MockFetch::new();
        let url = MyMemoryTranslator::new(&blank, "https://mt.example/get", None)
            .request_url("علي", "ar", "en");
        let mock = MockFetch::new().on(&url, vec![Reply::Ok(429, Vec::new())]);
        let translator = MyMemoryTranslator::new(&mock, "https://mt.example/get", None);
        assert!(matches!(
            translator.translate("علي", "ar", "en").await,
            Err(TranslationError::Throttled(_))
        ));
    }
}
