//! HTTP retrieval with bounded retry and exponential backoff.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the scrapers never see `reqwest`
//! directly:
//! - [`Fetch`]: Core trait, `fetch(url, stream) -> Fetched`
//! - [`HttpFetcher`]: `reqwest` implementation holding the connection pool
//! - [`RetryFetch`]: Decorator that retries connection failures
//!
//! # Retry Strategy
//!
//! Only connection-establishment failures ([`TransportError::Connect`]) are
//! retried. An HTTP error status is an ordinary response and is returned to
//! the caller untouched. The delay before retry `n` (1-based) is
//!
//! ```text
//! delay = base_delay * 2^(n-1) * backoff_factor
//! ```
//!
//! bounded only by the number of retries, never by elapsed time.

use crate::error::TransportError;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// A response body, either fully read or still on the wire.
pub enum Body {
    Buffered(Vec<u8>),
    Streamed(BoxStream<'static, Result<Vec<u8>, TransportError>>),
}

/// The result of one GET request.
pub struct Fetched {
    pub url: String,
    pub status: u16,
    body: Body,
}

impl fmt::Debug for Fetched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            Body::Buffered(bytes) => format!("{} bytes", bytes.len()),
            Body::Streamed(_) => "stream".to_string(),
        };
        f.debug_struct("Fetched")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("body", &body)
            .finish()
    }
}

impl Fetched {
    pub fn buffered(url: impl Into<String>, status: u16, bytes: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status,
            body: Body::Buffered(bytes),
        }
    }

    pub fn streamed(
        url: impl Into<String>,
        status: u16,
        chunks: BoxStream<'static, Result<Vec<u8>, TransportError>>,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            body: Body::Streamed(chunks),
        }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> Result<Vec<u8>, TransportError> {
        match self.body {
            Body::Buffered(bytes) => Ok(bytes),
            Body::Streamed(chunks) => {
                let parts: Vec<Vec<u8>> = chunks.try_collect().await?;
                Ok(parts.concat())
            }
        }
    }

    /// Read the whole body as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// The body as a chunk stream; a buffered body yields a single chunk.
    pub fn into_chunks(self) -> BoxStream<'static, Result<Vec<u8>, TransportError>> {
        match self.body {
            Body::Buffered(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Body::Streamed(chunks) => chunks,
        }
    }
}

/// Trait for issuing GET requests.
///
/// With `stream = true` the body is left on the wire and consumed chunk by
/// chunk, which is how images are downloaded.
pub trait Fetch {
    async fn fetch(&self, url: &str, stream: bool) -> Result<Fetched, TransportError>;
}

/// `reqwest`-backed fetcher. One instance owns one connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

fn classify(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str, stream: bool) -> Result<Fetched, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;
        let status = response.status().as_u16();
        debug!(status, "Response received");

        if stream {
            let owned_url = url.to_string();
            let chunks = response
                .bytes_stream()
                .map(move |chunk| {
                    chunk.map(|b| b.to_vec()).map_err(|e| TransportError::Body {
                        url: owned_url.clone(),
                        reason: e.to_string(),
                    })
                })
                .boxed();
            Ok(Fetched::streamed(url, status, chunks))
        } else {
            let bytes = response.bytes().await.map_err(|e| TransportError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            Ok(Fetched::buffered(url, status, bytes.to_vec()))
        }
    }
}

/// Retry limits for [`RetryFetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    pub backoff_factor: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << exp)
            .saturating_mul(self.backoff_factor)
    }
}

/// Wrapper that retries connection failures of any [`Fetch`] implementation.
pub struct RetryFetch<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str, stream: bool) -> Result<Fetched, TransportError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url, stream).await {
                Ok(fetched) => return Ok(fetched),
                Err(e @ TransportError::Connect { .. }) => {
                    attempt += 1;
                    if attempt > self.policy.max_retries {
                        error!(
                            attempt,
                            max = self.policy.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }
                    let delay = self.policy.backoff_delay(attempt);
                    warn!(
                        attempt,
                        max = self.policy.max_retries,
                        ?delay,
                        error = %e,
                        "connection failed; backing off"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`Fetch`] double shared by the scraper and downloader tests.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// A canned reply for one URL.
    #[derive(Clone)]
    pub enum Reply {
        Ok(u16, Vec<u8>),
        /// Body chunks, then a body error after them.
        Truncated(Vec<Vec<u8>>),
        Connect,
        Request,
    }

    #[derive(Default)]
    pub struct MockFetch {
        replies: Mutex<HashMap<String, VecDeque<Reply>>>,
        pub calls: Mutex<Vec<(String, bool)>>,
    }

    impl MockFetch {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue replies for a URL. The last one repeats.
        pub fn on(self, url: &str, replies: Vec<Reply>) -> Self {
            self.replies
                .lock()
                .unwrap()
                .insert(url.to_string(), replies.into());
            self
        }

        pub fn ok_text(self, url: &str, body: &str) -> Self {
            self.on(url, vec![Reply::Ok(200, body.as_bytes().to_vec())])
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Fetch for MockFetch {
        async fn fetch(&self, url: &str, stream: bool) -> Result<Fetched, TransportError> {
            self.calls.lock().unwrap().push((url.to_string(), stream));
            let reply = {
                let mut map = self.replies.lock().unwrap();
                match map.get_mut(url) {
                    Some(queue) if queue.len() > 1 => queue.pop_front(),
                    Some(queue) => queue.front().cloned(),
                    None => None,
                }
            };
            match reply {
                Some(Reply::Ok(status, body)) if stream => {
                    let chunks: Vec<Result<Vec<u8>, TransportError>> =
                        body.chunks(4).map(|c| Ok(c.to_vec())).collect();
                    Ok(Fetched::streamed(url, status, stream::iter(chunks).boxed()))
                }
                Some(Reply::Ok(status, body)) => Ok(Fetched::buffered(url, status, body)),
                Some(Reply::Truncated(parts)) => {
                    let owned = url.to_string();
                    let mut chunks: Vec<Result<Vec<u8>, TransportError>> =
                        parts.into_iter().map(Ok).collect();
                    chunks.push(Err(TransportError::Body {
                        url: owned,
                        reason: "connection reset".to_string(),
                    }));
                    Ok(Fetched::streamed(url, 200, stream::iter(chunks).boxed()))
                }
                Some(Reply::Connect) => Err(TransportError::Connect {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
                Some(Reply::Request) | None => Err(TransportError::Request {
                    url: url.to_string(),
                    reason: "no reply configured".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MockFetch, Reply};
    use super::*;

    fn instant_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_factor: 5,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_backoff_delay_grows_geometrically() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_retry_recovers_after_connect_failures() {
        let url = "https://example.com/a";
        let mock = MockFetch::new().on(
            url,
            vec![
                Reply::Connect,
                Reply::Connect,
                Reply::Ok(200, b"hello".to_vec()),
            ],
        );
        let fetcher = RetryFetch::new(mock, instant_policy(3));
        let fetched = fetcher.fetch(url, false).await.unwrap();
        assert_eq!(fetched.text().await.unwrap(), "hello");
        assert_eq!(fetcher.inner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let url = "https://example.com/down";
        let mock = MockFetch::new().on(url, vec![Reply::Connect]);
        let fetcher = RetryFetch::new(mock, instant_policy(3));
        let err = fetcher.fetch(url, false).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        // First attempt plus three retries.
        assert_eq!(fetcher.inner.call_count(), 4);
    }

    #[tokio::test]
    async fn test_non_connect_errors_are_not_retried() {
        let url = "https://example.com/slow";
        let mock = MockFetch::new().on(url, vec![Reply::Request]);
        let fetcher = RetryFetch::new(mock, instant_policy(3));
        assert!(fetcher.fetch(url, false).await.is_err());
        assert_eq!(fetcher.inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_http_error_status_is_a_response() {
        let url = "https://example.com/missing";
        let mock = MockFetch::new().on(url, vec![Reply::Ok(404, b"nope".to_vec())]);
        let fetcher = RetryFetch::new(mock, instant_policy(3));
        let fetched = fetcher.fetch(url, false).await.unwrap();
        assert_eq!(fetched.status, 404);
        assert!(!fetched.is_success());
        assert_eq!(fetcher.inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_streamed_body_collects() {
        let url = "https://example.com/img.jpg";
        let mock = MockFetch::new().on(url, vec![Reply::Ok(200, b"0123456789".to_vec())]);
        let fetched = mock.fetch(url, true).await.unwrap();
        assert_eq!(fetched.bytes().await.unwrap(), b"0123456789");
    }
}
