//! HTTP page fetcher with a shared admission limiter and charset detection
//!
//! Every page retrieval in a run goes through one [`PageFetcher`]:
//! - one global semaphore bounds in-flight fetches across all sources
//! - a per-host semaphore keeps a single slow site from taking every slot
//! - an optional governor quota caps requests per second
//! - bodies are read as bytes and decoded with a three-tier fallback
//!
//! Permits are RAII guards held until the body has been read, so they are
//! released on every exit path including timeouts and errors.

use crate::config::CrawlerConfig;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::utils::site_host;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT},
    Client,
};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Pool of realistic User-Agent strings used when none is configured
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Page fetcher shared by every task of a run
pub struct PageFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Global admission limiter
    limiter: Arc<Semaphore>,

    /// Lazily created per-site limiters, keyed like [`site_host`]
    host_limits: Mutex<HashMap<String, Arc<Semaphore>>>,

    limit_per_host: usize,

    /// Optional requests-per-second quota
    rate_limiter: Option<DirectLimiter>,

    /// Fixed user agent, or `None` to rotate through the pool
    user_agent: Option<String>,

    /// Policy for [`PageFetcher::fetch_with_retry`]
    retry: RetryConfig,
}

impl PageFetcher {
    /// Create a fetcher with its own global limiter sized from the config
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` if the HTTP client cannot be created
    pub fn new(config: &CrawlerConfig) -> Result<Self, FetchError> {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));
        Self::with_limiter(config, limiter)
    }

    /// Create a fetcher around an existing global limiter
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` if the HTTP client cannot be created
    pub fn with_limiter(
        config: &CrawlerConfig,
        limiter: Arc<Semaphore>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate_limiter = NonZeroU32::new(config.rate_limit)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        let user_agent = Some(config.user_agent.trim())
            .filter(|ua| !ua.is_empty())
            .map(str::to_string);

        Ok(Self {
            client,
            limiter,
            host_limits: Mutex::new(HashMap::new()),
            limit_per_host: config.limit_per_host.max(1),
            rate_limiter,
            user_agent,
            retry: RetryConfig::new(config.max_retries),
        })
    }

    /// Replace the retry policy used by [`PageFetcher::fetch_with_retry`]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch a page and return its decoded text
    ///
    /// Fails fast: exactly one request is made.
    ///
    /// # Errors
    ///
    /// - `FetchError::InvalidUrl` for unparsable or non-HTTP(S) URLs
    /// - `FetchError::Timeout` when the per-request timeout expires
    /// - `FetchError::HttpStatus` for any status >= 400
    /// - `FetchError::Network` for transport failures
    /// - `FetchError::Decode` when the response is not a text document
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        let host = site_host(&parsed).ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;

        // Host slot first so a waiter for a busy host does not hold a global slot
        let _host_permit = self
            .host_limiter(&host)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::LimiterClosed)?;

        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.until_ready().await;
        }

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FetchError::LimiterClosed)?;

        tracing::debug!(url = %url, "Fetching URL");

        let response = self
            .client
            .get(parsed)
            .headers(self.build_headers())
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if status.as_u16() >= 400 {
            tracing::debug!(url = %url, status = status.as_u16(), "HTTP error status");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !is_textual(ct) {
                return Err(FetchError::Decode(format!("unsupported content type {ct}")));
            }
        }

        let bytes = response.bytes().await.map_err(FetchError::from_transport)?;
        let charset = content_type.as_deref().and_then(charset_from_content_type);

        Ok(decode_body(&bytes, charset))
    }

    /// [`PageFetcher::fetch`] wrapped in the configured bounded retry
    ///
    /// Only transient failures (timeouts, transport errors, 429, 5xx) are
    /// retried. With `max_retries = 0` this behaves exactly like `fetch`.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        with_retry_if(&self.retry, || self.fetch(url), FetchError::is_transient).await
    }

    /// Limiter shared by every URL of one site (`www.` prefix ignored)
    fn host_limiter(&self, host: &str) -> Arc<Semaphore> {
        let mut limits = self
            .host_limits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            limits
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.limit_per_host))),
        )
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let user_agent = match &self.user_agent {
            Some(ua) => HeaderValue::from_str(ua)
                .unwrap_or_else(|_| HeaderValue::from_static(random_user_agent())),
            None => HeaderValue::from_static(random_user_agent()),
        };
        headers.insert(USER_AGENT, user_agent);

        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("es-AR,es;q=0.9,en;q=0.8"),
        );

        headers
    }
}

/// Get a random user agent from the pool
fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
}

/// Whether a Content-Type names something we can treat as a document
fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime.is_empty()
        || mime.starts_with("text/")
        || mime.contains("html")
        || mime.contains("xml")
        || mime.contains("json")
}

/// `charset` parameter of a Content-Type header value
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|v| !v.is_empty())
    })
}

/// Decode a response body
///
/// 1. A byte order mark wins outright.
/// 2. Statistical detection over the raw bytes, decoded strictly.
/// 3. The charset declared by the transport, decoded with replacement.
/// 4. UTF-8 with replacement.
pub fn decode_body(bytes: &[u8], declared: Option<&str>) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed = detector.guess(None, true);
    if let Some(text) = guessed.decode_without_bom_handling_and_without_replacement(bytes) {
        return text.into_owned();
    }

    if let Some(encoding) = declared.and_then(|label| Encoding::for_label(label.as_bytes())) {
        tracing::debug!(
            detected = guessed.name(),
            declared = encoding.name(),
            "Detected charset failed, using declared charset"
        );
        let (text, _) = encoding.decode_without_bom_handling(bytes);
        return text.into_owned();
    }

    String::from_utf8_lossy(bytes).into_owned()
}
