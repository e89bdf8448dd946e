//! Backoff-aware requester for the Câmara open-data API.
//!
//! One call to [`PageFetcher::fetch`] keeps trying until it has something
//! final to say about the URL:
//!
//! - 2xx: the decoded [`Page`], with its `next` link if any
//! - 429: wait exactly `retry-after` seconds and try again, without limit
//! - 404: [`FetchOutcome::NotFound`], without waiting
//! - other 4xx: [`FetchError::Status`]
//! - 5xx, transport errors and timeouts: capped exponential backoff, then
//!   [`FetchError::RetriesExhausted`]
//!
//! # Example
//!
//! ```ignore
//! use camara_crawler::camara::{HttpPageFetcher, PageFetcher};
//!
//! let fetcher = HttpPageFetcher::new(&config.api, config.retry.clone())?;
//! let outcome = fetcher.fetch("https://dadosabertos.camara.leg.br/api/v2/partidos").await?;
//! ```

use async_trait::async_trait;
use camara_model::Page;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::gate::RequestGate;
use super::link::next_link;
use crate::config::{ApiConfig, RetryConfig};

/// Final answer for one URL.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Page(Page),
    NotFound,
}

/// Errors that end a fetch. Transient failures never surface here until
/// their retry budget is spent.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Non-retryable client error (4xx other than 404 and 429)
    #[error("API error for {url}: {status} - {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// 2xx response whose body is not a `{"dados": ...}` document
    #[error("malformed body from {url}: {reason}")]
    Body { url: String, reason: String },

    /// 404 on a page reached through a `next` link
    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("stopped after {limit} pages, next would be {url}")]
    PageLimit { url: String, limit: usize },
}

/// Anything that can turn a URL into a page.
///
/// [`HttpPageFetcher`] talks to the real API; tests can script responses
/// with [`mock::MockPageFetcher`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError>;
}

/// HTTP implementation of [`PageFetcher`].
///
/// Holds one `reqwest::Client` so every request of a crawl reuses the same
/// connection pool and default headers.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    gate: Arc<RequestGate>,
    retry: RetryConfig,
    fallback_retry_after: Duration,
}

impl HttpPageFetcher {
    /// Build a fetcher from configuration, with its own request gate.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(api: &ApiConfig, retry: RetryConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(api.timeout())
            .build()?;

        Ok(Self::with_client(
            client,
            Arc::new(RequestGate::from_config(api)),
            retry,
            api.fallback_retry_after(),
        ))
    }

    /// Build a fetcher around an existing client and gate (for sharing a
    /// gate between fetchers, or custom client settings in tests).
    #[must_use]
    pub const fn with_client(
        client: reqwest::Client,
        gate: Arc<RequestGate>,
        retry: RetryConfig,
        fallback_retry_after: Duration,
    ) -> Self {
        Self {
            client,
            gate,
            retry,
            fallback_retry_after,
        }
    }

    #[must_use]
    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    /// Parse a body that arrived in full. Anything wrong here is the
    /// server's payload, not the transport, so it is not retried.
    fn parse_page(url: &Url, next: Option<String>, body: &[u8]) -> Result<Page, FetchError> {
        let body: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Page::from_body(body, next).map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Whole seconds from a `retry-after` header. HTTP-date values are not
/// used by this API and fall back to the configured delay.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut failures: u32 = 0;

        loop {
            self.gate.ready().await;
            debug!(url = %parsed, "Requesting page");

            let failure = match self.client.get(parsed.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let wait =
                            retry_after(response.headers()).unwrap_or(self.fallback_retry_after);
                        warn!(
                            url = %parsed,
                            retry_after_secs = wait.as_secs(),
                            "Rate limited, waiting before retry"
                        );
                        self.gate.defer(wait);
                        continue;
                    }

                    if status == StatusCode::NOT_FOUND {
                        debug!(url = %parsed, "Resource not found");
                        return Ok(FetchOutcome::NotFound);
                    }

                    if status.is_client_error() {
                        let message = response.text().await.unwrap_or_default();
                        return Err(FetchError::Status {
                            url: parsed.to_string(),
                            status: status.as_u16(),
                            message,
                        });
                    }

                    if status.is_success() {
                        let next = next_link(response.headers(), &parsed);
                        // A body cut short by a timeout or reset is transient.
                        match response.bytes().await {
                            Ok(body) => {
                                return Self::parse_page(&parsed, next, &body)
                                    .map(FetchOutcome::Page);
                            }
                            Err(e) => format!("failed reading body: {e}"),
                        }
                    } else {
                        format!("server responded {status}")
                    }
                }
                Err(e) => e.to_string(),
            };

            failures += 1;
            if failures > self.retry.max_retries {
                return Err(FetchError::RetriesExhausted {
                    url: parsed.to_string(),
                    attempts: failures,
                    last_error: failure,
                });
            }

            let delay = self.retry.backoff(failures);
            warn!(
                url = %parsed,
                attempt = failures,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "Transient failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::missing_const_for_fn,
    clippy::must_use_candidate
)]
pub mod mock {
    //! Scripted [`PageFetcher`] for crawler tests that don't need HTTP.

    use super::{FetchError, FetchOutcome, PageFetcher};
    use async_trait::async_trait;
    use camara_model::Page;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Responses are queued per URL and consumed in order. A URL with
    /// nothing queued answers `NotFound`.
    pub struct MockPageFetcher {
        responses: Mutex<HashMap<String, VecDeque<Result<FetchOutcome, FetchError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockPageFetcher {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Queue a raw outcome for `url`.
        pub fn push(&self, url: impl Into<String>, outcome: Result<FetchOutcome, FetchError>) {
            self.responses
                .lock()
                .unwrap()
                .entry(url.into())
                .or_default()
                .push_back(outcome);
        }

        /// Queue a page of `records` for `url`, linking to `next`.
        pub fn push_page(
            &self,
            url: impl Into<String>,
            records: Vec<serde_json::Value>,
            next: Option<&str>,
        ) {
            self.push(
                url,
                Ok(FetchOutcome::Page(Page {
                    records,
                    next: next.map(String::from),
                })),
            );
        }

        /// Every URL passed to `fetch`, in call order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Default for MockPageFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl PageFetcher for MockPageFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());

            self.responses
                .lock()
                .unwrap()
                .get_mut(url)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Ok(FetchOutcome::NotFound))
        }
    }
}
