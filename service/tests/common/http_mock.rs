//! HTTP mock server helpers for testing outbound HTTP calls.
//!
//! This module provides a thin wrapper around `wiremock` for declarative
//! HTTP stubbing of the open-data API.
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::common::http_mock::MockHttpServer;
//!
//! #[tokio::test]
//! async fn test_listing() {
//!     let server = MockHttpServer::start().await;
//!
//!     server
//!         .expect_get("/partidos")
//!         .respond_with_json(json!({"dados": []}))
//!         .mount()
//!         .await;
//!
//!     // Point the fetcher at server.url()
//! }
//! ```
//!
//! # Patterns
//!
//! - **Success response**: `.respond_with_json(value)`
//! - **Error response**: `.respond_with_status(503)`
//! - **Throttling**: `.respond_with_status(429).with_response_header("retry-after", "2").times(1)`
//! - **Next page**: `.with_link_next(url)`
//! - **Timeout simulation**: `.respond_with_delay(Duration::from_secs(30))`
//! - **Request verification**: `.expect_times(1)` then `server.verify()`
//!
//! Stubs limited with `.times(n)` are matched before unlimited ones, so a
//! scripted failure followed by a success is two stubs on the same path.

use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub struct MockHttpServer {
    server: MockServer,
}

impl MockHttpServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the server, without trailing slash.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Absolute URL for `path_and_query` on this server.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.server.uri())
    }

    /// The underlying wiremock server, for matchers this wrapper lacks.
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    pub fn expect_get(&self, path: &str) -> StubBuilder<'_> {
        StubBuilder {
            server: &self.server,
            path: path.to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            response: ResponseTemplate::new(200),
            times: None,
            expected: None,
        }
    }

    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    pub async fn verify(&self) {
        self.server.verify().await;
    }
}

pub struct StubBuilder<'a> {
    server: &'a MockServer,
    path: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    response: ResponseTemplate,
    times: Option<u64>,
    expected: Option<u64>,
}

impl StubBuilder<'_> {
    /// Only match requests carrying this header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Only match requests carrying this query parameter.
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn respond_with_json(mut self, body: Value) -> Self {
        self.response = ResponseTemplate::new(200).set_body_json(body);
        self
    }

    pub fn respond_with_status(mut self, status: u16) -> Self {
        self.response = ResponseTemplate::new(status);
        self
    }

    /// Attach a JSON body to the current response.
    pub fn with_json_response(mut self, body: Value) -> Self {
        self.response = self.response.set_body_json(body);
        self
    }

    pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
        self.response = self.response.insert_header(name, value);
        self
    }

    /// Advertise `next` through the `Link` response header.
    pub fn with_link_next(self, next: &str) -> Self {
        let value = format!("<{next}>; rel=\"next\"");
        self.with_response_header("link", &value)
    }

    pub fn respond_with_delay(mut self, delay: Duration) -> Self {
        self.response = self.response.set_delay(delay);
        self
    }

    /// Serve this stub at most `n` times, then fall through to other stubs.
    pub fn times(mut self, n: u64) -> Self {
        self.times = Some(n);
        self
    }

    /// Assert on drop (or [`MockHttpServer::verify`]) that this stub was hit `n` times.
    pub fn expect_times(mut self, n: u64) -> Self {
        self.expected = Some(n);
        self
    }

    pub async fn mount(self) {
        let mut mock = Mock::given(method("GET")).and(path(self.path.as_str()));
        for (name, value) in &self.headers {
            mock = mock.and(header(name.as_str(), value.as_str()));
        }
        for (name, value) in &self.query {
            mock = mock.and(query_param(name.as_str(), value.as_str()));
        }

        let mut mock = mock.respond_with(self.response);
        if let Some(n) = self.times {
            mock = mock.up_to_n_times(n).with_priority(1);
        } else if !self.query.is_empty() {
            mock = mock.with_priority(2);
        }
        if let Some(n) = self.expected {
            mock = mock.expect(n);
        }

        mock.mount(self.server).await;
    }
}
