//! Câmara dos Deputados API fetch layer.
//!
//! # Architecture
//!
//! - [`PageFetcher`] - Trait for "give me the page at this URL"
//! - [`HttpPageFetcher`] - reqwest implementation with rate-limit and
//!   transient-failure handling
//! - [`RequestGate`] - Single shared "not before" instant plus optional quota
//! - [`Endpoints`] - URL construction for each resource
//! - [`mock::MockPageFetcher`] - Scripted fetcher for unit tests (behind `test-utils` feature)
//!
//! # Testing Patterns
//!
//! Crawler logic is tested against `MockPageFetcher`, which answers from
//! per-URL queues and records every call. `HttpPageFetcher` itself is tested
//! against `wiremock` stubs in `tests/requester_tests.rs`.

mod client;
mod endpoints;
mod gate;
mod link;

pub use client::{FetchError, FetchOutcome, HttpPageFetcher, PageFetcher};
pub use endpoints::Endpoints;
pub use gate::RequestGate;
pub use link::next_link;

#[cfg(any(test, feature = "test-utils"))]
pub use client::mock;
