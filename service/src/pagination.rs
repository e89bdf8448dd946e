//! Pagination follower: walks `next` links until the server stops
//! advertising one.

use camara_model::Page;
use tracing::debug;

use crate::camara::{FetchError, FetchOutcome, PageFetcher};

/// Fetch `first_url` and every page reachable through its `next` links.
///
/// Returns `Ok(None)` when the first page is absent (404). Pages come back in
/// server order and each URL is requested once per successful page.
///
/// # Errors
///
/// Propagates fatal [`FetchError`]s from the requester. A 404 on a page
/// reached through a `next` link is [`FetchError::NotFound`], since the
/// sequence is already known to exist. Following more than `max_pages`
/// pages is [`FetchError::PageLimit`].
pub async fn paginate(
    fetcher: &dyn PageFetcher,
    first_url: &str,
    max_pages: Option<usize>,
) -> Result<Option<Vec<Page>>, FetchError> {
    let mut pages: Vec<Page> = Vec::new();
    let mut url = first_url.to_string();

    loop {
        if let Some(limit) = max_pages {
            if pages.len() >= limit {
                return Err(FetchError::PageLimit { url, limit });
            }
        }

        let page = match fetcher.fetch(&url).await? {
            FetchOutcome::Page(page) => page,
            FetchOutcome::NotFound if pages.is_empty() => return Ok(None),
            FetchOutcome::NotFound => return Err(FetchError::NotFound { url }),
        };

        debug!(
            url = %url,
            page = pages.len() + 1,
            records = page.len(),
            has_next = page.next.is_some(),
            "Fetched page"
        );

        let next = page.next.clone();
        pages.push(page);

        match next {
            Some(next) => url = next,
            None => return Ok(Some(pages)),
        }
    }
}
