//! Single-entity detail lookups (`/partidos/{id}`, `/deputados/{id}`).

use camara_model::{decode_one, DecodeError, Entity, MemberDetails, OrganizationDetails};
use thiserror::Error;
use tracing::debug;

use crate::camara::{Endpoints, FetchError, FetchOutcome, PageFetcher};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Details of one party. `None` when the id does not exist.
///
/// # Errors
///
/// Returns [`LookupError`] on a fatal fetch error or an undecodable document.
pub async fn fetch_organization_details(
    fetcher: &dyn PageFetcher,
    endpoints: &Endpoints,
    organization_id: i64,
) -> Result<Option<OrganizationDetails>, LookupError> {
    fetch_one(fetcher, &endpoints.organization(organization_id)).await
}

/// Details of one legislator. `None` when the id does not exist.
///
/// # Errors
///
/// Returns [`LookupError`] on a fatal fetch error or an undecodable document.
pub async fn fetch_member_details(
    fetcher: &dyn PageFetcher,
    endpoints: &Endpoints,
    member_id: i64,
) -> Result<Option<MemberDetails>, LookupError> {
    fetch_one(fetcher, &endpoints.member(member_id)).await
}

async fn fetch_one<T: Entity>(fetcher: &dyn PageFetcher, url: &str) -> Result<Option<T>, LookupError> {
    match fetcher.fetch(url).await? {
        FetchOutcome::Page(page) => Ok(decode_one(&page)?),
        FetchOutcome::NotFound => {
            debug!(url = %url, kind = %T::KIND, "Lookup found nothing");
            Ok(None)
        }
    }
}
