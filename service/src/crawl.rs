//! Hierarchical crawler: organizations, then their members, then each
//! member's records.
//!
//! The base query (date range, legislatures, sort direction) is built once.
//! Each level takes its own copy and sets its sort field on it, so nothing a
//! level does is visible to its siblings.
//!
//! Failures below the organization listing are isolated: a member listing
//! or record listing that is absent, exhausts its retries or (under
//! [`MalformedPolicy::Abort`]) fails to decode leaves that branch empty,
//! is recorded in the [`CrawlReport`] and the crawl moves on.

use camara_model::{
    decode, flatten, CrawlTree, DecodeError, Entity, EntityKind, Member, MemberId, Organization,
    QueryParams, Record, Row, TreeError,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::camara::{Endpoints, FetchError, HttpPageFetcher, PageFetcher};
use crate::config::{Config, CrawlConfig, MalformedPolicy};
use crate::pagination::paginate;
use crate::report::CrawlReport;

/// Errors that stop the whole crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("no organization codes to crawl")]
    NoOrganizations,

    #[error("failed to list organizations: {0}")]
    Organizations(#[source] FetchError),

    #[error("malformed organization listing: {0}")]
    Malformed(#[source] DecodeError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// The crawl result and its accounting.
#[derive(Debug)]
pub struct CrawlOutput {
    pub tree: CrawlTree,
    pub report: CrawlReport,
}

impl CrawlOutput {
    /// Flattened, deduplicated rows in crawl order.
    #[must_use]
    pub fn rows(&self) -> Vec<Row<'_>> {
        flatten(&self.tree)
    }
}

/// Why a branch ended without entities.
#[derive(Debug, Error)]
enum BranchFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Malformed(#[from] DecodeError),
}

/// Entities of one listing plus what it cost.
#[derive(Debug)]
struct Listing<T> {
    entities: Vec<T>,
    pages: usize,
    malformed_pages: usize,
    dropped_records: usize,
}

impl<T> Listing<T> {
    fn absorb_into(&self, report: &mut CrawlReport) {
        report.pages_fetched += self.pages;
        report.malformed_pages += self.malformed_pages;
        report.dropped_records += self.dropped_records;
    }
}

pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    endpoints: Endpoints,
    config: CrawlConfig,
}

impl Crawler {
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, endpoints: Endpoints, config: CrawlConfig) -> Self {
        Self {
            fetcher,
            endpoints,
            config,
        }
    }

    /// Build a crawler that talks to the API described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher = HttpPageFetcher::new(&config.api, config.retry.clone())?;
        let endpoints = Endpoints::new(&config.api.base_url)?;
        Ok(Self::new(
            Arc::new(fetcher),
            endpoints,
            config.crawl.clone(),
        ))
    }

    /// Query parameters every level inherits.
    fn base_params(&self) -> QueryParams {
        QueryParams::new()
            .date_range(self.config.start_date, self.config.end_date)
            .legislatures(&self.config.legislatures)
            .order(self.config.order)
    }

    /// Run the crawl.
    ///
    /// # Errors
    ///
    /// Fails before any request when no organization codes are configured,
    /// and when the organization listing itself cannot be fetched. Every
    /// other failure is isolated to its branch and recorded in the report.
    pub async fn crawl(&self) -> Result<CrawlOutput, CrawlError> {
        if self.config.parties.is_empty() {
            return Err(CrawlError::NoOrganizations);
        }

        let mut report = CrawlReport::new();
        let mut tree = CrawlTree::new();

        let base = self.base_params();
        let organization_params = base
            .with_sort_field(self.config.organization_sort.as_deref())
            .organization_codes(&self.config.parties);
        let member_params = base.with_sort_field(self.config.member_sort.as_deref());
        let record_params = base.with_sort_field(self.config.record_sort.as_deref());

        info!(
            run_id = %report.run_id,
            parties = ?self.config.parties,
            concurrency = self.config.concurrency,
            "Starting crawl"
        );

        let url = self.endpoints.organizations(&organization_params);
        let organizations = match self.list::<Organization>(&url).await {
            Ok(Some(listing)) => {
                listing.absorb_into(&mut report);
                listing.entities
            }
            Ok(None) => {
                warn!(url = %url, "Organization listing not found");
                report.absent_branches += 1;
                Vec::new()
            }
            Err(BranchFailure::Fetch(e)) => return Err(CrawlError::Organizations(e)),
            Err(BranchFailure::Malformed(e)) => return Err(CrawlError::Malformed(e)),
        };

        for organization in organizations
            .into_iter()
            .filter(|organization| self.is_requested(organization))
        {
            self.crawl_organization(
                organization,
                &member_params,
                &record_params,
                &mut tree,
                &mut report,
            )
            .await?;
        }

        report.organizations = tree.organizations().len();
        report.members = tree.member_count();
        report.records = tree.record_count();
        report.complete();

        info!(
            run_id = %report.run_id,
            organizations = report.organizations,
            members = report.members,
            records = report.records,
            pages = report.pages_fetched,
            malformed_pages = report.malformed_pages,
            dropped_records = report.dropped_records,
            absent_branches = report.absent_branches,
            failed_branches = report.failed_branches,
            inverted_intervals = report.inverted_intervals,
            "Crawl completed"
        );

        Ok(CrawlOutput { tree, report })
    }

    /// The server filters by `sigla` too, but matching again here keeps
    /// the tree limited to the requested codes whatever the server returns.
    fn is_requested(&self, organization: &Organization) -> bool {
        self.config
            .parties
            .iter()
            .any(|code| code.eq_ignore_ascii_case(&organization.code))
    }

    async fn crawl_organization(
        &self,
        organization: Organization,
        member_params: &QueryParams,
        record_params: &QueryParams,
        tree: &mut CrawlTree,
        report: &mut CrawlReport,
    ) -> Result<(), CrawlError> {
        let organization_id = organization.id;
        let code = organization.code.clone();
        let node = tree.add_organization(organization);

        let url = self
            .endpoints
            .organization_members(organization_id, member_params);
        let members = match self.list::<Member>(&url).await {
            Ok(Some(listing)) => {
                listing.absorb_into(report);
                listing.entities
            }
            Ok(None) => {
                warn!(organization_id, url = %url, "Member listing not found");
                report.absent_branches += 1;
                return Ok(());
            }
            Err(e) => {
                warn!(organization_id, error = %e, "Member listing failed");
                report.add_error(EntityKind::Organization, organization_id, e);
                return Ok(());
            }
        };

        info!(organization_id, code = %code, members = members.len(), "Listed members");

        let mut jobs: Vec<(MemberId, i64)> = Vec::with_capacity(members.len());
        for member in members {
            if !member.organization_code.eq_ignore_ascii_case(&code) {
                debug!(
                    member_id = member.id,
                    member_code = %member.organization_code,
                    code = %code,
                    "Member listed under a different organization code"
                );
            }
            let api_id = member.id;
            jobs.push((tree.add_member(node, member)?, api_id));
        }

        let mut results: Vec<_> = stream::iter(jobs)
            .map(|(member, api_id)| async move {
                let url = self.endpoints.member_records(api_id, record_params);
                (member, api_id, self.list::<Record>(&url).await)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        // Completion order depends on the network; tree order must not.
        results.sort_by_key(|(member, _, _)| *member);

        for (member, api_id, result) in results {
            match result {
                Ok(Some(listing)) => {
                    listing.absorb_into(report);
                    let inverted = listing
                        .entities
                        .iter()
                        .filter(|record| !record.has_consistent_interval())
                        .count();
                    if inverted > 0 {
                        warn!(member_id = api_id, inverted, "Records end before they start");
                        report.inverted_intervals += inverted;
                    }
                    debug!(member_id = api_id, records = listing.entities.len(), "Listed records");
                    tree.add_records(member, listing.entities)?;
                }
                Ok(None) => {
                    debug!(member_id = api_id, "Record listing not found");
                    report.absent_branches += 1;
                }
                Err(e) => {
                    warn!(member_id = api_id, error = %e, "Record listing failed");
                    report.add_error(EntityKind::Member, api_id, e);
                }
            }
        }

        Ok(())
    }

    /// Paginate `url` and decode every page as `T`, applying the malformed
    /// page policy.
    async fn list<T: Entity + Send>(
        &self,
        url: &str,
    ) -> Result<Option<Listing<T>>, BranchFailure> {
        let Some(pages) = paginate(self.fetcher.as_ref(), url, self.config.max_pages).await? else {
            return Ok(None);
        };

        let mut listing = Listing {
            entities: Vec::new(),
            pages: pages.len(),
            malformed_pages: 0,
            dropped_records: 0,
        };

        for page in &pages {
            match decode::<T>(page) {
                Ok(entities) => listing.entities.extend(entities),
                Err(e) => match self.config.malformed_pages {
                    MalformedPolicy::Skip => {
                        warn!(
                            url = %url,
                            kind = %T::KIND,
                            dropped = page.len(),
                            error = %e,
                            "Skipping malformed page"
                        );
                        listing.malformed_pages += 1;
                        listing.dropped_records += page.len();
                    }
                    MalformedPolicy::Abort => return Err(e.into()),
                },
            }
        }

        Ok(Some(listing))
    }
}
