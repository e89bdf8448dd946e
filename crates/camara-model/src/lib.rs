//! Data model for the Câmara dos Deputados open-data API.
//!
//! This crate is I/O free. It holds:
//!
//! - the typed entities decoded from listing pages ([`Organization`],
//!   [`Member`], [`Record`] and its nested [`Phase`]),
//! - the detail documents returned by single-entity endpoints,
//! - [`Page`] and the entity decoder ([`decode`]),
//! - [`QueryParams`], the copy-on-branch filter set passed down a crawl,
//! - [`CrawlTree`], the arena holding a finished crawl, and the table
//!   flattener that turns it into deduplicated [`Row`]s.

mod details;
mod entity;
mod page;
mod query;
mod table;
mod timestamp;

pub use details::{
    LastStatus, MemberDetails, Office, OrganizationDetails, OrganizationLeader, OrganizationStatus,
};
pub use entity::{Entity, EntityKind, Member, Organization, Phase, Record};
pub use page::{decode, decode_one, DecodeError, MalformedBody, Page};
pub use query::{ParamValue, QueryParams, SortOrder};
pub use table::{flatten, CrawlTree, MemberId, OrganizationId, Row, TreeError, COLUMNS};
pub use timestamp::format_timestamp;
