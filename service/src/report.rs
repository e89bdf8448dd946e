//! Crawl accounting: what was fetched, what was dropped and which branches
//! failed.

use camara_model::EntityKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_fetched: usize,
    pub organizations: usize,
    pub members: usize,
    pub records: usize,
    /// Pages whose records failed to decode.
    pub malformed_pages: usize,
    /// Records lost with those pages.
    pub dropped_records: usize,
    /// Branches whose first page answered 404.
    pub absent_branches: usize,
    /// Branches that ended in an error and were left empty.
    pub failed_branches: usize,
    /// Records kept despite ending before they start.
    pub inverted_intervals: usize,
    pub errors: Vec<BranchError>,
}

/// One branch that did not complete normally.
#[derive(Debug, Clone, Serialize)]
pub struct BranchError {
    pub level: EntityKind,
    pub entity_id: i64,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl CrawlReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            pages_fetched: 0,
            organizations: 0,
            members: 0,
            records: 0,
            malformed_pages: 0,
            dropped_records: 0,
            absent_branches: 0,
            failed_branches: 0,
            inverted_intervals: 0,
            errors: Vec::new(),
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Record a failed branch. `level` and `entity_id` name the entity whose
    /// children could not be listed: an organization for a failed member
    /// listing, a member for a failed record listing.
    pub fn add_error(&mut self, level: EntityKind, entity_id: i64, error: impl ToString) {
        self.failed_branches += 1;
        self.errors.push(BranchError {
            level,
            entity_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}

impl Default for CrawlReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_is_clean() {
        let report = CrawlReport::new();
        assert!(!report.has_errors());
        assert!(report.completed_at.is_none());
        assert_eq!(report.failed_branches, 0);
    }

    #[test]
    fn test_add_error_counts_failed_branch() {
        let mut report = CrawlReport::new();
        report.add_error(EntityKind::Member, 204_536, "giving up");
        report.complete();

        assert!(report.has_errors());
        assert_eq!(report.failed_branches, 1);
        assert_eq!(report.errors[0].entity_id, 204_536);
        assert!(report.completed_at.unwrap() >= report.started_at);
    }

    #[test]
    fn test_serializes_level_as_snake_case() {
        let mut report = CrawlReport::new();
        report.add_error(EntityKind::Member, 7, "boom");

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["errors"][0]["level"], "member");
        assert_eq!(value["failed_branches"], 1);
    }
}
