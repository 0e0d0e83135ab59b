//! Query Matching
//!
//! `QueryMatcher` filters a user's persisted pins in memory, mirroring the
//! abstract Store's `Select(predicate).Order(field).Limit(n)` with the
//! predicate expressed as a plain Rust function over [`PinRecord`].

use chrono::{DateTime, Utc};

use crate::db::{PinRecord, PinStatusValue};
use crate::pin::error::ApiError;
use crate::pin::wire::TextMatchingStrategy;

/// Maximum length of the `cid` query parameter's comma-separated list.
pub const MAX_CID_LIST: usize = 10;
/// Maximum length of the `status` query parameter's comma-separated list.
pub const MAX_STATUS_LIST: usize = 4;
/// Default page size when `limit` is not supplied.
pub const DEFAULT_LIMIT: i64 = 10;

/// A parsed and bounds-checked `GET /pins` query.
#[derive(Debug, Clone, Default)]
pub struct PinQuery {
    pub cid: Vec<String>,
    pub name: Option<String>,
    pub match_strategy: TextMatchingStrategy,
    pub status: Vec<PinStatusValue>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub limit: i64,
}

impl PinQuery {
    /// Validate the list-length bounds enforced at the HTTP boundary.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.cid.len() > MAX_CID_LIST {
            return Err(ApiError::bad_request(format!(
                "cid list exceeds maximum of {MAX_CID_LIST}"
            )));
        }
        if self.status.len() > MAX_STATUS_LIST {
            return Err(ApiError::bad_request(format!(
                "status list exceeds maximum of {MAX_STATUS_LIST}"
            )));
        }
        Ok(())
    }

    /// Does `record` satisfy every clause of this query?
    #[must_use]
    pub fn matches(&self, record: &PinRecord) -> bool {
        if !self.cid.is_empty() && !self.cid.iter().any(|c| c == &record.cid) {
            return false;
        }
        if let Some(name) = &self.name {
            if !self.match_strategy.matches(&record.name, name) {
                return false;
            }
        }
        if !self.status.is_empty() && !self.status.contains(&record.status) {
            return false;
        }
        // `before` excludes records at or after the instant; `after`
        // excludes records at or before it (API documentation is
        // authoritative here, not the reference's apparent inversion).
        if let Some(before) = self.before {
            if record.created_at >= before {
                return false;
            }
        }
        if let Some(after) = self.after {
            if record.created_at <= after {
                return false;
            }
        }
        true
    }

    /// Filter, order (descending by creation time), and truncate to `limit`.
    #[must_use]
    pub fn apply(&self, mut records: Vec<PinRecord>) -> Vec<PinRecord> {
        records.retain(|r| self.matches(r));
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let limit = usize::try_from(self.limit.max(0)).unwrap_or(usize::MAX);
        records.truncate(limit);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    fn record(id: i64, name: &str, cid: &str, status: PinStatusValue, age_secs: i64) -> PinRecord {
        PinRecord {
            id,
            user_id: Uuid::nil(),
            created_at: Utc::now() - Duration::seconds(age_secs),
            updated_at: Utc::now(),
            status,
            name: name.to_string(),
            cid: cid.to_string(),
            origins: vec![],
            meta: Some(json!({})),
        }
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = PinQuery::default();
        let pin = record(1, "doc", "Qm1", PinStatusValue::Queued, 10);
        assert!(query.matches(&pin));
    }

    #[test]
    fn cid_filter_is_exact_membership() {
        let query = PinQuery {
            cid: vec!["Qm1".into(), "Qm2".into()],
            ..Default::default()
        };
        assert!(query.matches(&record(1, "a", "Qm1", PinStatusValue::Queued, 1)));
        assert!(!query.matches(&record(2, "a", "Qm3", PinStatusValue::Queued, 1)));
    }

    #[test]
    fn name_filter_respects_match_strategy() {
        let query = PinQuery {
            name: Some("DOC".into()),
            match_strategy: TextMatchingStrategy::Ipartial,
            ..Default::default()
        };
        assert!(query.matches(&record(1, "my document", "Qm1", PinStatusValue::Queued, 1)));
        let exact = PinQuery {
            name: Some("DOC".into()),
            match_strategy: TextMatchingStrategy::Exact,
            ..Default::default()
        };
        assert!(!exact.matches(&record(1, "my document", "Qm1", PinStatusValue::Queued, 1)));
    }

    #[test]
    fn status_filter_is_set_membership() {
        let query = PinQuery {
            status: vec![PinStatusValue::Pinned, PinStatusValue::Failed],
            ..Default::default()
        };
        assert!(query.matches(&record(1, "a", "Qm1", PinStatusValue::Pinned, 1)));
        assert!(!query.matches(&record(2, "a", "Qm2", PinStatusValue::Queued, 1)));
    }

    #[test]
    fn before_excludes_at_or_after_the_instant() {
        let cutoff = Utc::now() - Duration::seconds(5);
        let query = PinQuery {
            before: Some(cutoff),
            ..Default::default()
        };
        let older = record(1, "a", "Qm1", PinStatusValue::Queued, 10);
        let newer = record(2, "a", "Qm2", PinStatusValue::Queued, 1);
        assert!(query.matches(&older));
        assert!(!query.matches(&newer));
    }

    #[test]
    fn after_excludes_at_or_before_the_instant() {
        let cutoff = Utc::now() - Duration::seconds(5);
        let query = PinQuery {
            after: Some(cutoff),
            ..Default::default()
        };
        let older = record(1, "a", "Qm1", PinStatusValue::Queued, 10);
        let newer = record(2, "a", "Qm2", PinStatusValue::Queued, 1);
        assert!(!query.matches(&older));
        assert!(query.matches(&newer));
    }

    #[test]
    fn apply_orders_descending_by_creation_and_truncates() {
        let query = PinQuery {
            limit: 2,
            ..Default::default()
        };
        let records = vec![
            record(1, "a", "Qm1", PinStatusValue::Queued, 30),
            record(2, "b", "Qm2", PinStatusValue::Queued, 10),
            record(3, "c", "Qm3", PinStatusValue::Queued, 20),
        ];
        let result = query.apply(records);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, 2);
        assert_eq!(result[1].id, 3);
    }

    #[test]
    fn validate_rejects_oversized_lists() {
        let too_many_cids = PinQuery {
            cid: (0..11).map(|i| format!("Qm{i}")).collect(),
            ..Default::default()
        };
        assert!(too_many_cids.validate().is_err());

        let too_many_statuses = PinQuery {
            status: vec![
                PinStatusValue::Queued,
                PinStatusValue::Pinning,
                PinStatusValue::Pinned,
                PinStatusValue::Failed,
                PinStatusValue::Queued,
            ],
            ..Default::default()
        };
        assert!(too_many_statuses.validate().is_err());
    }
}
