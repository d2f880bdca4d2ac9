//! Business deletion requests
//!
//! Owners ask for their listing to be removed; a reviewer approves or rejects
//! the request. Requests travel as opaque JSON apart from the state field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_domain_status_conversions;

/// Fields matched by the free-text request search.
const SEARCHABLE_FIELDS: [&str; 6] =
    ["nombre", "descripcion", "motivo", "email", "cedula", "telefono"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl_domain_status_conversions!(DeletionStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

impl DeletionStatus {
    /// Code used by the backend in `estado` fields and filters.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// State of one request; unknown values are pending.
    #[must_use]
    pub fn of(request: &Value) -> Self {
        request
            .get("estado")
            .or_else(|| request.get("status"))
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

/// Filter and page of the request listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionQuery {
    pub status: Option<DeletionStatus>,
    pub page: u32,
    pub size: u32,
}

impl Default for DeletionQuery {
    fn default() -> Self {
        Self { status: None, page: 0, size: 10 }
    }
}

impl DeletionQuery {
    pub const fn new(page: u32, size: u32) -> Self {
        Self { status: None, page, size }
    }

    #[must_use]
    pub const fn with_status(mut self, status: DeletionStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(status) = self.status {
            pairs.push(("estado", status.code().to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("size", self.size.to_string()));
        pairs
    }
}

/// Requests in a listing body: a plain array, a page with `content`, or
/// either of those under `data`.
#[must_use]
pub fn deletion_requests(listing: &Value) -> Option<Vec<Value>> {
    let page = listing.get("data").unwrap_or(listing);
    match page {
        Value::Array(items) => Some(items.clone()),
        other => other.get("content").and_then(Value::as_array).cloned(),
    }
}

/// Case-insensitive match of `query` against the descriptive fields.
#[must_use]
pub fn request_matches(request: &Value, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    SEARCHABLE_FIELDS.iter().any(|field| {
        request
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&query))
    })
}

/// Counters for the deletion review screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeletionStats {
    pub total: u64,
    pub pending: u64,
    /// Approved requests; the listing is gone.
    pub deleted: u64,
    pub rejected: u64,
    pub cancelled: u64,
}

impl DeletionStats {
    #[must_use]
    pub fn from_requests(requests: &[Value]) -> Self {
        requests.iter().fold(
            Self { total: requests.len() as u64, ..Self::default() },
            |mut stats, request| {
                match DeletionStatus::of(request) {
                    DeletionStatus::Pending => stats.pending += 1,
                    DeletionStatus::Approved => stats.deleted += 1,
                    DeletionStatus::Rejected => stats.rejected += 1,
                    DeletionStatus::Cancelled => stats.cancelled += 1,
                }
                stats
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_of_request() {
        assert_eq!(DeletionStatus::of(&json!({"estado": "APPROVED"})), DeletionStatus::Approved);
        assert_eq!(DeletionStatus::of(&json!({"status": "cancelled"})), DeletionStatus::Cancelled);
        assert_eq!(DeletionStatus::of(&json!({"estado": "ARCHIVED"})), DeletionStatus::Pending);
        assert_eq!(DeletionStatus::of(&json!({"id": 1})), DeletionStatus::Pending);
    }

    #[test]
    fn test_query_pairs_use_backend_codes() {
        let query = DeletionQuery::new(2, 5).with_status(DeletionStatus::Rejected);
        assert_eq!(
            query.query_pairs(),
            vec![("estado", "REJECTED".to_string()), ("page", "2".into()), ("size", "5".into())]
        );
        assert_eq!(DeletionQuery::default().query_pairs().len(), 2);
    }

    #[test]
    fn test_requests_from_listing_shapes() {
        let page = json!({"content": [{"id": 1}, {"id": 2}], "totalElements": 2});
        assert_eq!(deletion_requests(&page).map(|r| r.len()), Some(2));
        assert_eq!(deletion_requests(&json!({"data": [{"id": 1}]})).map(|r| r.len()), Some(1));
        assert_eq!(deletion_requests(&json!([])), Some(Vec::new()));
        assert!(deletion_requests(&json!({"message": "ok"})).is_none());
    }

    #[test]
    fn test_search_matches_descriptive_fields() {
        let request = json!({"nombre": "Panaderia Central", "email": "rosa@example.com", "id": 7});
        assert!(request_matches(&request, "central"));
        assert!(request_matches(&request, "ROSA@"));
        assert!(!request_matches(&request, "7"));
    }

    #[test]
    fn test_stats_count_every_state() {
        let requests = [
            json!({"estado": "PENDING"}),
            json!({"estado": "APPROVED"}),
            json!({"estado": "APPROVED"}),
            json!({"estado": "REJECTED"}),
            json!({"estado": "CANCELLED"}),
        ];
        assert_eq!(
            DeletionStats::from_requests(&requests),
            DeletionStats { total: 5, pending: 1, deleted: 2, rejected: 1, cancelled: 1 }
        );
    }
}
