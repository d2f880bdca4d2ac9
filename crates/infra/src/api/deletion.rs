//! Review of business deletion requests

use std::sync::Arc;

use civicdesk_domain::constants::{MIN_JUSTIFICATION_CHARS, STATS_PAGE_SIZE};
use civicdesk_domain::{
    deletion_requests, request_matches, DeletionQuery, DeletionStats, DeletionStatus, ErrorKind,
    ResponseBody, ResultEnvelope,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::business::with_query;
use super::executor::{Executor, RequestExecutor};
use super::request::ApiRequest;
use super::session::SessionGate;

pub struct DeletionApi {
    executor: Arc<RequestExecutor>,
    gate: SessionGate,
}

impl DeletionApi {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { gate: SessionGate::new(executor.tokens().clone()), executor }
    }

    /// One page of deletion requests, unwrapped from whatever page shape the
    /// server used.
    #[instrument(skip(self))]
    pub async fn requests(&self, query: &DeletionQuery) -> ResultEnvelope<Vec<Value>> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let path = with_query("/business/deletion", &query.query_pairs());
        self.executor.execute(ApiRequest::get(path)).await.and_then(|body| {
            let listing = body.map_or(Value::Null, ResponseBody::into_json);
            match deletion_requests(&listing) {
                Some(requests) => ResultEnvelope::ok(requests),
                None => {
                    warn!("Deletion request list has an unexpected shape");
                    ResultEnvelope::failure(
                        ErrorKind::DecodeError,
                        "Unexpected deletion request list format",
                    )
                }
            }
        })
    }

    #[instrument(skip(self))]
    pub async fn request(&self, id: u64) -> ResultEnvelope<Value> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }
        self.executor
            .execute(ApiRequest::get(format!("/business/deletion/{id}")))
            .await
            .map(ResponseBody::into_json)
    }

    /// Approve a request; the business listing is removed by the server. A
    /// blank justification is left out.
    #[instrument(skip(self, justification))]
    pub async fn approve(&self, id: u64, justification: Option<&str>) -> ResultEnvelope<Value> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let route = format!("/business/deletion/{id}/approve");
        let path = match justification.map(str::trim).filter(|j| !j.is_empty()) {
            Some(justification) => with_query(&route, &[("justification", justification.into())]),
            None => route,
        };
        let outcome = self.executor.execute(ApiRequest::post(path)).await;
        if outcome.is_success() {
            info!(request_id = id, "Deletion approved");
        }
        outcome.map(ResponseBody::into_json)
    }

    /// Reject a request. The justification is shown to the owner and must
    /// have at least [`MIN_JUSTIFICATION_CHARS`] characters.
    #[instrument(skip(self, justification))]
    pub async fn reject(&self, id: u64, justification: &str) -> ResultEnvelope<Value> {
        let justification = justification.trim();
        if justification.chars().count() < MIN_JUSTIFICATION_CHARS {
            return ResultEnvelope::invalid_request(format!(
                "The justification must have at least {MIN_JUSTIFICATION_CHARS} characters"
            ));
        }
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let path = with_query(
            &format!("/business/deletion/{id}/reject"),
            &[("justification", justification.to_string())],
        );
        let outcome = self.executor.execute(ApiRequest::post(path)).await;
        if outcome.is_success() {
            info!(request_id = id, "Deletion rejected");
        }
        outcome.map(ResponseBody::into_json)
    }

    /// Counters over one large page of requests.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> ResultEnvelope<DeletionStats> {
        self.requests(&DeletionQuery::new(0, STATS_PAGE_SIZE)).await.map(|requests| {
            let stats = DeletionStats::from_requests(&requests);
            debug!(?stats, "Computed deletion stats");
            stats
        })
    }

    /// Requests whose descriptive fields contain `query`, filtered locally
    /// over one large page.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        status: Option<DeletionStatus>,
    ) -> ResultEnvelope<Vec<Value>> {
        let query = query.trim();
        if query.is_empty() {
            return ResultEnvelope::invalid_request("A search term is required");
        }

        let mut page = DeletionQuery::new(0, STATS_PAGE_SIZE);
        page.status = status;
        self.requests(&page).await.map(|requests| {
            requests.into_iter().filter(|request| request_matches(request, query)).collect()
        })
    }
}
