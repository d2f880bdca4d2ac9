//! Business registry operations for the review dashboard
//!
//! Every operation is gated on a live session. Review and creation routes
//! have moved between backend releases, so those go through the failover
//! prober with the known candidates in order of preference.

use std::sync::Arc;

use chrono::{Local, Utc};
use civicdesk_domain::constants::STATS_PAGE_SIZE;
use civicdesk_domain::{
    BusinessFiles, BusinessStats, CivicDeskError, DashboardStats, ErrorKind, FileAttachment,
    NewBusiness, PageRequest, ResponseBody, ResultEnvelope,
};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::executor::{Executor, RequestExecutor};
use super::prober::{CandidateEndpoint, EndpointFailoverProber, ProbePolicy};
use super::request::ApiRequest;
use super::session::SessionGate;

const DEFAULT_REVIEWER: &str = "admin";

const CATEGORY_ROUTES: [&str; 2] = ["/business/categories", "/businessCategories/select"];

pub struct BusinessApi {
    executor: Arc<RequestExecutor>,
    mutations: EndpointFailoverProber,
    lookups: EndpointFailoverProber,
    gate: SessionGate,
}

impl BusinessApi {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            mutations: EndpointFailoverProber::new(executor.clone(), ProbePolicy::mutating()),
            lookups: EndpointFailoverProber::new(executor.clone(), ProbePolicy::lookup()),
            gate: SessionGate::new(executor.tokens().clone()),
            executor,
        }
    }

    fn reviewer(&self) -> String {
        self.executor
            .tokens()
            .claims()
            .and_then(|claims| claims.subject().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_REVIEWER.to_string())
    }

    /// Mark a business as approved.
    #[instrument(skip(self))]
    pub async fn approve_business(&self, id: u64) -> ResultEnvelope<Value> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let status_body = json!({
            "validationStatus": "APPROVED",
            "approvedBy": self.reviewer(),
            "approvalDate": Utc::now().to_rfc3339(),
        });
        let candidates = [
            CandidateEndpoint::new(Method::POST, "/admin/business/approve/{id}"),
            CandidateEndpoint::new(Method::POST, "/business/approve/{id}"),
            CandidateEndpoint::new(Method::PUT, "/business/{id}").with_json(status_body.clone()),
            CandidateEndpoint::new(Method::PATCH, "/business/{id}").with_json(status_body),
            CandidateEndpoint::new(Method::POST, "/business/{id}/approve"),
        ];

        let id = id.to_string();
        let outcome = self.mutations.probe("approve business", &candidates, &[("id", &id)]).await;
        if outcome.is_success() {
            info!(business_id = %id, "Business approved");
        }
        outcome.map(ResponseBody::into_json)
    }

    /// Mark a business as rejected. A non-blank reason is required.
    #[instrument(skip(self, reason))]
    pub async fn reject_business(&self, id: u64, reason: &str) -> ResultEnvelope<Value> {
        let reason = reason.trim();
        if reason.is_empty() {
            return ResultEnvelope::invalid_request("A rejection reason is required");
        }
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let now = Utc::now().to_rfc3339();
        let status_body = json!({
            "validationStatus": "REJECTED",
            "rejectionReason": reason,
            "rejectedBy": self.reviewer(),
            "rejectionDate": now,
        });
        let candidates = [
            CandidateEndpoint::new(Method::PUT, "/admin/business/reject/{id}?reason={reason}"),
            CandidateEndpoint::new(Method::POST, "/business/reject/{id}")
                .with_json(json!({"observacion": reason, "timestamp": now})),
            CandidateEndpoint::new(Method::PUT, "/business/{id}").with_json(status_body.clone()),
            CandidateEndpoint::new(Method::PATCH, "/business/{id}").with_json(status_body),
            CandidateEndpoint::new(Method::POST, "/business/{id}/reject")
                .with_json(json!({"reason": reason})),
        ];

        let id = id.to_string();
        let outcome = self
            .mutations
            .probe("reject business", &candidates, &[("id", &id), ("reason", reason)])
            .await;
        if outcome.is_success() {
            info!(business_id = %id, "Business rejected");
        }
        outcome.map(ResponseBody::into_json)
    }

    /// Register a business from JSON metadata only.
    #[instrument(skip(self, business), fields(name = %business.commercial_name))]
    pub async fn create_business(&self, business: &NewBusiness) -> ResultEnvelope<Value> {
        if let Err(err) = business.validate() {
            return invalid_input(err);
        }
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let body = match serde_json::to_value(business.normalized(Local::now().date_naive())) {
            Ok(body) => body,
            Err(err) => {
                return ResultEnvelope::invalid_request(format!("Unserializable business: {err}"))
            }
        };
        let candidates: Vec<CandidateEndpoint> =
            ["/business/create", "/business", "/admin/business/create", "/business/admin/create"]
                .into_iter()
                .map(|route| CandidateEndpoint::new(Method::POST, route).with_json(body.clone()))
                .collect();

        self.mutations.probe("create business", &candidates, &[]).await.map(ResponseBody::into_json)
    }

    /// Register a business together with its documents in one multipart
    /// request. The cedula scan is mandatory; everything else is optional.
    #[instrument(skip(self, business, files), fields(name = %business.commercial_name))]
    pub async fn create_business_with_files(
        &self,
        business: &NewBusiness,
        files: BusinessFiles,
    ) -> ResultEnvelope<Value> {
        if let Err(err) = business.validate() {
            return invalid_input(err);
        }
        if files.cedula.bytes.is_empty() {
            return ResultEnvelope::invalid_request("cedulaFile is required");
        }
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let form = match business_form(&business.normalized(Local::now().date_naive()), files) {
            Ok(form) => form,
            Err(message) => return ResultEnvelope::invalid_request(message),
        };

        let request = ApiRequest::post("/business/create").with_multipart(form);
        self.executor.execute(request).await.map(ResponseBody::into_json)
    }

    /// Businesses awaiting or past review, paged.
    #[instrument(skip(self))]
    pub async fn private_business_list(&self, page: &PageRequest) -> ResultEnvelope<Value> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let pairs = page.query_pairs();
        let candidates: Vec<CandidateEndpoint> = [
            "/business/private-list-by-category",
            "/business/admin/list",
            "/admin/business/list",
            "/business/list?type=private",
        ]
        .into_iter()
        .map(|route| CandidateEndpoint::new(Method::GET, with_query(route, &pairs)))
        .collect();

        self.lookups.probe("list businesses", &candidates, &[]).await.map(ResponseBody::into_json)
    }

    #[instrument(skip(self))]
    pub async fn business(&self, id: u64) -> ResultEnvelope<Value> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }
        self.executor
            .execute(ApiRequest::get(format!("/business/{id}")))
            .await
            .map(ResponseBody::into_json)
    }

    /// Replace the stored fields of a business with `changes`.
    #[instrument(skip(self, changes))]
    pub async fn update_business(&self, id: u64, changes: &Value) -> ResultEnvelope<Value> {
        if !changes.as_object().is_some_and(|fields| !fields.is_empty()) {
            return ResultEnvelope::invalid_request("Business changes must be a non-empty object");
        }
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let request = ApiRequest::put(format!("/business/{id}")).with_json(changes.clone());
        let outcome = self.executor.execute(request).await;
        if outcome.is_success() {
            info!(business_id = id, "Business updated");
        }
        outcome.map(ResponseBody::into_json)
    }

    #[instrument(skip(self))]
    pub async fn delete_business(&self, id: u64) -> ResultEnvelope<Value> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let outcome = self.executor.execute(ApiRequest::delete(format!("/business/{id}"))).await;
        if outcome.is_success() {
            info!(business_id = id, "Business deleted");
        }
        outcome.map(ResponseBody::into_json)
    }

    /// Categories offered in the registration form.
    #[instrument(skip(self))]
    pub async fn business_categories(&self) -> ResultEnvelope<Value> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let candidates: Vec<CandidateEndpoint> = CATEGORY_ROUTES
            .iter()
            .map(|route| CandidateEndpoint::new(Method::GET, *route))
            .collect();
        self.lookups.probe("list categories", &candidates, &[]).await.map(ResponseBody::into_json)
    }

    /// Free-text search. The search route counts pages from one, unlike the
    /// listings.
    #[instrument(skip(self))]
    pub async fn search_businesses(
        &self,
        query: &str,
        page: &PageRequest,
    ) -> ResultEnvelope<Value> {
        let query = query.trim();
        if query.is_empty() {
            return ResultEnvelope::invalid_request("A search term is required");
        }
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let pairs = [
            ("q", query.to_string()),
            ("page", (page.page + 1).to_string()),
            ("size", page.size.to_string()),
        ];
        self.executor
            .execute(ApiRequest::get(with_query("/business/search", &pairs)))
            .await
            .map(ResponseBody::into_json)
    }

    /// Review counters computed from one large page of the private list.
    #[instrument(skip(self))]
    pub async fn business_stats(&self) -> ResultEnvelope<BusinessStats> {
        let listing = self.private_business_list(&PageRequest::new(0, STATS_PAGE_SIZE)).await;
        listing.and_then(|value| {
            match value.as_ref().and_then(BusinessStats::from_listing) {
                Some(stats) => {
                    debug!(?stats, "Computed business stats");
                    ResultEnvelope::ok(stats)
                }
                None => {
                    warn!("Business list has an unexpected shape");
                    ResultEnvelope::failure(
                        ErrorKind::DecodeError,
                        "Unexpected business list format",
                    )
                }
            }
        })
    }

    /// Dashboard counters from the admin endpoint, or computed from the
    /// business list when that endpoint is unavailable.
    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> ResultEnvelope<DashboardStats> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let outcome = self
            .executor
            .execute(ApiRequest::get("/admin/get-dashboard-stats"))
            .await
            .decode::<DashboardStats>();
        match outcome.error_kind() {
            None | Some(ErrorKind::Unauthorized) => outcome,
            Some(kind) => {
                debug!(%kind, status = ?outcome.status(), "Dashboard stats unavailable");
                self.business_stats().await.map(DashboardStats::from)
            }
        }
    }
}

pub(super) fn invalid_input<T>(err: CivicDeskError) -> ResultEnvelope<T> {
    match err {
        CivicDeskError::InvalidInput(message) => ResultEnvelope::invalid_request(message),
        other => ResultEnvelope::invalid_request(other.to_string()),
    }
}

/// Append URL-encoded query pairs to a route that may already carry a query.
pub(super) fn with_query(route: &str, pairs: &[(&'static str, String)]) -> String {
    if pairs.is_empty() {
        return route.to_string();
    }
    let query = pairs
        .iter()
        .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if route.contains('?') { '&' } else { '?' };
    format!("{route}{separator}{query}")
}

fn file_part(file: FileAttachment) -> Result<Part, String> {
    let part = Part::bytes(file.bytes).file_name(file.file_name);
    match file.mime_type {
        Some(mime) => {
            part.mime_str(&mime).map_err(|err| format!("Invalid file type {mime}: {err}"))
        }
        None => Ok(part),
    }
}

fn business_form(business: &NewBusiness, files: BusinessFiles) -> Result<Form, String> {
    let metadata =
        serde_json::to_string(business).map_err(|err| format!("Unserializable business: {err}"))?;
    let metadata = Part::text(metadata)
        .mime_str("application/json")
        .map_err(|err| format!("Invalid metadata part: {err}"))?;

    let mut form = Form::new().part("business", metadata);
    if let Some(logo) = files.logo {
        form = form.part("logoFile", file_part(logo)?);
    }
    if let Some(signature) = files.signature {
        form = form.part("signatureFile", file_part(signature)?);
    }
    form = form.part("cedulaFile", file_part(files.cedula)?);
    for photo in files.carousel {
        form = form.part("carrouselPhotos", file_part(photo)?);
    }
    Ok(form)
}
