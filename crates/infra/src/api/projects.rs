//! Community project review operations
//!
//! Projects share the admin review queue with businesses: the listing is the
//! private business list and approval goes through the generic admin routes.
//! Every operation is gated on a live session.

use std::sync::Arc;

use civicdesk_domain::{
    ErrorKind, NewProject, PageRequest, ProjectFilter, ProjectUpdate, ResponseBody,
    ResultEnvelope,
};
use serde_json::Value;
use tracing::{info, instrument};

use super::business::{invalid_input, with_query};
use super::executor::{Executor, RequestExecutor};
use super::request::ApiRequest;
use super::session::SessionGate;

const USER_REJECTED_MESSAGE: &str = "User rejected";

pub struct ProjectApi {
    executor: Arc<RequestExecutor>,
    gate: SessionGate,
}

impl ProjectApi {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { gate: SessionGate::new(executor.tokens().clone()), executor }
    }

    async fn send(&self, request: ApiRequest) -> ResultEnvelope<Value> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }
        self.executor.execute(request).await.map(ResponseBody::into_json)
    }

    /// Paged project listing with optional status and search filters.
    #[instrument(skip(self))]
    pub async fn projects(&self, filter: &ProjectFilter) -> ResultEnvelope<Value> {
        let path = with_query("/business/private-list-by-category", &filter.query_pairs());
        self.send(ApiRequest::get(path)).await
    }

    /// Submissions waiting for a reviewer.
    #[instrument(skip(self))]
    pub async fn pending_projects(&self, page: &PageRequest) -> ResultEnvelope<Value> {
        self.send(ApiRequest::get(with_query("/admin/pending", &page.query_pairs()))).await
    }

    #[instrument(skip(self, project), fields(name = %project.name))]
    pub async fn create_project(&self, project: &NewProject) -> ResultEnvelope<Value> {
        if let Err(err) = project.validate() {
            return invalid_input(err);
        }
        let body = match serde_json::to_value(project) {
            Ok(body) => body,
            Err(err) => {
                return ResultEnvelope::invalid_request(format!("Unserializable project: {err}"))
            }
        };
        self.send(ApiRequest::post("/api/proyectos").with_json(body)).await
    }

    #[instrument(skip(self))]
    pub async fn project(&self, id: &str) -> ResultEnvelope<Value> {
        let Some(path) = project_path(id) else {
            return ResultEnvelope::invalid_request("A project id is required");
        };
        self.send(ApiRequest::get(path)).await
    }

    #[instrument(skip(self, changes))]
    pub async fn update_project(&self, id: &str, changes: &ProjectUpdate) -> ResultEnvelope<Value> {
        let Some(path) = project_path(id) else {
            return ResultEnvelope::invalid_request("A project id is required");
        };
        if changes.is_empty() {
            return ResultEnvelope::invalid_request("Nothing to update");
        }
        let body = match serde_json::to_value(changes) {
            Ok(body) => body,
            Err(err) => {
                return ResultEnvelope::invalid_request(format!("Unserializable project: {err}"))
            }
        };
        self.send(ApiRequest::put(path).with_json(body)).await
    }

    #[instrument(skip(self))]
    pub async fn delete_project(&self, id: &str) -> ResultEnvelope<Value> {
        let Some(path) = project_path(id) else {
            return ResultEnvelope::invalid_request("A project id is required");
        };
        let outcome = self.send(ApiRequest::delete(path)).await;
        if outcome.is_success() {
            info!(project_id = %id, "Project deleted");
        }
        outcome
    }

    #[instrument(skip(self))]
    pub async fn approve_project(&self, id: &str) -> ResultEnvelope<Value> {
        self.review("approve", id).await
    }

    #[instrument(skip(self))]
    pub async fn reject_project(&self, id: &str) -> ResultEnvelope<Value> {
        self.review("reject", id).await
    }

    async fn review(&self, action: &str, id: &str) -> ResultEnvelope<Value> {
        let id = id.trim();
        if id.is_empty() {
            return ResultEnvelope::invalid_request("A project id is required");
        }
        let path = format!("/admin/{action}/{}", urlencoding::encode(id));
        let outcome = self.send(ApiRequest::post(path)).await;
        if outcome.is_success() {
            info!(project_id = %id, action, "Project reviewed");
        }
        outcome
    }

    /// Turn down a pending account with a reason the applicant will see.
    ///
    /// Returns the server's confirmation text.
    #[instrument(skip(self, reason))]
    pub async fn reject_user(&self, user_id: &str, reason: &str) -> ResultEnvelope<String> {
        let (user_id, reason) = (user_id.trim(), reason.trim());
        if user_id.is_empty() {
            return ResultEnvelope::invalid_request("A user id is required");
        }
        if reason.is_empty() {
            return ResultEnvelope::invalid_request("A rejection reason is required");
        }
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }

        let path = with_query(
            &format!("/admin/reject/{}", urlencoding::encode(user_id)),
            &[("reason", reason.to_string())],
        );
        let outcome = self.executor.execute(ApiRequest::delete(path)).await;
        if outcome.is_success() {
            info!(user_id = %user_id, "User rejected");
            return outcome.map(|body| rejection_confirmation(&body));
        }
        explain_user_rejection_failure(&outcome)
    }
}

fn project_path(id: &str) -> Option<String> {
    let id = id.trim();
    (!id.is_empty()).then(|| format!("/api/proyectos/{}", urlencoding::encode(id)))
}

fn rejection_confirmation(body: &ResponseBody) -> String {
    body.field("data")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| body.message())
        .unwrap_or_else(|| USER_REJECTED_MESSAGE.to_string())
}

/// Rewords failures whose generic text would not tell a reviewer anything.
fn explain_user_rejection_failure<T, U>(outcome: &ResultEnvelope<T>) -> ResultEnvelope<U> {
    let status = outcome.status();
    let kind = outcome.error_kind().unwrap_or(ErrorKind::ServerError);
    let message = outcome.message().unwrap_or_default();
    let generic = message.is_empty() || message.starts_with("HTTP ");

    let message = match status {
        Some(400) if generic => "The user is already enabled",
        Some(404) if generic => "User not found",
        Some(403) => "You are not allowed to reject users",
        _ => message,
    };
    match status {
        Some(status) => ResultEnvelope::failure_with_status(kind, message, status),
        None => ResultEnvelope::failure(kind, message),
    }
}

#[cfg(test)]
mod tests {
    use civicdesk_common::testing::TokenBuilder;
    use civicdesk_common::TokenStore;
    use civicdesk_domain::{ApiConfig, ProjectStatus};
    use serde_json::json;
    use wiremock::matchers::{any, body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::HttpClient;

    fn api(base_url: &str, signed_in: bool) -> ProjectApi {
        let tokens = Arc::new(TokenStore::in_memory());
        if signed_in {
            tokens.set(TokenBuilder::new().subject("reviewer-1").build());
        }
        let executor = RequestExecutor::new(
            HttpClient::new().unwrap(),
            ApiConfig::with_base_url(base_url),
            tokens,
        );
        ProjectApi::new(Arc::new(executor))
    }

    #[tokio::test]
    async fn nothing_is_sent_without_session() {
        let server = MockServer::start().await;
        Mock::given(any()).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let api = api(&server.uri(), false);
        let project = NewProject::new("Huerto", "Parcela");
        let unauthorized = Some(ErrorKind::Unauthorized);
        assert_eq!(api.projects(&ProjectFilter::default()).await.error_kind(), unauthorized);
        assert_eq!(api.create_project(&project).await.error_kind(), unauthorized);
        assert_eq!(api.approve_project("p-1").await.error_kind(), unauthorized);
        assert_eq!(api.reject_user("u-1", "duplicate").await.error_kind(), unauthorized);
    }

    #[tokio::test]
    async fn listing_passes_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/business/private-list-by-category"))
            .and(query_param("page", "0"))
            .and(query_param("status", "pendiente"))
            .and(query_param("search", "huerto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/pending"))
            .and(query_param("size", "25"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"content": [{"id": "p-1"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = api(&server.uri(), true);
        let filter =
            ProjectFilter::default().with_status(ProjectStatus::Pending).with_search("huerto");
        assert!(api.projects(&filter).await.is_success());

        let pending = api.pending_projects(&PageRequest::new(0, 25)).await;
        assert_eq!(pending.into_data(), Some(json!({"content": [{"id": "p-1"}]})));
    }

    #[tokio::test]
    async fn crud_routes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/proyectos"))
            .and(body_json(json!({"nombre": "Huerto", "descripcion": "Parcela"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p-9"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/proyectos/p-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p-9"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/proyectos/p-9"))
            .and(body_json(json!({"presupuesto": 900.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p-9"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/proyectos/p-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(&server.uri(), true);
        let created = api.create_project(&NewProject::new("Huerto", "Parcela")).await;
        assert_eq!(created.status(), Some(201));
        assert!(api.project("p-9").await.is_success());

        let changes = ProjectUpdate { budget: Some(900.0), ..ProjectUpdate::default() };
        assert!(api.update_project("p-9", &changes).await.is_success());
        assert!(api.delete_project("p-9").await.is_success());
    }

    #[tokio::test]
    async fn local_checks_run_before_any_request() {
        let api = api("http://127.0.0.1:1", true);
        assert_eq!(
            api.create_project(&NewProject::new("", "Parcela")).await.message(),
            Some("nombre is required")
        );
        assert_eq!(
            api.update_project("p-1", &ProjectUpdate::default()).await.error_kind(),
            Some(ErrorKind::InvalidRequest)
        );
        assert_eq!(api.project("  ").await.error_kind(), Some(ErrorKind::InvalidRequest));
        assert_eq!(api.reject_user("u-1", " ").await.error_kind(), Some(ErrorKind::InvalidRequest));
    }

    #[tokio::test]
    async fn approve_and_reject_use_admin_routes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/approve/p-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"estado": "aprobado"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/reject/p-4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"estado": "rechazado"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(&server.uri(), true);
        let approved = api.approve_project("p-3").await;
        assert_eq!(approved.into_data(), Some(json!({"estado": "aprobado"})));
        let rejected = api.reject_project("p-4").await;
        assert_eq!(rejected.into_data(), Some(json!({"estado": "rechazado"})));
    }

    #[tokio::test]
    async fn reject_user_sends_reason_and_reads_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/admin/reject/u-7"))
            .and(query_param("reason", "documents are illegible"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Usuario rechazado"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome =
            api(&server.uri(), true).reject_user("u-7", " documents are illegible ").await;
        assert_eq!(outcome.into_data(), Some("Usuario rechazado".to_string()));
    }

    #[tokio::test]
    async fn reject_user_explains_failures() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/admin/reject/u-1"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/admin/reject/u-2"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "No such applicant"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/admin/reject/u-3"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let api = api(&server.uri(), true);
        let already = api.reject_user("u-1", "duplicate").await;
        assert_eq!(already.message(), Some("The user is already enabled"));
        assert_eq!(already.status(), Some(400));

        assert_eq!(api.reject_user("u-2", "duplicate").await.message(), Some("No such applicant"));

        let forbidden = api.reject_user("u-3", "duplicate").await;
        assert_eq!(forbidden.error_kind(), Some(ErrorKind::Forbidden));
        assert_eq!(forbidden.message(), Some("You are not allowed to reject users"));
    }
}
