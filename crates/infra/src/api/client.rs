//! Facade wiring the token store, executor and services together
//!
//! One [`ApiClient`] is built at start-up and shared by the dashboard. Every
//! collaborator holds the same `Arc<TokenStore>`, so a 401 seen by any of
//! them signs the whole client out.

use std::path::PathBuf;
use std::sync::Arc;

use civicdesk_common::{FileTier, MemoryTier, StorageTier, TokenState, TokenStore};
use civicdesk_domain::{
    ApiConfig, CivicDeskError, Config, ResultEnvelope, StorageConfig, TokenBackend,
};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::auth::AuthService;
use super::business::BusinessApi;
use super::deletion::DeletionApi;
use super::executor::RequestExecutor;
use super::projects::ProjectApi;
use super::request::{ApiRequest, Deadline};
use super::session::SessionGate;
use crate::http::HttpClient;

/// Durable session file used when the configuration names none.
pub const DEFAULT_SESSION_FILE: &str = "civicdesk-session.json";

/// Entry point for the dashboard's API access
pub struct ApiClient {
    executor: Arc<RequestExecutor>,
    gate: SessionGate,
    auth: AuthService,
    business: BusinessApi,
    projects: ProjectApi,
    deletions: DeletionApi,
}

impl ApiClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Build a client from loaded configuration, including the durable token
    /// tier it names.
    ///
    /// # Errors
    /// Returns `CivicDeskError::Config` when the HTTP client cannot be built
    /// or the configured token backend is not compiled in.
    pub fn from_config(config: &Config) -> Result<Self, CivicDeskError> {
        let tokens =
            TokenStore::new(Arc::new(MemoryTier::new()), durable_tier(&config.storage)?);
        Self::builder().config(config.api.clone()).tokens(Arc::new(tokens)).build()
    }

    fn assemble(executor: RequestExecutor) -> Self {
        let executor = Arc::new(executor);
        Self {
            gate: SessionGate::new(executor.tokens().clone()),
            auth: AuthService::new(executor.clone()),
            business: BusinessApi::new(executor.clone()),
            projects: ProjectApi::new(executor.clone()),
            deletions: DeletionApi::new(executor.clone()),
            executor,
        }
    }

    pub const fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub const fn business(&self) -> &BusinessApi {
        &self.business
    }

    pub const fn projects(&self) -> &ProjectApi {
        &self.projects
    }

    pub const fn deletions(&self) -> &DeletionApi {
        &self.deletions
    }

    pub const fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub const fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        self.executor.tokens()
    }

    /// Whether the server answers at all. Any HTTP status counts as up; only
    /// a transport failure or the short health deadline counts as down.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> ResultEnvelope<Value> {
        let request = ApiRequest::head("").with_deadline(Deadline::Health).without_auth();
        match self.executor.execute_raw(request).await {
            Ok(response) => {
                debug!(status = %response.status, "Server reachable");
                ResultEnvelope::ok_with_status(json!({"status": "ok"}), response.status.as_u16())
            }
            Err(err) => {
                warn!(error = %err, "Health check failed");
                err.into_envelope()
            }
        }
    }

    /// `GET /health` answered with a 2xx.
    #[instrument(skip(self))]
    pub async fn server_available(&self) -> bool {
        let request = ApiRequest::get("/health").with_deadline(Deadline::Health).without_auth();
        match self.executor.execute_raw(request).await {
            Ok(response) => response.status.is_success(),
            Err(err) => {
                debug!(error = %err, "Health endpoint unreachable");
                false
            }
        }
    }

    /// Session snapshot for support screens. Never exposes the full token
    /// and never clears the store.
    pub fn debug_info(&self) -> Value {
        let token = self.tokens().get();
        let state = token.as_ref().map_or(TokenState::Absent, |token| token.state());

        json!({
            "authenticated": state.is_valid(),
            "has_token": token.is_some(),
            "token_preview": token.as_ref().map(|token| token.preview()),
            "base_url": self.executor.config().base_url,
            "token_expired": matches!(state, TokenState::Expired),
        })
    }
}

fn durable_tier(storage: &StorageConfig) -> Result<Arc<dyn StorageTier>, CivicDeskError> {
    match storage.backend {
        TokenBackend::File => {
            let path =
                storage.path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));
            debug!(path = %path.display(), "Using file token tier");
            Ok(Arc::new(FileTier::new(path)))
        }
        #[cfg(feature = "keychain")]
        TokenBackend::Keychain => {
            debug!(service = %storage.keychain_service, "Using keychain token tier");
            let tier = civicdesk_common::KeychainTier::new(storage.keychain_service.clone());
            Ok(Arc::new(tier))
        }
        #[cfg(not(feature = "keychain"))]
        TokenBackend::Keychain => Err(CivicDeskError::Config(
            "keychain token storage requires the `keychain` feature".to_string(),
        )),
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiConfig>,
    tokens: Option<Arc<TokenStore>>,
    http: Option<HttpClient>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing token store
    #[must_use]
    pub fn tokens(mut self, tokens: Arc<TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Use a preconfigured HTTP client
    #[must_use]
    pub fn http(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client. Missing parts fall back to the default config and an
    /// in-memory token store.
    ///
    /// # Errors
    /// Returns `CivicDeskError::Config` if the HTTP client cannot be built.
    pub fn build(self) -> Result<ApiClient, CivicDeskError> {
        let config = self.config.unwrap_or_default();
        let tokens = self.tokens.unwrap_or_else(|| Arc::new(TokenStore::in_memory()));
        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = HttpClient::builder();
                if let Some(agent) = &config.user_agent {
                    builder = builder.user_agent(agent.clone());
                }
                builder.build()?
            }
        };

        info!(base_url = %config.base_url, "API client ready");
        Ok(ApiClient::assemble(RequestExecutor::new(http, config, tokens)))
    }
}

#[cfg(test)]
mod tests {
    use civicdesk_common::auth::AUTH_FLAG_KEY;
    use civicdesk_common::testing::TokenBuilder;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::builder().config(ApiConfig::with_base_url(base_url)).build().unwrap()
    }

    #[tokio::test]
    async fn health_check_accepts_any_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server.uri()).health_check().await;
        assert!(outcome.is_success());
        assert_eq!(outcome.status(), Some(404));
        assert_eq!(outcome.into_data(), Some(json!({"status": "ok"})));
    }

    #[tokio::test]
    async fn health_check_reports_unreachable_server() {
        let outcome = client("http://127.0.0.1:1").health_check().await;
        assert!(!outcome.is_success());
        assert!(outcome.error_kind().is_some_and(|kind| kind.is_retryable()));
    }

    #[tokio::test]
    async fn server_available_requires_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        assert!(!client(&server.uri()).server_available().await);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("UP"))
            .mount(&server)
            .await;
        assert!(client(&server.uri()).server_available().await);
    }

    #[test]
    fn debug_info_reports_session_without_leaking_token() {
        let client = client("http://api.local");
        let info = client.debug_info();
        assert_eq!(info["authenticated"], json!(false));
        assert_eq!(info["has_token"], json!(false));
        assert_eq!(info["token_preview"], Value::Null);

        let token = TokenBuilder::new().expired().build();
        client.tokens().set(token.clone());
        let info = client.debug_info();
        assert_eq!(info["authenticated"], json!(false));
        assert_eq!(info["token_expired"], json!(true));
        assert_eq!(info["base_url"], json!("http://api.local"));

        let preview = info["token_preview"].as_str().unwrap();
        assert_eq!(preview, token.preview());
        assert_ne!(preview, token.expose());

        // Inspection alone must not sign the user out.
        assert!(client.tokens().get().is_some());
    }

    #[test]
    fn from_config_uses_file_tier() {
        let dir = TempDir::new().unwrap();
        let session = dir.path().join("session.json");
        let config = Config {
            storage: StorageConfig { path: Some(session.clone()), ..StorageConfig::default() },
            ..Config::default()
        };

        let client = ApiClient::from_config(&config).unwrap();
        client.tokens().set(TokenBuilder::new().build());

        let stored: Value =
            serde_json::from_str(&std::fs::read_to_string(&session).unwrap()).unwrap();
        assert_eq!(stored[AUTH_FLAG_KEY], json!("true"));
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn keychain_backend_needs_feature() {
        let config = Config {
            storage: StorageConfig { backend: TokenBackend::Keychain, ..StorageConfig::default() },
            ..Config::default()
        };
        assert!(matches!(ApiClient::from_config(&config), Err(CivicDeskError::Config(_))));
    }
}
