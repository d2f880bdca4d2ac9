//! One HTTP call: headers, deadline, decoding and classification
//!
//! The executor never retries. Every outcome is folded into a
//! [`ResultEnvelope`]; a 401 additionally clears the token store.

use std::sync::Arc;

use async_trait::async_trait;
use civicdesk_common::TokenStore;
use civicdesk_domain::constants::SESSION_EXPIRED_MESSAGE;
use civicdesk_domain::{ApiConfig, ErrorKind, ResponseBody, ResultEnvelope};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE,
};
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use super::decode::decode_body;
use super::request::{ApiRequest, RequestBody};
use crate::http::{HttpClient, TransportError};

const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";

/// Anything that can run an [`ApiRequest`] to an envelope
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ResultEnvelope<ResponseBody>;
}

/// A completed exchange with its body already decoded
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// Map a completed exchange to an envelope. Pure; does not touch the store.
#[must_use]
pub fn classify(response: ApiResponse) -> ResultEnvelope<ResponseBody> {
    let code = response.status.as_u16();
    if response.status.is_success() {
        return ResultEnvelope::ok_with_status(response.body, code);
    }

    match response.status {
        StatusCode::UNAUTHORIZED => {
            ResultEnvelope::failure_with_status(
                ErrorKind::Unauthorized,
                SESSION_EXPIRED_MESSAGE,
                code,
            )
        }
        StatusCode::FORBIDDEN => {
            ResultEnvelope::failure_with_status(ErrorKind::Forbidden, FORBIDDEN_MESSAGE, code)
        }
        status => {
            let message = response.body.message().unwrap_or_else(|| {
                format!("HTTP {}: {}", code, status.canonical_reason().unwrap_or("Unknown Status"))
            });
            ResultEnvelope::failure_with_status(ErrorKind::ServerError, message, code)
        }
    }
}

/// Executes requests against one base URL with credentials from a shared
/// [`TokenStore`]
pub struct RequestExecutor {
    http: HttpClient,
    config: ApiConfig,
    tokens: Arc<TokenStore>,
}

impl RequestExecutor {
    pub fn new(http: HttpClient, config: ApiConfig, tokens: Arc<TokenStore>) -> Self {
        Self { http, config, tokens }
    }

    #[must_use]
    pub const fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Absolute URL for a path relative to the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if path.is_empty() {
            return base.to_string();
        }
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    fn headers(&self, request: &ApiRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let accept = if request.is_multipart() { "*/*" } else { "application/json" };
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if matches!(request.body, RequestBody::Json(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if request.authenticated {
            if let Some(token) = self.tokens.get() {
                match HeaderValue::from_str(&format!("Bearer {}", token.expose())) {
                    Ok(mut value) => {
                        value.set_sensitive(true);
                        headers.insert(AUTHORIZATION, value);
                    }
                    Err(_) => warn!("Stored token is not a valid header value, sending without it"),
                }
            }
        }

        for (name, value) in &request.headers {
            let (Ok(name), Ok(value)) =
                (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
            else {
                warn!(header = %name, "Skipping invalid caller header");
                continue;
            };
            if request.is_multipart() && name == CONTENT_TYPE {
                debug!("Ignoring caller Content-Type on a multipart request");
                continue;
            }
            headers.insert(name, value);
        }

        headers
    }

    /// Send the request and decode the body without classifying the status.
    ///
    /// # Errors
    /// Returns [`TransportError`] when no complete response arrived before
    /// the deadline.
    pub async fn execute_raw(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.path);
        let deadline = request.deadline.resolve(&self.config);
        let headers = self.headers(&request);

        let mut builder = self.http.request(request.method, &url).headers(headers);
        builder = match request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = self.http.fetch(builder, deadline).await?;
        let body = decode_body(&response.headers, &response.body);
        Ok(ApiResponse { status: response.status, headers: response.headers, body })
    }
}

#[async_trait]
impl Executor for RequestExecutor {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn execute(&self, request: ApiRequest) -> ResultEnvelope<ResponseBody> {
        let authenticated = request.authenticated;
        let envelope = match self.execute_raw(request).await {
            Ok(response) => classify(response),
            Err(err) => {
                warn!(error = %err, "Request did not complete");
                return err.into_envelope();
            }
        };

        if authenticated && envelope.error_kind() == Some(ErrorKind::Unauthorized) {
            warn!("Server rejected the token, clearing the session");
            self.tokens.clear();
        }

        if let Some(error) = envelope.error() {
            debug!(status = ?envelope.status(), kind = %error.kind, "Request failed");
        }
        envelope
    }
}
