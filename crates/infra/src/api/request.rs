//! Request description handed to the executor

use std::time::Duration;

use civicdesk_domain::ApiConfig;
use reqwest::multipart::Form;
use reqwest::Method;
use serde_json::Value;

/// Which configured deadline applies to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deadline {
    #[default]
    Standard,
    /// File-bearing requests
    Upload,
    Login,
    Health,
}

impl Deadline {
    #[must_use]
    pub const fn resolve(self, config: &ApiConfig) -> Duration {
        match self {
            Self::Standard => config.request_timeout(),
            Self::Upload => config.upload_timeout(),
            Self::Login => config.login_timeout(),
            Self::Health => config.health_timeout(),
        }
    }
}

#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    None,
    Json(Value),
    /// Encoded by reqwest, which also sets the boundary content type.
    Multipart(Form),
}

/// One HTTP call against the configured base URL
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL; may carry a query string.
    pub path: String,
    pub body: RequestBody,
    /// Caller headers; these override the defaults.
    pub headers: Vec<(String, String)>,
    pub deadline: Deadline,
    /// Attach the bearer token when one is stored.
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::None,
            headers: Vec::new(),
            deadline: Deadline::Standard,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Multipart body; switches to the upload deadline.
    #[must_use]
    pub fn with_multipart(mut self, form: Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self.deadline = Deadline::Upload;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        if matches!(body, RequestBody::Multipart(_)) {
            self.deadline = Deadline::Upload;
        }
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Never send the bearer token (login, health).
    #[must_use]
    pub const fn without_auth(mut self) -> Self {
        self.authenticated = false;
        self
    }

    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart(_))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn multipart_switches_to_upload_deadline() {
        let request = ApiRequest::post("/business/create").with_multipart(Form::new());
        assert!(request.is_multipart());
        assert_eq!(request.deadline, Deadline::Upload);

        let request = ApiRequest::post("/business").with_json(json!({"a": 1}));
        assert_eq!(request.deadline, Deadline::Standard);
    }

    #[test]
    fn deadlines_resolve_against_config() {
        let config = ApiConfig { upload_timeout_secs: 45, ..ApiConfig::default() };
        assert_eq!(Deadline::Standard.resolve(&config), Duration::from_secs(15));
        assert_eq!(Deadline::Upload.resolve(&config), Duration::from_secs(45));
        assert_eq!(Deadline::Login.resolve(&config), Duration::from_secs(10));
        assert_eq!(Deadline::Health.resolve(&config), Duration::from_secs(3));
    }
}
