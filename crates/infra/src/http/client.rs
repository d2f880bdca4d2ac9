use std::time::Duration;

use civicdesk_domain::{ApiError, CivicDeskError, ErrorKind, ResultEnvelope};
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::errors::InfraError;

/// Failure before any HTTP status was received
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("could not connect to the server: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Connect(_) | Self::Request(_) => ErrorKind::NetworkError,
        }
    }

    /// Failure envelope without a status.
    pub fn into_envelope<T>(self) -> ResultEnvelope<T> {
        let message = match &self {
            Self::Timeout(_) => "The request timed out. Please try again.".to_string(),
            other => format!("Could not reach the server: {other}"),
        };
        ResultEnvelope::from_error(ApiError::new(self.kind(), message), None)
    }

    fn from_reqwest(err: &reqwest::Error, deadline: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(deadline)
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Status, headers and raw body of a completed exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// HTTP client with a per-call hard deadline and no retries.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns `CivicDeskError::Config` if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, CivicDeskError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send the request and read the whole body, all within `deadline`.
    ///
    /// When the deadline passes the in-flight future is dropped, so a late
    /// response is never observed.
    ///
    /// # Errors
    /// Returns [`TransportError`] when no complete response arrived in time.
    pub async fn fetch(
        &self,
        builder: RequestBuilder,
        deadline: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let request =
            builder.build().map_err(|err| TransportError::Request(err.to_string()))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, ?deadline, "sending HTTP request");

        let exchange = async {
            let response = self.client.execute(request).await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();
            Ok::<_, reqwest::Error>(HttpResponse { status, headers, body })
        };

        match tokio::time::timeout(deadline, exchange).await {
            Ok(Ok(response)) => {
                debug!(%method, %url, status = %response.status, "received HTTP response");
                Ok(response)
            }
            Ok(Err(err)) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(TransportError::from_reqwest(&err, deadline))
            }
            Err(_) => {
                debug!(%method, %url, ?deadline, "HTTP request abandoned at deadline");
                Err(TransportError::Timeout(deadline))
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
    accept_invalid_certs: bool,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    #[must_use]
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Test-only helper to allow insecure TLS (e.g., self-signed certs).
    #[cfg(test)]
    #[must_use]
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// # Errors
    /// Returns `CivicDeskError::Config` if reqwest rejects the settings.
    pub fn build(self) -> Result<HttpClient, CivicDeskError> {
        let mut builder = ReqwestClient::builder().no_proxy();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            CivicDeskError::from(infra)
        })?;

        Ok(HttpClient { client })
    }
}
