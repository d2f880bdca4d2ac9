//! Endpoint failover for operations whose backend route is not fixed
//!
//! A logical operation carries an ordered list of [`CandidateEndpoint`]s.
//! They are tried one at a time until one succeeds; the [`ProbePolicy`]
//! decides, per failure, whether the next candidate is worth trying.

use std::fmt;
use std::sync::Arc;

use civicdesk_domain::{ErrorKind, ResponseBody, ResultEnvelope};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::executor::Executor;
use super::request::{ApiRequest, RequestBody};

type BodyBuilder = Arc<dyn Fn() -> RequestBody + Send + Sync>;

/// One route to try for a logical operation
///
/// `{name}` placeholders in the path template are filled from the probe
/// parameters, URL-encoded.
#[derive(Clone)]
pub struct CandidateEndpoint {
    method: Method,
    path_template: String,
    body: Option<BodyBuilder>,
}

impl CandidateEndpoint {
    pub fn new(method: Method, path_template: impl Into<String>) -> Self {
        Self { method, path_template: path_template.into(), body: None }
    }

    /// Body built lazily, only if this candidate is reached.
    #[must_use]
    pub fn with_body<F>(mut self, build: F) -> Self
    where
        F: Fn() -> RequestBody + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(build));
        self
    }

    #[must_use]
    pub fn with_json(self, body: Value) -> Self {
        self.with_body(move || RequestBody::Json(body.clone()))
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Concrete path with every placeholder substituted.
    #[must_use]
    pub fn path(&self, params: &[(&str, &str)]) -> String {
        params.iter().fold(self.path_template.clone(), |path, (name, value)| {
            path.replace(&format!("{{{name}}}"), &urlencoding::encode(value))
        })
    }

    fn to_request(&self, params: &[(&str, &str)]) -> ApiRequest {
        let request = ApiRequest::new(self.method.clone(), self.path(params));
        match &self.body {
            Some(build) => request.with_body(build()),
            None => request,
        }
    }
}

impl fmt::Debug for CandidateEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateEndpoint")
            .field("method", &self.method)
            .field("path_template", &self.path_template)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// What to do after one candidate answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeDecision {
    Accept,
    Continue,
    Stop,
}

/// Statuses that mean "this route does not apply, try the next one"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    continue_on: &'static [u16],
}

impl ProbePolicy {
    /// Mutations: a missing route (404) or a route that exists but cannot
    /// handle the shape (500) moves on.
    #[must_use]
    pub const fn mutating() -> Self {
        Self { continue_on: &[404, 500] }
    }

    /// Read-only lookups move on only for a missing route.
    #[must_use]
    pub const fn lookup() -> Self {
        Self { continue_on: &[404] }
    }

    /// Failures without a status (timeouts, transport errors) always stop.
    #[must_use]
    pub fn decide<T>(&self, outcome: &ResultEnvelope<T>) -> ProbeDecision {
        if outcome.is_success() {
            return ProbeDecision::Accept;
        }
        match outcome.status() {
            Some(status) if self.continue_on.contains(&status) => ProbeDecision::Continue,
            _ => ProbeDecision::Stop,
        }
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self::mutating()
    }
}

pub struct EndpointFailoverProber {
    executor: Arc<dyn Executor>,
    policy: ProbePolicy,
}

impl EndpointFailoverProber {
    pub fn new(executor: Arc<dyn Executor>, policy: ProbePolicy) -> Self {
        Self { executor, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> ProbePolicy {
        self.policy
    }

    /// Try `candidates` in order and return the first success.
    ///
    /// Stops early on a failure the policy does not skip. When every
    /// candidate was skipped the last failure is returned; with no candidates
    /// at all a 404 "no valid endpoint" failure is synthesised.
    #[instrument(skip(self, candidates, params), fields(candidates = candidates.len()))]
    pub async fn probe(
        &self,
        operation: &str,
        candidates: &[CandidateEndpoint],
        params: &[(&str, &str)],
    ) -> ResultEnvelope<ResponseBody> {
        let mut last_failure = None;

        for (index, candidate) in candidates.iter().enumerate() {
            let path = candidate.path(params);
            debug!(attempt = index + 1, method = %candidate.method, %path, "Trying endpoint");

            let outcome = self.executor.execute(candidate.to_request(params)).await;
            match self.policy.decide(&outcome) {
                ProbeDecision::Accept => {
                    info!(
                        attempt = index + 1,
                        method = %candidate.method,
                        %path,
                        "Endpoint accepted"
                    );
                    return outcome;
                }
                ProbeDecision::Continue => {
                    debug!(attempt = index + 1, status = ?outcome.status(), "Endpoint skipped");
                    last_failure = Some(outcome);
                }
                ProbeDecision::Stop => {
                    warn!(
                        attempt = index + 1,
                        status = ?outcome.status(),
                        kind = ?outcome.error_kind(),
                        "Endpoint failed terminally"
                    );
                    return outcome;
                }
            }
        }

        last_failure.unwrap_or_else(|| {
            ResultEnvelope::failure_with_status(
                ErrorKind::ServerError,
                format!("No valid endpoint found for {operation}"),
                404,
            )
        })
    }
}
