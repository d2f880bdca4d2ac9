//! Login, logout and current-user lookups
//!
//! Login is the only place a token enters the [`TokenStore`]. The backend has
//! shipped the token under several body fields and headers over time, so
//! discovery walks a fixed priority list and takes the first usable value.

use std::sync::Arc;

use civicdesk_common::{Claims, Token, TokenStore};
use civicdesk_domain::constants::{MIN_TOKEN_LENGTH, TOKEN_RESPONSE_FIELDS, TOKEN_RESPONSE_HEADERS};
use civicdesk_domain::{
    AdminPermissions, ApiError, Credentials, ErrorKind, LoginOutcome, ResponseBody,
    ResultEnvelope, UserInfo, UserProfile,
};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::executor::{classify, Executor, RequestExecutor};
use super::prober::{CandidateEndpoint, EndpointFailoverProber, ProbePolicy};
use super::request::{ApiRequest, Deadline};
use super::session::SessionGate;

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";
const LOGIN_SUCCESS_MESSAGE: &str = "Login successful";
const USER_INFO_UNAVAILABLE_MESSAGE: &str = "Unable to load user information";
const DEFAULT_ROLE: &str = "user";

const CURRENT_USER_ROUTES: [&str; 4] =
    ["/users/me", "/auth/user", "/user/profile", "/api/user/current"];

/// Authentication operations over a shared executor and token store
pub struct AuthService {
    executor: Arc<RequestExecutor>,
    lookups: EndpointFailoverProber,
    gate: SessionGate,
}

impl AuthService {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        let gate = SessionGate::new(executor.tokens().clone());
        let lookups = EndpointFailoverProber::new(executor.clone(), ProbePolicy::lookup());
        Self { executor, lookups, gate }
    }

    fn tokens(&self) -> &Arc<TokenStore> {
        self.executor.tokens()
    }

    /// Sign in with username and password.
    ///
    /// A 2xx without a discoverable token still counts as a successful login;
    /// `token_stored` on the outcome tells the two apart.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> ResultEnvelope<LoginOutcome> {
        let Some(credentials) = credentials.trimmed() else {
            return ResultEnvelope::invalid_request("Username and password are required");
        };

        let request = ApiRequest::post("/auth/login")
            .with_json(json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .with_deadline(Deadline::Login)
            .without_auth();

        let response = match self.executor.execute_raw(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Login request did not complete");
                return err.into_envelope();
            }
        };

        if matches!(response.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            info!(status = response.status.as_u16(), "Login rejected");
            return ResultEnvelope::failure_with_status(
                ErrorKind::Unauthorized,
                INVALID_CREDENTIALS_MESSAGE,
                response.status.as_u16(),
            );
        }

        let header_token = token_from_headers(&response.headers);
        classify(response).and_then(|body| {
            let body = body.unwrap_or(ResponseBody::Empty);
            let token = token_from_body(&body).or(header_token);
            let token_stored = token.is_some();

            match token {
                Some(token) => {
                    let token = Token::new(token);
                    debug!(token = %token.preview(), "Storing session token");
                    self.tokens().set(token);
                }
                None => warn!("Login succeeded but no token was found in the response"),
            }

            let root = body.to_json();
            let user = profile_from(user_object(&root), None, &credentials.username);
            let message = body.message().unwrap_or_else(|| LOGIN_SUCCESS_MESSAGE.to_string());
            info!(user = %user.username, token_stored, "Login succeeded");

            ResultEnvelope::ok(LoginOutcome { user, message, token_stored })
        })
    }

    /// Drop the session everywhere. Never fails.
    pub fn logout(&self) -> ResultEnvelope<()> {
        self.tokens().clear();
        info!("Logged out");
        ResultEnvelope::ok_empty()
    }

    /// Profile of the signed-in user from `GET /users/me`.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> ResultEnvelope<UserProfile> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }
        let claims = self.tokens().claims();

        self.executor.execute(ApiRequest::get("/users/me")).await.map(|body| {
            let root = body.into_json();
            profile_from(user_object(&root), claims.as_ref(), "")
        })
    }

    /// User details plus roles, permissions and the admin flag.
    ///
    /// Tries the known profile routes in order; when none of them exists the
    /// answer is built from the token claims alone.
    #[instrument(skip(self))]
    pub async fn current_user_info(&self) -> ResultEnvelope<UserInfo> {
        if !self.gate.require_session() {
            return ResultEnvelope::session_expired();
        }
        let claims = self.tokens().claims();

        let candidates: Vec<CandidateEndpoint> = CURRENT_USER_ROUTES
            .iter()
            .map(|route| CandidateEndpoint::new(Method::GET, *route))
            .collect();
        let outcome = self.lookups.probe("current user", &candidates, &[]).await;

        if outcome.is_success() {
            let root = outcome.into_data().map_or(Value::Null, ResponseBody::into_json);
            return ResultEnvelope::ok(user_info_from(user_object(&root), claims.as_ref()));
        }

        if outcome.error_kind() == Some(ErrorKind::Unauthorized) {
            return forward_failure(&outcome);
        }

        match claims {
            Some(claims) => {
                debug!(status = ?outcome.status(), "No profile route answered, using token claims");
                ResultEnvelope::ok(user_info_from(&Value::Null, Some(&claims)))
            }
            None => ResultEnvelope::failure_with_status(
                ErrorKind::ServerError,
                USER_INFO_UNAVAILABLE_MESSAGE,
                404,
            ),
        }
    }

    /// Whether the signed-in user can act as an administrator.
    ///
    /// The admin flag from [`Self::current_user_info`] decides, and a 403
    /// from `GET /admin/test` overrides it. Any other answer from that route,
    /// including a failure to reach it, leaves the verdict alone.
    #[instrument(skip(self))]
    pub async fn check_admin_permissions(&self) -> AdminPermissions {
        if !self.gate.require_session() {
            return AdminPermissions::denied(None, &["Sign in first"]);
        }

        let Some(info) = self.current_user_info().await.into_data() else {
            return AdminPermissions::denied(
                None,
                &["Could not load user information", "Check the connection to the server"],
            );
        };
        if !info.is_admin {
            return AdminPermissions::denied(
                Some(info),
                &[
                    "Your user has no administrator permissions",
                    "Ask a system administrator for access",
                    "Check that you are signed in with the right account",
                ],
            );
        }

        let verdict = self.executor.execute(ApiRequest::get("/admin/test")).await;
        if verdict.error_kind() == Some(ErrorKind::Unauthorized) {
            return AdminPermissions::denied(Some(info), &["Session expired, sign in again"]);
        }
        if verdict.status() == Some(StatusCode::FORBIDDEN.as_u16()) {
            warn!("Token lacks administrator rights on the server");
            return AdminPermissions::denied(
                Some(info),
                &["The token has no valid administrator rights", "Sign out and sign in again"],
            );
        }

        debug!(status = ?verdict.status(), "Administrator permissions verified");
        AdminPermissions::granted(info)
    }
}

fn forward_failure<T, U>(outcome: &ResultEnvelope<T>) -> ResultEnvelope<U> {
    let error = outcome
        .error()
        .cloned()
        .unwrap_or_else(|| ApiError::new(ErrorKind::ServerError, USER_INFO_UNAVAILABLE_MESSAGE));
    ResultEnvelope::from_error(error, outcome.status())
}

fn usable_token(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    (candidate.len() > MIN_TOKEN_LENGTH).then(|| candidate.to_string())
}

fn token_from_body(body: &ResponseBody) -> Option<String> {
    TOKEN_RESPONSE_FIELDS
        .iter()
        .find_map(|name| body.field(name).and_then(Value::as_str).and_then(usable_token))
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    TOKEN_RESPONSE_HEADERS.iter().find_map(|name| {
        let value = headers.get(*name)?.to_str().ok()?.trim();
        let value = value.strip_prefix("Bearer ").unwrap_or(value);
        usable_token(value)
    })
}

/// The object describing the user: `user`, then `userData`, then the root.
fn user_object(root: &Value) -> &Value {
    ["user", "userData"]
        .iter()
        .find_map(|name| root.get(name).filter(|v| v.is_object()))
        .unwrap_or(root)
}

/// String or numeric field rendered as a string.
fn text_field(value: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match value.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn string_list(value: &Value, name: &str) -> Vec<String> {
    value
        .get(name)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn profile_from(user: &Value, claims: Option<&Claims>, fallback_username: &str) -> UserProfile {
    let subject = claims.and_then(Claims::subject);
    let username = text_field(user, &["username"])
        .or_else(|| (!fallback_username.is_empty()).then(|| fallback_username.to_string()))
        .or_else(|| subject.map(str::to_string))
        .unwrap_or_default();
    let id = text_field(user, &["id", "userId"])
        .or_else(|| claims.and_then(|c| c.sub.clone()))
        .unwrap_or_else(|| username.clone());

    UserProfile {
        id,
        username,
        email: text_field(user, &["email"]).or_else(|| claims.and_then(|c| c.email.clone())),
        role: text_field(user, &["role"])
            .or_else(|| claims.and_then(Claims::primary_role).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
    }
}

fn user_info_from(user: &Value, claims: Option<&Claims>) -> UserInfo {
    let profile = profile_from(user, claims, "");

    let mut roles = string_list(user, "roles");
    if roles.is_empty() {
        roles = claims.map(Claims::all_roles).unwrap_or_default();
    }
    if roles.is_empty() {
        roles.push(profile.role.clone());
    }

    let mut permissions = string_list(user, "permissions");
    if permissions.is_empty() {
        permissions = claims.map(|c| c.permissions.clone()).unwrap_or_default();
    }

    let is_admin = claims.is_some_and(Claims::is_admin)
        || roles.iter().any(|role| role.to_lowercase().contains("admin"));

    UserInfo { user: profile, roles, permissions, is_admin }
}
