//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Request deadlines (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 3;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again.";

/// Response body fields that may carry the token after login, in priority
/// order.
pub const TOKEN_RESPONSE_FIELDS: [&str; 9] = [
    "jwt",
    "token",
    "accessToken",
    "access_token",
    "authToken",
    "bearerToken",
    "sessionToken",
    "apiToken",
    "authenticationToken",
];

/// Response headers that may carry the token after login, in priority order.
pub const TOKEN_RESPONSE_HEADERS: [&str; 6] =
    ["Authorization", "X-Auth-Token", "Access-Token", "X-Access-Token", "Bearer", "X-JWT-Token"];

/// Discovered tokens this short are ignored.
pub const MIN_TOKEN_LENGTH: usize = 10;

/// Body fields checked for a human-readable error, in priority order.
pub const MESSAGE_FIELDS: [&str; 3] = ["message", "error", "detail"];

/// Page size used when statistics are computed from the business list.
pub const STATS_PAGE_SIZE: u32 = 1000;

/// Shortest justification accepted when rejecting a deletion request.
pub const MIN_JUSTIFICATION_CHARS: usize = 10;
