//! Uniform result envelope returned by every public operation
//!
//! A [`ResultEnvelope`] is either a success (optional data, no error) or a
//! failure (an [`ApiError`] tagged with an [`ErrorKind`]). The fields are
//! private so the two shapes cannot be mixed.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::SESSION_EXPIRED_MESSAGE;
use crate::impl_domain_status_conversions;
use crate::types::ResponseBody;

/// Closed set of failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Token missing, expired or rejected by the server (401)
    Unauthorized,
    /// Valid token with insufficient rights (403)
    Forbidden,
    /// Deadline exceeded before a response arrived
    Timeout,
    /// Transport failure before any response
    NetworkError,
    /// Any other non-2xx response
    ServerError,
    /// Response body could not be interpreted as the expected shape
    DecodeError,
    /// Request rejected locally before it was sent
    InvalidRequest,
}

impl_domain_status_conversions!(ErrorKind {
    Unauthorized => "unauthorized",
    Forbidden => "forbidden",
    Timeout => "timeout",
    NetworkError => "network_error",
    ServerError => "server_error",
    DecodeError => "decode_error",
    InvalidRequest => "invalid_request",
});

/// What the UI layer is expected to offer the user for a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Prompt for a new login
    Reauthenticate,
    /// Offer to try again
    Retry,
    /// Display the envelope message
    ShowMessage,
}

impl ErrorKind {
    /// Transport-level failures that are worth retrying as-is.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::NetworkError)
    }

    #[must_use]
    pub const fn recovery(self) -> Recovery {
        match self {
            Self::Unauthorized => Recovery::Reauthenticate,
            Self::Timeout | Self::NetworkError => Recovery::Retry,
            Self::Forbidden | Self::ServerError | Self::DecodeError | Self::InvalidRequest => {
                Recovery::ShowMessage
            }
        }
    }
}

/// Failure description carried by a failed envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Uniform success/failure wrapper
///
/// `success == true` implies `error` is absent, `success == false` implies
/// `error` is present. Only the constructors below can build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl<T> ResultEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, status: None }
    }

    pub fn ok_with_status(data: T, status: u16) -> Self {
        Self { success: true, data: Some(data), error: None, status: Some(status) }
    }

    /// Success without a payload (e.g. logout).
    pub fn ok_empty() -> Self {
        Self { success: true, data: None, error: None, status: None }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::from_error(ApiError::new(kind, message), None)
    }

    pub fn failure_with_status(kind: ErrorKind, message: impl Into<String>, status: u16) -> Self {
        Self::from_error(ApiError::new(kind, message), Some(status))
    }

    pub fn from_error(error: ApiError, status: Option<u16>) -> Self {
        Self { success: false, data: None, error: Some(error), status }
    }

    /// Failure returned when a privileged operation is attempted without a
    /// live session.
    pub fn session_expired() -> Self {
        Self::failure(ErrorKind::Unauthorized, SESSION_EXPIRED_MESSAGE)
    }

    /// Local validation failure; mirrors a 400 without touching the network.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::failure_with_status(ErrorKind::InvalidRequest, message, 400)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    #[must_use]
    pub const fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Error message of a failed envelope.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    /// Transform the payload of a success; failures pass through untouched.
    pub fn map<U, F>(self, f: F) -> ResultEnvelope<U>
    where
        F: FnOnce(T) -> U,
    {
        ResultEnvelope {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            status: self.status,
        }
    }

    /// Chain an operation that itself produces an envelope.
    pub fn and_then<U, F>(self, f: F) -> ResultEnvelope<U>
    where
        F: FnOnce(Option<T>) -> ResultEnvelope<U>,
    {
        if self.success {
            f(self.data)
        } else {
            ResultEnvelope { success: false, data: None, error: self.error, status: self.status }
        }
    }

    /// Leave the envelope world, e.g. for `?` inside internal helpers.
    ///
    /// # Errors
    /// Returns the carried [`ApiError`] when the envelope is a failure.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl ResultEnvelope<ResponseBody> {
    /// Interpret a successful body as `U`.
    ///
    /// A body that does not fit `U` becomes a [`ErrorKind::DecodeError`]
    /// failure carrying the original status.
    pub fn decode<U: DeserializeOwned>(self) -> ResultEnvelope<U> {
        if !self.success {
            return ResultEnvelope {
                success: false,
                data: None,
                error: self.error,
                status: self.status,
            };
        }

        let value = self.data.map_or(serde_json::Value::Null, ResponseBody::into_json);
        match serde_json::from_value::<U>(value) {
            Ok(decoded) => ResultEnvelope {
                success: true,
                data: Some(decoded),
                error: None,
                status: self.status,
            },
            Err(e) => ResultEnvelope::from_error(
                ApiError::new(ErrorKind::DecodeError, format!("Unexpected response shape: {e}")),
                self.status,
            ),
        }
    }
}
