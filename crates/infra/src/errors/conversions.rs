//! Conversions from external infrastructure errors into domain errors.

use civicdesk_domain::CivicDeskError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CivicDeskError);

impl From<InfraError> for CivicDeskError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CivicDeskError> for InfraError {
    fn from(value: CivicDeskError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCivicDeskError {
    fn into_civicdesk(self) -> CivicDeskError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CivicDeskError */
/* -------------------------------------------------------------------------- */

impl IntoCivicDeskError for HttpError {
    fn into_civicdesk(self) -> CivicDeskError {
        if self.is_builder() {
            return CivicDeskError::Config(format!("HTTP client configuration rejected: {self}"));
        }

        if self.is_timeout() {
            return CivicDeskError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CivicDeskError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => CivicDeskError::Auth(message),
                400..=499 => CivicDeskError::InvalidInput(message),
                _ => CivicDeskError::Network(message),
            };
        }

        CivicDeskError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_civicdesk())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → CivicDeskError */
/* -------------------------------------------------------------------------- */

impl IntoCivicDeskError for std::io::Error {
    fn into_civicdesk(self) -> CivicDeskError {
        match self.kind() {
            std::io::ErrorKind::NotFound => {
                CivicDeskError::Config(format!("file not found: {self}"))
            }
            std::io::ErrorKind::PermissionDenied => {
                CivicDeskError::Storage(format!("permission denied: {self}"))
            }
            _ => CivicDeskError::Storage(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_civicdesk())
    }
}

/* -------------------------------------------------------------------------- */
/* Config formats → CivicDeskError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(CivicDeskError::Config(format!("Invalid JSON format: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(CivicDeskError::Config(format!("Invalid TOML format: {value}")))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(CivicDeskError::Config(format!("Invalid base URL: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
