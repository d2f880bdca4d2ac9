//! Authentication types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Username/password pair submitted to the login endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// Trimmed copy, or `None` when either field is blank.
    #[must_use]
    pub fn trimmed(&self) -> Option<Self> {
        let username = self.username.trim();
        let password = self.password.trim();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { username: username.to_string(), password: password.to_string() })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Signed-in user as reported by the backend or the token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
}

/// Result payload of a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub message: String,
    /// Whether a bearer token was found in the response and stored.
    pub token_stored: bool,
}

/// User details together with the permissions needed by the admin screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub user: UserProfile,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub is_admin: bool,
}

/// Whether the signed-in user may use the admin screens, with hints for the
/// user when not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPermissions {
    pub has_permissions: bool,
    pub user_info: Option<UserInfo>,
    pub suggestions: Vec<String>,
}

impl AdminPermissions {
    pub fn denied(user_info: Option<UserInfo>, suggestions: &[&str]) -> Self {
        Self {
            has_permissions: false,
            user_info,
            suggestions: suggestions.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn granted(user_info: UserInfo) -> Self {
        Self {
            has_permissions: true,
            user_info: Some(user_info),
            suggestions: vec!["Administrator permissions verified".to_string()],
        }
    }
}
