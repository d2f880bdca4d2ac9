//! Bearer token and JWT payload decoding
//!
//! Tokens are treated as opaque credentials. The payload segment is decoded
//! only to read the expiry and the identity claims; the signature is never
//! verified client-side.

use std::fmt;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Characters of the token shown in diagnostics.
pub const TOKEN_PREVIEW_CHARS: usize = 20;

/// Errors raised while decoding a token payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is not three dot-separated segments (found {0})")]
    Malformed(usize),

    #[error("token payload is not valid base64: {0}")]
    Encoding(String),

    #[error("token payload is not a JSON object: {0}")]
    Payload(String),
}

/// Opaque bearer credential
///
/// The value is zeroed on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw value for the `Authorization` header and storage tiers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First characters of the token followed by `...`, for diagnostics.
    #[must_use]
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(TOKEN_PREVIEW_CHARS).collect();
        format!("{head}...")
    }

    /// Decode the payload segment.
    ///
    /// # Errors
    /// Returns [`TokenError`] when the token does not have three segments or
    /// the middle one is not base64-encoded JSON.
    pub fn claims(&self) -> Result<Claims, TokenError> {
        let segments: Vec<&str> = self.0.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::Malformed(segments.len()));
        }

        let payload = segments[1].trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .or_else(|_| STANDARD_NO_PAD.decode(payload))
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| TokenError::Payload(e.to_string()))
    }

    /// Classify the token against a Unix timestamp.
    ///
    /// Undecodable payloads and payloads without `exp` count as expired.
    #[must_use]
    pub fn state_at(&self, now_secs: i64) -> TokenState {
        match self.claims() {
            Ok(claims) if claims.exp.is_some_and(|exp| exp > now_secs) => {
                TokenState::Valid(claims)
            }
            _ => TokenState::Expired,
        }
    }

    #[must_use]
    pub fn state(&self) -> TokenState {
        self.state_at(chrono::Utc::now().timestamp())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// The only three states a stored token can be in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Absent,
    Valid(Claims),
    Expired,
}

impl TokenState {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Decoded JWT payload
///
/// Every claim is read leniently: a value of an unexpected type is treated as
/// absent instead of failing the whole payload. Role-like claims are accepted
/// as a single string, a list of strings or a list of `{ "authority": .. }`
/// objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub exp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub iat: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub role: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub authorities: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub scope: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub permissions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_admin: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub admin: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Subject identifier, falling back to the username claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().or(self.username.as_deref())
    }

    /// First entry of the `role` claim.
    #[must_use]
    pub fn primary_role(&self) -> Option<&str> {
        self.role.first().map(String::as_str)
    }

    /// Every role-like claim, deduplicated, in claim order.
    #[must_use]
    pub fn all_roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::new();
        let candidates = self.role.iter().chain(&self.roles).chain(&self.authorities);
        for role in candidates {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }
        roles
    }

    /// Administrator detection over the claim shapes the backend has used.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        let mentions_admin = |s: &String| s.to_lowercase().contains("admin");

        self.all_roles().iter().any(mentions_admin)
            || self.scope.iter().any(mentions_admin)
            || self.is_admin == Some(true)
            || self.admin == Some(true)
            || self.user_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("admin"))
    }
}

// Fractional seconds are truncated toward the past.
#[allow(clippy::cast_possible_truncation)]
fn timestamp(value: &Value) -> Option<i64> {
    let secs = match value {
        Value::Number(n) => return n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    secs.is_finite().then(|| secs.floor() as i64)
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(timestamp))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => Some(flag),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
        _ => None,
    })
}

fn role_name(item: Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s),
        Value::Object(map) => map
            .get("authority")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// A single role name kept whole, or a list of them.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => items.into_iter().filter_map(role_name).collect(),
        _ => Vec::new(),
    })
}

/// Space or comma separated string, or a list.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            s.split([' ', ',']).filter(|part| !part.is_empty()).map(str::to_string).collect()
        }
        Some(Value::Array(items)) => items.into_iter().filter_map(role_name).collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::TokenBuilder;

    #[test]
    fn test_claims_decode() {
        let token = TokenBuilder::new().subject("clerk-7").expires_at(2_000_000_000).build();
        let claims = token.claims().unwrap();
        assert_eq!(claims.sub.as_deref(), Some("clerk-7"));
        assert_eq!(claims.exp, Some(2_000_000_000));
    }

    #[test]
    fn test_state_at_boundaries() {
        let token = TokenBuilder::new().expires_at(1_000).build();
        assert!(token.state_at(999).is_valid());
        assert_eq!(token.state_at(1_000), TokenState::Expired);
        assert_eq!(token.state_at(1_001), TokenState::Expired);
    }

    #[test]
    fn test_missing_exp_counts_as_expired() {
        let token = TokenBuilder::new().without_expiry().build();
        assert_eq!(token.state_at(0), TokenState::Expired);
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(Token::new("opaque-session-id").claims(), Err(TokenError::Malformed(1)));
        assert!(matches!(Token::new("a.%%%.c").claims(), Err(TokenError::Encoding(_))));

        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("plain text"));
        assert!(matches!(Token::new(not_json).claims(), Err(TokenError::Payload(_))));
        assert_eq!(Token::new("a.b").state_at(0), TokenState::Expired);
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":5,"sub":"x"}"#);
        let token = Token::new(format!("h.{payload}.s"));
        assert_eq!(token.claims().unwrap().exp, Some(5));
    }

    #[test]
    fn test_debug_and_preview_hide_token() {
        let token = Token::new("abcdefghijklmnopqrstuvwxyz0123456789");
        assert_eq!(format!("{token:?}"), "Token(<redacted>)");
        assert_eq!(token.preview(), "abcdefghijklmnopqrst...");
    }

    #[test]
    fn test_is_admin_rules() {
        let by_authority: Claims =
            serde_json::from_value(json!({"authorities": [{"authority": "ROLE_ADMIN"}]})).unwrap();
        assert!(by_authority.is_admin());

        let by_scope: Claims =
            serde_json::from_value(json!({"scope": "read admin:write"})).unwrap();
        assert!(by_scope.is_admin());

        let by_flag: Claims = serde_json::from_value(json!({"isAdmin": true})).unwrap();
        assert!(by_flag.is_admin());

        let by_type: Claims = serde_json::from_value(json!({"userType": "ADMIN"})).unwrap();
        assert!(by_type.is_admin());

        let clerk: Claims =
            serde_json::from_value(json!({"role": "CLERK", "roles": ["USER"], "admin": false}))
                .unwrap();
        assert!(!clerk.is_admin());
        assert_eq!(clerk.all_roles(), vec!["CLERK".to_string(), "USER".to_string()]);
        assert_eq!(clerk.primary_role(), Some("CLERK"));
    }

    #[test]
    fn test_numeric_subject_keeps_token_live() {
        let token = TokenBuilder::new().claim("sub", 4_217).expires_at(2_000).build();
        let TokenState::Valid(claims) = token.state_at(1_000) else {
            panic!("numeric sub should not invalidate the token");
        };
        assert_eq!(claims.subject(), Some("4217"));
    }

    #[test]
    fn test_role_list_claim() {
        let token =
            TokenBuilder::new()
                .claim("role", json!(["REVIEWER", "ADMIN"]))
                .expires_at(2_000)
                .build();
        let TokenState::Valid(claims) = token.state_at(1_000) else {
            panic!("role list should not invalidate the token");
        };
        assert_eq!(claims.primary_role(), Some("REVIEWER"));
        assert!(claims.is_admin());
    }

    #[test]
    fn test_string_admin_flag() {
        let token = TokenBuilder::new().claim("isAdmin", "true").expires_at(2_000).build();
        let TokenState::Valid(claims) = token.state_at(1_000) else {
            panic!("string flag should not invalidate the token");
        };
        assert_eq!(claims.is_admin, Some(true));
        assert!(claims.is_admin());

        let odd: Claims = serde_json::from_value(json!({"admin": {"level": 3}})).unwrap();
        assert_eq!(odd.admin, None);
    }

    #[test]
    fn test_fractional_exp() {
        let token = TokenBuilder::new().claim("exp", 1_500.75).build();
        assert!(token.state_at(1_499).is_valid());
        assert_eq!(token.state_at(1_500), TokenState::Expired);

        let as_string = TokenBuilder::new().claim("exp", "1500").build();
        assert!(as_string.state_at(1_000).is_valid());

        let nonsense = TokenBuilder::new().claim("exp", json!({"at": 1})).build();
        assert_eq!(nonsense.state_at(0), TokenState::Expired);
    }

    #[test]
    fn test_unknown_claims_are_kept() {
        let claims: Claims =
            serde_json::from_value(json!({"sub": "7", "department": "permits"})).unwrap();
        assert_eq!(claims.extra.get("department"), Some(&json!("permits")));
        assert_eq!(claims.subject(), Some("7"));
    }
}
