//! Test data builders with fluent API

// Builders are infallible in test contexts; a panic indicates a setup error.
#![allow(clippy::missing_panics_doc)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Map, Value};

use crate::auth::Token;

/// Builds unsigned `header.payload.signature` tokens with chosen claims
///
/// Defaults to a token expiring one hour from now.
///
/// # Examples
///
/// ```
/// use civicdesk_common::testing::TokenBuilder;
///
/// let token = TokenBuilder::new().subject("clerk").claim("role", "ADMIN").build();
/// assert!(token.state().is_valid());
/// ```
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    claims: Map<String, Value>,
}

impl TokenBuilder {
    pub fn new() -> Self {
        let mut claims = Map::new();
        claims.insert("sub".into(), json!("test-user"));
        claims.insert("exp".into(), json!(chrono::Utc::now().timestamp() + 3600));
        Self { claims }
    }

    #[must_use]
    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", sub)
    }

    #[must_use]
    pub fn expires_at(self, exp: i64) -> Self {
        self.claim("exp", exp)
    }

    #[must_use]
    pub fn expires_in_secs(self, secs: i64) -> Self {
        self.expires_at(chrono::Utc::now().timestamp() + secs)
    }

    #[must_use]
    pub fn expired(self) -> Self {
        self.expires_in_secs(-60)
    }

    #[must_use]
    pub fn without_expiry(mut self) -> Self {
        self.claims.remove("exp");
        self
    }

    #[must_use]
    pub fn claim(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(key.to_string(), value.into());
        self
    }

    /// Encoded token string.
    pub fn build_string(&self) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(Value::Object(self.claims.clone()).to_string());
        format!("{header}.{payload}.test-signature")
    }

    pub fn build(&self) -> Token {
        Token::new(self.build_string())
    }
}

impl Default for TokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
