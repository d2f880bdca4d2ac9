//! Precondition for privileged operations

use std::sync::Arc;

use civicdesk_common::TokenStore;
use tracing::debug;

/// Confirms a live session before any privileged request is issued
#[derive(Debug, Clone)]
pub struct SessionGate {
    tokens: Arc<TokenStore>,
}

impl SessionGate {
    pub fn new(tokens: Arc<TokenStore>) -> Self {
        Self { tokens }
    }

    /// True only when a token is stored and has not expired. Never touches
    /// the network; an expired token is cleared.
    #[must_use]
    pub fn require_session(&self) -> bool {
        if self.tokens.get().is_none() {
            debug!("No session token, refusing privileged operation");
            return false;
        }
        self.tokens.is_valid()
    }
}
