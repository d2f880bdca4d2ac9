//! Replicated token store
//!
//! Holds at most one [`Token`] in memory and mirrors it into a volatile and a
//! durable [`StorageTier`]. The tiers are replicas used for recovery after
//! the in-memory slot is lost (cold start, restart); memory is authoritative
//! while it holds a token.
//!
//! Tier failures are logged and swallowed. They never decide whether a user
//! is authenticated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::tier::{MemoryTier, StorageTier};
use super::token::{Claims, Token, TokenState};

/// Storage key aliases for the token, in read priority order.
///
/// Every alias is written on `set` so historical readers keep working.
pub const TOKEN_STORAGE_KEYS: [&str; 3] = ["auth_token", "authToken", "token"];

/// Marker written to the durable tier next to the token.
pub const AUTH_FLAG_KEY: &str = "isAuthenticated";

pub struct TokenStore {
    memory: RwLock<Option<Token>>,
    // Odd while a `clear` is removing tier entries. `set` moves it by two.
    // A tier read is only promoted if it started and ended on the same even
    // value.
    generation: AtomicU64,
    volatile: Arc<dyn StorageTier>,
    durable: Arc<dyn StorageTier>,
}

impl TokenStore {
    pub fn new(volatile: Arc<dyn StorageTier>, durable: Arc<dyn StorageTier>) -> Self {
        Self { memory: RwLock::new(None), generation: AtomicU64::new(0), volatile, durable }
    }

    /// Store whose both tiers live in process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTier::new()), Arc::new(MemoryTier::new()))
    }

    /// Current token: memory first, then the volatile tier, then the durable
    /// tier. A tier hit is promoted into memory.
    pub fn get(&self) -> Option<Token> {
        let started = {
            let slot = self.memory.read();
            if let Some(token) = slot.as_ref() {
                return Some(token.clone());
            }
            self.generation.load(Ordering::Acquire)
        };

        let recovered = [&self.volatile, &self.durable].into_iter().find_map(|tier| {
            TOKEN_STORAGE_KEYS.iter().find_map(|key| match tier.read(key) {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    debug!(tier = tier.name(), key = %key, "Recovered token from storage tier");
                    Some(Token::new(value.trim()))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(tier = tier.name(), key = %key, error = %e, "Token tier read failed");
                    None
                }
            })
        })?;

        let mut slot = self.memory.write();
        if started % 2 == 1 || self.generation.load(Ordering::Acquire) != started {
            return slot.clone();
        }
        Some(slot.get_or_insert(recovered).clone())
    }

    /// Replace the token in memory and in both tiers under every alias.
    pub fn set(&self, token: Token) {
        let value = token.expose().to_string();
        {
            let mut slot = self.memory.write();
            *slot = Some(token);
            self.generation.fetch_add(2, Ordering::AcqRel);
        }

        for tier in [&self.volatile, &self.durable] {
            for key in TOKEN_STORAGE_KEYS {
                if let Err(e) = tier.write(key, &value) {
                    warn!(tier = tier.name(), key = %key, error = %e, "Token tier write failed");
                }
            }
        }
        if let Err(e) = self.durable.write(AUTH_FLAG_KEY, "true") {
            warn!(tier = self.durable.name(), error = %e, "Auth marker write failed");
        }

        info!("Token stored");
    }

    /// Remove the token from memory and from both tiers.
    pub fn clear(&self) {
        {
            let mut slot = self.memory.write();
            *slot = None;
            self.generation.fetch_add(1, Ordering::AcqRel);
        }

        for tier in [&self.volatile, &self.durable] {
            for key in TOKEN_STORAGE_KEYS.iter().chain(std::iter::once(&AUTH_FLAG_KEY)) {
                if let Err(e) = tier.remove(key) {
                    warn!(tier = tier.name(), key = %key, error = %e, "Token tier remove failed");
                }
            }
        }
        {
            let _slot = self.memory.write();
            self.generation.fetch_add(1, Ordering::AcqRel);
        }

        info!("Token cleared");
    }

    /// Drop only the in-memory slot; the tiers keep their replicas.
    pub fn forget_cached(&self) {
        *self.memory.write() = None;
    }

    /// Classify the current token. Does not clear anything.
    pub fn state(&self) -> TokenState {
        self.get().map_or(TokenState::Absent, |token| token.state())
    }

    /// Whether a live token is held. An expired or undecodable token is
    /// cleared as a side effect.
    pub fn is_valid(&self) -> bool {
        match self.state() {
            TokenState::Valid(_) => true,
            TokenState::Expired => {
                debug!("Stored token expired or unreadable, clearing");
                self.clear();
                false
            }
            TokenState::Absent => false,
        }
    }

    /// Decoded claims of the current token, expired or not.
    pub fn claims(&self) -> Option<Claims> {
        self.get().and_then(|token| token.claims().ok())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("cached", &self.memory.read().is_some())
            .field("volatile", &self.volatile.name())
            .field("durable", &self.durable.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{OnceLock, Weak};

    use super::*;
    use crate::auth::TierError;
    use crate::testing::{FailingTier, TokenBuilder};

    /// Durable tier that signs the store out while its first read is in flight
    #[derive(Default)]
    struct LogoutDuringRead {
        inner: MemoryTier,
        store: OnceLock<Weak<TokenStore>>,
        fired: AtomicBool,
    }

    impl StorageTier for LogoutDuringRead {
        fn name(&self) -> &str {
            "logout-during-read"
        }

        fn read(&self, key: &str) -> Result<Option<String>, TierError> {
            let value = self.inner.read(key);
            if !self.fired.swap(true, Ordering::SeqCst) {
                if let Some(store) = self.store.get().and_then(Weak::upgrade) {
                    store.clear();
                }
            }
            value
        }

        fn write(&self, key: &str, value: &str) -> Result<(), TierError> {
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), TierError> {
            self.inner.remove(key)
        }
    }

    /// Volatile tier that reads the store back before its first removal
    #[derive(Default)]
    struct ReadDuringClear {
        inner: MemoryTier,
        store: OnceLock<Weak<TokenStore>>,
        seen: OnceLock<Option<Token>>,
    }

    impl StorageTier for ReadDuringClear {
        fn name(&self) -> &str {
            "read-during-clear"
        }

        fn read(&self, key: &str) -> Result<Option<String>, TierError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), TierError> {
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), TierError> {
            if self.seen.get().is_none() {
                if let Some(store) = self.store.get().and_then(Weak::upgrade) {
                    self.seen.set(store.get()).ok();
                }
            }
            self.inner.remove(key)
        }
    }

    fn tiers() -> (Arc<MemoryTier>, Arc<MemoryTier>) {
        (Arc::new(MemoryTier::new()), Arc::new(MemoryTier::new()))
    }

    #[test]
    fn test_last_set_wins() {
        let store = TokenStore::in_memory();
        let first = TokenBuilder::new().subject("a").build();
        let second = TokenBuilder::new().subject("b").build();

        store.set(first);
        store.set(second.clone());
        assert_eq!(store.get(), Some(second));
    }

    #[test]
    fn test_set_writes_every_alias_and_marker() {
        let (volatile, durable) = tiers();
        let store = TokenStore::new(volatile.clone(), durable.clone());
        store.set(Token::new("h.p.s"));

        for key in TOKEN_STORAGE_KEYS {
            assert_eq!(volatile.read(key).unwrap().as_deref(), Some("h.p.s"));
            assert_eq!(durable.read(key).unwrap().as_deref(), Some("h.p.s"));
        }
        assert_eq!(durable.read(AUTH_FLAG_KEY).unwrap().as_deref(), Some("true"));
        assert_eq!(volatile.read(AUTH_FLAG_KEY).unwrap(), None);
    }

    #[test]
    fn test_recovers_from_tiers_and_promotes() {
        let (volatile, durable) = tiers();
        let store = TokenStore::new(volatile.clone(), durable);
        let token = TokenBuilder::new().build();

        store.set(token.clone());
        store.forget_cached();
        volatile.remove("auth_token").unwrap();

        assert_eq!(store.get(), Some(token.clone()));

        // Served from memory once promoted.
        for key in TOKEN_STORAGE_KEYS {
            volatile.remove(key).unwrap();
        }
        assert_eq!(store.get(), Some(token));
    }

    #[test]
    fn test_legacy_alias_only_in_durable_tier() {
        let (volatile, durable) = tiers();
        durable.write("token", "legacy.value.here").unwrap();

        let store = TokenStore::new(volatile, durable);
        assert_eq!(store.get(), Some(Token::new("legacy.value.here")));
    }

    #[test]
    fn test_expired_token_is_cleared_by_is_valid() {
        let (volatile, durable) = tiers();
        let store = TokenStore::new(volatile.clone(), durable.clone());
        store.set(TokenBuilder::new().expired().build());

        assert_eq!(store.state(), TokenState::Expired);
        assert!(!store.is_valid());
        assert!(store.get().is_none());
        assert!(volatile.is_empty());
        assert!(durable.is_empty());
    }

    #[test]
    fn test_live_token_with_unusual_claims_survives_is_valid() {
        let odd_claims = [
            ("sub", serde_json::json!(90_210)),
            ("role", serde_json::json!(["ADMIN", "CLERK"])),
            ("isAdmin", serde_json::json!("true")),
            ("exp", serde_json::json!(4_102_444_800.5)),
        ];

        for (claim, value) in odd_claims {
            let (volatile, durable) = tiers();
            let store = TokenStore::new(volatile, durable.clone());
            store.set(TokenBuilder::new().claim(claim, value).build());

            assert!(store.is_valid(), "{claim} should not end the session");
            assert!(store.get().is_some(), "{claim} should keep the token");
            assert!(!durable.is_empty());
        }
    }

    #[test]
    fn test_clear_during_recovery_is_not_undone() {
        let durable = Arc::new(LogoutDuringRead::default());
        let store = Arc::new(TokenStore::new(Arc::new(MemoryTier::new()), durable.clone()));
        durable.store.set(Arc::downgrade(&store)).ok();

        store.set(TokenBuilder::new().build());
        store.forget_cached();
        durable.fired.store(false, Ordering::SeqCst);
        for key in TOKEN_STORAGE_KEYS {
            store.volatile.remove(key).unwrap();
        }

        assert!(store.get().is_none());
        assert!(store.memory.read().is_none());
        assert!(durable.inner.is_empty());
    }

    #[test]
    fn test_read_while_clearing_does_not_promote() {
        let volatile = Arc::new(ReadDuringClear::default());
        let durable = Arc::new(MemoryTier::new());
        let store = Arc::new(TokenStore::new(volatile.clone(), durable.clone()));
        volatile.store.set(Arc::downgrade(&store)).ok();

        store.set(TokenBuilder::new().build());
        store.clear();

        // The durable replica was still present when the read ran.
        assert_eq!(volatile.seen.get(), Some(&None));
        assert!(store.memory.read().is_none());
        assert!(store.get().is_none());
        assert!(durable.is_empty());
    }

    #[test]
    fn test_undecodable_token_is_invalid() {
        let store = TokenStore::in_memory();
        store.set(Token::new("not-a-jwt"));
        assert!(!store.is_valid());
        assert!(store.get().is_none());
    }

    #[test]
    fn test_failing_tiers_never_block_memory() {
        let store = TokenStore::new(Arc::new(FailingTier::new()), Arc::new(FailingTier::new()));
        let token = TokenBuilder::new().build();

        store.set(token.clone());
        assert_eq!(store.get(), Some(token));
        assert!(store.is_valid());

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_claims_of_current_token() {
        let store = TokenStore::in_memory();
        assert!(store.claims().is_none());

        store.set(TokenBuilder::new().subject("inspector").build());
        assert_eq!(store.claims().unwrap().sub.as_deref(), Some("inspector"));
    }
}
