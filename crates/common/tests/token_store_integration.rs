//! Integration tests for the replicated token store
//!
//! Exercises the store over a real file-backed durable tier to cover the
//! restart path: a new process recovers the session from disk.

use std::sync::Arc;

use civicdesk_common::auth::{AUTH_FLAG_KEY, TOKEN_STORAGE_KEYS};
use civicdesk_common::testing::{FailingTier, TokenBuilder};
use civicdesk_common::{FileTier, MemoryTier, StorageTier, TokenState, TokenStore};

fn file_store(path: &std::path::Path) -> TokenStore {
    TokenStore::new(Arc::new(MemoryTier::new()), Arc::new(FileTier::new(path)))
}

/// A session written by one store is recovered by a fresh store over the
/// same file, as after a restart.
#[test]
fn test_restart_recovers_session_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.json");
    let token = TokenBuilder::new().subject("inspector-3").build();

    file_store(&path).set(token.clone());

    let restarted = file_store(&path);
    assert_eq!(restarted.get(), Some(token));
    assert!(restarted.is_valid());
    match restarted.state() {
        TokenState::Valid(claims) => assert_eq!(claims.sub.as_deref(), Some("inspector-3")),
        other => panic!("expected a valid token, got {other:?}"),
    }
}

/// The durable file carries every alias and the authenticated marker.
#[test]
fn test_durable_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.json");
    file_store(&path).set(TokenBuilder::new().build());

    let contents: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for key in TOKEN_STORAGE_KEYS {
        assert!(contents[key].is_string(), "missing alias {key}");
    }
    assert_eq!(contents[AUTH_FLAG_KEY], "true");
}

/// Dropping the memory slot falls back to the tiers.
#[test]
fn test_forget_cached_then_recover() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir.path().join("tokens.json"));
    let token = TokenBuilder::new().build();

    store.set(token.clone());
    store.forget_cached();
    assert_eq!(store.get(), Some(token));
}

/// An expired session on disk is detected and wiped on the next check.
#[test]
fn test_expired_session_on_disk_is_wiped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.json");
    file_store(&path).set(TokenBuilder::new().expired().build());

    let restarted = file_store(&path);
    assert!(!restarted.is_valid());
    assert!(restarted.get().is_none());

    let tier = FileTier::new(&path);
    for key in TOKEN_STORAGE_KEYS {
        assert_eq!(tier.read(key).unwrap(), None);
    }
}

/// Logout clears both tiers so a restart finds nothing.
#[test]
fn test_clear_is_durable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.json");
    let store = file_store(&path);

    store.set(TokenBuilder::new().build());
    store.clear();

    assert!(file_store(&path).get().is_none());
}

/// A broken durable tier is tried and logged but does not stop the volatile
/// tier from recovering the token.
#[test]
fn test_broken_durable_tier_falls_back_to_volatile() {
    let volatile = Arc::new(MemoryTier::new());
    let durable = Arc::new(FailingTier::new());
    let store = TokenStore::new(volatile.clone(), durable.clone());
    let token = TokenBuilder::new().build();

    store.set(token.clone());
    assert!(durable.attempts() > 0);

    store.forget_cached();
    assert_eq!(store.get(), Some(token));
    assert!(!volatile.is_empty());
}
