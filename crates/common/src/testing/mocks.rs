//! Mock implementations of storage tiers

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::auth::{StorageTier, TierError};

/// Tier whose every operation fails, counting the attempts
#[derive(Debug, Default)]
pub struct FailingTier {
    attempts: AtomicUsize,
}

impl FailingTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read, write and remove calls received.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, op: &str, key: &str) -> Result<T, TierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TierError::Unavailable(format!("{op} {key}: tier offline")))
    }
}

impl StorageTier for FailingTier {
    fn name(&self) -> &str {
        "failing"
    }

    fn read(&self, key: &str) -> Result<Option<String>, TierError> {
        self.fail("read", key)
    }

    fn write(&self, key: &str, _value: &str) -> Result<(), TierError> {
        self.fail("write", key)
    }

    fn remove(&self, key: &str) -> Result<(), TierError> {
        self.fail("remove", key)
    }
}
