//! Durable token tier on the platform keychain
//!
//! macOS Keychain Access, Windows Credential Manager or the Linux Secret
//! Service, through `keyring`. Each storage key becomes one keychain entry
//! under the configured service name.

use keyring::Entry;
use tracing::debug;

use super::tier::{StorageTier, TierError};

pub struct KeychainTier {
    service_name: String,
}

impl KeychainTier {
    /// # Examples
    /// ```
    /// use civicdesk_common::auth::KeychainTier;
    ///
    /// let tier = KeychainTier::new("civicdesk");
    /// assert_eq!(tier.service_name(), "civicdesk");
    /// ```
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> Result<Entry, TierError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            TierError::Unavailable(format!("keychain entry {key} could not be opened: {e}"))
        })
    }
}

impl StorageTier for KeychainTier {
    fn name(&self) -> &str {
        "keychain"
    }

    fn read(&self, key: &str) -> Result<Option<String>, TierError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(TierError::Unavailable(format!("failed to read {key}: {e}"))),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TierError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");
        self.entry(key)?
            .set_password(value)
            .map_err(|e| TierError::Unavailable(format!("failed to store {key}: {e}")))
    }

    fn remove(&self, key: &str) -> Result<(), TierError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(TierError::Unavailable(format!("failed to delete {key}: {e}"))),
        }
    }
}
