//! Modular common utilities shared across CivicDesk crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: bearer token model and claims decoding
//! - `runtime`: storage tiers and the replicated [`TokenStore`]
//! - `platform`: the platform keychain storage tier
//! - `observability`: tracing for swallowed failures (implied by `runtime`)
//! - `test-utils`: token builders and failing tiers for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

#[cfg(feature = "foundation")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "foundation")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use auth::KeychainTier;
#[cfg(feature = "foundation")]
pub use auth::{Claims, Token, TokenError, TokenState};
#[cfg(feature = "runtime")]
pub use auth::{FileTier, MemoryTier, StorageTier, TierError, TokenStore};
