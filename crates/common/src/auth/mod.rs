//! Bearer token lifecycle
//!
//! - [`token`]: the opaque token, its decoded [`Claims`] and [`TokenState`]
//! - [`tier`]: the [`StorageTier`] seam plus memory and file tiers
//! - [`keychain`]: platform keychain tier (`platform` feature)
//! - [`store`]: [`TokenStore`], which replicates one token across tiers

pub mod token;

#[cfg(feature = "platform")]
pub mod keychain;
#[cfg(feature = "runtime")]
pub mod store;
#[cfg(feature = "runtime")]
pub mod tier;

#[cfg(feature = "platform")]
pub use keychain::KeychainTier;
#[cfg(feature = "runtime")]
pub use store::{TokenStore, AUTH_FLAG_KEY, TOKEN_STORAGE_KEYS};
#[cfg(feature = "runtime")]
pub use tier::{FileTier, MemoryTier, StorageTier, TierError};
pub use token::{Claims, Token, TokenError, TokenState, TOKEN_PREVIEW_CHARS};
