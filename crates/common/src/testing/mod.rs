//! Testing utilities and helpers
//!
//! - **[`builders`]**: [`TokenBuilder`] mints unsigned three-segment tokens
//! - **[`mocks`]**: [`FailingTier`], a storage tier that is always down

pub mod builders;
#[cfg(feature = "runtime")]
pub mod mocks;

pub use builders::TokenBuilder;
#[cfg(feature = "runtime")]
pub use mocks::FailingTier;
