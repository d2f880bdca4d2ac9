//! # CivicDesk Domain
//!
//! Domain types for the CivicDesk back-office API access layer.
//!
//! This crate contains:
//! - The uniform [`ResultEnvelope`] and the closed [`ErrorKind`] taxonomy
//! - The decoded [`ResponseBody`] variants
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Authentication, business, project and deletion-request models
//!
//! ## Architecture
//! - No dependencies on other CivicDesk crates
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod envelope;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use envelope::{ApiError, ErrorKind, Recovery, ResultEnvelope};
pub use errors::*;
pub use types::*;
