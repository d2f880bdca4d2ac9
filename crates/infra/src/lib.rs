//! # CivicDesk Infrastructure
//!
//! Impure side of the CivicDesk API access layer.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport with hard per-call deadlines
//! - Request execution, response classification and endpoint failover
//! - Authentication, business registry, project and deletion review
//!   operations
//! - The [`ApiClient`] facade the dashboard talks to
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Depends on `civicdesk-domain` for types and `civicdesk-common` for the
//!   token store
//! - Every public operation that can fail returns a `ResultEnvelope`

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, AuthService, BusinessApi, DeletionApi, ProjectApi, SessionGate,
};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, TransportError};
pub use observability::init_tracing;
