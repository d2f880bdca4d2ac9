//! Resilient access to the back-office REST service
//!
//! # Architecture
//!
//! - [`RequestExecutor`] runs one call: headers, deadline, decoding,
//!   classification. It never retries.
//! - [`EndpointFailoverProber`] walks ordered candidate routes for
//!   operations whose backend route is not fixed.
//! - [`SessionGate`] refuses privileged operations without a live token.
//! - [`AuthService`], [`BusinessApi`], [`ProjectApi`] and [`DeletionApi`]
//!   are the operations the dashboard calls; [`ApiClient`] wires them to one
//!   shared token store.
//!
//! Every public operation that can fail returns a `ResultEnvelope`; no error
//! type crosses this boundary.

pub mod auth;
pub mod business;
pub mod client;
pub mod decode;
pub mod deletion;
pub mod executor;
pub mod prober;
pub mod projects;
pub mod request;
pub mod session;

pub use auth::AuthService;
pub use business::BusinessApi;
pub use client::{ApiClient, ApiClientBuilder, DEFAULT_SESSION_FILE};
pub use decode::decode_body;
pub use deletion::DeletionApi;
pub use executor::{classify, ApiResponse, Executor, RequestExecutor};
pub use prober::{CandidateEndpoint, EndpointFailoverProber, ProbeDecision, ProbePolicy};
pub use projects::ProjectApi;
pub use request::{ApiRequest, Deadline, RequestBody};
pub use session::SessionGate;
