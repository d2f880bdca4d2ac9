//! Configuration loading
//!
//! The configuration structs live in `civicdesk-domain`; this module finds
//! and parses them from the environment, `.env` files and config files.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
