//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment when one exists
//! 2. Attempts to load from environment variables
//! 3. If the base URL is not set there, falls back to loading from file
//! 4. Probes multiple paths for config files (JSON or TOML)
//!
//! ## Environment Variables
//! - `CIVICDESK_API_BASE_URL`: Backend base URL (required for env loading)
//! - `CIVICDESK_REQUEST_TIMEOUT_SECS`: Deadline for ordinary requests
//! - `CIVICDESK_UPLOAD_TIMEOUT_SECS`: Deadline for file-bearing requests
//! - `CIVICDESK_LOGIN_TIMEOUT_SECS`: Deadline for the login call
//! - `CIVICDESK_HEALTH_TIMEOUT_SECS`: Deadline for health probes
//! - `CIVICDESK_TOKEN_BACKEND`: Durable token tier, `file` or `keychain`
//! - `CIVICDESK_TOKEN_PATH`: Session file for the `file` backend
//! - `CIVICDESK_KEYCHAIN_SERVICE`: Service name for the `keychain` backend
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.{json,toml}`, then `./civicdesk.{json,toml}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use civicdesk_domain::{ApiConfig, CivicDeskError, Config, Result, StorageConfig, TokenBackend};
use url::Url;

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 4] =
    ["config.json", "config.toml", "civicdesk.json", "civicdesk.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `CivicDeskError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The base URL is not an http(s) URL
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only the base URL is required; every other setting keeps its default
/// when unset.
///
/// # Errors
/// Returns `CivicDeskError::Config` if the base URL is missing or any
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let defaults = ApiConfig::default();
    let api = ApiConfig {
        base_url: env_var("CIVICDESK_API_BASE_URL")?,
        request_timeout_secs: env_secs(
            "CIVICDESK_REQUEST_TIMEOUT_SECS",
            defaults.request_timeout_secs,
        )?,
        upload_timeout_secs: env_secs(
            "CIVICDESK_UPLOAD_TIMEOUT_SECS",
            defaults.upload_timeout_secs,
        )?,
        login_timeout_secs: env_secs("CIVICDESK_LOGIN_TIMEOUT_SECS", defaults.login_timeout_secs)?,
        health_timeout_secs: env_secs(
            "CIVICDESK_HEALTH_TIMEOUT_SECS",
            defaults.health_timeout_secs,
        )?,
        user_agent: None,
    };

    let mut storage = StorageConfig::default();
    if let Ok(backend) = std::env::var("CIVICDESK_TOKEN_BACKEND") {
        storage.backend = TokenBackend::from_str(&backend).map_err(CivicDeskError::Config)?;
    }
    storage.path = std::env::var("CIVICDESK_TOKEN_PATH").ok().map(PathBuf::from);
    if let Ok(service) = std::env::var("CIVICDESK_KEYCHAIN_SERVICE") {
        storage.keychain_service = service;
    }

    validate(Config { api, storage })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CivicDeskError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CivicDeskError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CivicDeskError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(InfraError::from)?;
    validate(parse_config(&contents, &config_path)?)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => Ok(serde_json::from_str(contents).map_err(InfraError::from)?),
        _ => Err(CivicDeskError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Reject configurations the client could never use.
fn validate(config: Config) -> Result<Config> {
    let url = Url::parse(&config.api.base_url).map_err(InfraError::from)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CivicDeskError::Config(format!(
            "Base URL must use http or https: {}",
            config.api.base_url
        )));
    }

    let timeouts = [
        ("request", config.api.request_timeout_secs),
        ("upload", config.api.upload_timeout_secs),
        ("login", config.api.login_timeout_secs),
        ("health", config.api.health_timeout_secs),
    ];
    if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
        return Err(CivicDeskError::Config(format!(
            "The {name} timeout must be at least one second"
        )));
    }

    Ok(config)
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    let exe_dir =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf));
    if let Some(exe_dir) = exe_dir {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `CivicDeskError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CivicDeskError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional whole-second duration, `default` when unset.
fn env_secs(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| CivicDeskError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
