//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{Secret, SentinelConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Upstream provider base URL.
pub const UPSTREAM_URL_ENV_VAR: &str = "SENTINEL_UPSTREAM_URL";
/// Upstream provider credential.
pub const UPSTREAM_API_KEY_ENV_VAR: &str = "SENTINEL_UPSTREAM_API_KEY";
/// Risk-evaluation service URL.
pub const RISK_API_URL_ENV_VAR: &str = "SENTINEL_RISK_API_URL";
/// Listener bind address.
pub const BIND_ADDRESS_ENV_VAR: &str = "SENTINEL_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides and validate a TOML file.
pub fn load_config(path: &Path) -> Result<SentinelConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: SentinelConfig = toml::from_str(&content)?;
    finalize(config)
}

/// Build a configuration from defaults and the environment only.
pub fn load_from_env() -> Result<SentinelConfig, ConfigError> {
    finalize(SentinelConfig::default())
}

fn finalize(mut config: SentinelConfig) -> Result<SentinelConfig, ConfigError> {
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay named settings onto a parsed configuration.
///
/// The upstream credential has no file representation; this is the only
/// place it gets populated.
pub fn apply_overrides<F>(config: &mut SentinelConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(UPSTREAM_URL_ENV_VAR) {
        config.upstream.rpc_url = url;
    }
    if let Some(key) = lookup(UPSTREAM_API_KEY_ENV_VAR) {
        config.upstream.api_key = Secret::new(key);
    }
    if let Some(url) = lookup(RISK_API_URL_ENV_VAR) {
        config.risk.api_url = url;
    }
    if let Some(addr) = lookup(BIND_ADDRESS_ENV_VAR) {
        config.listener.bind_address = addr;
    }
}
