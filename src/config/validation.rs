//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and URLs.
//! Every problem is reported, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::SentinelConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &SentinelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Err(e) = url::Url::parse(&config.upstream.endpoint()) {
        errors.push(ValidationError::new("upstream.rpc_url", format!("invalid URL: {}", e)));
    }
    if config.upstream.broadcast_method.trim().is_empty() {
        errors.push(ValidationError::new("upstream.broadcast_method", "must not be empty"));
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }

    if let Err(e) = url::Url::parse(&config.risk.api_url) {
        errors.push(ValidationError::new("risk.api_url", format!("invalid URL: {}", e)));
    }
    if config.risk.timeout_secs == 0 {
        errors.push(ValidationError::new("risk.timeout_secs", "must be greater than 0"));
    }

    if config.gate.method.trim().is_empty() {
        errors.push(ValidationError::new("gate.method", "must not be empty"));
    }

    if config.intents.ttl_secs < 60 {
        errors.push(ValidationError::new(
            "intents.ttl_secs",
            "must cover at least one minute bucket",
        ));
    }

    // A gated call makes one risk call and up to two upstream calls (chain id,
    // broadcast); the request deadline must outlast all of them.
    let gated_budget = config
        .risk
        .timeout_secs
        .saturating_add(config.upstream.timeout_secs.saturating_mul(2));
    if config.timeouts.request_secs <= gated_budget {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed risk.timeout_secs + 2 * upstream.timeout_secs ({}s)",
                gated_budget
            ),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin API is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
