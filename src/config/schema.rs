//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SentinelConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream blockchain node.
    pub upstream: UpstreamConfig,

    /// External risk-evaluation service.
    pub risk: RiskConfig,

    /// Decision gate policy (hot reloadable).
    pub gate: GateConfig,

    /// Intent correlation cache settings.
    pub intents: IntentConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8545").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8545".to_string(),
        }
    }
}

/// Credential that must never show up in logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

/// Upstream JSON-RPC provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Provider base URL. The API key, when set, is appended verbatim.
    pub rpc_url: String,

    /// Provider credential. Only ever read from `SENTINEL_UPSTREAM_API_KEY`.
    #[serde(skip)]
    pub api_key: Secret,

    /// Provider-specific method used to broadcast released transactions.
    pub broadcast_method: String,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    /// Full endpoint URL (base URL followed by the credential path segment).
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.rpc_url, self.api_key.expose())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            api_key: Secret::default(),
            broadcast_method: "qn_broadcastRawTransaction".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Risk-evaluation service configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Endpoint receiving the normalized transaction descriptor.
    pub api_url: String,

    /// Request timeout in seconds. A timeout fails closed.
    pub timeout_secs: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/evaluate".to_string(),
            timeout_secs: 15,
        }
    }
}

/// What happens to a staged transaction that is not released.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RejectCleanup {
    /// Keep the staged entry (matches the historical behaviour).
    #[default]
    Retain,
    /// Drop the staged entry once the rejection is sent.
    Remove,
}

/// Decision gate policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// JSON-RPC method intercepted for evaluation.
    pub method: String,

    /// Cleanup policy for rejected or failed submissions.
    pub on_reject: RejectCleanup,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            method: "eth_sendRawTransaction".to_string(),
            on_reject: RejectCleanup::Retain,
        }
    }
}

/// Intent correlation cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct IntentConfig {
    /// Entries whose minute bucket is this old are evicted.
    pub ttl_secs: u64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus listener address.
    pub metrics_address: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,
    pub api_key: String,
}
