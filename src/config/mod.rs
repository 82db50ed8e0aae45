//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → SentinelConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the gate policy atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - The upstream credential is only read from the environment
//! - Only the `gate` section is applied live; the rest needs a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    AdminConfig, GateConfig, IntentConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RejectCleanup, RiskConfig, Secret, SentinelConfig, UpstreamConfig,
};
