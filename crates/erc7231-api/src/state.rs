//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor, plus the environment-driven [`AppConfig`].
//!
//! ## Architecture
//!
//! AppState holds `Arc`s to the registry components:
//! - **Ledger**: token ownership, the registry's ownership oracle
//! - **Audit log**: every `SetIdentitiesRoot` event, sequence-numbered
//! - **Registry**: root storage, verification, event emission
//!
//! All locks inside are `parking_lot` and never held across `.await`.

use std::sync::Arc;

use erc7231_core::{ClaimEncoding, DigestAlgorithm};
use erc7231_registry::{EventLog, FanOut, IdentityRegistry, RegistryConfig, TokenLedger, TracingSink};
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;

use crate::auth::SecretToken;

/// Log output format for the server binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// A configuration variable held an unusable value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {var}: {reason}")]
pub struct ConfigError {
    /// The environment variable.
    pub var: &'static str,
    /// Why it was rejected.
    pub reason: String,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port to bind.
    pub port: u16,
    /// Bearer token required on `/v1/*`. `None` disables auth.
    pub auth_token: Option<SecretToken>,
    /// Claim encoding and digest algorithm.
    pub registry: RegistryConfig,
    /// Whether `/metrics` is served.
    pub metrics_enabled: bool,
    /// Server log format.
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            registry: RegistryConfig::default(),
            metrics_enabled: true,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// | Variable                  | Default     |
    /// |---------------------------|-------------|
    /// | `PORT`                    | `8080`      |
    /// | `AUTH_TOKEN`              | unset       |
    /// | `ERC7231_CLAIM_ENCODING`  | `compact`   |
    /// | `ERC7231_DIGEST`          | `keccak256` |
    /// | `ERC7231_METRICS_ENABLED` | `true`      |
    /// | `ERC7231_LOG_FORMAT`      | `text`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = port.trim().parse().map_err(|e| ConfigError {
                var: "PORT",
                reason: format!("{e}"),
            })?;
        }

        config.auth_token = lookup("AUTH_TOKEN")
            .filter(|t| !t.is_empty())
            .map(SecretToken::new);

        if let Some(enc) = lookup("ERC7231_CLAIM_ENCODING") {
            config.registry.encoding = enc.parse::<ClaimEncoding>().map_err(|e| ConfigError {
                var: "ERC7231_CLAIM_ENCODING",
                reason: e.to_string(),
            })?;
        }

        if let Some(alg) = lookup("ERC7231_DIGEST") {
            config.registry.algorithm = alg.parse::<DigestAlgorithm>().map_err(|e| ConfigError {
                var: "ERC7231_DIGEST",
                reason: e.to_string(),
            })?;
        }

        if let Some(flag) = lookup("ERC7231_METRICS_ENABLED") {
            config.metrics_enabled = !flag.trim().eq_ignore_ascii_case("false");
        }

        if let Some(fmt) = lookup("ERC7231_LOG_FORMAT") {
            config.log_format = if fmt.trim().eq_ignore_ascii_case("json") {
                LogFormat::Json
            } else {
                LogFormat::Text
            };
        }

        Ok(config)
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Arc<AppConfig>,
    /// Token ownership and approvals.
    pub ledger: Arc<TokenLedger>,
    /// Append-only audit trail of root writes.
    pub audit_log: Arc<EventLog>,
    /// The identity registry.
    pub registry: Arc<IdentityRegistry>,
    /// Prometheus render handle, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state with default configuration and no metrics exporter.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create state from configuration.
    pub fn with_config(config: AppConfig, prometheus: Option<PrometheusHandle>) -> Self {
        let ledger = Arc::new(TokenLedger::new());
        let audit_log = Arc::new(EventLog::new());
        let events = FanOut::new()
            .with(audit_log.clone())
            .with(Arc::new(TracingSink));
        let registry = IdentityRegistry::new(ledger.clone())
            .with_events(Arc::new(events))
            .with_config(config.registry);
        Self {
            config: Arc::new(config),
            ledger,
            audit_log,
            registry: Arc::new(registry),
            prometheus,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
