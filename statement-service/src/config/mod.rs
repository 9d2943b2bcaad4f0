//! Configuration module for statement-service.

use service_core::config as core_config;
use service_core::error::AppError;
use service_core::utils::RetryConfig;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StatementConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub ledger: LedgerSettings,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Behaviour of the ledger engine's service layer.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Recompute the statements after a deleted one.
    pub ripple_on_delete: bool,
    /// Retry policy for transient storage failures.
    pub retry: RetryConfig,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            ripple_on_delete: false,
            retry: RetryConfig::default(),
        }
    }
}

impl LedgerSettings {
    fn from_env() -> Self {
        let defaults = RetryConfig::default();
        Self {
            ripple_on_delete: env::var("LEDGER_RIPPLE_ON_DELETE")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(false),
            retry: RetryConfig {
                max_retries: env::var("STORAGE_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.max_retries),
                initial_backoff: env::var("STORAGE_INITIAL_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.initial_backoff),
                ..defaults
            },
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl StatementConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "statement-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            ledger: LedgerSettings::from_env(),
        })
    }
}
