use std::time::Duration;

use lending::{Environment, RetryPolicy, ServiceSettings};
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Host-supplied settings for a [`crate::RuntimeHandle`]. Every field has a
/// default, so `{}` is a valid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Ledger RPC endpoint used when a call does not name one.
    pub rpc_url: String,
    /// Base URL of the lending protocol's config API.
    pub lending_config_url: String,
    pub environment: Environment,
    pub http_timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub lamports_per_signature: u64,
    /// How long `shutdown` waits for in-flight work.
    pub shutdown_timeout_ms: u64,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            lending_config_url: "https://api.solend.fi".to_string(),
            environment: Environment::Production,
            http_timeout_ms: 10_000,
            retry_attempts: 3,
            retry_backoff_ms: 250,
            lamports_per_signature: 5_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl SdkConfig {
    /// Parse a JSON document; blank text yields the defaults.
    pub fn from_json(json: &str) -> Result<Self, RelayError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| RelayError::Configuration(e.to_string()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            environment: self.environment,
            lamports_per_signature: self.lamports_per_signature,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn http_client(&self) -> Result<reqwest::Client, RelayError> {
        reqwest::Client::builder()
            .timeout(Duration::from_millis(self.http_timeout_ms))
            .build()
            .map_err(|e| RelayError::Configuration(format!("http client: {e}")))
    }
}
