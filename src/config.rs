use crate::application::ledger_poster::DEFAULT_POSTED_BY;
use crate::application::token_manager::{DEFAULT_SAFETY_MARGIN_SECS, DEFAULT_TOKEN_LIFETIME_SECS};
use crate::domain::provider::ProviderConfig;
use crate::error::{PaymentError, Result};
use crate::infrastructure::btc::adapter::DEFAULT_CURRENCY;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Runtime settings for the gateway, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Identity written on ledger entries.
    pub posted_by: String,
    pub currency: String,
    pub token_lifetime_secs: i64,
    pub token_safety_margin_secs: i64,
    /// No timeout when absent.
    pub request_timeout_secs: Option<u64>,
    pub providers: Vec<ProviderConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            posted_by: DEFAULT_POSTED_BY.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            token_lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
            token_safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
            request_timeout_secs: None,
            providers: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Reads and validates a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: GatewayConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.posted_by.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "posted_by must not be empty".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "currency must not be empty".to_string(),
            ));
        }
        if self.token_safety_margin_secs < 0
            || self.token_lifetime_secs <= self.token_safety_margin_secs
        {
            return Err(PaymentError::Configuration(format!(
                "token lifetime ({}s) must exceed the safety margin ({}s)",
                self.token_lifetime_secs, self.token_safety_margin_secs
            )));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(PaymentError::Configuration(
                "request_timeout_secs must be positive".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.provider) {
                return Err(PaymentError::Configuration(format!(
                    "provider {} configured more than once",
                    provider.provider
                )));
            }
            if provider.base_url.trim().is_empty() {
                return Err(PaymentError::Configuration(format!(
                    "provider {} has no base_url",
                    provider.provider
                )));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_lifetime_secs)
    }

    pub fn token_safety_margin(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_safety_margin_secs)
    }
}
