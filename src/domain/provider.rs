use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The mobile-money networks known to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    Btc,
    Orange,
    Mascom,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Btc => "BTC",
            Provider::Orange => "ORANGE",
            Provider::Mascom => "MASCOM",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = PaymentError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_uppercase().as_str() {
            "BTC" => Ok(Provider::Btc),
            "ORANGE" => Ok(Provider::Orange),
            "MASCOM" => Ok(Provider::Mascom),
            _ => Err(PaymentError::InvalidProvider(name.to_string())),
        }
    }
}

/// Connection and credential settings for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub username: String,
    pub password: String,
    pub merchant_number: String,
    pub merchant_pin: String,
    pub base_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
