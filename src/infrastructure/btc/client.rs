//! HTTP client for the BTC mobile-money API (GSMA style).
//!
//! Provides async access to:
//! - Credential exchange
//! - Merchant payments (deposits)
//! - Disbursements (withdrawals)
//! - Transaction lookups by internal or external reference

use crate::domain::ports::Authenticator;
use crate::domain::provider::ProviderConfig;
use crate::domain::token::IssuedToken;
use crate::domain::transaction::ReferenceKind;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Path prefix of the transaction API below the provider's base URL.
pub const GSMA_PATH: &str = "/mfs-ocpdev/gsma";
pub const INSTITUTION_ID_HEADER: &str = "X-Account-Holding-Institution-Identifier";
pub const INSTITUTION_ID_TYPE_HEADER: &str = "X-Account-Holding-Institution-Identifier-Type";
const INSTITUTION_ID: &str = "smega";
const INSTITUTION_ID_TYPE: &str = "organisationid";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn msisdn(value: &str) -> Vec<Self> {
        vec![Self::new("msisdn", value)]
    }
}

/// Body of a merchant payment or disbursement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub original_transaction_reference: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sub_type: Option<String>,
    pub amount: String,
    pub credit_party: Vec<KeyValue>,
    pub debit_party: Vec<KeyValue>,
    pub custom_data: Vec<KeyValue>,
}

impl TransferPayload {
    /// Subscriber pays the merchant; authorised with the merchant `mpin`.
    pub fn merchant_pay(reference: &str, amount: String, subscriber: &str, config: &ProviderConfig) -> Self {
        Self {
            original_transaction_reference: reference.to_string(),
            sub_type: None,
            amount,
            credit_party: KeyValue::msisdn(&config.merchant_number),
            debit_party: KeyValue::msisdn(subscriber),
            custom_data: vec![KeyValue::new("mpin", &config.merchant_pin)],
        }
    }

    /// Merchant pays the subscriber; authorised with the merchant `pin`.
    pub fn disbursement(reference: &str, amount: String, subscriber: &str, config: &ProviderConfig) -> Self {
        Self {
            original_transaction_reference: reference.to_string(),
            sub_type: Some("cash-in".to_string()),
            amount,
            credit_party: KeyValue::msisdn(subscriber),
            debit_party: KeyValue::msisdn(&config.merchant_number),
            custom_data: vec![KeyValue::new("pin", &config.merchant_pin)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReply {
    pub transaction_reference: Option<String>,
    pub description_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    #[serde(default)]
    pub amount: Decimal,
    pub description_text: Option<String>,
    pub transaction_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthReply {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Async client for the BTC API.
#[derive(Debug, Clone)]
pub struct BtcClient {
    http: reqwest::Client,
}

impl BtcClient {
    /// Create a client. Without a timeout a hanging provider call hangs the
    /// request that issued it.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    fn url(config: &ProviderConfig, path: &str) -> String {
        format!("{}{}", config.base_url.trim_end_matches('/'), path)
    }

    /// The reference is pushed as a single escaped path segment, so `/`, `?`
    /// or `#` inside it cannot redirect the lookup.
    fn status_url(config: &ProviderConfig, reference: &str, kind: ReferenceKind) -> Result<Url> {
        let segment = match kind {
            ReferenceKind::Original => "external",
            ReferenceKind::Provider => "internal",
        };
        let base = Self::url(config, &format!("{}/transactions/{}", GSMA_PATH, segment));
        let mut url = Url::parse(&base).map_err(|e| {
            PaymentError::Configuration(format!("Invalid base URL {}: {}", config.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                PaymentError::Configuration(format!("Base URL {} cannot carry a path", config.base_url))
            })?
            .push(reference);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .header(INSTITUTION_ID_HEADER, INSTITUTION_ID)
            .header(INSTITUTION_ID_TYPE_HEADER, INSTITUTION_ID_TYPE)
    }

    /// Sends the request and returns the raw body of a success response.
    /// Non-success statuses become `PaymentError::Provider` carrying the body.
    async fn send(&self, builder: RequestBuilder) -> Result<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "Provider responded");

        if status.is_success() {
            Ok(body)
        } else {
            Err(PaymentError::Provider {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Initiate a merchant payment (deposit).
    pub async fn merchant_pay(
        &self,
        config: &ProviderConfig,
        token: &str,
        payload: &TransferPayload,
    ) -> Result<String> {
        let url = Self::url(config, &format!("{}/transactions/type/merchantpay", GSMA_PATH));
        let request = self.authorized(self.http.post(&url), token).json(payload);
        self.send(request).await
    }

    /// Initiate a disbursement (withdrawal).
    pub async fn disbursement(
        &self,
        config: &ProviderConfig,
        token: &str,
        payload: &TransferPayload,
    ) -> Result<String> {
        let url = Self::url(config, &format!("{}/transactions/type/disbursement", GSMA_PATH));
        let request = self.authorized(self.http.post(&url), token).json(payload);
        self.send(request).await
    }

    /// Look a transaction up. Original references are queried on the
    /// `external` path, provider references on the `internal` one.
    pub async fn transaction_status(
        &self,
        config: &ProviderConfig,
        token: &str,
        reference: &str,
        kind: ReferenceKind,
    ) -> Result<String> {
        let url = Self::status_url(config, reference, kind)?;
        let request = self.authorized(self.http.get(url), token);
        self.send(request).await
    }
}

#[async_trait]
impl Authenticator for BtcClient {
    async fn authenticate(&self, config: &ProviderConfig) -> Result<IssuedToken> {
        let url = Self::url(config, "/security-services");
        let request = self.http.post(&url).json(&Credentials {
            username: &config.username,
            password: &config.password,
        });

        let body = self.send(request).await.map_err(|e| match e {
            PaymentError::Provider { status, body } => {
                error!(status, body = %body, "Failed to obtain token");
                PaymentError::Authentication(format!("Credential exchange returned HTTP {}", status))
            }
            other => other,
        })?;

        let reply: AuthReply = serde_json::from_str(&body)?;
        match reply.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(IssuedToken {
                access_token,
                expires_in: reply.expires_in,
            }),
            _ => {
                error!(body = %body, "Credential exchange returned no token");
                Err(PaymentError::Authentication(
                    "Credential exchange returned no token".to_string(),
                ))
            }
        }
    }
}
