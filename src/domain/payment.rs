use super::money::Amount;
use super::transaction::{ReferenceKind, TransactionStatus};
use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to move money between a subscriber wallet and the merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub provider: String,
    pub client_id: String,
    pub amount: Amount,
    pub subscriber_msisdn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub provider: String,
    pub transaction_reference: String,
    #[serde(default)]
    pub use_original_reference: bool,
}

impl StatusRequest {
    pub fn reference_kind(&self) -> ReferenceKind {
        ReferenceKind::from_flag(self.use_original_reference)
    }
}

/// Outcome reported to the caller of every orchestration operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub success: bool,
    pub message: String,
    /// Provider-assigned reference.
    pub transaction_reference: Option<String>,
    pub original_transaction_reference: Option<String>,
    pub status: Option<TransactionStatus>,
    pub amount: Option<Decimal>,
    pub error_code: Option<String>,
}

impl PaymentResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Failure response for an error caught at the adapter boundary.
    pub fn from_error(err: &PaymentError) -> Self {
        Self {
            error_code: err.error_code(),
            ..Self::failure(err.to_string())
        }
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_original_reference(mut self, reference: &str) -> Self {
        self.original_transaction_reference = Some(reference.to_string());
        self
    }
}
