use super::money::Amount;
use super::provider::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    /// Prefix of locally generated references for this kind.
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEP",
            TransactionKind::Withdraw => "WD",
        }
    }
}

/// Lifecycle of a transaction.
///
/// `Pending` is set at creation. `Paused` means the provider accepted a
/// deposit and settles it asynchronously. `Success`, `Failed` and
/// `Cancelled` are terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Paused,
    Success,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Success | TransactionStatus::Failed | TransactionStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        !self.is_terminal() && *self != next
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Paused => "PAUSED",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two identifiers a lookup refers to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ReferenceKind {
    /// Generated locally before the first provider call.
    Original,
    /// Assigned by the provider once it accepted the transaction.
    Provider,
}

impl ReferenceKind {
    pub fn from_flag(use_original_reference: bool) -> Self {
        if use_original_reference {
            ReferenceKind::Original
        } else {
            ReferenceKind::Provider
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub original_reference: String,
    pub provider_reference: Option<String>,
    pub provider: Provider,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: Amount,
    pub currency: String,
    pub client_id: String,
    pub debit_party: String,
    pub credit_party: String,
    pub description: Option<String>,
    pub error_message: Option<String>,
    pub raw_request: Option<String>,
    pub raw_response: Option<String>,
    pub posted_to_ledger: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a `Pending` record that has not been sent anywhere yet.
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        original_reference: String,
        provider: Provider,
        kind: TransactionKind,
        amount: Amount,
        currency: &str,
        client_id: &str,
        debit_party: &str,
        credit_party: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            original_reference,
            provider_reference: None,
            provider,
            kind,
            status: TransactionStatus::Pending,
            amount,
            currency: currency.to_string(),
            client_id: client_id.to_string(),
            debit_party: debit_party.to_string(),
            credit_party: credit_party.to_string(),
            description: None,
            error_message: None,
            raw_request: None,
            raw_response: None,
            posted_to_ledger: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn matches(&self, reference: &str, kind: ReferenceKind) -> bool {
        match kind {
            ReferenceKind::Original => self.original_reference == reference,
            ReferenceKind::Provider => self.provider_reference.as_deref() == Some(reference),
        }
    }

    /// Records a failed attempt.
    pub fn fail(&mut self, error_message: impl Into<String>, now: DateTime<Utc>) {
        self.status = TransactionStatus::Failed;
        self.error_message = Some(error_message.into());
        self.updated_at = now;
    }
}
