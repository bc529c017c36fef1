use super::transaction::{Transaction, TransactionKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status code the back office uses for a settled cash line.
pub const SETTLED_TRANS_STATUS: &str = "1";

/// A back-office cash line produced from a successful transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub description: String,
    pub trans_type: String,
    /// Signed: withdrawals reduce the client's balance.
    pub amount: Decimal,
    pub date_created: DateTime<Utc>,
    pub capture_date: DateTime<Utc>,
    pub trans_status: String,
    pub client_id: String,
    pub paid: bool,
    /// Original (locally generated) reference of the transaction.
    pub reference: String,
    /// Provider reference of the transaction, if any.
    pub reference2: Option<String>,
    pub posted_by: String,
    pub currency: String,
}

impl LedgerEntry {
    pub fn from_transaction(tx: &Transaction, posted_by: &str, now: DateTime<Utc>) -> Self {
        let (description, trans_type, amount) = match tx.kind {
            TransactionKind::Deposit => (
                format!("Mobile Money Deposit - {}", tx.provider),
                "Account Deposit",
                tx.amount.value(),
            ),
            TransactionKind::Withdraw => (
                format!("Mobile Money Withdrawal - {}", tx.provider),
                "Account Withdrawal",
                -tx.amount.value().abs(),
            ),
        };

        Self {
            description,
            trans_type: trans_type.to_string(),
            amount,
            date_created: now,
            capture_date: now,
            trans_status: SETTLED_TRANS_STATUS.to_string(),
            client_id: tx.client_id.clone(),
            paid: true,
            reference: tx.original_reference.clone(),
            reference2: tx.provider_reference.clone(),
            posted_by: posted_by.to_string(),
            currency: tx.currency.clone(),
        }
    }
}
