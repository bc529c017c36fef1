use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{ClockArc, LedgerStoreArc};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::PaymentError;
use tracing::{error, info, warn};

/// Identity recorded on ledger entries when none is supplied.
pub const DEFAULT_POSTED_BY: &str = "bse-api";

/// What a posting attempt did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// A new entry was written.
    Posted,
    /// The ledger already held an entry for the transaction's reference.
    AlreadyInLedger,
    /// Nothing was written: the transaction is not eligible or the store failed.
    Refused,
}

impl PostOutcome {
    /// Whether the ledger now holds the transaction's entry.
    pub fn in_ledger(self) -> bool {
        matches!(self, PostOutcome::Posted | PostOutcome::AlreadyInLedger)
    }
}

/// Posts successful transactions into the back-office ledger.
///
/// The ledger store rejects a second entry for the same transaction
/// reference, so a transaction contributes at most one entry even when two
/// callers pass the `posted_to_ledger` check at the same time. Flipping that
/// flag afterwards is the caller's job.
pub struct LedgerPoster {
    ledger: LedgerStoreArc,
    clock: ClockArc,
}

impl LedgerPoster {
    pub fn new(ledger: LedgerStoreArc, clock: ClockArc) -> Self {
        Self { ledger, clock }
    }

    pub async fn post(&self, tx: &Transaction, posted_by: &str) -> PostOutcome {
        let reference = tx.original_reference.as_str();

        if tx.posted_to_ledger {
            info!(reference, "Transaction already posted to ledger");
            return PostOutcome::AlreadyInLedger;
        }
        if tx.status != TransactionStatus::Success {
            warn!(reference, status = %tx.status, "Transaction not successful, not posting to ledger");
            return PostOutcome::Refused;
        }
        if tx.client_id.trim().is_empty() {
            error!(reference, "Transaction has no client identifier, cannot post to ledger");
            return PostOutcome::Refused;
        }

        let entry = LedgerEntry::from_transaction(tx, posted_by, self.clock.now());
        info!(
            reference,
            client_id = %entry.client_id,
            amount = %entry.amount,
            "Posting to ledger"
        );

        match self.ledger.insert(entry).await {
            Ok(()) => {
                info!(reference, client_id = %tx.client_id, "Posted transaction to ledger");
                PostOutcome::Posted
            }
            Err(PaymentError::DuplicateLedgerEntry(_)) => {
                info!(reference, "Ledger already holds an entry for transaction");
                PostOutcome::AlreadyInLedger
            }
            Err(e) => {
                error!(reference, error = %e, "Error posting transaction to ledger");
                PostOutcome::Refused
            }
        }
    }
}
