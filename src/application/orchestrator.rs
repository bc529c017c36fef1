use super::ledger_poster::{DEFAULT_POSTED_BY, LedgerPoster, PostOutcome};
use crate::domain::payment::{PaymentRequest, PaymentResponse, StatusRequest};
use crate::domain::ports::{PaymentAdapterArc, TransactionStoreArc};
use crate::domain::provider::Provider;
use crate::domain::transaction::TransactionStatus;
use crate::error::{PaymentError, Result};
use std::collections::HashMap;
use tracing::{error, info, warn};

/// The main entry point for payment operations.
///
/// `PaymentOrchestrator` resolves the adapter for the requested provider,
/// delegates to it and, when a status check confirms success, posts the
/// transaction to the ledger. Adapters are handed in at construction; there
/// is no runtime lookup.
pub struct PaymentOrchestrator {
    adapters: HashMap<Provider, PaymentAdapterArc>,
    transactions: TransactionStoreArc,
    poster: LedgerPoster,
    posted_by: String,
}

impl PaymentOrchestrator {
    /// Creates a new `PaymentOrchestrator`.
    ///
    /// # Arguments
    ///
    /// * `adapters` - One adapter per supported provider, keyed by `PaymentAdapter::provider`.
    /// * `transactions` - The store the adapters record transactions in.
    /// * `poster` - Posts confirmed transactions to the ledger.
    pub fn new(
        adapters: impl IntoIterator<Item = PaymentAdapterArc>,
        transactions: TransactionStoreArc,
        poster: LedgerPoster,
    ) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.provider(), a)).collect(),
            transactions,
            poster,
            posted_by: DEFAULT_POSTED_BY.to_string(),
        }
    }

    pub fn with_posted_by(mut self, posted_by: impl Into<String>) -> Self {
        self.posted_by = posted_by.into();
        self
    }

    pub fn supported_providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.adapters.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    fn resolve(&self, provider_name: &str) -> std::result::Result<&PaymentAdapterArc, PaymentResponse> {
        let provider: Provider = provider_name
            .parse()
            .map_err(|e: PaymentError| PaymentResponse::from_error(&e))?;
        self.adapters.get(&provider).ok_or_else(|| {
            warn!(%provider, "No adapter registered for provider");
            PaymentResponse::from_error(&PaymentError::NotSupported(provider_name.to_string()))
        })
    }

    /// Initiates a deposit (subscriber pays merchant).
    pub async fn deposit(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        info!(
            provider = %request.provider,
            amount = %request.amount,
            subscriber = %request.subscriber_msisdn,
            "Deposit request"
        );
        match self.resolve(&request.provider) {
            Ok(adapter) => adapter.deposit(request).await,
            Err(response) => Ok(response),
        }
    }

    /// Initiates a withdrawal (merchant pays subscriber).
    pub async fn withdraw(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        info!(
            provider = %request.provider,
            amount = %request.amount,
            subscriber = %request.subscriber_msisdn,
            "Withdraw request"
        );
        match self.resolve(&request.provider) {
            Ok(adapter) => adapter.withdraw(request).await,
            Err(response) => Ok(response),
        }
    }

    /// Checks a transaction with its provider and posts it to the ledger
    /// once it is confirmed. Posting never changes what is reported.
    pub async fn check_status(&self, request: &StatusRequest) -> Result<PaymentResponse> {
        info!(
            provider = %request.provider,
            reference = %request.transaction_reference,
            "Status check"
        );
        let adapter = match self.resolve(&request.provider) {
            Ok(adapter) => adapter,
            Err(response) => return Ok(response),
        };

        let response = adapter.get_status(request).await?;
        if response.success && response.status == Some(TransactionStatus::Success) {
            self.post_to_ledger(request).await;
        }
        Ok(response)
    }

    async fn post_to_ledger(&self, request: &StatusRequest) {
        let reference = request.transaction_reference.as_str();
        let tx = match self
            .transactions
            .find_by_reference(reference, request.reference_kind())
            .await
        {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                warn!(reference, "Transaction not found locally, cannot post to ledger");
                return;
            }
            Err(e) => {
                error!(reference, error = %e, "Could not load transaction for ledger posting");
                return;
            }
        };

        if tx.posted_to_ledger {
            info!(reference, "Transaction already posted to ledger");
            return;
        }

        info!(reference, client_id = %tx.client_id, "Posting transaction to ledger");
        match self.poster.post(&tx, &self.posted_by).await {
            PostOutcome::Posted => {}
            // An earlier run wrote the entry but never flagged the record.
            PostOutcome::AlreadyInLedger => {
                info!(reference, "Ledger entry already present, flagging transaction")
            }
            PostOutcome::Refused => {
                error!(reference, "Failed to post transaction to ledger");
                return;
            }
        }

        match self.transactions.mark_posted(&tx.original_reference).await {
            Ok(true) => info!(reference, "Transaction marked as posted"),
            Ok(false) => warn!(reference, "Transaction was already marked as posted"),
            Err(e) => error!(
                reference,
                error = %e,
                "Ledger entry written but transaction could not be marked as posted"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::ports::{PaymentAdapter, TransactionStore};
    use crate::domain::transaction::{ReferenceKind, Transaction, TransactionKind};
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryTransactionStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter that reports a fixed status for every lookup.
    struct ScriptedAdapter {
        status: TransactionStatus,
        status_calls: AtomicUsize,
    }

    impl ScriptedAdapter {
        fn new(status: TransactionStatus) -> Self {
            Self {
                status,
                status_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentAdapter for ScriptedAdapter {
        fn provider(&self) -> Provider {
            Provider::Btc
        }

        async fn deposit(&self, _request: &PaymentRequest) -> Result<PaymentResponse> {
            Ok(PaymentResponse {
                success: true,
                message: "deposit".to_string(),
                ..Default::default()
            })
        }

        async fn withdraw(&self, _request: &PaymentRequest) -> Result<PaymentResponse> {
            Ok(PaymentResponse {
                success: true,
                message: "withdraw".to_string(),
                ..Default::default()
            })
        }

        async fn get_status(&self, _request: &StatusRequest) -> Result<PaymentResponse> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentResponse {
                success: true,
                message: "Transaction Success".to_string(),
                status: Some(self.status),
                amount: Some(dec!(50.00)),
                ..Default::default()
            })
        }
    }

    struct Fixture {
        orchestrator: PaymentOrchestrator,
        transactions: InMemoryTransactionStore,
        ledger: InMemoryLedgerStore,
    }

    fn fixture(status: TransactionStatus) -> Fixture {
        let transactions = InMemoryTransactionStore::new();
        let ledger = InMemoryLedgerStore::new();
        let poster = LedgerPoster::new(Arc::new(ledger.clone()), Arc::new(SystemClock));
        let adapter: PaymentAdapterArc = Arc::new(ScriptedAdapter::new(status));
        let orchestrator =
            PaymentOrchestrator::new([adapter], Arc::new(transactions.clone()), poster);
        Fixture {
            orchestrator,
            transactions,
            ledger,
        }
    }

    async fn seed(store: &InMemoryTransactionStore, status: TransactionStatus) {
        let mut tx = Transaction::pending(
            "DEP-1".to_string(),
            Provider::Btc,
            TransactionKind::Deposit,
            Amount::new(dec!(50.00)).unwrap(),
            "BWP",
            "CDS-1",
            "71234567",
            "70000000",
            Utc::now(),
        );
        tx.provider_reference = Some("PRV1".to_string());
        tx.status = status;
        store.create(tx).await.unwrap();
    }

    fn payment(provider: &str) -> PaymentRequest {
        PaymentRequest {
            provider: provider.to_string(),
            client_id: "CDS-1".to_string(),
            amount: Amount::new(dec!(10)).unwrap(),
            subscriber_msisdn: "71234567".to_string(),
        }
    }

    fn status_request(reference: &str) -> StatusRequest {
        StatusRequest {
            provider: "btc".to_string(),
            transaction_reference: reference.to_string(),
            use_original_reference: false,
        }
    }

    #[tokio::test]
    async fn test_invalid_provider_is_a_failure_response() {
        let f = fixture(TransactionStatus::Success);
        let response = f.orchestrator.deposit(&payment("MPESA")).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.message, "Invalid provider: MPESA");
    }

    #[tokio::test]
    async fn test_known_provider_without_adapter_is_not_supported() {
        let f = fixture(TransactionStatus::Success);
        let response = f.orchestrator.withdraw(&payment("Orange")).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.message, "Provider Orange not supported yet");
    }

    #[tokio::test]
    async fn test_delegates_to_adapter() {
        let f = fixture(TransactionStatus::Success);
        assert_eq!(f.orchestrator.supported_providers(), vec![Provider::Btc]);
        let response = f.orchestrator.deposit(&payment("BTC")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.message, "deposit");
        let response = f.orchestrator.withdraw(&payment("btc")).await.unwrap();
        assert_eq!(response.message, "withdraw");
    }

    #[tokio::test]
    async fn test_successful_status_posts_once() {
        let f = fixture(TransactionStatus::Success);
        seed(&f.transactions, TransactionStatus::Success).await;

        for _ in 0..3 {
            let response = f.orchestrator.check_status(&status_request("PRV1")).await.unwrap();
            assert_eq!(response.status, Some(TransactionStatus::Success));
        }

        assert_eq!(f.ledger.entries().await.len(), 1);
        let tx = f
            .transactions
            .find_by_reference("DEP-1", ReferenceKind::Original)
            .await
            .unwrap()
            .unwrap();
        assert!(tx.posted_to_ledger);
    }

    #[tokio::test]
    async fn test_existing_ledger_entry_heals_unflagged_transaction() {
        use crate::domain::ledger::LedgerEntry;
        use crate::domain::ports::LedgerStore;

        let f = fixture(TransactionStatus::Success);
        seed(&f.transactions, TransactionStatus::Success).await;
        // Entry written by a run that stopped before flagging the record.
        let tx = f
            .transactions
            .find_by_reference("DEP-1", ReferenceKind::Original)
            .await
            .unwrap()
            .unwrap();
        f.ledger
            .insert(LedgerEntry::from_transaction(&tx, DEFAULT_POSTED_BY, Utc::now()))
            .await
            .unwrap();

        for _ in 0..3 {
            f.orchestrator.check_status(&status_request("PRV1")).await.unwrap();
        }

        let tx = f
            .transactions
            .find_by_reference("DEP-1", ReferenceKind::Original)
            .await
            .unwrap()
            .unwrap();
        assert!(tx.posted_to_ledger);
        assert_eq!(f.ledger.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_status_does_not_post() {
        let f = fixture(TransactionStatus::Pending);
        seed(&f.transactions, TransactionStatus::Paused).await;

        let response = f.orchestrator.check_status(&status_request("PRV1")).await.unwrap();
        assert_eq!(response.status, Some(TransactionStatus::Pending));
        assert!(f.ledger.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_reference_still_reports_status() {
        let f = fixture(TransactionStatus::Success);

        let response = f.orchestrator.check_status(&status_request("PRV404")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.status, Some(TransactionStatus::Success));
        assert_eq!(response.amount, Some(dec!(50.00)));
        assert!(f.ledger.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_posted_by_is_configurable() {
        let f = fixture(TransactionStatus::Success);
        let orchestrator = f.orchestrator.with_posted_by("ops-desk");
        seed(&f.transactions, TransactionStatus::Success).await;

        orchestrator.check_status(&status_request("PRV1")).await.unwrap();
        let entries = f.ledger.entries().await;
        assert_eq!(entries[0].posted_by, "ops-desk");
    }
}
