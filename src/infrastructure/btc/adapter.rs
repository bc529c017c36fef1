use super::client::{BtcClient, StatusReply, TransferPayload, TransferReply};
use crate::application::token_manager::TokenManager;
use crate::domain::payment::{PaymentRequest, PaymentResponse, StatusRequest};
use crate::domain::ports::{ClockArc, PaymentAdapter, ProviderConfigStoreArc, TransactionStoreArc};
use crate::domain::provider::{Provider, ProviderConfig};
use crate::domain::reference;
use crate::domain::transaction::{ReferenceKind, Transaction, TransactionKind, TransactionStatus};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Currency recorded on transactions unless configured otherwise.
pub const DEFAULT_CURRENCY: &str = "BWP";
/// Fresh references tried before giving up on a collision.
const REFERENCE_ATTEMPTS: usize = 3;

/// Derives a status from the provider's free-text description.
///
/// The provider exposes no status code on lookups; any description that
/// contains "success" (case-insensitive) counts as settled, anything else as
/// still pending.
pub fn derive_status(description: Option<&str>) -> TransactionStatus {
    match description {
        Some(text) if text.to_lowercase().contains("success") => TransactionStatus::Success,
        _ => TransactionStatus::Pending,
    }
}

/// `PaymentAdapter` for the BTC mobile-money network.
pub struct BtcAdapter {
    configs: ProviderConfigStoreArc,
    tokens: Arc<TokenManager>,
    transactions: TransactionStoreArc,
    client: BtcClient,
    clock: ClockArc,
    currency: String,
}

impl BtcAdapter {
    pub fn new(
        configs: ProviderConfigStoreArc,
        tokens: Arc<TokenManager>,
        transactions: TransactionStoreArc,
        client: BtcClient,
        clock: ClockArc,
    ) -> Self {
        Self {
            configs,
            tokens,
            transactions,
            client,
            clock,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Loads the active configuration and a bearer token.
    async fn prepare(&self) -> Result<(ProviderConfig, String)> {
        let config = self
            .configs
            .active_config(Provider::Btc)
            .await?
            .ok_or_else(|| {
                warn!(provider = %Provider::Btc, "Provider not configured");
                PaymentError::Configuration(format!("{} provider not configured", Provider::Btc))
            })?;

        let token = self
            .tokens
            .get_token(&config, &self.client)
            .await?
            .ok_or_else(|| {
                PaymentError::Authentication("Failed to obtain authentication token".to_string())
            })?;

        Ok((config, token))
    }

    /// Persists a `Pending` record under a fresh original reference and
    /// returns it with the payload that will be sent.
    async fn open_transaction(
        &self,
        request: &PaymentRequest,
        kind: TransactionKind,
        config: &ProviderConfig,
    ) -> Result<(Transaction, TransferPayload)> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let now = self.clock.now();
            let original_reference = reference::generate(kind.reference_prefix(), now);
            let amount = request.amount.to_wire();
            let subscriber = request.subscriber_msisdn.as_str();

            let (payload, debit, credit) = match kind {
                TransactionKind::Deposit => (
                    TransferPayload::merchant_pay(&original_reference, amount, subscriber, config),
                    subscriber,
                    config.merchant_number.as_str(),
                ),
                TransactionKind::Withdraw => (
                    TransferPayload::disbursement(&original_reference, amount, subscriber, config),
                    config.merchant_number.as_str(),
                    subscriber,
                ),
            };

            let mut tx = Transaction::pending(
                original_reference,
                Provider::Btc,
                kind,
                request.amount,
                &self.currency,
                &request.client_id,
                debit,
                credit,
                now,
            );
            tx.raw_request = serde_json::to_string(&payload).ok();

            match self.transactions.create(tx.clone()).await {
                Ok(()) => return Ok((tx, payload)),
                Err(PaymentError::DuplicateTransaction(reference)) if attempts < REFERENCE_ATTEMPTS => {
                    warn!(reference = %reference, "Generated reference already in use, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn initiate(&self, request: &PaymentRequest, kind: TransactionKind) -> Result<PaymentResponse> {
        let (config, token) = match self.prepare().await {
            Ok(prepared) => prepared,
            Err(e) => return Ok(PaymentResponse::from_error(&e)),
        };

        let (mut tx, payload) = match self.open_transaction(request, kind, &config).await {
            Ok(opened) => opened,
            Err(e) => {
                error!(error = %e, "Could not record transaction, nothing sent to provider");
                return Ok(PaymentResponse::from_error(&e));
            }
        };
        let original_reference = tx.original_reference.clone();

        let outcome = match kind {
            TransactionKind::Deposit => self.client.merchant_pay(&config, &token, &payload).await,
            TransactionKind::Withdraw => self.client.disbursement(&config, &token, &payload).await,
        };

        let (accepted_status, accepted_message, rejected_message) = match kind {
            TransactionKind::Deposit => (TransactionStatus::Paused, "Transaction initiated", "Transaction failed"),
            // Disbursements are treated as settled once accepted.
            TransactionKind::Withdraw => (TransactionStatus::Success, "Withdrawal successful", "Withdrawal failed"),
        };

        let now = self.clock.now();
        let response = match outcome {
            Ok(body) => {
                tx.raw_response = Some(body.clone());
                match serde_json::from_str::<TransferReply>(&body) {
                    Ok(reply) => {
                        tx.provider_reference = reply.transaction_reference;
                        tx.description = reply.description_text;
                        tx.status = accepted_status;
                        tx.updated_at = now;
                        info!(
                            reference = %original_reference,
                            provider_reference = ?tx.provider_reference,
                            status = %accepted_status,
                            "Provider accepted transaction"
                        );
                        PaymentResponse {
                            success: true,
                            message: tx
                                .description
                                .clone()
                                .unwrap_or_else(|| accepted_message.to_string()),
                            transaction_reference: tx.provider_reference.clone(),
                            original_transaction_reference: Some(original_reference.clone()),
                            status: Some(accepted_status),
                            amount: Some(request.amount.value()),
                            error_code: None,
                        }
                    }
                    Err(e) => {
                        error!(reference = %original_reference, error = %e, "Unreadable provider reply");
                        tx.fail(e.to_string(), now);
                        PaymentResponse::failure(e.to_string())
                            .with_status(TransactionStatus::Failed)
                            .with_original_reference(&original_reference)
                    }
                }
            }
            Err(PaymentError::Provider { status, body }) => {
                warn!(reference = %original_reference, status, "Provider rejected transaction");
                tx.raw_response = Some(body.clone());
                tx.fail(body, now);
                PaymentResponse {
                    error_code: Some(status.to_string()),
                    ..PaymentResponse::failure(rejected_message)
                        .with_status(TransactionStatus::Failed)
                        .with_original_reference(&original_reference)
                }
            }
            Err(e) => {
                error!(reference = %original_reference, error = %e, "Error calling provider");
                tx.fail(e.to_string(), now);
                PaymentResponse::from_error(&e)
                    .with_status(TransactionStatus::Failed)
                    .with_original_reference(&original_reference)
            }
        };

        // The provider has been contacted; a record we cannot write is a fault.
        self.transactions.update(tx).await?;
        Ok(response)
    }

    /// Moves the local record to the provider-derived status when the state
    /// machine allows it. Returns the original reference if a record exists.
    async fn reconcile(
        &self,
        reference: &str,
        kind: ReferenceKind,
        status: TransactionStatus,
        description: Option<String>,
    ) -> Result<Option<String>> {
        let Some(mut tx) = self.transactions.find_by_reference(reference, kind).await? else {
            debug!(reference, "Transaction not known locally");
            return Ok(None);
        };
        let original_reference = tx.original_reference.clone();

        if tx.status == status {
            return Ok(Some(original_reference));
        }
        if !tx.status.can_transition_to(status) {
            warn!(
                reference,
                stored = %tx.status,
                reported = %status,
                "Ignoring provider status for transaction in terminal state"
            );
            return Ok(Some(original_reference));
        }

        info!(reference, from = %tx.status, to = %status, "Updating transaction status");
        tx.status = status;
        tx.description = description;
        tx.updated_at = self.clock.now();
        self.transactions.update(tx).await?;
        Ok(Some(original_reference))
    }
}

#[async_trait]
impl PaymentAdapter for BtcAdapter {
    fn provider(&self) -> Provider {
        Provider::Btc
    }

    async fn deposit(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        self.initiate(request, TransactionKind::Deposit).await
    }

    async fn withdraw(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        self.initiate(request, TransactionKind::Withdraw).await
    }

    async fn get_status(&self, request: &StatusRequest) -> Result<PaymentResponse> {
        let (config, token) = match self.prepare().await {
            Ok(prepared) => prepared,
            Err(e) => return Ok(PaymentResponse::from_error(&e)),
        };
        let reference = request.transaction_reference.as_str();
        let kind = request.reference_kind();

        let body = match self
            .client
            .transaction_status(&config, &token, reference, kind)
            .await
        {
            Ok(body) => body,
            Err(e @ PaymentError::Provider { .. }) => {
                warn!(reference, error = %e, "Provider does not know transaction");
                return Ok(PaymentResponse {
                    error_code: e.error_code(),
                    ..PaymentResponse::failure("Transaction not found")
                });
            }
            Err(e) => {
                error!(reference, error = %e, "Error checking transaction status");
                return Ok(PaymentResponse::from_error(&e));
            }
        };

        let reply: StatusReply = match serde_json::from_str(&body) {
            Ok(reply) => reply,
            Err(e) => {
                error!(reference, error = %e, "Unreadable status reply");
                return Ok(PaymentResponse::from_error(&PaymentError::from(e)));
            }
        };

        let status = derive_status(reply.description_text.as_deref());
        let original_reference = self
            .reconcile(reference, kind, status, reply.description_text.clone())
            .await?;

        Ok(PaymentResponse {
            success: true,
            message: reply
                .description_text
                .unwrap_or_else(|| "Transaction found".to_string()),
            transaction_reference: reply.transaction_reference,
            original_transaction_reference: original_reference,
            status: Some(status),
            amount: Some(reply.amount),
            error_code: None,
        })
    }
}
