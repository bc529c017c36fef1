use super::ledger::LedgerEntry;
use super::payment::{PaymentRequest, PaymentResponse, StatusRequest};
use super::provider::{Provider, ProviderConfig};
use super::token::{IssuedToken, ProviderToken};
use super::transaction::{ReferenceKind, Transaction};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persists a new record. Fails with `DuplicateTransaction` if the
    /// original reference is already taken.
    async fn create(&self, tx: Transaction) -> Result<()>;
    /// Replaces an existing record. Fails with `TransactionNotFound` otherwise.
    async fn update(&self, tx: Transaction) -> Result<()>;
    async fn find_by_reference(
        &self,
        reference: &str,
        kind: ReferenceKind,
    ) -> Result<Option<Transaction>>;
    /// Flips `posted_to_ledger` from false to true. Returns false if it was
    /// already set.
    async fn mark_posted(&self, original_reference: &str) -> Result<bool>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn save(&self, token: ProviderToken) -> Result<()>;
    /// The most recently created token for `provider` still valid at `now`.
    async fn current(&self, provider: Provider, now: DateTime<Utc>)
    -> Result<Option<ProviderToken>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fails with `DuplicateLedgerEntry` if an entry for the same
    /// transaction reference exists.
    async fn insert(&self, entry: LedgerEntry) -> Result<()>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<LedgerEntry>>;
}

#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    /// Returns the configuration only if it exists and is active.
    async fn active_config(&self, provider: Provider) -> Result<Option<ProviderConfig>>;
}

/// Provider-specific credential exchange.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, config: &ProviderConfig) -> Result<IssuedToken>;
}

/// Capability every provider integration exposes to the orchestrator.
///
/// Configuration, authentication and provider failures come back as a
/// `PaymentResponse` with `success == false`; only faults that leave no
/// recovery path are returned as `Err`.
#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    fn provider(&self) -> Provider;
    async fn deposit(&self, request: &PaymentRequest) -> Result<PaymentResponse>;
    async fn withdraw(&self, request: &PaymentRequest) -> Result<PaymentResponse>;
    async fn get_status(&self, request: &StatusRequest) -> Result<PaymentResponse>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type TransactionStoreArc = Arc<dyn TransactionStore>;
pub type TokenStoreArc = Arc<dyn TokenStore>;
pub type LedgerStoreArc = Arc<dyn LedgerStore>;
pub type ProviderConfigStoreArc = Arc<dyn ProviderConfigStore>;
pub type PaymentAdapterArc = Arc<dyn PaymentAdapter>;
pub type ClockArc = Arc<dyn Clock>;
