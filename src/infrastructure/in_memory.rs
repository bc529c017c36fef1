use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{LedgerStore, ProviderConfigStore, TokenStore, TransactionStore};
use crate::domain::provider::{Provider, ProviderConfig};
use crate::domain::token::ProviderToken;
use crate::domain::transaction::{ReferenceKind, Transaction};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for transactions, keyed by original reference.
///
/// Uses `Arc<RwLock<HashMap<String, Transaction>>>` for shared concurrent access.
/// Ideal for testing or single-process deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.original_reference) {
            return Err(PaymentError::DuplicateTransaction(tx.original_reference));
        }
        transactions.insert(tx.original_reference.clone(), tx);
        Ok(())
    }

    async fn update(&self, mut tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        match transactions.get_mut(&tx.original_reference) {
            Some(existing) => {
                // Never unset by a stale snapshot.
                tx.posted_to_ledger |= existing.posted_to_ledger;
                *existing = tx;
                Ok(())
            }
            None => Err(PaymentError::TransactionNotFound(tx.original_reference)),
        }
    }

    async fn find_by_reference(
        &self,
        reference: &str,
        kind: ReferenceKind,
    ) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        let found = match kind {
            ReferenceKind::Original => transactions.get(reference).cloned(),
            ReferenceKind::Provider => transactions
                .values()
                .find(|tx| tx.matches(reference, kind))
                .cloned(),
        };
        Ok(found)
    }

    async fn mark_posted(&self, original_reference: &str) -> Result<bool> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(original_reference)
            .ok_or_else(|| PaymentError::TransactionNotFound(original_reference.to_string()))?;
        if tx.posted_to_ledger {
            return Ok(false);
        }
        tx.posted_to_ledger = true;
        tx.updated_at = Utc::now();
        Ok(true)
    }
}

/// A thread-safe in-memory store for provider tokens.
///
/// Keeps every issued token; expired ones are simply never selected.
#[derive(Default, Clone)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<Vec<ProviderToken>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens ever issued for `provider`.
    pub async fn issued(&self, provider: Provider) -> usize {
        let tokens = self.tokens.read().await;
        tokens.iter().filter(|t| t.provider == provider).count()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, token: ProviderToken) -> Result<()> {
        self.tokens.write().await.push(token);
        Ok(())
    }

    async fn current(
        &self,
        provider: Provider,
        now: DateTime<Utc>,
    ) -> Result<Option<ProviderToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .iter()
            .filter(|t| t.provider == provider && t.is_valid_at(now))
            .max_by_key(|t| t.created_at)
            .cloned())
    }
}

/// A thread-safe in-memory ledger, unique per transaction reference.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    entries: Arc<RwLock<HashMap<String, LedgerEntry>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, in no particular order.
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert(&self, entry: LedgerEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.reference) {
            return Err(PaymentError::DuplicateLedgerEntry(entry.reference));
        }
        entries.insert(entry.reference.clone(), entry);
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<LedgerEntry>> {
        Ok(self.entries.read().await.get(reference).cloned())
    }
}

/// Provider configurations held in memory, typically loaded from the config file.
#[derive(Default, Clone)]
pub struct InMemoryProviderConfigStore {
    configs: Arc<RwLock<HashMap<Provider, ProviderConfig>>>,
}

impl InMemoryProviderConfigStore {
    pub fn new(configs: impl IntoIterator<Item = ProviderConfig>) -> Self {
        let configs = configs.into_iter().map(|c| (c.provider, c)).collect();
        Self {
            configs: Arc::new(RwLock::new(configs)),
        }
    }

    pub async fn upsert(&self, config: ProviderConfig) {
        self.configs.write().await.insert(config.provider, config);
    }
}

#[async_trait]
impl ProviderConfigStore for InMemoryProviderConfigStore {
    async fn active_config(&self, provider: Provider) -> Result<Option<ProviderConfig>> {
        let configs = self.configs.read().await;
        Ok(configs.get(&provider).filter(|c| c.is_active).cloned())
    }
}
