use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{LedgerStore, TokenStore, TransactionStore};
use crate::domain::provider::Provider;
use crate::domain::token::ProviderToken;
use crate::domain::transaction::{ReferenceKind, Transaction};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for transaction records, keyed by original reference.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family mapping provider references to original references.
pub const CF_PROVIDER_REFS: &str = "provider_refs";
/// Column Family for issued provider tokens.
pub const CF_TOKENS: &str = "tokens";
/// Column Family for ledger entries, keyed by transaction reference.
pub const CF_LEDGER: &str = "ledger";

/// A persistent store implementation using RocksDB.
///
/// Handles transactions, provider tokens and ledger entries using separate
/// Column Families. Read-check-write sequences (create, mark posted, ledger
/// insert) are serialised through an in-process write lock, so a key is never
/// written twice by concurrent callers sharing this store.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_TRANSACTIONS, CF_PROVIDER_REFS, CF_TOKENS, CF_LEDGER]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::Persistence(format!("{} column family not found", name)))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn write_transaction(&self, tx: &Transaction) -> Result<()> {
        self.put_json(CF_TRANSACTIONS, tx.original_reference.as_bytes(), tx)?;
        if let Some(provider_reference) = &tx.provider_reference {
            let cf = self.cf(CF_PROVIDER_REFS)?;
            self.db.put_cf(
                cf,
                provider_reference.as_bytes(),
                tx.original_reference.as_bytes(),
            )?;
        }
        Ok(())
    }
}

fn token_key_prefix(provider: Provider) -> String {
    format!("{}|", provider)
}

fn token_key(token: &ProviderToken) -> String {
    // Zero-padded so keys sort by creation time within a provider.
    format!(
        "{}{:020}|{}",
        token_key_prefix(token.provider),
        token.created_at.timestamp_micros().max(0),
        token.access_token
    )
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn create(&self, tx: Transaction) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_TRANSACTIONS)?;
        if self
            .db
            .get_pinned_cf(cf, tx.original_reference.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::DuplicateTransaction(tx.original_reference));
        }
        self.write_transaction(&tx)
    }

    async fn update(&self, mut tx: Transaction) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let existing: Transaction = self
            .get_json(CF_TRANSACTIONS, tx.original_reference.as_bytes())?
            .ok_or_else(|| PaymentError::TransactionNotFound(tx.original_reference.clone()))?;
        // Never unset by a stale snapshot.
        tx.posted_to_ledger |= existing.posted_to_ledger;
        self.write_transaction(&tx)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
        kind: ReferenceKind,
    ) -> Result<Option<Transaction>> {
        let original_reference = match kind {
            ReferenceKind::Original => reference.to_string(),
            ReferenceKind::Provider => {
                let cf = self.cf(CF_PROVIDER_REFS)?;
                match self.db.get_cf(cf, reference.as_bytes())? {
                    Some(bytes) => String::from_utf8(bytes).map_err(|e| {
                        PaymentError::Persistence(format!("Corrupt provider reference index: {}", e))
                    })?,
                    None => return Ok(None),
                }
            }
        };
        self.get_json(CF_TRANSACTIONS, original_reference.as_bytes())
    }

    async fn mark_posted(&self, original_reference: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut tx: Transaction = self
            .get_json(CF_TRANSACTIONS, original_reference.as_bytes())?
            .ok_or_else(|| PaymentError::TransactionNotFound(original_reference.to_string()))?;
        if tx.posted_to_ledger {
            return Ok(false);
        }
        tx.posted_to_ledger = true;
        tx.updated_at = Utc::now();
        self.write_transaction(&tx)?;
        Ok(true)
    }
}

#[async_trait]
impl TokenStore for RocksDBStore {
    async fn save(&self, token: ProviderToken) -> Result<()> {
        self.put_json(CF_TOKENS, token_key(&token).as_bytes(), &token)
    }

    async fn current(
        &self,
        provider: Provider,
        now: DateTime<Utc>,
    ) -> Result<Option<ProviderToken>> {
        let cf = self.cf(CF_TOKENS)?;
        let prefix = token_key_prefix(provider);
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );

        let mut latest: Option<ProviderToken> = None;
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let token: ProviderToken = serde_json::from_slice(&value)?;
            if token.is_valid_at(now)
                && latest
                    .as_ref()
                    .is_none_or(|current| token.created_at >= current.created_at)
            {
                latest = Some(token);
            }
        }
        Ok(latest)
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn insert(&self, entry: LedgerEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_LEDGER)?;
        if self
            .db
            .get_pinned_cf(cf, entry.reference.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::DuplicateLedgerEntry(entry.reference));
        }
        self.put_json(CF_LEDGER, entry.reference.as_bytes(), &entry)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<LedgerEntry>> {
        self.get_json(CF_LEDGER, reference.as_bytes())
    }
}
