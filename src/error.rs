use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Authentication(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Provider responded with HTTP {status}")]
    Provider { status: u16, body: String },
    #[error("Storage error: {0}")]
    Persistence(String),
    #[error("Provider {0} not supported yet")]
    NotSupported(String),
    #[error("Invalid provider: {0}")]
    InvalidProvider(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Transaction {0} already exists")]
    DuplicateTransaction(String),
    #[error("Transaction {0} already posted to the ledger")]
    DuplicateLedgerEntry(String),
    #[error("Transaction {0} not found")]
    TransactionNotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PaymentError {
    /// Opaque code reported by the provider, if this error came from one.
    pub fn error_code(&self) -> Option<String> {
        match self {
            PaymentError::Provider { status, .. } => Some(status.to_string()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Transport(err.to_string())
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        PaymentError::Persistence(err.to_string())
    }
}
