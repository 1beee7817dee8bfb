use std::path::PathBuf;

use arsim_types::{Address, TxId, TypeError, Winston};

/// Errors from transaction store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested transaction is not in the store.
    #[error("transaction not found: {0}")]
    NotFound(TxId),

    /// A transaction with this id has already been stored.
    #[error("transaction already stored: {0}")]
    Duplicate(TxId),

    /// The storage location cannot be created, read, or written.
    #[error("store path {path} is not accessible: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The submitted body cannot be indexed.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TypeError),

    /// The on-disk index cannot be decoded.
    #[error("corrupt index {path}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from accepting transactions into the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("malformed transaction: {0}")]
    Malformed(#[from] TypeError),

    #[error("transaction already processed: {0}")]
    Duplicate(TxId),

    #[error("insufficient balance for {address}: has {balance}, needs {required}")]
    InsufficientBalance {
        address: Address,
        balance: Winston,
        required: Winston,
    },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(id) => LedgerError::Duplicate(id),
            StoreError::InvalidTransaction(e) => LedgerError::Malformed(e),
            other => LedgerError::Store(other),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
