use std::sync::Arc;

use async_trait::async_trait;

use arsim_types::{BlockRef, TransactionIndex, TransactionRecord, TxId};

use crate::error::StoreResult;

/// Durable transaction storage.
///
/// All implementations must satisfy these invariants:
/// - A stored record is never modified or overwritten.
/// - `store_transaction` re-checks id uniqueness under its own write lock, so
///   two racing submissions of one id produce exactly one `Ok`.
/// - The index and the body are committed together; if either write fails
///   the transaction is not in the store.
/// - `get_transaction_body` returns the submitted bytes unchanged.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Prepare the backing storage and load existing state.
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn has_transaction(&self, id: &TxId) -> StoreResult<bool>;

    /// Returns `StoreError::NotFound` for unknown ids.
    async fn get_transaction_metadata(&self, id: &TxId) -> StoreResult<TransactionRecord>;

    /// Returns `StoreError::NotFound` for unknown ids.
    async fn get_transaction_body(&self, id: &TxId) -> StoreResult<Vec<u8>>;

    /// Index and persist a signed transaction body.
    async fn store_transaction(
        &self,
        body: &[u8],
        block: Option<BlockRef>,
    ) -> StoreResult<TransactionRecord>;

    /// A consistent snapshot of the whole index.
    async fn index(&self) -> StoreResult<Arc<TransactionIndex>>;
}

/// Parse a submitted body into its index record, stamped with the current time.
pub(crate) fn index_body(body: &[u8], block: Option<BlockRef>) -> StoreResult<TransactionRecord> {
    let tx = arsim_types::SignedTransaction::from_json(body)?;
    Ok(TransactionRecord::from_transaction(
        &tx,
        block,
        chrono::Utc::now(),
    )?)
}
