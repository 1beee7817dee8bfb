use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use arsim_types::{BlockRef, TransactionIndex, TransactionRecord, TxId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{index_body, TransactionStore};

#[derive(Default)]
struct MemoryState {
    index: Arc<TransactionIndex>,
    bodies: HashMap<TxId, Vec<u8>>,
}

/// In-memory transaction store.
///
/// Intended for tests and embedding. Nothing survives the process.
#[derive(Default)]
pub struct InMemoryTransactionStore {
    state: RwLock<MemoryState>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.index.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn has_transaction(&self, id: &TxId) -> StoreResult<bool> {
        Ok(self.state.read().await.index.contains_key(id))
    }

    async fn get_transaction_metadata(&self, id: &TxId) -> StoreResult<TransactionRecord> {
        self.state
            .read()
            .await
            .index
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn get_transaction_body(&self, id: &TxId) -> StoreResult<Vec<u8>> {
        self.state
            .read()
            .await
            .bodies
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn store_transaction(
        &self,
        body: &[u8],
        block: Option<BlockRef>,
    ) -> StoreResult<TransactionRecord> {
        let record = index_body(body, block)?;
        let mut state = self.state.write().await;
        if state.index.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        let mut next = TransactionIndex::clone(&state.index);
        next.insert(record.id.clone(), record.clone());
        state.index = Arc::new(next);
        state.bodies.insert(record.id.clone(), body.to_vec());
        Ok(record)
    }

    async fn index(&self) -> StoreResult<Arc<TransactionIndex>> {
        Ok(Arc::clone(&self.state.read().await.index))
    }
}

impl std::fmt::Debug for InMemoryTransactionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransactionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use arsim_types::encoding::b64url_encode;
    use arsim_types::Tag;
    use sha2::{Digest, Sha256};

    /// A structurally valid signed body whose id derives from `seed`.
    pub(crate) fn body(seed: &str, reward: u64, tags: &[(&str, &str)]) -> Vec<u8> {
        let signature = format!("signature-{seed}");
        let tags: Vec<Tag> = tags.iter().map(|(n, v)| Tag::from_utf8(n, v)).collect();
        serde_json::to_vec(&serde_json::json!({
            "format": 2,
            "id": b64url_encode(Sha256::digest(signature.as_bytes())),
            "last_tx": "",
            "owner": b64url_encode(format!("owner-{seed}")),
            "tags": tags,
            "target": "",
            "quantity": "0",
            "data": b64url_encode(b"payload"),
            "reward": reward.to_string(),
            "signature": b64url_encode(signature.as_bytes()),
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn store_and_read_back() {
        let store = InMemoryTransactionStore::new();
        let raw = body("a", 10, &[("App", "demo")]);
        let record = store.store_transaction(&raw, None).await.unwrap();

        assert!(store.has_transaction(&record.id).await.unwrap());
        assert_eq!(store.get_transaction_body(&record.id).await.unwrap(), raw);
        let meta = store.get_transaction_metadata(&record.id).await.unwrap();
        assert!(meta.has_tag("App", "demo"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_is_rejected_and_record_kept() {
        let store = InMemoryTransactionStore::new();
        let raw = body("a", 10, &[]);
        let first = store.store_transaction(&raw, None).await.unwrap();
        let block = Some(BlockRef { id: "later".into(), height: 9 });
        let err = store.store_transaction(&raw, block).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref id) if *id == first.id));
        assert_eq!(store.get_transaction_metadata(&first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = InMemoryTransactionStore::new();
        let id = TxId::parse("A".repeat(43)).unwrap();
        assert!(!store.has_transaction(&id).await.unwrap());
        assert!(matches!(
            store.get_transaction_body(&id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn snapshot_is_unaffected_by_later_writes() {
        let store = InMemoryTransactionStore::new();
        store.store_transaction(&body("a", 1, &[]), None).await.unwrap();
        let snapshot = store.index().await.unwrap();
        store.store_transaction(&body("b", 1, &[]), None).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.index().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_body_is_invalid() {
        let store = InMemoryTransactionStore::new();
        let err = store.store_transaction(b"{not json", None).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransaction(_)));
        assert!(store.is_empty().await);
    }
}
