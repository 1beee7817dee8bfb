use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use arsim_types::{BlockRef, TransactionIndex, TransactionRecord, TxId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{index_body, TransactionStore};

const INDEX_FILE: &str = "txs.json";
const BODY_DIR: &str = "txs";
const PROBE_FILE: &str = ".access-check";

/// Filesystem-backed transaction store.
///
/// On-disk layout under `root`:
/// ```text
/// txs.json        id -> TransactionRecord, one JSON object
/// txs/<id>.json   raw signed body, byte for byte
/// ```
/// Both files are written to a temporary sibling and renamed into place.
/// The body is committed first, so an index entry always has a body.
pub struct FilesystemStore {
    index_path: PathBuf,
    body_dir: PathBuf,
    index: RwLock<Arc<TransactionIndex>>,
}

impl FilesystemStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            index_path: root.join(INDEX_FILE),
            body_dir: root.join(BODY_DIR),
            index: RwLock::new(Arc::new(TransactionIndex::new())),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn body_dir(&self) -> &Path {
        &self.body_dir
    }

    fn body_path(&self, id: &TxId) -> PathBuf {
        self.body_dir.join(format!("{id}.json"))
    }

    async fn check_access(&self) -> StoreResult<()> {
        let inaccessible = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StoreError::Inaccessible { path, source }
        };

        fs::create_dir_all(&self.body_dir)
            .await
            .map_err(inaccessible(&self.body_dir))?;

        let probe = self.body_dir.join(PROBE_FILE);
        fs::write(&probe, b"ok").await.map_err(inaccessible(&probe))?;
        fs::read(&probe).await.map_err(inaccessible(&probe))?;
        fs::remove_file(&probe).await.map_err(inaccessible(&probe))?;
        Ok(())
    }

    async fn load_index(&self) -> StoreResult<TransactionIndex> {
        match fs::read(&self.index_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptIndex {
                path: self.index_path.clone(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = TransactionIndex::new();
                write_atomic(&self.index_path, &encode_index(&empty)?)
                    .await
                    .map_err(|source| StoreError::Inaccessible {
                        path: self.index_path.clone(),
                        source,
                    })?;
                Ok(empty)
            }
            Err(source) => Err(StoreError::Inaccessible {
                path: self.index_path.clone(),
                source,
            }),
        }
    }
}

fn encode_index(index: &TransactionIndex) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(index).map_err(|e| StoreError::Serialization(e.to_string()))
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await
}

#[async_trait]
impl TransactionStore for FilesystemStore {
    async fn init(&self) -> StoreResult<()> {
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Inaccessible {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        self.check_access().await?;
        let loaded = self.load_index().await?;
        info!(
            index = %self.index_path.display(),
            transactions = loaded.len(),
            "transaction store ready"
        );
        *self.index.write().await = Arc::new(loaded);
        Ok(())
    }

    async fn has_transaction(&self, id: &TxId) -> StoreResult<bool> {
        Ok(self.index.read().await.contains_key(id))
    }

    async fn get_transaction_metadata(&self, id: &TxId) -> StoreResult<TransactionRecord> {
        self.index
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn get_transaction_body(&self, id: &TxId) -> StoreResult<Vec<u8>> {
        if !self.has_transaction(id).await? {
            return Err(StoreError::NotFound(id.clone()));
        }
        match fs::read(self.body_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(%id, "indexed transaction has no body file");
                Err(StoreError::NotFound(id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store_transaction(
        &self,
        body: &[u8],
        block: Option<BlockRef>,
    ) -> StoreResult<TransactionRecord> {
        let record = index_body(body, block)?;

        // Held across both writes: the duplicate check and the commit are one step.
        let mut current = self.index.write().await;
        if current.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }

        let mut next = TransactionIndex::clone(&current);
        next.insert(record.id.clone(), record.clone());
        let encoded = encode_index(&next)?;

        let body_path = self.body_path(&record.id);
        write_atomic(&body_path, body).await?;
        if let Err(e) = write_atomic(&self.index_path, &encoded).await {
            if let Err(cleanup) = fs::remove_file(&body_path).await {
                warn!(id = %record.id, error = %cleanup, "failed to remove orphaned body");
            }
            return Err(e.into());
        }

        *current = Arc::new(next);
        debug!(id = %record.id, bytes = body.len(), "transaction stored");
        Ok(record)
    }

    async fn index(&self) -> StoreResult<Arc<TransactionIndex>> {
        Ok(Arc::clone(&*self.index.read().await))
    }
}

impl std::fmt::Debug for FilesystemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesystemStore")
            .field("index_path", &self.index_path)
            .field("body_dir", &self.body_dir)
            .finish()
    }
}
