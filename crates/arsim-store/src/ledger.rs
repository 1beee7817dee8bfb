use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use arsim_types::{Address, BlockRef, SignedTransaction, TransactionRecord, Winston};

use crate::error::{LedgerError, LedgerResult, StoreError, StoreResult};
use crate::traits::TransactionStore;
use crate::wallets::{WalletLedger, WalletUpdate};

/// Accepts transactions: deduplicates, charges the sender, persists.
///
/// Balances are applied only after the store has committed the transaction.
/// Because the wallet ledger is memory-only, a crash between the two steps
/// loses the in-memory delta together with everything else, and
/// [`Ledger::replay`] on the next start re-derives it from the stored log
/// exactly once.
pub struct Ledger {
    store: Arc<dyn TransactionStore>,
    wallets: WalletLedger,
    accept_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(store: Arc<dyn TransactionStore>, wallets: WalletLedger) -> Self {
        Self {
            store,
            wallets,
            accept_lock: Mutex::new(()),
        }
    }

    /// Initialize the store and replay its transactions over the seeded wallets.
    pub async fn open(store: Arc<dyn TransactionStore>, wallets: WalletLedger) -> StoreResult<Self> {
        store.init().await?;
        let ledger = Self::new(store, wallets);
        ledger.replay().await?;
        Ok(ledger)
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    pub fn wallets(&self) -> &WalletLedger {
        &self.wallets
    }

    /// Re-apply every stored transaction in acceptance order. Returns the count applied.
    pub async fn replay(&self) -> StoreResult<usize> {
        let _guard = self.accept_lock.lock().await;
        let index = self.store.index().await?;
        let mut records: Vec<&TransactionRecord> = index.values().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut applied = 0;
        for record in records {
            let body = match self.store.get_transaction_body(&record.id).await {
                Ok(body) => body,
                Err(StoreError::NotFound(_)) => {
                    warn!(id = %record.id, "skipping transaction without body during replay");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let parsed = SignedTransaction::from_json(&body)
                .and_then(|tx| tx.target_address().map(|target| (tx, target)));
            match parsed {
                Ok((tx, target)) => {
                    self.apply(&tx, record, target.as_ref());
                    applied += 1;
                }
                Err(e) => warn!(id = %record.id, error = %e, "skipping unreadable body during replay"),
            }
        }
        if applied > 0 {
            info!(transactions = applied, "wallet balances replayed from store");
        }
        Ok(applied)
    }

    /// Accept a signed body. The caller has already verified the signature.
    pub async fn accept(
        &self,
        body: &[u8],
        block: Option<BlockRef>,
    ) -> LedgerResult<TransactionRecord> {
        let tx = SignedTransaction::from_json(body)?;
        let sender = tx.sender()?;
        let target = tx.target_address()?;

        let _guard = self.accept_lock.lock().await;
        if self.store.has_transaction(&tx.id).await? {
            return Err(LedgerError::Duplicate(tx.id));
        }

        let required = tx.total_cost();
        let balance = self.wallets.balance(&sender);
        if balance < required {
            return Err(LedgerError::InsufficientBalance {
                address: sender,
                balance,
                required,
            });
        }

        let record = self.store.store_transaction(body, block).await?;
        self.apply(&tx, &record, target.as_ref());
        debug!(id = %record.id, from = %record.from, cost = %required, "transaction accepted");
        Ok(record)
    }

    fn apply(&self, tx: &SignedTransaction, record: &TransactionRecord, target: Option<&Address>) {
        let cost = tx.total_cost();
        let current = self.wallets.balance(&record.from);
        let remaining = current.checked_sub(&cost).unwrap_or_else(|| {
            warn!(address = %record.from, balance = %current, %cost, "balance underflow, clamping to zero");
            Winston::zero()
        });
        self.wallets.update_wallet(
            &record.from,
            WalletUpdate {
                balance: Some(remaining),
                last_tx: Some(record.id.to_string()),
            },
        );

        let Some(target) = target else { return };
        if tx.quantity.is_zero() {
            return;
        }
        let credited = self.wallets.balance(target).add(&tx.quantity);
        self.wallets.update_wallet(
            target,
            WalletUpdate {
                balance: Some(credited),
                last_tx: None,
            },
        );
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("wallets", &self.wallets)
            .finish_non_exhaustive()
    }
}
