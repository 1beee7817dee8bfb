use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeResult;
use crate::id::{Address, TxId};
use crate::transaction::SignedTransaction;
use crate::winston::Winston;

/// Decoded tags, grouped by name. A name may carry several values, in submission order.
pub type TagMap = BTreeMap<String, Vec<String>>;

/// The full transaction index, keyed by id.
pub type TransactionIndex = BTreeMap<TxId, TransactionRecord>;

/// Block a transaction was accepted against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub id: String,
    pub height: u64,
}

/// Index entry for one stored transaction.
///
/// Tags are kept decoded and denormalized by name so queries never touch the
/// raw body. Records are immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TxId,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
    pub from: Address,
    pub block: Option<BlockRef>,
    pub tags: TagMap,
}

impl TransactionRecord {
    /// Index a signed transaction: decode its tags and add the synthetic
    /// `from` (and, for transfers, `to`) tags.
    pub fn from_transaction(
        tx: &SignedTransaction,
        block: Option<BlockRef>,
        created_at: DateTime<Utc>,
    ) -> TypeResult<Self> {
        let from = tx.sender()?;
        let mut tags = TagMap::new();
        for tag in &tx.tags {
            let (name, value) = tag.decoded()?;
            tags.entry(name).or_default().push(value);
        }
        tags.insert("from".into(), vec![from.to_string()]);
        if let Some(target) = tx.target_address()? {
            tags.insert("to".into(), vec![target.to_string()]);
        }

        Ok(Self {
            id: tx.id.clone(),
            created_at,
            from,
            block,
            tags,
        })
    }

    /// Whether `name` carries `value` among its entries.
    pub fn has_tag(&self, name: &str, value: &str) -> bool {
        self.tags
            .get(name)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    pub fn first_tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).and_then(|v| v.first()).map(String::as_str)
    }
}

/// A wallet in the session ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: Address,
    pub balance: Winston,
    pub last_tx: String,
}

impl Wallet {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: Winston::zero(),
            last_tx: String::new(),
        }
    }
}
