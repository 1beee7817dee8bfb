//! Transaction storage and wallet ledger for the arsim simulator.
//!
//! # Storage Backends
//!
//! All backends implement the [`TransactionStore`] trait:
//!
//! - [`FilesystemStore`] -- one JSON index file plus one body file per transaction
//! - [`InMemoryTransactionStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Records are immutable once written; a second write of the same id is
//!    rejected with [`StoreError::Duplicate`], never overwritten.
//! 2. The raw body is stored exactly as submitted.
//! 3. Readers take a snapshot of the index; writers replace it whole.
//! 4. Wallet balances live only in memory and are rebuilt by replaying the
//!    stored transactions over the seed balances.

pub mod error;
pub mod fs;
pub mod ledger;
pub mod memory;
pub mod traits;
pub mod wallets;

pub use error::{LedgerError, LedgerResult, StoreError, StoreResult};
pub use fs::FilesystemStore;
pub use ledger::Ledger;
pub use memory::InMemoryTransactionStore;
pub use traits::TransactionStore;
pub use wallets::{WalletLedger, WalletUpdate};
