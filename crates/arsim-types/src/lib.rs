//! Foundation types for the arsim ledger simulator.
//!
//! Every other arsim crate depends on `arsim-types`. The types here mirror
//! the wire shapes of the real network closely enough that a client built
//! against the network cannot tell the simulator apart.
//!
//! # Key Types
//!
//! - [`TxId`] / [`Address`]: 43-character base64url identifiers
//! - [`SignedTransaction`]: the signed JSON body as submitted by clients
//! - [`TransactionRecord`]: the indexed, pre-decoded view of a stored transaction
//! - [`Wallet`]: a session-scoped wallet balance and last transaction
//! - [`Winston`]: arbitrary-precision, non-negative currency amounts

pub mod encoding;
pub mod error;
pub mod id;
pub mod record;
pub mod transaction;
pub mod winston;

pub use error::{TypeError, TypeResult};
pub use id::{Address, TxId, ID_LENGTH};
pub use record::{BlockRef, TagMap, TransactionIndex, TransactionRecord, Wallet};
pub use transaction::{sender_address, SignedTransaction, Tag};
pub use winston::Winston;
