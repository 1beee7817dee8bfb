//! ARQL: boolean tag-equality queries over the transaction index.
//!
//! Queries arrive as JSON trees:
//!
//! ```json
//! {"op": "and",
//!  "expr1": {"op": "equals", "expr1": "App-Name", "expr2": "demo"},
//!  "expr2": {"op": "equals", "expr1": "from", "expr2": "<address>"}}
//! ```
//!
//! Every node is validated before the index is touched.

pub mod arql;
pub mod error;

pub use arql::{merge_results, ArqlQuery};
pub use error::{QueryError, QueryResult};
