//! Endpoint handlers. Each returns a complete response or a [`ServerError`]
//! that renders as one.
//!
//! [`ServerError`]: crate::error::ServerError

pub mod app;
pub mod arql;
pub mod favicon;
pub mod proxy;
pub mod tx;
pub mod wallet;

use arsim_types::{Address, TxId};

use crate::error::{ServerError, ServerResult};

fn parse_id(raw: &str) -> ServerResult<TxId> {
    TxId::parse(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn parse_address(raw: &str) -> ServerResult<Address> {
    Address::parse(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}
