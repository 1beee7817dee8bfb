use axum::response::{IntoResponse, Response};

use crate::error::ServerResult;
use crate::session::Session;

use super::parse_address;

/// Balance in Winston as a bare decimal string. Unknown wallets hold `0`.
pub fn balance(session: &Session, address: &str) -> ServerResult<Response> {
    let address = parse_address(address)?;
    Ok(session.ledger().wallets().balance(&address).to_string().into_response())
}

/// Id of the wallet's latest transaction, empty if it has none.
pub fn last_tx(session: &Session, address: &str) -> ServerResult<Response> {
    let address = parse_address(address)?;
    let last = session
        .ledger()
        .wallets()
        .get_wallet(&address)
        .map(|w| w.last_tx)
        .unwrap_or_default();
    Ok(last.into_response())
}
