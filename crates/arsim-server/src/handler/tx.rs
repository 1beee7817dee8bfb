use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use arsim_types::SignedTransaction;

use crate::error::{ServerError, ServerResult};
use crate::session::Session;

use super::parse_id;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// `POST /tx`: verify, stamp with the current block, and accept.
pub async fn post(session: &Session, body: &[u8]) -> ServerResult<Response> {
    let tx = SignedTransaction::from_json(body).map_err(|e| ServerError::BadRequest(e.to_string()))?;

    if session.store().has_transaction(&tx.id).await? {
        return Err(ServerError::Duplicate(tx.id));
    }
    if !session.network().verify_transaction(&tx).await {
        warn!(id = %tx.id, "transaction failed verification");
        return Err(ServerError::VerificationFailed);
    }

    let block = match session.network().get_network_info().await {
        Ok(info) => Some(info.block_ref()),
        Err(e) => {
            warn!(id = %tx.id, error = %e, "network info unavailable, storing without block");
            None
        }
    };
    let record = session.ledger().accept(body, block).await?;
    info!(id = %record.id, from = %record.from, "transaction accepted");
    Ok((StatusCode::OK, "OK").into_response())
}

/// `GET /tx/{id}`: the stored body exactly as submitted.
pub async fn get(session: &Session, id: &str) -> ServerResult<Response> {
    let id = parse_id(id)?;
    let body = session.store().get_transaction_body(&id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

#[derive(Debug, Serialize)]
struct TxStatus {
    block_indep_hash: String,
    block_height: u64,
    number_of_confirmations: u64,
}

/// `GET /tx/{id}/status`. Transactions stored without a block are not found.
pub async fn status(session: &Session, id: &str) -> ServerResult<Response> {
    let id = parse_id(id)?;
    let record = session.store().get_transaction_metadata(&id).await?;
    let block = record.block.ok_or(ServerError::NotFound)?;
    let info = session.network().get_network_info().await?;
    Ok(Json(TxStatus {
        number_of_confirmations: info.height.saturating_sub(block.height),
        block_indep_hash: block.id,
        block_height: block.height,
    })
    .into_response())
}

/// `GET /tx/{id}/{field}`: one top-level field of the stored body. Strings
/// are returned bare, other values as JSON.
pub async fn field(session: &Session, id: &str, field: &str) -> ServerResult<Response> {
    let id = parse_id(id)?;
    let body = session.store().get_transaction_body(&id).await?;
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ServerError::Internal(format!("stored body for {id} is not JSON: {e}")))?;
    match value.get(field) {
        Some(Value::String(s)) => Ok(s.clone().into_response()),
        Some(other) => Ok(other.to_string().into_response()),
        None => Err(ServerError::BadRequest(format!("unknown transaction field: {field}"))),
    }
}

/// `GET /{id}`: the decoded data payload, typed by its `Content-Type` tag.
pub async fn serve_data(session: &Session, id: &str) -> ServerResult<Response> {
    let id = parse_id(id)?;
    let record = session.store().get_transaction_metadata(&id).await?;
    let body = session.store().get_transaction_body(&id).await?;
    let data = SignedTransaction::from_json(&body)
        .and_then(|tx| tx.data_bytes())
        .map_err(|e| ServerError::Internal(format!("stored body for {id} is unreadable: {e}")))?;
    let content_type = record
        .first_tag("Content-Type")
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
