use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use arsim_query::QueryError;
use arsim_store::{LedgerError, StoreError};
use arsim_types::TxId;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("Transaction verification failed.")]
    VerificationFailed,

    #[error("invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("not found")]
    NotFound,

    #[error("transaction already processed: {0}")]
    Duplicate(TxId),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ServerError::NotFound,
            StoreError::Duplicate(id) => ServerError::Duplicate(id),
            StoreError::InvalidTransaction(e) => ServerError::BadRequest(e.to_string()),
            other => ServerError::Store(other),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Duplicate(id) => ServerError::Duplicate(id),
            LedgerError::Malformed(e) => ServerError::BadRequest(e.to_string()),
            e @ LedgerError::InsufficientBalance { .. } => ServerError::BadRequest(e.to_string()),
            LedgerError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ServerError::VerificationFailed => {
                (StatusCode::BAD_REQUEST, "Transaction verification failed.").into_response()
            }
            // Query errors answer with a JSON string, as the network does.
            ServerError::Query(e) => (
                StatusCode::BAD_REQUEST,
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                serde_json::Value::String(e.to_string()).to_string(),
            )
                .into_response(),
            ServerError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ServerError::Duplicate(_) => {
                (StatusCode::ALREADY_REPORTED, "Transaction already processed.").into_response()
            }
            ServerError::Upstream(detail) => {
                error!(%detail, "upstream request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            other => {
                error!(error = %other, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
