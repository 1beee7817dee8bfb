use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid base64url string: {0}")]
    InvalidBase64(String),

    #[error("invalid identifier {value:?}: expected {expected} base64url characters")]
    InvalidId { value: String, expected: usize },

    #[error("invalid winston amount: {0:?}")]
    InvalidWinston(String),

    #[error("tag {field} is not valid UTF-8")]
    InvalidTagEncoding { field: &'static str },

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),
}

pub type TypeResult<T> = Result<T, TypeError>;
