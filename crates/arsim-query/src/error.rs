/// Errors from parsing an ARQL request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid json")]
    InvalidJson(String),

    #[error("Invalid arql query syntax")]
    InvalidSyntax(String),
}

impl QueryError {
    /// Detail for logs; the display form is the client-facing message.
    pub fn detail(&self) -> &str {
        match self {
            QueryError::InvalidJson(d) | QueryError::InvalidSyntax(d) => d,
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
