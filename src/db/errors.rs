use thiserror::Error;

/// Wraps any exception from the connection layer. Not retried by the core.
#[derive(Debug, Clone, Error)]
#[error("database error: {0}")]
pub struct DbError(pub String);

impl DbError {
    pub fn new(msg: impl Into<String>) -> Self {
        DbError(msg.into())
    }
}
