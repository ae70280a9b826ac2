use thiserror::Error;

/// Structural problem in the user DSL: wrong shape, missing `Table` tag,
/// malformed relationship map. Raised at compile time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid spec at {position}: {reason}")]
pub struct InvalidSpec {
    /// Byte offset into the source the parser had reached when it failed.
    pub position: usize,
    pub reason: String,
}

impl InvalidSpec {
    pub fn new(position: usize, reason: impl Into<String>) -> Self {
        InvalidSpec {
            position,
            reason: reason.into(),
        }
    }
}
