//! Error types for the migration ledger.

use thiserror::Error;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while loading, mutating, or persisting the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted document could not be parsed or serialized.
    #[error("Malformed ledger document: {0}")]
    Json(#[from] serde_json::Error),

    /// Document store operation error.
    #[error("Document store error: {0}")]
    Store(String),

    /// The persisted ledger violates an internal invariant.
    #[error("Corrupt ledger: {0}")]
    Corrupt(String),

    /// Rollback was requested on a ledger with no recorded batches.
    #[error("Nothing to roll back: the ledger has no recorded batches")]
    NothingToRollback,
}

impl LedgerError {
    /// Create a document store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a corruption error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Check if this error indicates a corrupted persisted document, as
    /// opposed to a transient I/O or precondition failure.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupt(_) | Self::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::corrupt("batch counter is 2 but the highest recorded batch is 1");
        assert!(err.to_string().contains("Corrupt ledger"));
        assert!(err.to_string().contains("batch counter"));
    }

    #[test]
    fn test_rollback_display() {
        let err = LedgerError::NothingToRollback;
        assert!(err.to_string().contains("no recorded batches"));
    }

    #[test]
    fn test_is_corruption() {
        assert!(LedgerError::corrupt("mismatch").is_corruption());
        assert!(!LedgerError::NothingToRollback.is_corruption());
        assert!(!LedgerError::store("unreachable").is_corruption());
    }
}
