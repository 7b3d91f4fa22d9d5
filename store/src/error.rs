use thiserror::Error;

/// Failure of a storage operation.
///
/// A missing row is never an error: loads report zero rows, existence checks
/// report `false`. Everything here means the call itself did not succeed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Whether this error means the store itself is unusable, as opposed to a
    /// rejected request.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Backend(_) | StoreError::Serialization(_) | StoreError::Corruption(_)
        )
    }
}
