use tangle_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        LmdbError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for LmdbError {
    fn from(e: std::io::Error) -> Self {
        LmdbError::Io(e.to_string())
    }
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::NotFound(msg) => StoreError::NotFound(msg),
            LmdbError::Serialization(msg) => StoreError::Serialization(msg),
            LmdbError::Corruption(msg) => StoreError::Corruption(msg),
            LmdbError::Config(msg) => StoreError::InvalidArgument(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<StoreError> for LmdbError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => LmdbError::NotFound(msg),
            StoreError::Serialization(msg) => LmdbError::Serialization(msg),
            StoreError::Corruption(msg) => LmdbError::Corruption(msg),
            other => LmdbError::Heed(other.to_string()),
        }
    }
}
