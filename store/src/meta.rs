//! Bookkeeping storage trait.

use crate::StoreError;

/// Key under which the schema version is stored.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Small key-value store for engine bookkeeping that belongs to no record
/// kind, such as the schema version.
pub trait MetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] if `key` is absent.
    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Schema version of the database, 0 for a database that has none yet.
    fn schema_version(&self) -> Result<u32, StoreError> {
        match self.get_meta(SCHEMA_VERSION_KEY) {
            Ok(bytes) => {
                let raw: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!(
                        "schema version has {} bytes, expected 4",
                        bytes.len()
                    ))
                })?;
                Ok(u32::from_be_bytes(raw))
            }
            Err(StoreError::NotFound(_)) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta(SCHEMA_VERSION_KEY, &version.to_be_bytes())
    }
}
