//! Schema version check run on every open.
//!
//! A fresh database is stamped with [`CURRENT_SCHEMA_VERSION`]. A database
//! stamped by a newer engine is refused, since its layout is unknown here.

use tangle_store::MetaStore;
use tracing::info;

use crate::LmdbError;

/// The schema version that the current code writes and reads.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Stamp a fresh database and refuse one written by a newer schema.
pub fn check_schema_version(meta_store: &impl MetaStore) -> Result<(), LmdbError> {
    match meta_store.schema_version()? {
        0 => {
            meta_store.set_schema_version(CURRENT_SCHEMA_VERSION)?;
            info!(version = CURRENT_SCHEMA_VERSION, "schema version recorded");
            Ok(())
        }
        CURRENT_SCHEMA_VERSION => Ok(()),
        stored => Err(LmdbError::Corruption(format!(
            "database schema version {stored} is not supported (expected {CURRENT_SCHEMA_VERSION})"
        ))),
    }
}
