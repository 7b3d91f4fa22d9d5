//! Spent-addresses environment and its LMDB store.
//!
//! Kept in its own environment, at its own path, so the append-only set can
//! be shared or pruned independently of the Tangle database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};
use tracing::{debug, info};

use tangle_store::{SpentAddressStore, StoreError};
use tangle_types::{Hash243, HashSet243};

use crate::environment::open_env;
use crate::{LmdbError, StorageConfig};

const SPENT_ADDRESSES_DB: &str = "spent_addresses";

/// The spent-addresses environment.
#[derive(Clone)]
pub struct SpentAddressEnvironment {
    env: Arc<Env>,
    spent_db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl SpentAddressEnvironment {
    pub fn open(config: &StorageConfig) -> Result<Self, LmdbError> {
        config.validate()?;
        let env = open_env(
            &config.spent_addresses_path,
            config.map_size,
            1,
            config.max_readers,
        )?;
        let mut wtxn = env.write_txn()?;
        let spent_db = env.create_database(&mut wtxn, Some(SPENT_ADDRESSES_DB))?;
        wtxn.commit()?;

        let rtxn = env.read_txn()?;
        let addresses = spent_db.len(&rtxn)?;
        drop(rtxn);
        info!(
            path = %config.spent_addresses_path.display(),
            addresses,
            "spent-addresses database opened"
        );

        Ok(Self {
            env: Arc::new(env),
            spent_db,
            path: config.spent_addresses_path.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spent_address_store(&self) -> LmdbSpentAddressStore {
        LmdbSpentAddressStore {
            env: Arc::clone(&self.env),
            spent_db: self.spent_db,
        }
    }

    pub fn close(self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        info!(path = %self.path.display(), "spent-addresses database closed");
        Ok(())
    }
}

pub struct LmdbSpentAddressStore {
    pub(crate) env: Arc<Env>,
    /// address → empty.
    pub(crate) spent_db: Database<Bytes, Bytes>,
}

impl SpentAddressStore for LmdbSpentAddressStore {
    fn store(&self, address: &Hash243) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.spent_db
            .put(&mut wtxn, address.as_bytes().as_slice(), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn store_bulk(&self, addresses: &HashSet243) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for address in addresses {
            self.spent_db
                .put(&mut wtxn, address.as_bytes().as_slice(), &[])
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        debug!(addresses = addresses.len(), "spent addresses stored");
        Ok(())
    }

    fn exist(&self, address: &Hash243) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let exists = self
            .spent_db
            .get(&rtxn, address.as_bytes().as_slice())
            .map_err(LmdbError::from)?
            .is_some();
        Ok(exists)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.spent_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
