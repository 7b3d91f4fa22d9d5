//! LMDB implementation of StateDeltaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use tangle_store::{StateDelta, StateDeltaStore, StoreError};

use crate::index::index_be;
use crate::LmdbError;

pub struct LmdbStateDeltaStore {
    pub(crate) env: Arc<Env>,
    /// `index_be_u64(8)` → bincode-encoded delta.
    pub(crate) state_deltas_db: Database<Bytes, Bytes>,
}

impl StateDeltaStore for LmdbStateDeltaStore {
    fn store(&self, index: u64, delta: &StateDelta) -> Result<(), StoreError> {
        let bytes = bincode::serialize(delta).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.state_deltas_db
            .put(&mut wtxn, &index_be(index), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn load(&self, index: u64) -> Result<Option<StateDelta>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let delta = self
            .state_deltas_db
            .get(&rtxn, &index_be(index))
            .map_err(LmdbError::from)?
            .map(|bytes| bincode::deserialize::<StateDelta>(bytes))
            .transpose()
            .map_err(LmdbError::from)?;
        Ok(delta)
    }
}
