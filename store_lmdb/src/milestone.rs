//! LMDB implementation of MilestoneStore.
//!
//! Two databases, always written together:
//! - `milestones_db`: `index_be_u64(8)` → hash. Big-endian keys sort by index,
//!   so first/last/next are cursor operations.
//! - `milestone_hashes_db`: hash → `index_be_u64(8)`, for lookups by hash.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};
use tracing::warn;

use tangle_store::{Milestone, MilestoneStore, Pack, StoreError};
use tangle_types::Hash243;

use crate::index::{decode_be, index_be};
use crate::LmdbError;

pub struct LmdbMilestoneStore {
    pub(crate) env: Arc<Env>,
    pub(crate) milestones_db: Database<Bytes, Bytes>,
    pub(crate) milestone_hashes_db: Database<Bytes, Bytes>,
}

fn decode_entry(key: &[u8], value: &[u8]) -> Result<Milestone, LmdbError> {
    let hash = Hash243::try_from(value).map_err(|e| LmdbError::Corruption(e.to_string()))?;
    Ok(Milestone::new(decode_be(key)?, hash))
}

impl MilestoneStore for LmdbMilestoneStore {
    fn store(&self, milestone: &Milestone) -> Result<(), StoreError> {
        let index = index_be(milestone.index);
        let hash = milestone.hash.as_bytes().as_slice();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let index_taken = self
            .milestones_db
            .get(&wtxn, &index)
            .map_err(LmdbError::from)?
            .is_some();
        let hash_taken = self
            .milestone_hashes_db
            .get(&wtxn, hash)
            .map_err(LmdbError::from)?
            .is_some();
        if index_taken || hash_taken {
            warn!(index = milestone.index, hash = %milestone.hash, "rejected duplicate milestone");
            return Err(StoreError::Duplicate(format!(
                "milestone {} ({})",
                milestone.index, milestone.hash
            )));
        }

        self.milestones_db
            .put(&mut wtxn, &index, hash)
            .map_err(LmdbError::from)?;
        self.milestone_hashes_db
            .put(&mut wtxn, hash, &index)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn load(&self, hash: &Hash243, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        if let Some(index) = self
            .milestone_hashes_db
            .get(&rtxn, hash.as_bytes().as_slice())
            .map_err(LmdbError::from)?
        {
            pack.push(Milestone::new(decode_be(index)?, *hash));
        }
        Ok(())
    }

    fn load_by_index(&self, index: u64, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let key = index_be(index);
        if let Some(hash) = self
            .milestones_db
            .get(&rtxn, &key)
            .map_err(LmdbError::from)?
        {
            pack.push(decode_entry(&key, hash)?);
        }
        Ok(())
    }

    fn load_first(&self, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        if let Some((key, hash)) = self.milestones_db.first(&rtxn).map_err(LmdbError::from)? {
            pack.push(decode_entry(key, hash)?);
        }
        Ok(())
    }

    fn load_last(&self, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        if let Some((key, hash)) = self.milestones_db.last(&rtxn).map_err(LmdbError::from)? {
            pack.push(decode_entry(key, hash)?);
        }
        Ok(())
    }

    fn load_next(&self, after_index: u64, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let lower = index_be(after_index);
        let bounds = (Bound::Excluded(lower.as_slice()), Bound::Unbounded);
        let mut iter = self
            .milestones_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        if let Some(result) = iter.next() {
            let (key, hash) = result.map_err(LmdbError::from)?;
            pack.push(decode_entry(key, hash)?);
        }
        Ok(())
    }

    fn exist(&self, hash: Option<&Hash243>) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let exists = match hash {
            Some(hash) => self
                .milestone_hashes_db
                .get(&rtxn, hash.as_bytes().as_slice())
                .map_err(LmdbError::from)?
                .is_some(),
            None => !self
                .milestones_db
                .is_empty(&rtxn)
                .map_err(LmdbError::from)?,
        };
        Ok(exists)
    }

    fn delete(&self, hash: &Hash243) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let index = match self
            .milestone_hashes_db
            .get(&wtxn, hash.as_bytes().as_slice())
            .map_err(LmdbError::from)?
        {
            Some(index) => decode_be(index)?,
            None => return Ok(()),
        };
        self.milestones_db
            .delete(&mut wtxn, &index_be(index))
            .map_err(LmdbError::from)?;
        self.milestone_hashes_db
            .delete(&mut wtxn, hash.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.milestones_db.clear(&mut wtxn).map_err(LmdbError::from)?;
        self.milestone_hashes_db
            .clear(&mut wtxn)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
