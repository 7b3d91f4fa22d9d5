//! Write batching: groups several transaction writes into a single LMDB
//! write transaction, so they become visible together and share one fsync.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! batch.store(&tail)?;
//! batch.store(&head)?;
//! batch.update_solidity(tail.hash(), true)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`TransactionBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).
//! A failed operation leaves earlier ones in the batch; drop the batch to
//! discard them.
//!
//! An open batch holds the environment's single LMDB writer lock. Every other
//! store, update or batch on the same environment waits until this one commits
//! or drops, so keep batches short-lived. Readers are not affected.

use heed::{Env, RwTxn};

use tangle_store::{StoreError, Transaction};
use tangle_types::{Clock, Hash243};

use crate::environment::TangleTables;
use crate::transaction::{delete_row, insert_row, update_metadata_row};
use crate::LmdbError;

/// Pending transaction writes inside one LMDB write transaction.
///
/// Holds the store-wide writer lock until [`commit`](Self::commit) or drop.
pub struct TransactionBatch<'a> {
    txn: RwTxn<'a>,
    tables: TangleTables,
    clock: &'a dyn Clock,
    written: usize,
}

impl<'a> TransactionBatch<'a> {
    pub(crate) fn new(
        env: &'a Env,
        tables: TangleTables,
        clock: &'a dyn Clock,
    ) -> Result<Self, StoreError> {
        let txn = env.write_txn().map_err(LmdbError::from)?;
        Ok(Self {
            txn,
            tables,
            clock,
            written: 0,
        })
    }

    /// Store a transaction. Fails with [`StoreError::Duplicate`] if the hash
    /// is already stored or was stored earlier in this batch.
    pub fn store(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        insert_row(&self.tables, &mut self.txn, transaction, self.clock.now())?;
        self.written += 1;
        Ok(())
    }

    pub fn update_snapshot_index(
        &mut self,
        hash: &Hash243,
        snapshot_index: u64,
    ) -> Result<(), StoreError> {
        if update_metadata_row(&self.tables, &mut self.txn, hash, |m| {
            m.snapshot_index = snapshot_index
        })? {
            self.written += 1;
        }
        Ok(())
    }

    pub fn update_solidity(&mut self, hash: &Hash243, solid: bool) -> Result<(), StoreError> {
        if update_metadata_row(&self.tables, &mut self.txn, hash, |m| m.solid = solid)? {
            self.written += 1;
        }
        Ok(())
    }

    pub fn update_validity(&mut self, hash: &Hash243, validity: i8) -> Result<(), StoreError> {
        if update_metadata_row(&self.tables, &mut self.txn, hash, |m| m.validity = validity)? {
            self.written += 1;
        }
        Ok(())
    }

    /// Delete a transaction and its index entries; absent hashes are skipped.
    pub fn delete(&mut self, hash: &Hash243) -> Result<(), StoreError> {
        if delete_row(&self.tables, &mut self.txn, hash)? {
            self.written += 1;
        }
        Ok(())
    }

    /// Number of rows written so far.
    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Commit all batched operations in a single write transaction.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        tracing::debug!(rows = self.written, "transaction batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LmdbEnvironment, StorageConfig};
    use tangle_store::{Pack, TransactionField, TransactionStore};
    use tangle_types::HASH_SIZE;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = StorageConfig::new(dir.path());
        config.map_size = 10 * 1024 * 1024;
        let env = LmdbEnvironment::open(&config).expect("failed to open env");
        (dir, env)
    }

    fn transaction(n: u8) -> Transaction {
        let mut tx = Transaction::default();
        tx.consensus.hash = Hash243::new([n; HASH_SIZE]);
        tx.essence.bundle = Hash243::new([0xB0; HASH_SIZE]);
        tx.essence.current_index = u64::from(n);
        tx
    }

    #[test]
    fn batch_store_and_update_committed() {
        let (_dir, env) = temp_env();

        let mut batch = env.write_batch().expect("write_batch");
        batch.store(&transaction(1)).expect("store");
        batch.store(&transaction(2)).expect("store");
        batch
            .update_solidity(transaction(1).hash(), true)
            .expect("update_solidity");
        assert_eq!(batch.len(), 3);
        batch.commit().expect("commit");

        let store = env.transaction_store();
        assert_eq!(store.count().unwrap(), 2);
        let mut pack = Pack::with_capacity(1);
        store.load_metadata(transaction(1).hash(), &mut pack).unwrap();
        assert!(pack.models()[0].metadata.solid);
    }

    #[test]
    fn dropped_batch_does_not_persist() {
        let (_dir, env) = temp_env();

        {
            let mut batch = env.write_batch().expect("write_batch");
            batch.store(&transaction(3)).expect("store");
            // batch is dropped here, implicit rollback
        }

        let store = env.transaction_store();
        assert!(!store
            .exist(TransactionField::Hash(*transaction(3).hash()))
            .unwrap());
        assert!(!store
            .exist(TransactionField::Bundle(transaction(3).essence.bundle))
            .unwrap());
    }

    #[test]
    fn duplicate_within_batch_is_rejected() {
        let (_dir, env) = temp_env();

        let mut batch = env.write_batch().expect("write_batch");
        batch.store(&transaction(4)).expect("store");
        let err = batch.store(&transaction(4)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn batch_delete_skips_absent() {
        let (_dir, env) = temp_env();
        env.transaction_store().store(&transaction(5)).unwrap();

        let mut batch = env.write_batch().expect("write_batch");
        batch.delete(transaction(5).hash()).expect("delete");
        batch.delete(transaction(6).hash()).expect("delete absent");
        assert_eq!(batch.len(), 1);
        batch.commit().expect("commit");

        assert_eq!(env.transaction_store().count().unwrap(), 0);
    }
}
