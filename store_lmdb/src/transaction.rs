//! LMDB implementation of TransactionStore.
//!
//! A transaction is split across four tables keyed by its hash (essence,
//! attachment, data, metadata) plus one entry in each secondary index.
//! [`insert_row`] and [`delete_row`] touch all of them inside the caller's
//! write transaction, so no reader ever sees a row without its indices.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Env, RoTxn, RwTxn};
use tracing::{debug, warn};

use tangle_store::{
    Attachment, ColumnMask, Consensus, Data, Essence, FindQuery, Metadata, Pack, StoreError,
    Transaction, TransactionField, TransactionStore,
};
use tangle_types::{Clock, Hash243, HashSet243, Timestamp};

use crate::environment::TangleTables;
use crate::index::{count_under, hashes_under, index_key, scan_prefix};
use crate::LmdbError;

pub struct LmdbTransactionStore {
    pub(crate) env: Arc<Env>,
    pub(crate) tables: TangleTables,
    pub(crate) clock: Arc<dyn Clock>,
}

// ── Row primitives ──────────────────────────────────────────────────────

/// Insert a transaction and its index entries. Fails with
/// [`StoreError::Duplicate`] if the hash is already stored.
pub(crate) fn insert_row(
    tables: &TangleTables,
    wtxn: &mut RwTxn,
    transaction: &Transaction,
    arrival: Timestamp,
) -> Result<(), StoreError> {
    let hash = transaction.hash();
    let key = hash.as_bytes().as_slice();
    if tables
        .tx_essence
        .get(wtxn, key)
        .map_err(LmdbError::from)?
        .is_some()
    {
        warn!(hash = %hash, "rejected duplicate transaction");
        return Err(StoreError::Duplicate(format!("transaction {hash}")));
    }

    let essence = &transaction.essence;
    let attachment = &transaction.attachment;
    let essence_bytes = bincode::serialize(essence).map_err(LmdbError::from)?;
    let attachment_bytes = bincode::serialize(attachment).map_err(LmdbError::from)?;
    let metadata_bytes =
        bincode::serialize(&Metadata::arrived_at(arrival)).map_err(LmdbError::from)?;

    tables
        .tx_essence
        .put(wtxn, key, &essence_bytes)
        .map_err(LmdbError::from)?;
    tables
        .tx_attachment
        .put(wtxn, key, &attachment_bytes)
        .map_err(LmdbError::from)?;
    tables
        .tx_data
        .put(wtxn, key, &transaction.data.signature_or_message)
        .map_err(LmdbError::from)?;
    tables
        .tx_metadata
        .put(wtxn, key, &metadata_bytes)
        .map_err(LmdbError::from)?;

    for (db, prefix) in [
        (tables.idx_address, essence.address.as_bytes().as_slice()),
        (tables.idx_bundle, essence.bundle.as_bytes().as_slice()),
        (tables.idx_tag, attachment.tag.as_bytes().as_slice()),
        (tables.idx_obsolete_tag, essence.obsolete_tag.as_bytes().as_slice()),
    ] {
        db.put(wtxn, &index_key(prefix, hash), &[])
            .map_err(LmdbError::from)?;
    }

    let timestamp = attachment.attachment_timestamp.to_be_bytes();
    for approvee in [&attachment.trunk, &attachment.branch] {
        tables
            .idx_approvee
            .put(wtxn, &index_key(approvee.as_bytes(), hash), &timestamp)
            .map_err(LmdbError::from)?;
    }
    Ok(())
}

/// Remove a transaction and its index entries. Returns `false` if the hash
/// is not stored.
pub(crate) fn delete_row(
    tables: &TangleTables,
    wtxn: &mut RwTxn,
    hash: &Hash243,
) -> Result<bool, LmdbError> {
    let key = hash.as_bytes().as_slice();
    let Some(essence_bytes) = tables.tx_essence.get(wtxn, key)? else {
        return Ok(false);
    };
    let essence: Essence = bincode::deserialize(essence_bytes)?;
    let attachment_bytes = tables
        .tx_attachment
        .get(wtxn, key)?
        .ok_or_else(|| LmdbError::Corruption(format!("transaction {hash} has no attachment")))?;
    let attachment: Attachment = bincode::deserialize(attachment_bytes)?;

    for db in [
        tables.tx_essence,
        tables.tx_attachment,
        tables.tx_data,
        tables.tx_metadata,
    ] {
        db.delete(wtxn, key)?;
    }

    for (db, prefix) in [
        (tables.idx_address, essence.address.as_bytes().as_slice()),
        (tables.idx_bundle, essence.bundle.as_bytes().as_slice()),
        (tables.idx_tag, attachment.tag.as_bytes().as_slice()),
        (tables.idx_obsolete_tag, essence.obsolete_tag.as_bytes().as_slice()),
        (tables.idx_approvee, attachment.trunk.as_bytes().as_slice()),
        (tables.idx_approvee, attachment.branch.as_bytes().as_slice()),
    ] {
        db.delete(wtxn, &index_key(prefix, hash))?;
    }
    Ok(true)
}

/// Apply `update` to the metadata of `hash`. Returns `false` if the hash is
/// not stored.
pub(crate) fn update_metadata_row<F>(
    tables: &TangleTables,
    wtxn: &mut RwTxn,
    hash: &Hash243,
    update: F,
) -> Result<bool, LmdbError>
where
    F: FnOnce(&mut Metadata),
{
    let key = hash.as_bytes().as_slice();
    let Some(bytes) = tables.tx_metadata.get(wtxn, key)? else {
        return Ok(false);
    };
    let mut metadata: Metadata = bincode::deserialize(bytes)?;
    let arrival = metadata.arrival_timestamp;
    update(&mut metadata);
    metadata.arrival_timestamp = arrival;
    let bytes = bincode::serialize(&metadata)?;
    tables.tx_metadata.put(wtxn, key, &bytes)?;
    Ok(true)
}

/// Read the requested column groups of one transaction, `None` if the hash
/// is not stored.
pub(crate) fn read_row(
    tables: &TangleTables,
    rtxn: &RoTxn,
    hash: &Hash243,
    columns: ColumnMask,
) -> Result<Option<Transaction>, LmdbError> {
    let key = hash.as_bytes().as_slice();
    let Some(essence_bytes) = tables.tx_essence.get(rtxn, key)? else {
        return Ok(None);
    };
    let missing = |group: &str| LmdbError::Corruption(format!("transaction {hash} has no {group}"));

    let mut transaction = Transaction {
        loaded_columns: columns,
        ..Transaction::default()
    };
    if columns.contains(ColumnMask::ESSENCE) {
        transaction.essence = bincode::deserialize(essence_bytes)?;
    }
    if columns.contains(ColumnMask::ATTACHMENT) {
        let bytes = tables
            .tx_attachment
            .get(rtxn, key)?
            .ok_or_else(|| missing("attachment"))?;
        transaction.attachment = bincode::deserialize(bytes)?;
    }
    if columns.contains(ColumnMask::CONSENSUS) {
        transaction.consensus = Consensus { hash: *hash };
    }
    if columns.contains(ColumnMask::DATA) {
        let bytes = tables.tx_data.get(rtxn, key)?.ok_or_else(|| missing("data"))?;
        transaction.data = Data {
            signature_or_message: bytes.to_vec(),
        };
    }
    if columns.contains(ColumnMask::METADATA) {
        let bytes = tables
            .tx_metadata
            .get(rtxn, key)?
            .ok_or_else(|| missing("metadata"))?;
        transaction.metadata = bincode::deserialize(bytes)?;
    }
    Ok(Some(transaction))
}

impl TangleTables {
    /// Index table and key prefix serving `field`, `None` for fields that are
    /// not served by a secondary index.
    pub(crate) fn index_for(
        &self,
        field: &TransactionField,
    ) -> Option<(heed::Database<Bytes, Bytes>, Vec<u8>)> {
        match field {
            TransactionField::Address(h) => Some((self.idx_address, h.as_bytes().to_vec())),
            TransactionField::Bundle(h) => Some((self.idx_bundle, h.as_bytes().to_vec())),
            TransactionField::Tag(t) => Some((self.idx_tag, t.as_bytes().to_vec())),
            TransactionField::ObsoleteTag(t) => {
                Some((self.idx_obsolete_tag, t.as_bytes().to_vec()))
            }
            TransactionField::Approvee(h) => Some((self.idx_approvee, h.as_bytes().to_vec())),
            TransactionField::None | TransactionField::Hash(_) => None,
        }
    }

    /// Hashes of every transaction matching `field`, in index order.
    pub(crate) fn matching_hashes(
        &self,
        rtxn: &RoTxn,
        field: &TransactionField,
    ) -> Result<Vec<Hash243>, StoreError> {
        match (field, self.index_for(field)) {
            (_, Some((db, prefix))) => Ok(hashes_under(db, rtxn, &prefix)?),
            (TransactionField::Hash(hash), None) => {
                let exists = self
                    .tx_essence
                    .get(rtxn, hash.as_bytes().as_slice())
                    .map_err(LmdbError::from)?
                    .is_some();
                Ok(if exists { vec![*hash] } else { Vec::new() })
            }
            (_, None) => Err(StoreError::InvalidArgument(
                "a keyed field is required to load hashes".into(),
            )),
        }
    }
}

fn push_hashes(hashes: impl IntoIterator<Item = Hash243>, pack: &mut Pack<Hash243>) {
    for hash in hashes {
        if !pack.push(hash) {
            break;
        }
    }
}

impl LmdbTransactionStore {
    fn load_rows(
        &self,
        rtxn: &RoTxn,
        hashes: impl IntoIterator<Item = Hash243>,
        columns: ColumnMask,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        for hash in hashes {
            if let Some(transaction) = read_row(&self.tables, rtxn, &hash, columns)? {
                if !pack.push(transaction) {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Apply `update` to every hash in one write transaction.
    fn update_many<F>(&self, hashes: &HashSet243, update: F) -> Result<(), StoreError>
    where
        F: Fn(&mut Metadata),
    {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut updated = 0usize;
        for hash in hashes {
            if update_metadata_row(&self.tables, &mut wtxn, hash, &update)? {
                updated += 1;
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        debug!(requested = hashes.len(), updated, "bulk metadata update");
        Ok(())
    }

    fn update_one<F>(&self, hash: &Hash243, update: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Metadata),
    {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if update_metadata_row(&self.tables, &mut wtxn, hash, update)? {
            wtxn.commit().map_err(LmdbError::from)?;
        }
        Ok(())
    }
}

impl TransactionStore for LmdbTransactionStore {
    fn store(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        insert_row(&self.tables, &mut wtxn, transaction, self.clock.now())?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn load(
        &self,
        field: TransactionField,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match field {
            TransactionField::None => {
                let first = self
                    .tables
                    .tx_essence
                    .first(&rtxn)
                    .map_err(LmdbError::from)?
                    .map(|(key, _)| Hash243::try_from(key))
                    .transpose()
                    .map_err(|e| LmdbError::Corruption(e.to_string()))?;
                self.load_rows(&rtxn, first, ColumnMask::IMMUTABLE, pack)
            }
            field => {
                let hashes = self.tables.matching_hashes(&rtxn, &field)?;
                self.load_rows(&rtxn, hashes, ColumnMask::IMMUTABLE, pack)
            }
        }
    }

    fn load_columns(
        &self,
        hash: &Hash243,
        columns: ColumnMask,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.load_rows(&rtxn, [*hash], columns, pack)
    }

    fn load_hashes(
        &self,
        field: TransactionField,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let hashes = self.tables.matching_hashes(&rtxn, &field)?;
        push_hashes(hashes, pack);
        Ok(())
    }

    fn load_hashes_of_approvers(
        &self,
        approvee: &Hash243,
        min_attachment_timestamp: u64,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        scan_prefix(
            self.tables.idx_approvee,
            &rtxn,
            approvee.as_bytes(),
            |hash, value| {
                if min_attachment_timestamp != 0 {
                    let timestamp = crate::index::decode_be(value)?;
                    if timestamp <= min_attachment_timestamp {
                        return Ok(true);
                    }
                }
                Ok(pack.push(hash))
            },
        )?;
        Ok(())
    }

    fn load_hashes_of_milestone_candidates(
        &self,
        address: &Hash243,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let milestone_hashes = self.tables.milestone_hashes;
        scan_prefix(self.tables.idx_address, &rtxn, address.as_bytes(), |hash, _| {
            if milestone_hashes
                .get(&rtxn, hash.as_bytes().as_slice())?
                .is_some()
            {
                return Ok(true);
            }
            Ok(pack.push(hash))
        })?;
        Ok(())
    }

    fn find(&self, query: &FindQuery, pack: &mut Pack<Hash243>) -> Result<(), StoreError> {
        if query.is_empty() {
            return Err(StoreError::InvalidArgument(
                "find needs at least one criterion".into(),
            ));
        }
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;

        let criteria: [Vec<TransactionField>; 4] = [
            query.bundles.iter().copied().map(TransactionField::Bundle).collect(),
            query.addresses.iter().copied().map(TransactionField::Address).collect(),
            query.tags.iter().copied().map(TransactionField::Tag).collect(),
            query.approvees.iter().copied().map(TransactionField::Approvee).collect(),
        ];

        let mut result: Option<HashSet243> = None;
        for fields in criteria.iter().filter(|fields| !fields.is_empty()) {
            let mut matches = HashSet243::new();
            for field in fields {
                matches.extend(self.tables.matching_hashes(&rtxn, field)?);
            }
            match result.as_mut() {
                Some(acc) => acc.retain_common(&matches),
                None => result = Some(matches),
            }
        }

        let mut hashes: Vec<Hash243> = result.unwrap_or_default().into_iter().collect();
        hashes.sort_unstable();
        push_hashes(hashes, pack);
        Ok(())
    }

    fn approvers_count(&self, approvee: &Hash243) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(count_under(self.tables.idx_approvee, &rtxn, approvee.as_bytes())?)
    }

    fn exist(&self, field: TransactionField) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let exists = match &field {
            TransactionField::None => !self
                .tables
                .tx_essence
                .is_empty(&rtxn)
                .map_err(LmdbError::from)?,
            TransactionField::Hash(hash) => self
                .tables
                .tx_essence
                .get(&rtxn, hash.as_bytes().as_slice())
                .map_err(LmdbError::from)?
                .is_some(),
            keyed => {
                let mut found = false;
                if let Some((db, prefix)) = self.tables.index_for(keyed) {
                    scan_prefix(db, &rtxn, &prefix, |_, _| {
                        found = true;
                        Ok(false)
                    })?;
                }
                found
            }
        };
        Ok(exists)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.tables.tx_essence.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }

    fn update_snapshot_index(&self, hash: &Hash243, snapshot_index: u64) -> Result<(), StoreError> {
        self.update_one(hash, |m| m.snapshot_index = snapshot_index)
    }

    fn update_solidity(&self, hash: &Hash243, solid: bool) -> Result<(), StoreError> {
        self.update_one(hash, |m| m.solid = solid)
    }

    fn update_validity(&self, hash: &Hash243, validity: i8) -> Result<(), StoreError> {
        self.update_one(hash, |m| m.validity = validity)
    }

    fn update_snapshot_indexes(
        &self,
        hashes: &HashSet243,
        snapshot_index: u64,
    ) -> Result<(), StoreError> {
        self.update_many(hashes, |m| m.snapshot_index = snapshot_index)
    }

    fn update_solidities(&self, hashes: &HashSet243, solid: bool) -> Result<(), StoreError> {
        self.update_many(hashes, |m| m.solid = solid)
    }

    fn update_bundle_validity(&self, bundle: &Hash243, validity: i8) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let hashes = hashes_under(self.tables.idx_bundle, &wtxn, bundle.as_bytes())?;
        for hash in &hashes {
            update_metadata_row(&self.tables, &mut wtxn, hash, |m| m.validity = validity)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        debug!(bundle = %bundle, transactions = hashes.len(), validity, "bundle validity updated");
        Ok(())
    }

    fn delete(&self, hash: &Hash243) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if delete_row(&self.tables, &mut wtxn, hash)? {
            wtxn.commit().map_err(LmdbError::from)?;
        }
        Ok(())
    }

    fn delete_many(&self, hashes: &HashSet243) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut deleted = 0usize;
        for hash in hashes {
            if delete_row(&self.tables, &mut wtxn, hash)? {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        debug!(requested = hashes.len(), deleted, "bulk transaction delete");
        Ok(())
    }

    fn metadata_clear(&self) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut rows = Vec::new();
        for result in self.tables.tx_metadata.iter(&wtxn).map_err(LmdbError::from)? {
            let (key, value) = result.map_err(LmdbError::from)?;
            let mut metadata: Metadata = bincode::deserialize(value).map_err(LmdbError::from)?;
            metadata.clear();
            rows.push((key.to_vec(), metadata));
        }
        for (key, metadata) in &rows {
            let bytes = bincode::serialize(metadata).map_err(LmdbError::from)?;
            self.tables
                .tx_metadata
                .put(&mut wtxn, key, &bytes)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        debug!(transactions = rows.len(), "transaction metadata cleared");
        Ok(())
    }
}
