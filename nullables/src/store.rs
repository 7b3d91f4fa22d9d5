//! In-memory storage for testing.
//!
//! [`NullTangleStore`] keeps transactions, milestones and state deltas in one
//! shared map set and hands out per-trait handles, the way the LMDB
//! environment does. Every call takes the same lock, so each operation is
//! atomic and readers never observe a row without its index entries.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tangle_store::{
    ColumnMask, Consensus, FindQuery, Metadata, Milestone, MilestoneStore, Pack, SpentAddressStore,
    StateDelta, StateDeltaStore, StoreError, Transaction, TransactionField, TransactionStore,
};
use tangle_types::{Clock, Hash243, HashSet243, Timestamp};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend("null store lock poisoned".into()))
}

fn push_all<T>(rows: impl IntoIterator<Item = T>, pack: &mut Pack<T>) {
    for row in rows {
        if !pack.push(row) {
            break;
        }
    }
}

#[derive(Default)]
struct TangleState {
    /// Immutable record with metadata kept alongside, ordered by hash.
    transactions: BTreeMap<Hash243, Transaction>,
    milestones: BTreeMap<u64, Hash243>,
    milestone_indexes: HashMap<Hash243, u64>,
    state_deltas: HashMap<u64, StateDelta>,
}

impl TangleState {
    fn matches(transaction: &Transaction, field: &TransactionField) -> bool {
        let essence = &transaction.essence;
        let attachment = &transaction.attachment;
        match field {
            TransactionField::None => true,
            TransactionField::Hash(h) => transaction.hash() == h,
            TransactionField::Address(h) => essence.address == *h,
            TransactionField::Bundle(h) => essence.bundle == *h,
            TransactionField::Tag(t) => attachment.tag == *t,
            TransactionField::ObsoleteTag(t) => essence.obsolete_tag == *t,
            TransactionField::Approvee(h) => attachment.trunk == *h || attachment.branch == *h,
        }
    }

    fn matching_hashes(&self, field: &TransactionField) -> Vec<Hash243> {
        self.transactions
            .values()
            .filter(|tx| Self::matches(tx, field))
            .map(|tx| *tx.hash())
            .collect()
    }

    fn project(transaction: &Transaction, columns: ColumnMask) -> Transaction {
        let mut row = Transaction {
            loaded_columns: columns,
            ..Transaction::default()
        };
        if columns.contains(ColumnMask::ESSENCE) {
            row.essence = transaction.essence.clone();
        }
        if columns.contains(ColumnMask::ATTACHMENT) {
            row.attachment = transaction.attachment.clone();
        }
        if columns.contains(ColumnMask::CONSENSUS) {
            row.consensus = Consensus {
                hash: *transaction.hash(),
            };
        }
        if columns.contains(ColumnMask::DATA) {
            row.data = transaction.data.clone();
        }
        if columns.contains(ColumnMask::METADATA) {
            row.metadata = transaction.metadata;
        }
        row
    }

    fn update_metadata(&mut self, hash: &Hash243, update: impl FnOnce(&mut Metadata)) -> bool {
        let Some(transaction) = self.transactions.get_mut(hash) else {
            return false;
        };
        let arrival = transaction.metadata.arrival_timestamp;
        update(&mut transaction.metadata);
        transaction.metadata.arrival_timestamp = arrival;
        true
    }
}

/// In-memory transaction, milestone and state-delta storage.
pub struct NullTangleStore {
    state: Arc<Mutex<TangleState>>,
    clock: Arc<dyn Clock>,
}

impl NullTangleStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TangleState::default())),
            clock,
        }
    }

    pub fn transaction_store(&self) -> NullTransactionStore {
        NullTransactionStore {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }

    pub fn milestone_store(&self) -> NullMilestoneStore {
        NullMilestoneStore {
            state: Arc::clone(&self.state),
        }
    }

    pub fn state_delta_store(&self) -> NullStateDeltaStore {
        NullStateDeltaStore {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for NullTangleStore {
    fn default() -> Self {
        Self::new(Arc::new(crate::NullClock::new(Timestamp::EPOCH)))
    }
}

pub struct NullTransactionStore {
    state: Arc<Mutex<TangleState>>,
    clock: Arc<dyn Clock>,
}

impl TransactionStore for NullTransactionStore {
    fn store(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        let hash = *transaction.hash();
        if state.transactions.contains_key(&hash) {
            return Err(StoreError::Duplicate(format!("transaction {hash}")));
        }
        let row = Transaction {
            metadata: Metadata::arrived_at(self.clock.now()),
            loaded_columns: ColumnMask::ALL,
            ..transaction.clone()
        };
        state.transactions.insert(hash, row);
        Ok(())
    }

    fn load(
        &self,
        field: TransactionField,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        let state = lock(&self.state)?;
        let rows = state
            .transactions
            .values()
            .filter(|tx| TangleState::matches(tx, &field))
            .map(|tx| TangleState::project(tx, ColumnMask::IMMUTABLE));
        match field {
            TransactionField::None => push_all(rows.take(1), pack),
            _ => push_all(rows, pack),
        }
        Ok(())
    }

    fn load_columns(
        &self,
        hash: &Hash243,
        columns: ColumnMask,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        let state = lock(&self.state)?;
        if let Some(transaction) = state.transactions.get(hash) {
            pack.push(TangleState::project(transaction, columns));
        }
        Ok(())
    }

    fn load_hashes(
        &self,
        field: TransactionField,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError> {
        if field == TransactionField::None {
            return Err(StoreError::InvalidArgument(
                "a keyed field is required to load hashes".into(),
            ));
        }
        let state = lock(&self.state)?;
        push_all(state.matching_hashes(&field), pack);
        Ok(())
    }

    fn load_hashes_of_approvers(
        &self,
        approvee: &Hash243,
        min_attachment_timestamp: u64,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError> {
        let state = lock(&self.state)?;
        let field = TransactionField::Approvee(*approvee);
        let hashes = state
            .transactions
            .values()
            .filter(|tx| TangleState::matches(tx, &field))
            .filter(|tx| {
                min_attachment_timestamp == 0
                    || tx.attachment.attachment_timestamp > min_attachment_timestamp
            })
            .map(|tx| *tx.hash());
        push_all(hashes, pack);
        Ok(())
    }

    fn load_hashes_of_milestone_candidates(
        &self,
        address: &Hash243,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError> {
        let state = lock(&self.state)?;
        let hashes = state
            .matching_hashes(&TransactionField::Address(*address))
            .into_iter()
            .filter(|h| !state.milestone_indexes.contains_key(h));
        push_all(hashes, pack);
        Ok(())
    }

    fn find(&self, query: &FindQuery, pack: &mut Pack<Hash243>) -> Result<(), StoreError> {
        if query.is_empty() {
            return Err(StoreError::InvalidArgument(
                "find needs at least one criterion".into(),
            ));
        }
        let state = lock(&self.state)?;
        let criteria: [Vec<TransactionField>; 4] = [
            query.bundles.iter().copied().map(TransactionField::Bundle).collect(),
            query.addresses.iter().copied().map(TransactionField::Address).collect(),
            query.tags.iter().copied().map(TransactionField::Tag).collect(),
            query.approvees.iter().copied().map(TransactionField::Approvee).collect(),
        ];
        let hashes = state.transactions.values().filter(|tx| {
            criteria
                .iter()
                .filter(|fields| !fields.is_empty())
                .all(|fields| fields.iter().any(|f| TangleState::matches(tx, f)))
        });
        push_all(hashes.map(|tx| *tx.hash()), pack);
        Ok(())
    }

    fn approvers_count(&self, approvee: &Hash243) -> Result<u64, StoreError> {
        let state = lock(&self.state)?;
        Ok(state.matching_hashes(&TransactionField::Approvee(*approvee)).len() as u64)
    }

    fn exist(&self, field: TransactionField) -> Result<bool, StoreError> {
        let state = lock(&self.state)?;
        Ok(state
            .transactions
            .values()
            .any(|tx| TangleState::matches(tx, &field)))
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.state)?.transactions.len() as u64)
    }

    fn update_snapshot_index(&self, hash: &Hash243, snapshot_index: u64) -> Result<(), StoreError> {
        lock(&self.state)?.update_metadata(hash, |m| m.snapshot_index = snapshot_index);
        Ok(())
    }

    fn update_solidity(&self, hash: &Hash243, solid: bool) -> Result<(), StoreError> {
        lock(&self.state)?.update_metadata(hash, |m| m.solid = solid);
        Ok(())
    }

    fn update_validity(&self, hash: &Hash243, validity: i8) -> Result<(), StoreError> {
        lock(&self.state)?.update_metadata(hash, |m| m.validity = validity);
        Ok(())
    }

    fn update_snapshot_indexes(
        &self,
        hashes: &HashSet243,
        snapshot_index: u64,
    ) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        for hash in hashes {
            state.update_metadata(hash, |m| m.snapshot_index = snapshot_index);
        }
        Ok(())
    }

    fn update_solidities(&self, hashes: &HashSet243, solid: bool) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        for hash in hashes {
            state.update_metadata(hash, |m| m.solid = solid);
        }
        Ok(())
    }

    fn update_bundle_validity(&self, bundle: &Hash243, validity: i8) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        for hash in state.matching_hashes(&TransactionField::Bundle(*bundle)) {
            state.update_metadata(&hash, |m| m.validity = validity);
        }
        Ok(())
    }

    fn delete(&self, hash: &Hash243) -> Result<(), StoreError> {
        lock(&self.state)?.transactions.remove(hash);
        Ok(())
    }

    fn delete_many(&self, hashes: &HashSet243) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        for hash in hashes {
            state.transactions.remove(hash);
        }
        Ok(())
    }

    fn metadata_clear(&self) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        for transaction in state.transactions.values_mut() {
            transaction.metadata.clear();
        }
        Ok(())
    }
}

pub struct NullMilestoneStore {
    state: Arc<Mutex<TangleState>>,
}

impl MilestoneStore for NullMilestoneStore {
    fn store(&self, milestone: &Milestone) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        if state.milestones.contains_key(&milestone.index) {
            return Err(StoreError::Duplicate(format!(
                "milestone index {}",
                milestone.index
            )));
        }
        if state.milestone_indexes.contains_key(&milestone.hash) {
            return Err(StoreError::Duplicate(format!(
                "milestone hash {}",
                milestone.hash
            )));
        }
        state.milestones.insert(milestone.index, milestone.hash);
        state.milestone_indexes.insert(milestone.hash, milestone.index);
        Ok(())
    }

    fn load(&self, hash: &Hash243, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let state = lock(&self.state)?;
        if let Some(index) = state.milestone_indexes.get(hash) {
            pack.push(Milestone::new(*index, *hash));
        }
        Ok(())
    }

    fn load_by_index(&self, index: u64, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let state = lock(&self.state)?;
        if let Some(hash) = state.milestones.get(&index) {
            pack.push(Milestone::new(index, *hash));
        }
        Ok(())
    }

    fn load_first(&self, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let state = lock(&self.state)?;
        if let Some((index, hash)) = state.milestones.first_key_value() {
            pack.push(Milestone::new(*index, *hash));
        }
        Ok(())
    }

    fn load_last(&self, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let state = lock(&self.state)?;
        if let Some((index, hash)) = state.milestones.last_key_value() {
            pack.push(Milestone::new(*index, *hash));
        }
        Ok(())
    }

    fn load_next(&self, after_index: u64, pack: &mut Pack<Milestone>) -> Result<(), StoreError> {
        let Some(start) = after_index.checked_add(1) else {
            return Ok(());
        };
        let state = lock(&self.state)?;
        if let Some((index, hash)) = state.milestones.range(start..).next() {
            pack.push(Milestone::new(*index, *hash));
        }
        Ok(())
    }

    fn exist(&self, hash: Option<&Hash243>) -> Result<bool, StoreError> {
        let state = lock(&self.state)?;
        Ok(match hash {
            Some(hash) => state.milestone_indexes.contains_key(hash),
            None => !state.milestones.is_empty(),
        })
    }

    fn delete(&self, hash: &Hash243) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        if let Some(index) = state.milestone_indexes.remove(hash) {
            state.milestones.remove(&index);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut state = lock(&self.state)?;
        state.milestones.clear();
        state.milestone_indexes.clear();
        Ok(())
    }
}

pub struct NullStateDeltaStore {
    state: Arc<Mutex<TangleState>>,
}

impl StateDeltaStore for NullStateDeltaStore {
    fn store(&self, index: u64, delta: &StateDelta) -> Result<(), StoreError> {
        lock(&self.state)?.state_deltas.insert(index, delta.clone());
        Ok(())
    }

    fn load(&self, index: u64) -> Result<Option<StateDelta>, StoreError> {
        Ok(lock(&self.state)?.state_deltas.get(&index).cloned())
    }
}

/// In-memory spent-address set.
#[derive(Default)]
pub struct NullSpentAddressStore {
    addresses: Mutex<BTreeSet<Hash243>>,
}

impl NullSpentAddressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpentAddressStore for NullSpentAddressStore {
    fn store(&self, address: &Hash243) -> Result<(), StoreError> {
        lock(&self.addresses)?.insert(*address);
        Ok(())
    }

    fn store_bulk(&self, addresses: &HashSet243) -> Result<(), StoreError> {
        let mut stored = lock(&self.addresses)?;
        for address in addresses {
            stored.insert(*address);
        }
        Ok(())
    }

    fn exist(&self, address: &Hash243) -> Result<bool, StoreError> {
        Ok(lock(&self.addresses)?.contains(address))
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.addresses)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullClock;
    use tangle_types::{Tag, HASH_SIZE, TAG_SIZE};

    fn hash(n: u8) -> Hash243 {
        let mut bytes = [0u8; HASH_SIZE];
        bytes[0] = n;
        Hash243::new(bytes)
    }

    fn tag(n: u8) -> Tag {
        Tag::new([n; TAG_SIZE])
    }

    fn transaction(n: u8, trunk: Hash243, branch: Hash243) -> Transaction {
        let mut tx = Transaction::default();
        tx.consensus.hash = hash(n);
        tx.essence.address = hash(100 + n % 2);
        tx.essence.bundle = hash(200);
        tx.attachment.trunk = trunk;
        tx.attachment.branch = branch;
        tx.attachment.attachment_timestamp = u64::from(n) * 10;
        tx.attachment.tag = tag(n % 3);
        tx
    }

    fn tangle() -> (Arc<NullClock>, NullTangleStore) {
        let clock = Arc::new(NullClock::new(Timestamp::new(5_000)));
        let store = NullTangleStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn store_stamps_arrival_and_rejects_duplicates() {
        let (clock, tangle) = tangle();
        let store = tangle.transaction_store();
        store.store(&transaction(1, hash(50), hash(51))).unwrap();
        clock.advance(10);
        let again = store.store(&transaction(1, hash(50), hash(51))).unwrap_err();
        assert!(matches!(again, StoreError::Duplicate(_)));

        let mut pack = Pack::with_capacity(1);
        store.load_metadata(&hash(1), &mut pack).unwrap();
        let row = &pack.models()[0];
        assert_eq!(row.metadata.arrival_timestamp, Timestamp::new(5_000));
        assert_eq!(row.loaded_columns, ColumnMask::METADATA);
    }

    #[test]
    fn approvers_respect_timestamp_bound_and_shared_parents() {
        let (_clock, tangle) = tangle();
        let store = tangle.transaction_store();
        for n in 1..=4 {
            store.store(&transaction(n, hash(50), hash(50))).unwrap();
        }

        assert_eq!(store.approvers_count(&hash(50)).unwrap(), 4);
        let mut pack = Pack::with_capacity(10);
        store.load_hashes_of_approvers(&hash(50), 20, &mut pack).unwrap();
        assert_eq!(pack.models(), &[hash(3), hash(4)]);

        let mut small = Pack::with_capacity(2);
        store.load_hashes_of_approvers(&hash(50), 0, &mut small).unwrap();
        assert!(small.insufficient_capacity());
    }

    #[test]
    fn find_intersects_criteria() {
        let (_clock, tangle) = tangle();
        let store = tangle.transaction_store();
        for n in 1..=6 {
            store.store(&transaction(n, hash(50), hash(51))).unwrap();
        }
        let mut query = FindQuery::default();
        query.addresses.add(hash(101));
        query.tags.insert(tag(0));
        let mut pack = Pack::with_capacity(10);
        store.find(&query, &mut pack).unwrap();
        assert_eq!(pack.models(), &[hash(3)]);

        let empty = store.find(&FindQuery::default(), &mut pack).unwrap_err();
        assert!(matches!(empty, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn milestone_candidates_skip_stored_milestones() {
        let (_clock, tangle) = tangle();
        let transactions = tangle.transaction_store();
        let milestones = tangle.milestone_store();
        for n in [1, 3, 5] {
            transactions.store(&transaction(n, hash(50), hash(51))).unwrap();
        }
        milestones.store(&Milestone::new(7, hash(3))).unwrap();

        let mut pack = Pack::with_capacity(10);
        transactions
            .load_hashes_of_milestone_candidates(&hash(101), &mut pack)
            .unwrap();
        assert_eq!(pack.models(), &[hash(1), hash(5)]);
    }

    #[test]
    fn milestones_walk_in_index_order() {
        let (_clock, tangle) = tangle();
        let store = tangle.milestone_store();
        for index in [9u64, 3, 6] {
            store.store(&Milestone::new(index, hash(index as u8))).unwrap();
        }
        let mut pack = Pack::with_capacity(1);
        store.load_next(3, &mut pack).unwrap();
        assert_eq!(pack.first().map(|m| m.index), Some(6));
        pack.reset();
        store.load_next(u64::MAX, &mut pack).unwrap();
        assert_eq!(pack.num_loaded(), 0);
    }

    #[test]
    fn metadata_clear_keeps_arrival() {
        let (_clock, tangle) = tangle();
        let store = tangle.transaction_store();
        store.store(&transaction(1, hash(50), hash(51))).unwrap();
        store.update_snapshot_index(&hash(1), 12).unwrap();
        store.update_bundle_validity(&hash(200), 1).unwrap();
        store.metadata_clear().unwrap();

        let mut pack = Pack::with_capacity(1);
        store.load_metadata(&hash(1), &mut pack).unwrap();
        assert_eq!(
            pack.models()[0].metadata,
            Metadata::arrived_at(Timestamp::new(5_000))
        );
    }

    #[test]
    fn spent_addresses_are_a_set() {
        let store = NullSpentAddressStore::new();
        store.store(&hash(1)).unwrap();
        store.store(&hash(1)).unwrap();
        store
            .store_bulk(&[hash(2), hash(3)].into_iter().collect())
            .unwrap();
        assert_eq!(store.count().unwrap(), 3);
        assert!(store.exist(&hash(2)).unwrap());
        assert!(!store.exist(&hash(4)).unwrap());
    }
}
