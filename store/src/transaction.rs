//! Transaction model and storage trait.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tangle_types::{Hash243, HashSet243, Tag, Timestamp};

use crate::{ColumnMask, Pack, StoreError};

/// Value-transfer fields signed by the issuer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Essence {
    pub address: Hash243,
    pub value: i64,
    pub obsolete_tag: Tag,
    /// Issuer-supplied timestamp, seconds.
    pub timestamp: u64,
    pub current_index: u64,
    pub last_index: u64,
    pub bundle: Hash243,
}

/// Fields added when the transaction is attached to the Tangle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub trunk: Hash243,
    pub branch: Hash243,
    /// Attachment timestamp and its bounds, milliseconds.
    pub attachment_timestamp: u64,
    pub attachment_timestamp_lower: u64,
    pub attachment_timestamp_upper: u64,
    pub nonce: Tag,
    pub tag: Tag,
}

/// The transaction hash. It is the primary key and is never stored as a
/// value of its own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consensus {
    pub hash: Hash243,
}

/// The signature or message fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub signature_or_message: Vec<u8>,
}

/// Node-local, mutable state of a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Index of the milestone that confirmed this transaction, 0 if none.
    pub snapshot_index: u64,
    pub solid: bool,
    pub validity: i8,
    /// Wall-clock time of first local storage.
    pub arrival_timestamp: Timestamp,
}

impl Metadata {
    /// Metadata of a freshly stored transaction.
    pub fn arrived_at(arrival_timestamp: Timestamp) -> Self {
        Self {
            arrival_timestamp,
            ..Self::default()
        }
    }

    /// Reset consensus-derived state, keeping the arrival time.
    pub fn clear(&mut self) {
        *self = Self::arrived_at(self.arrival_timestamp);
    }
}

/// A transaction, possibly only partially loaded.
///
/// Groups outside [`Transaction::loaded_columns`] hold their zero value.
/// When storing, `loaded_columns` and `metadata` are ignored: the engine
/// persists every immutable group and initialises metadata itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    pub essence: Essence,
    pub attachment: Attachment,
    pub consensus: Consensus,
    pub data: Data,
    pub metadata: Metadata,
    pub loaded_columns: ColumnMask,
}

impl Transaction {
    pub fn hash(&self) -> &Hash243 {
        &self.consensus.hash
    }

    /// Whether every group of `columns` was loaded.
    pub fn has(&self, columns: ColumnMask) -> bool {
        self.loaded_columns.contains(columns)
    }
}

/// Lookup dimension of a transaction query, carrying its key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionField {
    /// No filter. Valid only for existence checks and single-row loads.
    None,
    Hash(Hash243),
    Address(Hash243),
    Bundle(Hash243),
    Tag(Tag),
    ObsoleteTag(Tag),
    /// Transactions whose trunk or branch is the given hash.
    Approvee(Hash243),
}

/// Multi-criteria transaction search.
///
/// A transaction matches a criterion if it matches any of its values; the
/// result is the intersection over all non-empty criteria.
#[derive(Clone, Debug, Default)]
pub struct FindQuery {
    pub bundles: HashSet243,
    pub addresses: HashSet243,
    pub tags: HashSet<Tag>,
    pub approvees: HashSet243,
}

impl FindQuery {
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
            && self.addresses.is_empty()
            && self.tags.is_empty()
            && self.approvees.is_empty()
    }
}

/// Storage of transactions and their secondary indices.
///
/// Every loader appends into the caller's pack and stops at its capacity,
/// raising the pack's overflow flag. A hash that does not exist is not an
/// error: loads report zero rows, updates and deletes skip it.
pub trait TransactionStore {
    /// Store a new transaction with default metadata and every index entry.
    ///
    /// Fails with [`StoreError::Duplicate`] if the hash already exists.
    fn store(&self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Load the immutable groups of every transaction matching `field`.
    /// `TransactionField::None` loads a single arbitrary transaction.
    fn load(
        &self,
        field: TransactionField,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError>;

    /// Load exactly the given column groups of one transaction.
    fn load_columns(
        &self,
        hash: &Hash243,
        columns: ColumnMask,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError>;

    fn load_essence_metadata(
        &self,
        hash: &Hash243,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        self.load_columns(hash, ColumnMask::ESSENCE_METADATA, pack)
    }

    fn load_essence_attachment_metadata(
        &self,
        hash: &Hash243,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        self.load_columns(hash, ColumnMask::ESSENCE_ATTACHMENT_METADATA, pack)
    }

    fn load_essence_consensus(
        &self,
        hash: &Hash243,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        self.load_columns(hash, ColumnMask::ESSENCE_CONSENSUS, pack)
    }

    fn load_metadata(
        &self,
        hash: &Hash243,
        pack: &mut Pack<Transaction>,
    ) -> Result<(), StoreError> {
        self.load_columns(hash, ColumnMask::METADATA, pack)
    }

    /// Load the hashes of every transaction matching `field`.
    ///
    /// `TransactionField::None` is rejected with [`StoreError::InvalidArgument`].
    fn load_hashes(
        &self,
        field: TransactionField,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError>;

    /// Load the hashes of transactions referencing `approvee` as trunk or
    /// branch whose attachment timestamp is strictly greater than
    /// `min_attachment_timestamp` (0 disables the bound).
    fn load_hashes_of_approvers(
        &self,
        approvee: &Hash243,
        min_attachment_timestamp: u64,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError>;

    /// Load the hashes of transactions at `address` that are not yet stored
    /// as milestones.
    fn load_hashes_of_milestone_candidates(
        &self,
        address: &Hash243,
        pack: &mut Pack<Hash243>,
    ) -> Result<(), StoreError>;

    /// Load the hashes matching a multi-criteria query.
    fn find(&self, query: &FindQuery, pack: &mut Pack<Hash243>) -> Result<(), StoreError>;

    fn approvers_count(&self, approvee: &Hash243) -> Result<u64, StoreError>;

    /// Whether any transaction matches `field`. `TransactionField::None`
    /// asks whether the store holds any transaction at all.
    fn exist(&self, field: TransactionField) -> Result<bool, StoreError>;

    fn count(&self) -> Result<u64, StoreError>;

    fn update_snapshot_index(&self, hash: &Hash243, snapshot_index: u64) -> Result<(), StoreError>;

    fn update_solidity(&self, hash: &Hash243, solid: bool) -> Result<(), StoreError>;

    fn update_validity(&self, hash: &Hash243, validity: i8) -> Result<(), StoreError>;

    /// Set the snapshot index of every listed transaction in one atomic write.
    fn update_snapshot_indexes(
        &self,
        hashes: &HashSet243,
        snapshot_index: u64,
    ) -> Result<(), StoreError>;

    /// Set the solidity of every listed transaction in one atomic write.
    fn update_solidities(&self, hashes: &HashSet243, solid: bool) -> Result<(), StoreError>;

    /// Set the validity of every transaction of a bundle in one atomic write.
    fn update_bundle_validity(&self, bundle: &Hash243, validity: i8) -> Result<(), StoreError>;

    /// Remove a transaction and all of its index entries.
    fn delete(&self, hash: &Hash243) -> Result<(), StoreError>;

    /// Remove every listed transaction in one atomic write.
    fn delete_many(&self, hashes: &HashSet243) -> Result<(), StoreError>;

    /// Reset snapshot index, solidity and validity of every transaction.
    fn metadata_clear(&self) -> Result<(), StoreError>;
}
