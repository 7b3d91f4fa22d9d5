//! Milestone storage trait.

use serde::{Deserialize, Serialize};
use tangle_types::Hash243;

use crate::{Pack, StoreError};

/// A checkpoint: the milestone index and the hash of the transaction
/// carrying it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub index: u64,
    pub hash: Hash243,
}

impl Milestone {
    pub fn new(index: u64, hash: Hash243) -> Self {
        Self { index, hash }
    }
}

/// Storage of milestones, ordered by index.
///
/// Ordering comes from the index itself, never from insertion order.
pub trait MilestoneStore {
    /// Store a milestone. Fails with [`StoreError::Duplicate`] if its index
    /// or its hash is already stored.
    fn store(&self, milestone: &Milestone) -> Result<(), StoreError>;

    fn load(&self, hash: &Hash243, pack: &mut Pack<Milestone>) -> Result<(), StoreError>;

    fn load_by_index(&self, index: u64, pack: &mut Pack<Milestone>) -> Result<(), StoreError>;

    /// Load the milestone with the lowest index.
    fn load_first(&self, pack: &mut Pack<Milestone>) -> Result<(), StoreError>;

    /// Load the milestone with the highest index.
    fn load_last(&self, pack: &mut Pack<Milestone>) -> Result<(), StoreError>;

    /// Load the milestone with the smallest index strictly greater than
    /// `after_index`.
    fn load_next(&self, after_index: u64, pack: &mut Pack<Milestone>) -> Result<(), StoreError>;

    /// Whether `hash` is a milestone, or with `None`, whether any milestone
    /// is stored.
    fn exist(&self, hash: Option<&Hash243>) -> Result<bool, StoreError>;

    fn delete(&self, hash: &Hash243) -> Result<(), StoreError>;

    /// Remove every milestone.
    fn clear(&self) -> Result<(), StoreError>;
}
