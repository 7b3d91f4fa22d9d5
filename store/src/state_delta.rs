//! Per-milestone balance changes.

use std::collections::hash_map::{self, HashMap};

use serde::{Deserialize, Serialize};
use tangle_types::Hash243;

use crate::StoreError;

/// Net balance change per address between two milestones.
///
/// Each address appears at most once; adding to an address already present
/// accumulates into its entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta(HashMap<Hash243, i64>);

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the balance change of `address`.
    ///
    /// Fails with [`StoreError::InvalidArgument`] if the sum overflows; the
    /// entry is left unchanged in that case.
    pub fn add(&mut self, address: Hash243, value: i64) -> Result<(), StoreError> {
        let entry = self.0.entry(address).or_insert(0);
        *entry = entry.checked_add(value).ok_or_else(|| {
            StoreError::InvalidArgument(format!("balance change of {address} overflows"))
        })?;
        Ok(())
    }

    pub fn get(&self, address: &Hash243) -> Option<i64> {
        self.0.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Hash243, i64> {
        self.0.iter()
    }

    /// Sum of all balance changes. A consistent delta sums to zero.
    pub fn sum(&self) -> i128 {
        self.0.values().map(|v| i128::from(*v)).sum()
    }
}

impl FromIterator<(Hash243, i64)> for StateDelta {
    /// Later pairs for the same address overwrite earlier ones; use
    /// [`StateDelta::add`] to accumulate.
    fn from_iter<I: IntoIterator<Item = (Hash243, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a StateDelta {
    type Item = (&'a Hash243, &'a i64);
    type IntoIter = hash_map::Iter<'a, Hash243, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Storage of state deltas keyed by milestone index.
pub trait StateDeltaStore {
    /// Persist `delta` as one unit, overwriting any delta at `index`.
    fn store(&self, index: u64, delta: &StateDelta) -> Result<(), StoreError>;

    /// Load the delta stored at `index`, `None` if there is none.
    fn load(&self, index: u64) -> Result<Option<StateDelta>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(n: u8) -> Hash243 {
        let mut bytes = [0u8; tangle_types::HASH_SIZE];
        bytes[0] = n;
        Hash243::new(bytes)
    }

    #[test]
    fn add_accumulates() {
        let mut delta = StateDelta::new();
        delta.add(address(1), 10).unwrap();
        delta.add(address(1), -4).unwrap();
        delta.add(address(2), 7).unwrap();
        assert_eq!(delta.len(), 2);
        assert_eq!(delta.get(&address(1)), Some(6));
        assert_eq!(delta.sum(), 13);
    }

    #[test]
    fn overflow_is_rejected_and_entry_kept() {
        let mut delta = StateDelta::new();
        delta.add(address(1), i64::MAX).unwrap();
        let err = delta.add(address(1), 1).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert_eq!(delta.get(&address(1)), Some(i64::MAX));
    }

    #[test]
    fn bincode_round_trip() {
        let delta: StateDelta = (0..20u8).map(|i| (address(i), i64::from(i) - 10)).collect();
        let bytes = bincode::serialize(&delta).unwrap();
        let back: StateDelta = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, delta);
    }
}
