//! Sets of 243-trit hashes.
//!
//! Used both as bulk-operation input ("mark these hashes solid") and to
//! combine index lookups. Membership is unique and iteration order is
//! unspecified; adding a hash twice is a no-op.

use std::collections::hash_set;
use std::collections::HashSet;

use crate::Hash243;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HashSet243(HashSet<Hash243>);

impl HashSet243 {
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    /// Add a hash. Returns `false` if it was already present.
    pub fn add(&mut self, hash: Hash243) -> bool {
        self.0.insert(hash)
    }

    pub fn contains(&self, hash: &Hash243) -> bool {
        self.0.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Hash243> {
        self.0.iter()
    }

    /// Keep only the hashes also present in `other`.
    pub fn retain_common(&mut self, other: &HashSet243) {
        self.0.retain(|hash| other.contains(hash));
    }
}

impl FromIterator<Hash243> for HashSet243 {
    fn from_iter<I: IntoIterator<Item = Hash243>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Hash243> for HashSet243 {
    fn extend<I: IntoIterator<Item = Hash243>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for HashSet243 {
    type Item = Hash243;
    type IntoIter = hash_set::IntoIter<Hash243>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HashSet243 {
    type Item = &'a Hash243;
    type IntoIter = hash_set::Iter<'a, Hash243>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
