//! Fixed-capacity result buffers.
//!
//! Every multi-row read writes into a caller-owned [`Pack`]. Loads append
//! after the rows already present; call [`Pack::reset`] to reuse a pack for a
//! new query. When more rows match than fit, the extra rows are dropped and
//! [`Pack::insufficient_capacity`] is raised, so a partial result can never
//! be mistaken for a complete one.

use tangle_types::{Hash243, HashSet243};

/// Rows reserved up front; larger packs grow as rows arrive.
const INITIAL_RESERVE: usize = 256;

#[derive(Clone, Debug)]
pub struct Pack<T> {
    models: Vec<T>,
    capacity: usize,
    insufficient_capacity: bool,
}

impl<T> Pack<T> {
    /// Allocate a pack holding at most `capacity` rows.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            models: Vec::with_capacity(capacity.min(INITIAL_RESERVE)),
            capacity,
            insufficient_capacity: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_loaded(&self) -> usize {
        self.models.len()
    }

    pub fn insufficient_capacity(&self) -> bool {
        self.insufficient_capacity
    }

    pub fn is_full(&self) -> bool {
        self.models.len() >= self.capacity
    }

    /// Append a row. If the pack is already full the row is dropped, the
    /// overflow flag is raised and `false` is returned; loaders stop there.
    pub fn push(&mut self, model: T) -> bool {
        if self.is_full() {
            self.insufficient_capacity = true;
            return false;
        }
        self.models.push(model);
        true
    }

    /// Clear loaded rows and the overflow flag, keeping the buffer.
    pub fn reset(&mut self) {
        self.models.clear();
        self.insufficient_capacity = false;
    }

    pub fn models(&self) -> &[T] {
        &self.models
    }

    pub fn first(&self) -> Option<&T> {
        self.models.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.models.iter()
    }

    pub fn into_models(self) -> Vec<T> {
        self.models
    }
}

impl Pack<Hash243> {
    /// Collect the loaded hashes into a set.
    pub fn to_hash_set(&self) -> HashSet243 {
        self.models.iter().copied().collect()
    }
}

impl<'a, T> IntoIterator for &'a Pack<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_within_capacity() {
        let mut pack = Pack::with_capacity(2);
        assert!(pack.push(1));
        assert!(pack.push(2));
        assert_eq!(pack.num_loaded(), 2);
        assert!(!pack.insufficient_capacity());
    }

    #[test]
    fn overflow_raises_flag_and_drops_row() {
        let mut pack = Pack::with_capacity(1);
        assert!(pack.push("a"));
        assert!(!pack.push("b"));
        assert_eq!(pack.models(), &["a"]);
        assert!(pack.insufficient_capacity());
    }

    #[test]
    fn reset_clears_rows_and_flag() {
        let mut pack = Pack::with_capacity(1);
        pack.push(1);
        pack.push(2);
        pack.reset();
        assert_eq!(pack.num_loaded(), 0);
        assert!(!pack.insufficient_capacity());
        assert_eq!(pack.capacity(), 1);
    }

    #[test]
    fn huge_capacity_allocates_lazily() {
        let mut pack = Pack::with_capacity(usize::MAX);
        assert_eq!(pack.capacity(), usize::MAX);
        for n in 0..1_000u64 {
            assert!(pack.push(n));
        }
        assert_eq!(pack.num_loaded(), 1_000);
        assert!(!pack.is_full());
    }

    #[test]
    fn zero_capacity_only_signals() {
        let mut pack = Pack::with_capacity(0);
        assert!(!pack.push(()));
        assert_eq!(pack.num_loaded(), 0);
        assert!(pack.insufficient_capacity());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_exceeds_capacity(capacity in 0usize..64, pushes in 0usize..128) {
                let mut pack = Pack::with_capacity(capacity);
                let accepted = (0..pushes).filter(|&n| pack.push(n)).count();
                prop_assert_eq!(accepted, pushes.min(capacity));
                prop_assert_eq!(pack.num_loaded(), accepted);
                prop_assert_eq!(pack.insufficient_capacity(), pushes > capacity);
            }
        }
    }
}
