//! Spent-address storage trait.

use tangle_types::{Hash243, HashSet243};

use crate::StoreError;

/// Append-only set of addresses that have been spent from.
///
/// Only membership is observable; there is no update or removal.
pub trait SpentAddressStore {
    /// Record `address` as spent. Recording it again is a no-op.
    fn store(&self, address: &Hash243) -> Result<(), StoreError>;

    /// Record every address of `addresses` in one atomic write.
    fn store_bulk(&self, addresses: &HashSet243) -> Result<(), StoreError>;

    fn exist(&self, address: &Hash243) -> Result<bool, StoreError>;

    fn count(&self) -> Result<u64, StoreError>;
}
