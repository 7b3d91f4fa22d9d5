//! Nullable infrastructure for deterministic testing.
//!
//! The storage engine's external dependencies (wall clock, disk) sit behind
//! traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests of code that
//! consumes the storage traits.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::{
    NullMilestoneStore, NullSpentAddressStore, NullStateDeltaStore, NullTangleStore,
    NullTransactionStore,
};
