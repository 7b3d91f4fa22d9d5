//! LMDB storage backend for the Tangle storage engine.
//!
//! Implements the storage traits from `tangle-store` using the `heed` LMDB
//! bindings. The Tangle database (transactions, milestones, state deltas) is
//! one environment; spent addresses live in a second, independent one.

pub mod config;
pub mod environment;
pub mod error;
mod index;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod milestone;
pub mod spent_address;
pub mod state_delta;
pub mod transaction;
pub mod write_batch;

pub use config::StorageConfig;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::IntegrityReport;
pub use meta::LmdbMetaStore;
pub use migration::{check_schema_version, CURRENT_SCHEMA_VERSION};
pub use milestone::LmdbMilestoneStore;
pub use spent_address::{LmdbSpentAddressStore, SpentAddressEnvironment};
pub use state_delta::LmdbStateDeltaStore;
pub use transaction::LmdbTransactionStore;
pub use write_batch::TransactionBatch;
