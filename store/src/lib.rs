//! Entity model and abstract storage traits for the Tangle storage engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the node depends only on the traits and on the
//! [`Pack`] result protocol.

pub mod columns;
pub mod error;
pub mod meta;
pub mod milestone;
pub mod pack;
pub mod spent_address;
pub mod state_delta;
pub mod transaction;

pub use columns::ColumnMask;
pub use error::StoreError;
pub use meta::{MetaStore, SCHEMA_VERSION_KEY};
pub use milestone::{Milestone, MilestoneStore};
pub use pack::Pack;
pub use spent_address::SpentAddressStore;
pub use state_delta::{StateDelta, StateDeltaStore};
pub use transaction::{
    Attachment, Consensus, Data, Essence, FindQuery, Metadata, Transaction, TransactionField,
    TransactionStore,
};
