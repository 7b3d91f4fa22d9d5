//! Fundamental types for the Tangle storage engine.
//!
//! This crate defines the fixed-width values shared across every other crate
//! in the workspace: packed trit hashes and tags, hash sets used as bulk
//! operation input, millisecond timestamps and the clock that produces them.

pub mod error;
pub mod hash;
pub mod hash_set;
pub mod time;

pub use error::TypesError;
pub use hash::{Hash243, Tag, HASH_SIZE, TAG_SIZE};
pub use hash_set::HashSet243;
pub use time::{Clock, SystemClock, Timestamp};
