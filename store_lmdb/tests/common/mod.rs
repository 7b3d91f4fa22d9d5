#![allow(dead_code)]

use std::sync::Arc;

use tangle_nullables::NullClock;
use tangle_store::Transaction;
use tangle_store_lmdb::{LmdbEnvironment, SpentAddressEnvironment, StorageConfig};
use tangle_types::{Hash243, HashSet243, Tag, Timestamp, HASH_SIZE, TAG_SIZE};

pub const ARRIVAL: Timestamp = Timestamp::new(1_600_000_000_000);

pub fn temp_config(dir: &tempfile::TempDir) -> StorageConfig {
    let mut config = StorageConfig::new(dir.path());
    config.map_size = 64 * 1024 * 1024;
    config
}

pub fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open_with_clock(&temp_config(&dir), Arc::new(NullClock::new(ARRIVAL)))
        .expect("open env");
    (dir, env)
}

pub fn temp_spent_env() -> (tempfile::TempDir, SpentAddressEnvironment) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = SpentAddressEnvironment::open(&temp_config(&dir)).expect("open env");
    (dir, env)
}

/// A hash whose first two bytes encode `n`.
pub fn hash(n: u16) -> Hash243 {
    let mut bytes = [0u8; HASH_SIZE];
    bytes[..2].copy_from_slice(&n.to_be_bytes());
    bytes[HASH_SIZE - 1] = 0x5A;
    Hash243::new(bytes)
}

pub fn set(hashes: &[Hash243]) -> HashSet243 {
    hashes.iter().copied().collect()
}

pub fn tag(n: u8) -> Tag {
    Tag::new([n; TAG_SIZE])
}

/// A fully populated transaction with hash `hash(n)`.
pub fn transaction(n: u16) -> Transaction {
    let mut tx = Transaction::default();
    tx.consensus.hash = hash(n);

    tx.essence.address = hash(10_000 + n);
    tx.essence.value = i64::from(n) * 1_000 - 500;
    tx.essence.obsolete_tag = tag(0x0B);
    tx.essence.timestamp = 1_500_000_000 + u64::from(n);
    tx.essence.current_index = 0;
    tx.essence.last_index = 0;
    tx.essence.bundle = hash(20_000 + n);

    tx.attachment.trunk = hash(30_000);
    tx.attachment.branch = hash(30_001);
    tx.attachment.attachment_timestamp = 1_500_000_000_000 + u64::from(n);
    tx.attachment.attachment_timestamp_lower = 0;
    tx.attachment.attachment_timestamp_upper = 3_812_798_742_493;
    tx.attachment.nonce = tag(0x4E);
    tx.attachment.tag = tag(0x7A);

    tx.data.signature_or_message = (0..=255u8).cycle().skip(usize::from(n % 256)).take(1_312).collect();
    tx
}
