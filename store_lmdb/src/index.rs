//! Secondary-index key layout.
//!
//! Every index is a table of composite keys `prefix ++ tx_hash`, where the
//! prefix is the indexed value (address, bundle, tag, obsolete tag or
//! approvee hash). All prefixes of one index have the same width, so a
//! prefix scan yields exactly the transactions sharing that value and the
//! transaction hash is always the last [`HASH_SIZE`] bytes of the key.
//!
//! Values are empty except in the approvee index, which stores the
//! approver's attachment timestamp as a big-endian `u64` so the timestamp
//! filter never touches the attachment table.

use heed::types::Bytes;
use heed::{Database, RoTxn};

use tangle_types::{Hash243, HASH_SIZE};

use crate::LmdbError;

/// Build the composite key `prefix ++ tx_hash`.
pub(crate) fn index_key(prefix: &[u8], tx_hash: &Hash243) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + HASH_SIZE);
    key.extend_from_slice(prefix);
    key.extend_from_slice(tx_hash.as_bytes());
    key
}

/// Extract the transaction hash from a composite index key.
pub(crate) fn tx_hash_of(key: &[u8]) -> Result<Hash243, LmdbError> {
    let start = key.len().checked_sub(HASH_SIZE).ok_or_else(|| {
        LmdbError::Corruption(format!("index key of {} bytes is too short", key.len()))
    })?;
    Hash243::try_from(&key[start..]).map_err(|e| LmdbError::Corruption(e.to_string()))
}

/// Big-endian key of an ordered `u64` table.
pub(crate) fn index_be(index: u64) -> [u8; 8] {
    index.to_be_bytes()
}

pub(crate) fn decode_be(bytes: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Corruption(format!("expected 8-byte index, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

/// Visit every `(tx_hash, value)` entry of `db` under `prefix`, in key order,
/// until `visit` returns `false`.
pub(crate) fn scan_prefix<F>(
    db: Database<Bytes, Bytes>,
    rtxn: &RoTxn,
    prefix: &[u8],
    mut visit: F,
) -> Result<(), LmdbError>
where
    F: FnMut(Hash243, &[u8]) -> Result<bool, LmdbError>,
{
    let iter = db.prefix_iter(rtxn, prefix)?;
    for result in iter {
        let (key, value) = result?;
        if !visit(tx_hash_of(key)?, value)? {
            break;
        }
    }
    Ok(())
}

/// All transaction hashes indexed under `prefix`.
pub(crate) fn hashes_under(
    db: Database<Bytes, Bytes>,
    rtxn: &RoTxn,
    prefix: &[u8],
) -> Result<Vec<Hash243>, LmdbError> {
    let mut hashes = Vec::new();
    scan_prefix(db, rtxn, prefix, |hash, _| {
        hashes.push(hash);
        Ok(true)
    })?;
    Ok(hashes)
}

/// Number of entries under `prefix`.
pub(crate) fn count_under(
    db: Database<Bytes, Bytes>,
    rtxn: &RoTxn,
    prefix: &[u8],
) -> Result<u64, LmdbError> {
    let mut count = 0u64;
    for result in db.prefix_iter(rtxn, prefix)? {
        result?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ends_with_tx_hash() {
        let tx = Hash243::new([7u8; HASH_SIZE]);
        let key = index_key(&[1, 2, 3], &tx);
        assert_eq!(key.len(), 3 + HASH_SIZE);
        assert_eq!(&key[..3], &[1, 2, 3]);
        assert_eq!(tx_hash_of(&key).unwrap(), tx);
    }

    #[test]
    fn short_key_is_corruption() {
        assert!(matches!(tx_hash_of(&[0u8; 10]), Err(LmdbError::Corruption(_))));
    }

    #[test]
    fn big_endian_keys_sort_numerically() {
        assert!(index_be(255) < index_be(256));
        assert!(index_be(1) < index_be(u64::MAX));
        assert_eq!(decode_be(&index_be(42)).unwrap(), 42);
        assert!(decode_be(&[1, 2]).is_err());
    }
}
