mod common;

use common::{hash, temp_config, temp_spent_env};
use tangle_store::SpentAddressStore;
use tangle_store_lmdb::SpentAddressEnvironment;
use tangle_types::HashSet243;

#[test]
fn store_and_exist() {
    let (_dir, env) = temp_spent_env();
    let store = env.spent_address_store();
    assert!(!store.exist(&hash(1)).unwrap());
    store.store(&hash(1)).unwrap();
    assert!(store.exist(&hash(1)).unwrap());
    assert!(!store.exist(&hash(2)).unwrap());
}

#[test]
fn store_is_idempotent() {
    let (_dir, env) = temp_spent_env();
    let store = env.spent_address_store();
    store.store(&hash(1)).unwrap();
    store.store(&hash(1)).unwrap();
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn bulk_store_adds_exactly_the_given_set() {
    let (_dir, env) = temp_spent_env();
    let store = env.spent_address_store();

    let odd: HashSet243 = (0..26u16).filter(|n| n % 2 == 1).map(hash).collect();
    store.store_bulk(&odd).unwrap();

    for n in 0..26u16 {
        assert_eq!(store.exist(&hash(n)).unwrap(), n % 2 == 1, "address {n}");
    }
    assert_eq!(store.count().unwrap(), 13);
}

#[test]
fn spent_addresses_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(&dir);
    {
        let env = SpentAddressEnvironment::open(&config).unwrap();
        env.spent_address_store().store(&hash(5)).unwrap();
        env.close().unwrap();
    }

    let env = SpentAddressEnvironment::open(&config).unwrap();
    let store = env.spent_address_store();
    assert!(store.exist(&hash(5)).unwrap());
    assert_eq!(store.count().unwrap(), 1);
}
