mod common;

use common::{hash, temp_env};
use proptest::prelude::*;
use tangle_store::{StateDelta, StateDeltaStore};
use tangle_types::{Hash243, HASH_SIZE};

#[test]
fn round_trip_of_201_entries() {
    let (_dir, env) = temp_env();
    let store = env.state_delta_store();

    let mut delta = StateDelta::new();
    for (address, value) in (0..=200u16).zip(-100..=100i64) {
        delta.add(hash(address), value).unwrap();
    }
    assert_eq!(delta.len(), 201);
    assert_eq!(delta.sum(), 0);

    store.store(42, &delta).unwrap();
    let loaded = store.load(42).unwrap().expect("delta stored at 42");
    assert_eq!(loaded.len(), 201);
    for (address, value) in &delta {
        assert_eq!(loaded.get(address), Some(*value));
    }

    assert!(store.load(43).unwrap().is_none());
}

#[test]
fn store_overwrites_previous_delta() {
    let (_dir, env) = temp_env();
    let store = env.state_delta_store();

    let first: StateDelta = [(hash(1), 10), (hash(2), -10)].into_iter().collect();
    let second: StateDelta = [(hash(3), 5), (hash(4), -5)].into_iter().collect();
    store.store(7, &first).unwrap();
    store.store(7, &second).unwrap();

    assert_eq!(store.load(7).unwrap(), Some(second));
}

#[test]
fn empty_delta_is_distinct_from_absent() {
    let (_dir, env) = temp_env();
    let store = env.state_delta_store();
    store.store(1, &StateDelta::new()).unwrap();
    assert_eq!(store.load(1).unwrap(), Some(StateDelta::new()));
    assert_eq!(store.load(2).unwrap(), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn arbitrary_delta_round_trips(
        index in any::<u64>(),
        entries in prop::collection::vec((any::<[u8; 32]>(), any::<i64>()), 0..64),
    ) {
        let (_dir, env) = temp_env();
        let store = env.state_delta_store();

        let delta: StateDelta = entries
            .into_iter()
            .map(|(seed, value)| {
                let mut bytes = [0u8; HASH_SIZE];
                bytes[..32].copy_from_slice(&seed);
                (Hash243::new(bytes), value)
            })
            .collect();
        store.store(index, &delta).unwrap();
        prop_assert_eq!(store.load(index).unwrap(), Some(delta));
    }
}
