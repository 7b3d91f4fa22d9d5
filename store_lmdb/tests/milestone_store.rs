mod common;

use common::{hash, temp_env};
use tangle_store::{Milestone, MilestoneStore, Pack, StoreError};

fn single(load: impl FnOnce(&mut Pack<Milestone>)) -> Option<Milestone> {
    let mut pack = Pack::with_capacity(1);
    load(&mut pack);
    pack.first().copied()
}

#[test]
fn empty_store_has_no_milestones() {
    let (_dir, env) = temp_env();
    let store = env.milestone_store();
    assert!(!store.exist(None).unwrap());
    assert!(!store.exist(Some(&hash(1))).unwrap());
    assert_eq!(single(|p| store.load_first(p).unwrap()), None);
    assert_eq!(single(|p| store.load_last(p).unwrap()), None);
    assert_eq!(single(|p| store.load_next(0, p).unwrap()), None);
}

#[test]
fn store_and_load_by_hash_and_index() {
    let (_dir, env) = temp_env();
    let store = env.milestone_store();
    let milestone = Milestone::new(42, hash(42));
    store.store(&milestone).unwrap();

    assert!(store.exist(None).unwrap());
    assert!(store.exist(Some(&hash(42))).unwrap());
    assert_eq!(single(|p| store.load(&hash(42), p).unwrap()), Some(milestone));
    assert_eq!(single(|p| store.load_by_index(42, p).unwrap()), Some(milestone));
    assert_eq!(single(|p| store.load_by_index(41, p).unwrap()), None);
}

#[test]
fn ordering_is_by_index_not_insertion() {
    let (_dir, env) = temp_env();
    let store = env.milestone_store();
    for index in [6u64, 0, 8, 2, 4] {
        store
            .store(&Milestone::new(index, hash(index as u16 + 100)))
            .unwrap();
    }

    assert_eq!(single(|p| store.load_first(p).unwrap()).map(|m| m.index), Some(0));
    assert_eq!(single(|p| store.load_last(p).unwrap()).map(|m| m.index), Some(8));

    let mut walked = Vec::new();
    let mut current = single(|p| store.load_first(p).unwrap());
    while let Some(milestone) = current {
        walked.push(milestone.index);
        current = single(|p| store.load_next(milestone.index, p).unwrap());
    }
    assert_eq!(walked, vec![0, 2, 4, 6, 8]);

    assert_eq!(single(|p| store.load_next(3, p).unwrap()).map(|m| m.index), Some(4));
    assert_eq!(single(|p| store.load_next(8, p).unwrap()), None);
}

#[test]
fn ordering_holds_across_byte_boundaries() {
    let (_dir, env) = temp_env();
    let store = env.milestone_store();
    for (n, index) in [256u64, 255, 65_536, 1].into_iter().enumerate() {
        store.store(&Milestone::new(index, hash(n as u16))).unwrap();
    }
    assert_eq!(single(|p| store.load_first(p).unwrap()).map(|m| m.index), Some(1));
    assert_eq!(single(|p| store.load_next(255, p).unwrap()).map(|m| m.index), Some(256));
    assert_eq!(single(|p| store.load_last(p).unwrap()).map(|m| m.index), Some(65_536));
}

#[test]
fn duplicate_index_or_hash_is_rejected() {
    let (_dir, env) = temp_env();
    let store = env.milestone_store();
    store.store(&Milestone::new(1, hash(1))).unwrap();

    let same_index = store.store(&Milestone::new(1, hash(2))).unwrap_err();
    assert!(matches!(same_index, StoreError::Duplicate(_)));
    let same_hash = store.store(&Milestone::new(2, hash(1))).unwrap_err();
    assert!(matches!(same_hash, StoreError::Duplicate(_)));

    assert!(!store.exist(Some(&hash(2))).unwrap());
    assert_eq!(single(|p| store.load_by_index(2, p).unwrap()), None);
}

#[test]
fn delete_removes_both_directions() {
    let (_dir, env) = temp_env();
    let store = env.milestone_store();
    store.store(&Milestone::new(1, hash(1))).unwrap();
    store.store(&Milestone::new(2, hash(2))).unwrap();

    store.delete(&hash(1)).unwrap();
    store.delete(&hash(99)).unwrap();

    assert!(!store.exist(Some(&hash(1))).unwrap());
    assert_eq!(single(|p| store.load_by_index(1, p).unwrap()), None);
    assert_eq!(single(|p| store.load_first(p).unwrap()).map(|m| m.index), Some(2));

    // Index 1 is free again.
    store.store(&Milestone::new(1, hash(3))).unwrap();
}

#[test]
fn clear_removes_everything() {
    let (_dir, env) = temp_env();
    let store = env.milestone_store();
    for index in 0..5u64 {
        store.store(&Milestone::new(index, hash(index as u16))).unwrap();
    }
    store.clear().unwrap();
    assert!(!store.exist(None).unwrap());
    assert!(!store.exist(Some(&hash(0))).unwrap());
    assert!(env.check_integrity().unwrap().is_healthy());
}
