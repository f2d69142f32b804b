//! Several threads on one bucket
//!
//! The facade adds no coordination; these check that the store's CAS and
//! lock guarantees pass through it unchanged.

use std::sync::{Arc, Barrier};
use std::thread;

use crate::common::*;

#[test]
fn cas_counter_never_loses_an_increment() {
    const THREADS: usize = 8;
    const INCREMENTS: u64 = 50;

    let store = TestStore::new();
    store.ds.set("counter", &json!(0), &plain()).unwrap();
    let ds = Arc::new(store.second_facade());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let ds = Arc::clone(&ds);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut conflicts = 0u64;
                for _ in 0..INCREMENTS {
                    loop {
                        let doc = ds.read_with_cas("counter").unwrap().unwrap();
                        let next = doc.value.as_u64().unwrap() + 1;
                        match ds.update_with_cas("counter", &json!(next), doc.cas, &plain()) {
                            Ok(_) => break,
                            Err(e) if e.is_version_conflict() => conflicts += 1,
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                }
                conflicts
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(
        ds.read("counter").unwrap(),
        Some(json!(THREADS as u64 * INCREMENTS))
    );
}

#[test]
fn exactly_one_creator_wins() {
    const THREADS: usize = 8;

    let store = TestStore::new();
    let ds = Arc::new(store.second_facade());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let ds = Arc::clone(&ds);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ds.create("contested", &json!(i), &plain())
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(outcomes
        .iter()
        .filter_map(|o| o.as_ref().err())
        .all(|e| e.is_already_exists()));
}

#[test]
fn exactly_one_locker_wins() {
    const THREADS: usize = 8;

    let store = TestStore::new();
    store.ds.set("k", &json!(1), &plain()).unwrap();
    let ds = Arc::new(store.second_facade());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let ds = Arc::clone(&ds);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ds.lock("k", 30)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|o| o.as_ref().err())
        .all(|e| e.is_locked()));
}

#[test]
fn disjoint_writers_do_not_interfere() {
    const THREADS: usize = 4;
    const KEYS: usize = 100;

    let store = TestStore::new();
    let ds = Arc::new(store.second_facade());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let ds = Arc::clone(&ds);
            thread::spawn(move || {
                for i in 0..KEYS {
                    ds.set(&format!("t{}:{}", t, i), &json!({"t": t, "i": i}), &plain())
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..THREADS {
        for i in [0, KEYS / 2, KEYS - 1] {
            assert_eq!(
                ds.read(&format!("t{}:{}", t, i)).unwrap(),
                Some(json!({"t": t, "i": i}))
            );
        }
    }
}
