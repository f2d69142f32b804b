//! Pessimistic locks

use std::thread;
use std::time::Duration;

use crate::common::*;

#[test]
fn locked_document_rejects_writers_until_unlocked() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k", &json!("v"), &plain()).unwrap();
    let locked = ds.lock("k", 30).unwrap();
    assert_eq!(locked.value, json!("v"));

    assert!(ds.update("k", &json!("v2"), &plain()).unwrap_err().is_locked());
    assert!(ds.set("k", &json!("v2"), &plain()).unwrap_err().is_locked());
    assert!(ds.delete("k", &plain()).unwrap_err().is_locked());

    ds.unlock("k", locked.cas).unwrap();
    assert!(ds.update("k", &json!("v2"), &plain()).unwrap());
    assert_eq!(ds.read("k").unwrap(), Some(json!("v2")));
}

#[test]
fn reads_see_locked_documents() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k", &json!({"n": 1}), &plain()).unwrap();
    let locked = ds.lock("k", 30).unwrap();

    let doc = ds.read_with_cas("k").unwrap().unwrap();
    assert_eq!(doc.value, json!({"n": 1}));
    assert_ne!(doc.cas, locked.cas);
}

#[test]
fn unlock_with_wrong_token_is_locked() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k", &json!(1), &plain()).unwrap();
    let locked = ds.lock("k", 30).unwrap();

    let err = ds.unlock("k", Cas::new(locked.cas.as_u64() + 1)).unwrap_err();
    assert!(err.is_locked());
    assert!(ds.update("k", &json!(2), &plain()).unwrap_err().is_locked());
}

#[test]
fn unlock_is_a_no_op_when_nothing_is_held() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.unlock("missing", Cas::new(99)).unwrap();

    ds.set("k", &json!(1), &plain()).unwrap();
    let locked = ds.lock("k", 30).unwrap();
    ds.unlock("k", locked.cas).unwrap();
    ds.unlock("k", locked.cas).unwrap();
}

#[test]
fn lock_token_authorizes_one_write() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k", &json!(1), &plain()).unwrap();
    let locked = ds.lock("k", 30).unwrap();

    let (ok, cas) = ds
        .update_with_cas("k", &json!(2), locked.cas, &plain())
        .unwrap();
    assert!(ok);
    assert_ne!(cas, locked.cas);
    assert!(ds.set("k", &json!(3), &plain()).unwrap());
}

#[test]
fn lock_twice_is_locked() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k", &json!(1), &plain()).unwrap();
    ds.lock("k", 30).unwrap();
    assert!(ds.lock("k", 30).unwrap_err().is_locked());
}

#[test]
fn lock_missing_document_is_not_found() {
    let store = TestStore::new();
    assert!(store.ds.lock("nope", 5).unwrap_err().is_not_found());
}

#[test]
fn lock_expires_on_its_own() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k", &json!(1), &plain()).unwrap();
    ds.lock("k", 1).unwrap();
    assert!(ds.set("k", &json!(2), &plain()).unwrap_err().is_locked());

    thread::sleep(Duration::from_millis(1300));
    assert!(ds.set("k", &json!(2), &plain()).unwrap());
}

#[test]
fn locks_are_visible_across_facades() {
    let store = TestStore::new();
    let other = store.second_facade();

    store.ds.set("k", &json!(1), &plain()).unwrap();
    let locked = store.ds.lock("k", 30).unwrap();
    assert!(other.update("k", &json!(2), &plain()).unwrap_err().is_locked());

    other.unlock("k", locked.cas).unwrap();
    assert!(other.update("k", &json!(2), &plain()).unwrap());
}
