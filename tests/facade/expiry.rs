//! Document expiry

use std::thread;
use std::time::Duration;

use crate::common::*;

#[test]
fn expired_documents_disappear() {
    let store = TestStore::new();
    let ds = &store.ds;

    let options = WriteOptions::new().with_expiry(Duration::from_secs(1));
    ds.set("short", &json!("lived"), &options).unwrap();
    ds.set("long", &json!("lived"), &plain()).unwrap();
    assert_eq!(ds.read("short").unwrap(), Some(json!("lived")));

    thread::sleep(Duration::from_millis(1500));
    assert_eq!(ds.read("short").unwrap(), None);
    assert_eq!(ds.read("long").unwrap(), Some(json!("lived")));
    assert!(!ds.delete("short", &plain()).unwrap());
}

#[test]
fn expired_key_can_be_created_again() {
    let store = TestStore::new();
    let ds = &store.ds;

    let options = WriteOptions::new().with_expiry(Duration::from_secs(1));
    ds.create("k", &json!(1), &options).unwrap();
    thread::sleep(Duration::from_millis(1500));
    assert!(ds.create("k", &json!(2), &plain()).unwrap());
    assert_eq!(ds.read("k").unwrap(), Some(json!(2)));
}

#[test]
fn long_expiry_keeps_document() {
    let store = TestStore::new();
    let ds = &store.ds;

    // Past the relative window, so it travels as an absolute timestamp
    let options = WriteOptions::new().with_expiry(Duration::from_secs(60 * 24 * 60 * 60));
    ds.set("k", &json!(1), &options).unwrap();
    assert_eq!(ds.read("k").unwrap(), Some(json!(1)));
}

#[test]
fn update_without_expiry_clears_it() {
    let store = TestStore::new();
    let ds = &store.ds;

    let options = WriteOptions::new().with_expiry(Duration::from_secs(1));
    ds.set("k", &json!(1), &options).unwrap();
    ds.update("k", &json!(2), &plain()).unwrap();

    thread::sleep(Duration::from_millis(1500));
    assert_eq!(ds.read("k").unwrap(), Some(json!(2)));
}
