//! Batch reads

use crate::common::*;

#[test]
fn get_multi_returns_exactly_the_present_keys() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k1", &json!("one"), &plain()).unwrap();
    ds.set("k3", &json!("three"), &plain()).unwrap();

    let docs = ds.get_multi(&["k1", "k2", "k3"]).unwrap();
    let mut keys: Vec<_> = docs.keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["k1", "k3"]);
    assert_eq!(docs["k1"].value, json!("one"));
    assert_eq!(docs["k3"].value, json!("three"));
}

#[test]
fn get_multi_carries_tokens() {
    let store = TestStore::new();
    let ds = &store.ds;

    let (_, cas) = ds.set_with_cas("k", &json!(1), &plain(), None).unwrap();
    let docs = ds.get_multi(&["k"]).unwrap();
    assert_eq!(docs["k"].cas, cas);
}

#[test]
fn get_multi_of_nothing() {
    let store = TestStore::new();
    assert!(store.ds.get_multi(&[]).unwrap().is_empty());
    assert!(store.ds.get_multi(&["a", "b"]).unwrap().is_empty());
}
