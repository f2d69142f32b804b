//! Optimistic concurrency through CAS tokens

use crate::common::*;

#[test]
fn set_with_cas_rejects_stale_token() {
    let store = TestStore::new();
    let ds = &store.ds;

    let (ok, t1) = ds.set_with_cas("k", &json!("v1"), &plain(), None).unwrap();
    assert!(ok);

    let (ok, t2) = ds
        .set_with_cas("k", &json!("v2"), &plain(), Some(t1))
        .unwrap();
    assert!(ok);
    assert_ne!(t1, t2);

    let err = ds
        .set_with_cas("k", &json!("v3"), &plain(), Some(t1))
        .unwrap_err();
    assert!(err.is_version_conflict());
    assert_eq!(ds.read("k").unwrap(), Some(json!("v2")));
}

#[test]
fn set_with_cas_ignores_token_for_missing_document() {
    let store = TestStore::new();
    let ds = &store.ds;

    let (ok, cas) = ds
        .set_with_cas("fresh", &json!(1), &plain(), Some(Cas::new(12345)))
        .unwrap();
    assert!(ok);
    assert_eq!(ds.read_with_cas("fresh").unwrap().unwrap().cas, cas);
}

#[test]
fn read_with_cas_matches_write_token() {
    let store = TestStore::new();
    let ds = &store.ds;

    let (_, written) = ds.set_with_cas("k", &json!(1), &plain(), None).unwrap();
    let doc = ds.read_with_cas("k").unwrap().unwrap();
    assert_eq!(doc.cas, written);
    assert_eq!(doc.value, json!(1));
}

#[test]
fn update_with_cas_round_trip() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.create("k", &json!({"n": 1}), &plain()).unwrap();
    let doc = ds.read_with_cas("k").unwrap().unwrap();

    let (ok, next) = ds
        .update_with_cas("k", &json!({"n": 2}), doc.cas, &plain())
        .unwrap();
    assert!(ok);
    assert_ne!(next, doc.cas);

    let err = ds
        .update_with_cas("k", &json!({"n": 3}), doc.cas, &plain())
        .unwrap_err();
    assert!(err.is_version_conflict());
    assert_eq!(ds.read("k").unwrap(), Some(json!({"n": 2})));
}

#[test]
fn update_with_cas_on_missing_document() {
    let store = TestStore::new();
    let err = store
        .ds
        .update_with_cas("nope", &json!(1), Cas::new(1), &plain())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn write_options_cas_guards_update_set_and_delete() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k", &json!(1), &plain()).unwrap();
    let stale = ds.read_with_cas("k").unwrap().unwrap().cas;
    ds.set("k", &json!(2), &plain()).unwrap();

    let guarded = WriteOptions::new().with_cas(stale);
    assert!(ds.update("k", &json!(3), &guarded).unwrap_err().is_version_conflict());
    assert!(ds.set("k", &json!(3), &guarded).unwrap_err().is_version_conflict());
    assert!(ds.delete("k", &guarded).unwrap_err().is_version_conflict());
    assert_eq!(ds.read("k").unwrap(), Some(json!(2)));

    let fresh = ds.read_with_cas("k").unwrap().unwrap().cas;
    assert!(ds.delete("k", &WriteOptions::new().with_cas(fresh)).unwrap());
}

#[test]
fn tokens_change_on_every_mutation() {
    let store = TestStore::new();
    let ds = &store.ds;

    let mut seen = std::collections::HashSet::new();
    for i in 0..50 {
        let (_, cas) = ds.set_with_cas("k", &json!(i), &plain(), None).unwrap();
        assert!(seen.insert(cas), "token reused: {}", cas);
    }
}

#[test]
fn cas_carried_as_raw_integer() {
    let store = TestStore::new();
    let ds = &store.ds;

    let (_, cas) = ds.set_with_cas("k", &json!(1), &plain(), None).unwrap();
    let raw: u64 = cas.into();
    let (ok, _) = ds
        .update_with_cas("k", &json!(2), Cas::from(raw), &plain())
        .unwrap();
    assert!(ok);
}
