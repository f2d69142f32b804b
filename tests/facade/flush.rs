//! Bucket flush

use crate::common::*;

#[test]
fn flush_removes_documents_but_keeps_definitions() {
    let store = TestStore::new();
    let ds = &store.ds;

    let ddoc = DesignDocument::new("test").with_view(
        "all",
        ViewDefinition::map("function (doc, meta) { emit(meta.id, null); }"),
    );
    ds.design_create(&ddoc, DesignNamespace::Production).unwrap();
    ds.n1ql_index_create("ix", &["a"], &IndexCreateOptions::new())
        .unwrap();
    for i in 0..10 {
        ds.set(&format!("k{}", i), &json!({"a": i}), &plain()).unwrap();
    }

    ds.flush_bucket().unwrap();

    assert!(ds.get_multi(&["k0", "k5", "k9"]).unwrap().is_empty());
    let rows = ds
        .view("test", "all", &ViewQuery::new().stale(Stale::False))
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(ds.design_get("test", DesignNamespace::Production).unwrap(), ddoc);
    assert_eq!(ds.n1ql_index_list().unwrap().len(), 1);
}

#[test]
fn flush_requires_flush_enabled() {
    let store = TestStore::with_settings(BucketSettings::new(BUCKET));
    let ds = &store.ds;
    ds.set("k", &json!(1), &plain()).unwrap();

    let err = ds.flush_bucket().unwrap_err();
    assert!(matches!(err, Error::FlushDisabled { .. }));
    assert_eq!(ds.read("k").unwrap(), Some(json!(1)));
}

#[test]
fn bucket_is_usable_after_flush() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.create("k", &json!(1), &plain()).unwrap();
    ds.flush_bucket().unwrap();
    assert!(ds.create("k", &json!(2), &plain()).unwrap());
    assert_eq!(ds.read("k").unwrap(), Some(json!(2)));
}
