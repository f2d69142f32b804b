//! Secondary indexes and ad hoc queries

use crate::common::*;

#[test]
fn index_create_is_idempotent_with_ignore_if_exists() {
    let store = TestStore::new();
    let ds = &store.ds;
    let options = IndexCreateOptions::new().ignore_if_exists();

    ds.n1ql_index_create("ix", &["docType"], &options).unwrap();
    ds.n1ql_index_create("ix", &["docType"], &options).unwrap();
    assert_eq!(ds.n1ql_index_list().unwrap().len(), 1);
}

#[test]
fn index_create_without_ignore_fails_on_duplicate() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.n1ql_index_create("ix", &["docType"], &IndexCreateOptions::new())
        .unwrap();
    let err = ds
        .n1ql_index_create("ix", &["other"], &IndexCreateOptions::new())
        .unwrap_err();
    assert!(err.is_already_exists());
}

#[test]
fn index_drop_of_missing_index_is_a_no_op() {
    let store = TestStore::new();
    store.ds.n1ql_index_drop("never_created").unwrap();
}

#[test]
fn index_list_describes_the_bucket() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.n1ql_query("CREATE PRIMARY INDEX ON `test`").unwrap();
    ds.n1ql_index_create("ix_b", &["profile.name"], &IndexCreateOptions::new())
        .unwrap();
    ds.n1ql_index_create("ix_a", &["docType", "n"], &IndexCreateOptions::new())
        .unwrap();

    let indexes = ds.n1ql_index_list().unwrap();
    let names: Vec<_> = indexes.iter().map(|ix| ix.name.as_str()).collect();
    assert_eq!(names, vec!["#primary", "ix_a", "ix_b"]);
    assert!(indexes[0].is_primary);
    assert_eq!(indexes[1].index_key, vec!["`docType`", "`n`"]);
    assert_eq!(indexes[2].index_key, vec!["`profile`.`name`"]);
    assert!(indexes.iter().all(|ix| ix.keyspace == BUCKET && ix.is_online()));
}

#[test]
fn index_list_only_covers_the_bound_bucket() {
    let store = TestStore::new();
    store.cluster.create_bucket(BucketSettings::new("other"));
    let other = Datastore::connect(
        &ConnectOptions::new(store.host.clone(), "other").credentials(USERNAME, PASSWORD),
    )
    .unwrap();

    other
        .n1ql_index_create("ix_other", &["a"], &IndexCreateOptions::new())
        .unwrap();
    assert!(store.ds.n1ql_index_list().unwrap().is_empty());
    assert_eq!(other.n1ql_index_list().unwrap().len(), 1);
}

#[test]
fn deferred_index_is_built_on_request() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.n1ql_index_create("ix", &["docType"], &IndexCreateOptions::new().defer_build())
        .unwrap();
    let listed = ds.n1ql_index_list().unwrap();
    assert_eq!(listed[0].state, IndexState::Deferred);

    ds.set("d", &json!({"docType": "dt1"}), &plain()).unwrap();
    let err = ds
        .n1ql_query("SELECT META().id FROM test WHERE docType = 'dt1'")
        .unwrap_err();
    assert!(matches!(err, Error::Query { .. }));

    ds.n1ql_index_build(&["ix"]).unwrap();
    let rows = ds
        .n1ql_query("SELECT META().id FROM test WHERE docType = 'dt1'")
        .unwrap();
    assert_eq!(rows, vec![json!({"id": "d"})]);
}

#[test]
fn invalid_index_arguments() {
    let store = TestStore::new();
    let ds = &store.ds;

    for (name, fields) in [("", vec!["a"]), ("ix", vec![]), ("i`x", vec!["a"]), ("ix", vec!["a..b"])] {
        let err = ds
            .n1ql_index_create(name, &fields, &IndexCreateOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }), "{:?}", (name, fields));
    }
}

#[test]
fn select_with_filter_order_and_limit() {
    let store = TestStore::new();
    let ds = &store.ds;
    ds.n1ql_query("CREATE PRIMARY INDEX ON test").unwrap();

    for (key, doc_type, n) in [("a", "dt1", 3), ("b", "dt2", 1), ("c", "dt1", 2), ("d", "dt1", 5)] {
        ds.set(key, &json!({"docType": doc_type, "n": n}), &plain())
            .unwrap();
    }

    let rows = ds
        .n1ql_query(
            "SELECT META(t).id AS id, t.n FROM test AS t \
             WHERE t.docType = 'dt1' AND t.n > 2 ORDER BY t.n DESC",
        )
        .unwrap();
    assert_eq!(rows, vec![json!({"id": "d", "n": 5}), json!({"id": "a", "n": 3})]);

    let rows = ds
        .n1ql_query("SELECT n FROM test ORDER BY n LIMIT 2 OFFSET 1")
        .unwrap();
    assert_eq!(rows, vec![json!({"n": 2}), json!({"n": 3})]);
}

#[test]
fn query_errors_are_distinct() {
    let store = TestStore::new();
    let ds = &store.ds;

    let err = ds.n1ql_query("SELEKT * FROM test").unwrap_err();
    assert!(matches!(err, Error::Query { .. }));

    let err = ds.n1ql_query("SELECT * FROM missing_bucket").unwrap_err();
    assert!(matches!(err, Error::Query { .. }));
}
