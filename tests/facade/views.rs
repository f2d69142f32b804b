//! Design documents and view queries

use crate::common::*;

const BY_TYPE: &str = r#"function (doc, meta) {
    if (doc.docType) {
        emit(doc.docType, doc.n);
    }
}"#;

fn publish(ds: &Datastore) {
    let ddoc = DesignDocument::new("test")
        .with_view("by_type", ViewDefinition::map(BY_TYPE))
        .with_view(
            "count_by_type",
            ViewDefinition::map(BY_TYPE).with_reduce("_count"),
        )
        .with_view(
            "sum_by_type",
            ViewDefinition::map(BY_TYPE).with_reduce("_sum"),
        );
    ds.design_create(&ddoc, DesignNamespace::Production).unwrap();
}

/// Five documents, inserted out of key order
fn seed(ds: &Datastore) {
    let docs = [
        ("doc5", "dt2", 5),
        ("doc1", "dt1", 1),
        ("doc4", "dt1", 4),
        ("doc2", "dt2", 2),
        ("doc3", "dt1", 3),
    ];
    for (key, doc_type, n) in docs {
        ds.set(key, &json!({"docType": doc_type, "n": n}), &plain())
            .unwrap();
    }
}

fn ids(rows: &[ViewRow]) -> Vec<&str> {
    rows.iter().filter_map(|r| r.id.as_deref()).collect()
}

fn fresh() -> ViewQuery {
    ViewQuery::new().stale(Stale::False)
}

#[test]
fn view_by_key_returns_exactly_the_tagged_subset() {
    let store = TestStore::new();
    let ds = &store.ds;
    publish(ds);
    seed(ds);

    let rows = ds.view("test", "by_type", &fresh().key("dt1")).unwrap();
    assert_eq!(ids(&rows), vec!["doc1", "doc3", "doc4"]);
    for row in &rows {
        assert_eq!(row.key, json!("dt1"));
    }

    let rows = ds.view("test", "by_type", &fresh().key("dt2")).unwrap();
    assert_eq!(ids(&rows), vec!["doc2", "doc5"]);
}

#[test]
fn view_rows_are_decoded() {
    let store = TestStore::new();
    let ds = &store.ds;
    publish(ds);
    seed(ds);

    let rows = ds.view("test", "by_type", &fresh().key("dt2")).unwrap();
    assert_eq!(rows[0].value, json!(2));
    assert_eq!(rows[1].value, json!(5));
}

#[test]
fn view_range_descending_skip_limit() {
    let store = TestStore::new();
    let ds = &store.ds;
    publish(ds);
    seed(ds);

    let all = ds.view("test", "by_type", &fresh()).unwrap();
    assert_eq!(ids(&all), vec!["doc1", "doc3", "doc4", "doc2", "doc5"]);

    let desc = ds
        .view("test", "by_type", &fresh().descending(true).limit(2))
        .unwrap();
    assert_eq!(ids(&desc), vec!["doc5", "doc2"]);

    let paged = ds
        .view("test", "by_type", &fresh().skip(1).limit(2))
        .unwrap();
    assert_eq!(ids(&paged), vec!["doc3", "doc4"]);

    let exclusive = ds
        .view(
            "test",
            "by_type",
            &fresh()
                .range(Some(json!("dt1")), Some(json!("dt2")))
                .inclusive_end(false),
        )
        .unwrap();
    assert_eq!(ids(&exclusive), vec!["doc1", "doc3", "doc4"]);
}

#[test]
fn view_keys_preserve_request_order() {
    let store = TestStore::new();
    let ds = &store.ds;
    publish(ds);
    seed(ds);

    let rows = ds
        .view("test", "by_type", &fresh().keys(vec![json!("dt2"), json!("dt1")]))
        .unwrap();
    assert_eq!(ids(&rows), vec!["doc2", "doc5", "doc1", "doc3", "doc4"]);
}

#[test]
fn reduce_views() {
    let store = TestStore::new();
    let ds = &store.ds;
    publish(ds);
    seed(ds);

    let rows = ds.view("test", "count_by_type", &fresh()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, json!(5));
    assert_eq!(rows[0].id, None);

    let grouped = ds
        .view("test", "sum_by_type", &fresh().group(true))
        .unwrap();
    let pairs: Vec<_> = grouped.iter().map(|r| (r.key.clone(), r.value.clone())).collect();
    assert_eq!(pairs, vec![(json!("dt1"), json!(8)), (json!("dt2"), json!(7))]);

    let unreduced = ds
        .view("test", "count_by_type", &fresh().reduce(false))
        .unwrap();
    assert_eq!(unreduced.len(), 5);
}

#[test]
fn stale_ok_reads_the_last_built_index() {
    let store = TestStore::new();
    let ds = &store.ds;
    publish(ds);
    seed(ds);

    assert_eq!(ds.view("test", "by_type", &fresh()).unwrap().len(), 5);

    ds.set("doc6", &json!({"docType": "dt1", "n": 6}), &plain())
        .unwrap();
    let stale = ViewQuery::new().stale(Stale::Ok);
    assert_eq!(ds.view("test", "by_type", &stale).unwrap().len(), 5);
    assert_eq!(ds.view("test", "by_type", &fresh()).unwrap().len(), 6);
}

#[test]
fn stale_update_after_refreshes_for_the_next_reader() {
    let store = TestStore::new();
    let ds = &store.ds;
    publish(ds);
    seed(ds);
    ds.view("test", "by_type", &fresh()).unwrap();

    ds.set("doc6", &json!({"docType": "dt1", "n": 6}), &plain())
        .unwrap();
    let update_after = ViewQuery::new().stale(Stale::UpdateAfter);
    assert_eq!(ds.view("test", "by_type", &update_after).unwrap().len(), 5);

    let stale = ViewQuery::new().stale(Stale::Ok);
    assert_eq!(ds.view("test", "by_type", &stale).unwrap().len(), 6);
}

#[test]
fn stale_values_are_validated_at_the_boundary() {
    assert!(ViewQuery::new().stale_str("false").is_ok());
    assert!(ViewQuery::new().stale_str("ok").is_ok());
    assert!(ViewQuery::new().stale_str("update_after").is_ok());
    assert!(ViewQuery::new().stale_value(&json!(false)).is_ok());

    let err = ViewQuery::new().stale_str("eventually").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[test]
fn development_namespace_is_separate() {
    let store = TestStore::new();
    let ds = &store.ds;

    let ddoc = DesignDocument::new("test").with_view("by_type", ViewDefinition::map(BY_TYPE));
    ds.design_create(&ddoc, DesignNamespace::Development).unwrap();

    let fetched = ds.design_get("test", DesignNamespace::Development).unwrap();
    assert_eq!(fetched, ddoc);
    assert!(ds
        .design_get("test", DesignNamespace::Production)
        .unwrap_err()
        .is_not_found());

    seed(ds);
    let rows = ds
        .view("test", "by_type", &fresh().development().key("dt2"))
        .unwrap();
    assert_eq!(ids(&rows), vec!["doc2", "doc5"]);
    assert!(ds.view("test", "by_type", &fresh()).unwrap_err().is_not_found());
}

#[test]
fn design_create_replaces_wholesale() {
    let store = TestStore::new();
    let ds = &store.ds;
    publish(ds);

    let replacement =
        DesignDocument::new("test").with_view("only", ViewDefinition::map(BY_TYPE));
    ds.design_create(&replacement, DesignNamespace::Production)
        .unwrap();

    let fetched = ds.design_get("test", DesignNamespace::Production).unwrap();
    assert_eq!(fetched.views.len(), 1);
    assert!(fetched.views.contains_key("only"));

    let err = ds.view("test", "by_type", &fresh()).unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            entity: EntityKind::View,
            ..
        }
    ));
}

#[test]
fn design_get_missing_is_not_found() {
    let store = TestStore::new();
    let err = store
        .ds
        .design_get("nope", DesignNamespace::Production)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            entity: EntityKind::DesignDocument,
            ..
        }
    ));
}

#[test]
fn reduce_with_unknown_builtin_is_rejected() {
    let store = TestStore::new();
    let ddoc = DesignDocument::new("bad").with_view(
        "v",
        ViewDefinition::map(BY_TYPE).with_reduce("_median"),
    );
    let err = store
        .ds
        .design_create(&ddoc, DesignNamespace::Production)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}
