//! Document CRUD and the not-found policy

use crate::common::*;

#[test]
fn create_then_read_returns_value() {
    let store = TestStore::new();
    let ds = &store.ds;

    assert!(ds.create("k", &json!({"yo": "dawg"}), &plain()).unwrap());
    assert_eq!(ds.read("k").unwrap(), Some(json!({"yo": "dawg"})));
}

#[test]
fn second_create_fails_without_overwriting() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.create("k", &json!("v1"), &plain()).unwrap();
    let err = ds.create("k", &json!("v2"), &plain()).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));
    assert_eq!(ds.read("k").unwrap(), Some(json!("v1")));
}

#[test]
fn read_missing_is_none() {
    let store = TestStore::new();
    assert_eq!(store.ds.read("nope").unwrap(), None);
    assert_eq!(store.ds.read_with_cas("nope").unwrap(), None);
}

#[test]
fn delete_is_idempotent() {
    let store = TestStore::new();
    let ds = &store.ds;

    assert!(!ds.delete("nope", &plain()).unwrap());
    ds.set("k", &json!(1), &plain()).unwrap();
    assert!(ds.delete("k", &plain()).unwrap());
    assert!(!ds.delete("k", &plain()).unwrap());
    assert_eq!(ds.read("k").unwrap(), None);
}

#[test]
fn set_overwrites_unconditionally() {
    let store = TestStore::new();
    let ds = &store.ds;

    ds.set("k", &json!("v1"), &plain()).unwrap();
    ds.set("k", &json!("v2"), &plain()).unwrap();
    assert_eq!(ds.read("k").unwrap(), Some(json!("v2")));
}

#[test]
fn update_requires_existing_document() {
    let store = TestStore::new();
    let ds = &store.ds;

    let err = ds.update("k", &json!(1), &plain()).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(ds.read("k").unwrap(), None);

    ds.create("k", &json!(1), &plain()).unwrap();
    assert!(ds.update("k", &json!(2), &plain()).unwrap());
    assert_eq!(ds.read("k").unwrap(), Some(json!(2)));
}

#[test]
fn values_keep_their_json_shape() {
    let store = TestStore::new();
    let ds = &store.ds;

    let values = [
        json!("plain string"),
        json!(42),
        json!(1.5),
        json!(true),
        json!(null),
        json!([1, "two", {"three": 3}]),
        json!({"nested": {"deep": [1, 2, 3]}}),
    ];
    for (i, value) in values.iter().enumerate() {
        let key = format!("value:{}", i);
        ds.set(&key, value, &plain()).unwrap();
        assert_eq!(ds.read(&key).unwrap().as_ref(), Some(value));
    }
}

#[test]
fn read_as_decodes_into_caller_types() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Profile {
        name: String,
        level: u32,
    }

    let store = TestStore::new();
    let ds = &store.ds;
    ds.set("p", &json!({"name": "pikachu", "level": 12}), &plain())
        .unwrap();

    let profile: Profile = ds.read_as("p").unwrap().unwrap();
    assert_eq!(
        profile,
        Profile {
            name: "pikachu".into(),
            level: 12
        }
    );
    assert!(ds.read_as::<Profile>("missing").unwrap().is_none());
}

#[test]
fn facades_share_the_bucket() {
    let store = TestStore::new();
    let other = store.second_facade();

    store.ds.set("k", &json!("shared"), &plain()).unwrap();
    assert_eq!(other.read("k").unwrap(), Some(json!("shared")));
    assert_eq!(other.bucket_name(), BUCKET);
}
