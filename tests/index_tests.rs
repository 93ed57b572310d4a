use docstore::{DocumentStore, field_matches, integrity};
use serde_json::{Value, json};

fn ids(docs: Vec<docstore::Document>) -> Vec<String> {
    docs.into_iter().map(|doc| doc.id).collect()
}

fn scan_ids(store: &DocumentStore, collection: &str, path: &str, value: &Value) -> Vec<String> {
    ids(store.query_documents(collection, |doc| field_matches(doc, path, value)))
}

#[test]
fn test_index_created_before_documents() {
    let store = DocumentStore::new();
    store.create_index("items", "category");
    store.add_document("items", "i1", json!({ "category": 2 }));

    let found = store.query_by_index("items", "category", &json!(2));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "i1");
    assert_eq!(found[0].data["category"], json!(2));
}

#[test]
fn test_index_built_from_existing_documents() {
    let store = DocumentStore::new();
    store.add_document("items", "i1", json!({ "category": "a" }));
    store.add_document("items", "i2", json!({ "category": "b" }));
    store.add_document("items", "i3", json!({ "category": "a" }));
    store.create_index("items", "category");
    assert!(store.has_index("items", "category"));
    assert_eq!(ids(store.query_by_index("items", "category", &json!("a"))), vec!["i1", "i3"]);
}

#[test]
fn test_index_tracks_updates_and_deletes() {
    let store = DocumentStore::new();
    store.create_index("items", "category");
    store.add_document("items", "i1", json!({ "category": "a" }));
    store.update_document("items", "i1", json!({ "category": "b" }));
    assert!(store.query_by_index("items", "category", &json!("a")).is_empty());
    assert_eq!(ids(store.query_by_index("items", "category", &json!("b"))), vec!["i1"]);

    store.add_document("items", "i1", json!({ "other": true }));
    assert!(store.query_by_index("items", "category", &json!("b")).is_empty());

    store.add_document("items", "i1", json!({ "category": "c" }));
    store.delete_document("items", "i1");
    assert!(store.query_by_index("items", "category", &json!("c")).is_empty());
    assert!(!integrity::validate_indexes(&store).has_issues());
}

#[test]
fn test_nested_field_path() {
    let store = DocumentStore::new();
    store.create_index("users", "profile.city");
    store.add_document("users", "u1", json!({ "profile": { "city": "Oslo" } }));
    store.add_document("users", "u2", json!({ "profile": { "city": "Lima" } }));
    store.add_document("users", "u3", json!({ "profile": "none" }));
    assert_eq!(ids(store.query_by_index("users", "profile.city", &json!("Oslo"))), vec!["u1"]);
    store.update_document("users", "u2", json!({ "profile": { "city": "Oslo" } }));
    assert_eq!(
        ids(store.query_by_index("users", "profile.city", &json!("Oslo"))),
        vec!["u1", "u2"]
    );
}

#[test]
fn test_index_and_scan_agree() {
    let indexed = DocumentStore::new();
    let plain = DocumentStore::new();
    indexed.create_index("items", "value");
    let values = [
        json!(1),
        json!(1.0),
        json!("1"),
        json!(null),
        json!(true),
        json!([1, 2]),
        json!({ "a": 1 }),
    ];
    for (n, value) in values.iter().enumerate() {
        for store in [&indexed, &plain] {
            store.add_document("items", &format!("i{n}"), json!({ "value": value }));
        }
    }
    for store in [&indexed, &plain] {
        store.add_document("items", "missing", json!({ "other": 1 }));
    }
    for value in values.iter().chain([json!(2), json!({ "a": 1.0 })].iter()) {
        let expected = scan_ids(&plain, "items", "value", value);
        assert_eq!(ids(indexed.query_by_index("items", "value", value)), expected);
        assert_eq!(ids(plain.query_by_index("items", "value", value)), expected);
    }
    assert_eq!(ids(indexed.query_by_index("items", "value", &json!(1))), vec!["i0", "i1"]);
    assert_eq!(ids(indexed.query_by_index("items", "value", &json!(null))), vec!["i3"]);
}

#[test]
fn test_index_on_metadata_id() {
    let store = DocumentStore::new();
    store.add_document("users", "u1", json!({}));
    store.add_document("users", "u2", json!({}));
    store.create_index("users", "id");
    assert_eq!(ids(store.query_by_index("users", "id", &json!("u2"))), vec!["u2"]);
}

#[test]
fn test_index_results_follow_insertion_order() {
    let store = DocumentStore::new();
    store.create_index("posts", "tag");
    for id in ["p5", "p1", "p9", "p3"] {
        store.add_document("posts", id, json!({ "tag": "x" }));
    }
    assert_eq!(
        ids(store.query_by_index("posts", "tag", &json!("x"))),
        vec!["p5", "p1", "p9", "p3"]
    );
}

#[test]
fn test_create_index_twice_is_noop() {
    let store = DocumentStore::new();
    store.create_index("items", "category");
    store.create_index("items", "category");
    store.create_index("items", "name");
    assert_eq!(store.indexes("items"), vec!["category", "name"]);
}
