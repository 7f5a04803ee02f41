use resource_mapper::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn catalog() -> SchemaCatalog {
    SchemaCatalog::new()
        .with(
            EntitySchema::new("Person")
                .field("firstname")
                .field("lastname")
                .has_many("items")
                .has_many_of("other_items", "Item")
                .has_one("item")
                .has_one_of("favorite_item", "Item"),
        )
        .with(EntitySchema::new("Item").field("name"))
}

fn ams_store(mock: &MockTransport) -> Store {
    Store::new(mock.transport(), Arc::new(AmsSerializer::new()), catalog())
}

fn names(collection: &Collection) -> Vec<String> {
    collection
        .map(|item| item.get_str("name").unwrap().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_find_person() {
    let mock = MockTransport::new();
    mock.expect_find("people", 123).return_json(json!({
        "person": {"id": 123, "firstname": "ryan", "lastname": "test"}
    }));

    let store = ams_store(&mock);
    let person = store
        .find("Person", 123)
        .await
        .expect("find failed")
        .expect("person missing");
    assert_eq!(person.id(), Some(json!(123)));
    assert_eq!(person.get_str("firstname").unwrap().as_deref(), Some("ryan"));
    assert_eq!(person.get_str("lastname").unwrap().as_deref(), Some("test"));
    mock.verify();
}

#[tokio::test]
async fn test_find_with_wrong_identity_fails() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1)
        .return_json(json!({"person": {"id": 2}}));

    let err = ams_store(&mock).find("Person", 1).await.unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(err, MapperError::IdentityMismatch { .. }));
}

#[tokio::test]
async fn test_query_people() {
    let mock = MockTransport::new();
    mock.expect_query(
        "people",
        QueryParams::from([("test".to_string(), "true".to_string())]),
    )
    .return_json(json!({
        "people": [
            {"id": 123, "firstname": "ryan", "lastname": "test"},
            {"id": 456, "firstname": "testing", "lastname": "again"}
        ]
    }));

    let store = ams_store(&mock);
    let people = store
        .query(
            "Person",
            QueryParams::from([("test".to_string(), "true".to_string())]),
        )
        .await
        .unwrap();

    assert_eq!(people.len(), 2);
    assert_eq!(people[0].id(), Some(json!(123)));
    assert_eq!(people[1].id(), Some(json!(456)));
    let firstnames: Vec<String> = people
        .map(|p| p.get_str("firstname").unwrap().unwrap())
        .collect();
    assert_eq!(firstnames, ["ryan", "testing"]);

    let origin = people.origin().expect("collection origin");
    for person in &people {
        assert!(Arc::ptr_eq(&person.origin().unwrap(), origin));
    }
}

#[tokio::test]
async fn test_has_many_sideloaded_from_collection() {
    let mock = MockTransport::new();
    mock.expect_find_many("people").return_json(json!({
        "people": [
            {"id": 123, "firstname": "ryan", "item_ids": [1, 2]},
            {"id": 456, "firstname": "testing", "item_ids": [2, 3]}
        ],
        "items": [
            {"id": 1, "name": "test 1"},
            {"id": 2, "name": "test 2"},
            {"id": 3, "name": "test 3"},
            {"id": 4, "name": "test 4"}
        ]
    }));

    let store = ams_store(&mock);
    let people = store.all("Person").await.unwrap();

    let first = store.has_many(&people[0], "items").await.unwrap();
    assert_eq!(names(&first), ["test 1", "test 2"]);
    assert_eq!(first[0].id(), Some(json!(1)));

    let second = store.has_many(&people[1], "items").await.unwrap();
    assert_eq!(names(&second), ["test 2", "test 3"]);

    // Everything came from the one collection response.
    assert_eq!(mock.request_count(), 1);
    mock.verify();
}

#[tokio::test]
async fn test_has_many_on_unloaded_parent_reloads_it() {
    let mock = MockTransport::new();
    mock.expect_find("people", 123).return_json(json!({
        "person": {"id": 123, "firstname": "ryan", "item_ids": [1, 2]},
        "items": [{"id": 1, "name": "first"}, {"id": 2, "name": "second"}]
    }));

    let store = ams_store(&mock);
    let person = store.build("Person", json!({"id": 123})).unwrap();
    let items = store.has_many(&person, "items").await.unwrap();

    assert_eq!(person.get_str("firstname").unwrap().as_deref(), Some("ryan"));
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].get_str("name").unwrap().as_deref(), Some("first"));
    mock.verify();
}

#[tokio::test]
async fn test_has_many_with_custom_target_type() {
    let mock = MockTransport::new();
    mock.expect_find("people", 123).return_json(json!({
        "person": {"id": 123, "other_item_ids": [1, 2]},
        "other_items": [{"id": 1, "name": "first"}, {"id": 2, "name": "second"}]
    }));

    let store = ams_store(&mock);
    let person = store.build("Person", json!({"id": 123})).unwrap();
    let other = store.has_many(&person, "other_items").await.unwrap();

    assert_eq!(other.len(), 2);
    assert_eq!(other[0].type_name(), "Item");
    assert_eq!(names(&other), ["first", "second"]);
}

#[tokio::test]
async fn test_has_many_from_link() {
    let mock = MockTransport::new();
    mock.expect_find("people", 123).return_json(json!({
        "person": {
            "id": 123,
            "firstname": "ryan",
            "links": {"items": "http://www.example.com/items?person_id=123"}
        }
    }));
    mock.expect_get("http://www.example.com/items?person_id=123")
        .return_json(json!({
            "items": [{"id": 1, "name": "first"}, {"id": 2, "name": "second"}]
        }));

    let store = ams_store(&mock);
    let person = store.find("Person", 123).await.unwrap().unwrap();
    let items = store.has_many(&person, "items").await.unwrap();

    assert_eq!(names(&items), ["first", "second"]);
    // Linked items carry the response they were fetched from.
    assert_ne!(items[0].origin(), person.origin());
    assert_eq!(items.origin(), person.origin().as_ref());
    mock.verify();
}

#[tokio::test]
async fn test_link_takes_precedence_over_sideload() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1).return_json(json!({
        "person": {"id": 1, "item_ids": [1], "links": {"items": "/people/1/items"}},
        "items": [{"id": 1, "name": "sideloaded"}]
    }));
    mock.expect_get("/people/1/items")
        .return_json(json!({"items": [{"id": 1, "name": "linked"}]}));

    let store = ams_store(&mock);
    let person = store.find("Person", 1).await.unwrap().unwrap();
    let items = store.has_many(&person, "items").await.unwrap();
    assert_eq!(names(&items), ["linked"]);
    mock.verify();
}

#[tokio::test]
async fn test_has_one_from_link() {
    let mock = MockTransport::new();
    mock.expect_find("people", 123).return_json(json!({
        "person": {
            "id": 123,
            "firstname": "ryan",
            "links": {"item": "http://www.example.com/items/10"}
        }
    }));
    mock.expect_get("http://www.example.com/items/10")
        .return_json(json!({"item": {"id": 10, "name": "testing"}}));

    let store = ams_store(&mock);
    let person = store.find("Person", 123).await.unwrap().unwrap();
    let item = store.has_one(&person, "item").await.unwrap().unwrap();

    assert_eq!(item.type_name(), "Item");
    assert_eq!(item.id(), Some(json!(10)));
    assert_eq!(item.get_str("name").unwrap().as_deref(), Some("testing"));
    mock.verify();
}

#[tokio::test]
async fn test_has_one_link_checks_declared_id() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1).return_json(json!({
        "person": {"id": 1, "item_id": 10, "links": {"item": "/items/10"}}
    }));
    mock.expect_get("/items/10")
        .return_json(json!({"item": {"id": 11}}));

    let store = ams_store(&mock);
    let person = store.find("Person", 1).await.unwrap().unwrap();
    let err = store.has_one(&person, "item").await.unwrap_err();
    assert!(matches!(err, MapperError::IdentityMismatch { .. }));
    assert_eq!(person.relationship_state("item"), SlotState::Uncached);
}

#[tokio::test]
async fn test_has_one_sideloaded() {
    let mock = MockTransport::new();
    mock.expect_find("people", 123).return_json(json!({
        "person": {"id": 123, "item_id": 2, "favorite_item_id": 3},
        "items": [{"id": 1, "name": "one"}, {"id": 2, "name": "two"}],
        "favorite_items": [{"id": 3, "name": "three"}]
    }));

    let store = ams_store(&mock);
    let person = store.find("Person", 123).await.unwrap().unwrap();

    let item = store.has_one(&person, "item").await.unwrap().unwrap();
    assert_eq!(item.get_str("name").unwrap().as_deref(), Some("two"));

    let favorite = store.has_one(&person, "favorite_item").await.unwrap().unwrap();
    assert_eq!(favorite.type_name(), "Item");
    assert_eq!(favorite.get_str("name").unwrap().as_deref(), Some("three"));
    mock.verify();
}

#[tokio::test]
async fn test_missing_relationship_data_is_empty() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1)
        .return_json(json!({"person": {"id": 1, "item_ids": [5]}}));

    let store = ams_store(&mock);
    let person = store.find("Person", 1).await.unwrap().unwrap();
    assert!(store.has_many(&person, "items").await.unwrap().is_empty());
    assert!(store.has_one(&person, "item").await.unwrap().is_none());
}

#[tokio::test]
async fn test_wire_format_includes_cached_has_one_id() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1).return_json(json!({
        "person": {"id": 1, "firstname": "ryan", "item_id": 2},
        "items": [{"id": 2, "name": "two"}]
    }));

    let store = ams_store(&mock);
    let person = store.find("Person", 1).await.unwrap().unwrap();
    store.has_one(&person, "item").await.unwrap();

    let wire = store.serializer().to_wire_format(&person);
    assert_eq!(
        wire,
        json!({"person": {"id": 1, "firstname": "ryan", "lastname": null, "item_id": 2}})
    );
}
