use resource_mapper::prelude::*;
use resource_mapper::registry;
use resource_mapper::transport::mock::TransportRequest;
use serde_json::{json, Value};
use std::sync::Arc;

fn catalog() -> SchemaCatalog {
    SchemaCatalog::new()
        .with(
            EntitySchema::new("Person")
                .field("firstname")
                .field("lastname")
                .has_many("items"),
        )
        .with(EntitySchema::new("Item").field("name"))
        .with(EntitySchema::new("Thing").identifier("uuid").field("label"))
}

fn store(mock: &MockTransport) -> Store {
    Store::new(mock.transport(), Arc::new(AmsSerializer::new()), catalog())
}

#[tokio::test]
async fn test_save_new_entity_merges_server_fields() {
    let mock = MockTransport::new();
    mock.expect_create("people").return_json(json!({
        "person": {"id": 42, "firstname": "ryan", "lastname": "assigned"}
    }));

    let store = store(&mock);
    let person = store.build("Person", json!({"firstname": "ryan"})).unwrap();
    let held = Arc::clone(&person);

    assert!(store.save(&person).await.unwrap());
    assert_eq!(held.id(), Some(json!(42)));
    assert_eq!(held.get_str("lastname").unwrap().as_deref(), Some("assigned"));
    assert!(held.origin().is_some());

    assert_eq!(
        mock.requests(),
        [TransportRequest::Create {
            resource: "people".into(),
            body: json!({"person": {"firstname": "ryan", "lastname": null}}),
        }]
    );
}

#[tokio::test]
async fn test_save_with_empty_response_keeps_entity() {
    let mock = MockTransport::new();
    mock.expect_update("people", 1).return_ok("");

    let store = store(&mock);
    let person = store
        .build("Person", json!({"id": 1, "firstname": "ryan"}))
        .unwrap();
    assert!(store.save(&person).await.unwrap());
    assert_eq!(person.get_str("firstname").unwrap().as_deref(), Some("ryan"));
    assert!(person.origin().is_none());
}

#[tokio::test]
async fn test_save_failure_propagates() {
    let mock = MockTransport::new();
    mock.expect_update("people", 1).return_status(422, "{}");

    let store = store(&mock);
    let person = store.build("Person", json!({"id": 1})).unwrap();
    assert!(matches!(
        store.save(&person).await,
        Err(MapperError::TransportFailure { operation: "update", status: 422, .. })
    ));
}

#[tokio::test]
async fn test_reload_preserves_reference() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1)
        .return_json(json!({"person": {"id": 1, "firstname": "old"}}));
    mock.expect_find("people", 1)
        .return_json(json!({"person": {"id": 1, "firstname": "new"}}));

    let store = store(&mock);
    let person = store.find("Person", 1).await.unwrap().unwrap();
    let reloaded = store.reload(&person).await.unwrap();

    assert!(Arc::ptr_eq(&person, &reloaded));
    assert_eq!(person.get_str("firstname").unwrap().as_deref(), Some("new"));
    mock.verify();
}

#[tokio::test]
async fn test_reload_keeps_cached_relationships() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1).return_json(json!({
        "person": {"id": 1, "item_ids": [1]},
        "items": [{"id": 1, "name": "before"}]
    }));
    mock.expect_find("people", 1).return_json(json!({
        "person": {"id": 1, "item_ids": [2]},
        "items": [{"id": 2, "name": "after"}]
    }));

    let store = store(&mock);
    let person = store.find("Person", 1).await.unwrap().unwrap();
    let before = store.has_many(&person, "items").await.unwrap();
    store.reload(&person).await.unwrap();
    let cached = store.has_many(&person, "items").await.unwrap();
    assert_eq!(before[0].id(), cached[0].id());

    person.invalidate_relationships();
    let fresh = store.has_many(&person, "items").await.unwrap();
    assert_eq!(fresh[0].get_str("name").unwrap().as_deref(), Some("after"));
}

#[tokio::test]
async fn test_merge_copies_shared_fields_only() {
    let mock = MockTransport::new();
    let store = store(&mock);
    let person = store
        .build("Person", json!({"id": 1, "firstname": "ryan", "lastname": "kept"}))
        .unwrap();
    let item = store.build("Item", json!({"id": 9, "name": "lamp"})).unwrap();

    let merged = store.merge(&person, &item);
    assert!(Arc::ptr_eq(&merged, &person));
    assert_eq!(person.id(), Some(json!(9)));
    assert_eq!(person.get_str("lastname").unwrap().as_deref(), Some("kept"));
}

#[tokio::test]
async fn test_custom_identifier_paths() {
    let mock = MockTransport::new();
    mock.expect_find("things", "abc-1")
        .return_json(json!({"thing": {"uuid": "abc-1", "label": "widget"}}));

    let thing = store(&mock).find("Thing", "abc-1").await.unwrap().unwrap();
    assert_eq!(thing.id(), Some(json!("abc-1")));
    assert!(thing.persisted());
}

#[tokio::test]
async fn test_concurrent_readers_share_one_resolution() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1).return_json(json!({
        "person": {"id": 1, "links": {"items": "/items?person=1"}}
    }));
    mock.expect_get("/items?person=1")
        .return_json(json!({"items": [{"id": 1}, {"id": 2}]}));

    let store = store(&mock);
    let person = store.find("Person", 1).await.unwrap().unwrap();

    let (a, b) = tokio::join!(
        store.has_many(&person, "items"),
        store.has_many(&person, "items")
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.len(), 2);
    assert!(Arc::ptr_eq(&a[0], &b[0]));
    assert_eq!(mock.request_count(), 2);
    mock.verify();
}

#[tokio::test]
async fn test_tasks_can_share_a_store() {
    let mock = MockTransport::new();
    mock.expect_find("items", 1)
        .return_json(json!({"item": {"id": 1, "name": "lamp"}}));

    let store = store(&mock);
    let handle = tokio::spawn({
        let store = store.clone();
        async move { store.find("Item", 1).await }
    });
    let item = handle.await.unwrap().unwrap().unwrap();
    assert_eq!(item.get_str("name").unwrap().as_deref(), Some("lamp"));
}

#[tokio::test]
async fn test_global_registry_default_store() {
    let mock = MockTransport::new();
    mock.expect_find("items", 5)
        .return_json(json!({"item": {"id": 5, "name": "global"}}));

    registry::reset();
    let handle = mock.clone();
    registry::with_global(|registry| {
        registry.register_transport_kind("MockTransport", move |_| Ok(handle.transport()));
    });
    registry::register_transport("ams", Some("MockTransport"), Value::Null).unwrap();
    registry::register_serializer("ams", None, Value::Null).unwrap();
    registry::register_schema(EntitySchema::new("Item").field("name"));
    registry::set_default("ams").unwrap();

    let store = registry::default_store().unwrap();
    let item = store.find("Item", 5).await.unwrap().unwrap();
    assert_eq!(item.get_str("name").unwrap().as_deref(), Some("global"));

    registry::reset();
    assert!(matches!(
        registry::default_store(),
        Err(MapperError::NoDefaultFormat)
    ));
}
