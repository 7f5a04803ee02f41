use mapper_sample::lifecycle::{MapperSystem, SystemConfig};
use mapper_sample::model::{CellPhone, Item, Person, Thing};
use resource_mapper::prelude::*;
use resource_mapper::transport::mock::TransportRequest;
use serde_json::json;
use std::sync::Arc;

fn ams_system(mock: &MockTransport) -> MapperSystem {
    MapperSystem::with_parts(mock.transport(), Arc::new(AmsSerializer::new()))
}

fn json_api_system(mock: &MockTransport) -> MapperSystem {
    MapperSystem::with_parts(mock.transport(), Arc::new(JsonApiSerializer::new()))
}

/// Find, read relationships and save through typed clients.
#[tokio::test]
async fn test_person_lifecycle_over_ams() {
    let mock = MockTransport::new();
    mock.expect_find("people", 1).return_json(json!({
        "person": {
            "id": 1,
            "firstname": "ryan",
            "lastname": "test",
            "item_ids": [1, 2],
            "cell_phone_ids": [7]
        },
        "items": [{"id": 1, "name": "one"}, {"id": 2, "name": "two"}],
        "cell_phones": [{"id": 7, "number": "555-0100"}]
    }));
    mock.expect_update("people", 1).return_json(json!({
        "person": {"id": 1, "firstname": "ryan", "lastname": "changed"}
    }));

    let system = ams_system(&mock);
    let person = system
        .people
        .find(1)
        .await
        .expect("find failed")
        .expect("person missing");
    assert_eq!(person.full_name(), "ryan test");

    let items: Vec<Item> = system.people.has_many(&person, "items").await.unwrap();
    let names: Vec<String> = items.iter().filter_map(Item::name).collect();
    assert_eq!(names, ["one", "two"]);

    let phones: Vec<CellPhone> = system
        .people
        .has_many(&person, "cell_phones")
        .await
        .unwrap();
    assert_eq!(phones.len(), 1);
    assert_eq!(phones[0].number().as_deref(), Some("555-0100"));

    person.set_lastname("changed").unwrap();
    assert!(system.people.save(&person).await.unwrap());
    assert_eq!(person.lastname().as_deref(), Some("changed"));

    mock.verify();
}

/// A cached relationship is not fetched twice.
#[tokio::test]
async fn test_has_one_link_is_cached() {
    let mock = MockTransport::new();
    mock.expect_find("people", 3).return_json(json!({
        "person": {"id": 3, "links": {"favorite_item": "/items/9"}}
    }));
    mock.expect_get("/items/9")
        .return_json(json!({"item": {"id": 9, "name": "kite"}}));

    let system = ams_system(&mock);
    let person = system.people.find(3).await.unwrap().unwrap();

    let first: Option<Item> = system.people.has_one(&person, "favorite_item").await.unwrap();
    let second: Option<Item> = system.people.has_one(&person, "favorite_item").await.unwrap();
    assert_eq!(first.unwrap().name().as_deref(), Some("kite"));
    assert_eq!(second.unwrap().name().as_deref(), Some("kite"));
    assert_eq!(mock.request_count(), 2);
    mock.verify();
}

#[tokio::test]
async fn test_query_people_over_json_api() {
    let mock = MockTransport::new();
    mock.expect_query(
        "people",
        QueryParams::from([("lastname".to_string(), "test".to_string())]),
    )
    .return_json(json!({
        "people": [
            {"id": 1, "firstname": "ryan", "lastname": "test"},
            {"id": 2, "firstname": "sam", "lastname": "test"}
        ]
    }));

    let system = json_api_system(&mock);
    let people: Vec<Person> = system
        .people
        .query(QueryParams::from([(
            "lastname".to_string(),
            "test".to_string(),
        )]))
        .await
        .unwrap();
    let full_names: Vec<String> = people.iter().map(Person::full_name).collect();
    assert_eq!(full_names, ["ryan test", "sam test"]);
    mock.verify();
}

#[tokio::test]
async fn test_thing_is_addressed_by_uuid() {
    let mock = MockTransport::new();
    mock.expect_find("things", "abc-123").return_json(json!({
        "thing": {"uuid": "abc-123", "label": "widget"}
    }));
    mock.expect_delete("things", "abc-123").return_ok("");

    let system = ams_system(&mock);
    let thing: Thing = system.things.find("abc-123").await.unwrap().unwrap();
    assert_eq!(thing.uuid().as_deref(), Some("abc-123"));
    assert_eq!(thing.label().as_deref(), Some("widget"));

    assert!(system.things.delete(&thing).await.unwrap());
    assert!(matches!(
        mock.requests().last(),
        Some(TransportRequest::Delete { resource, .. }) if resource == "things"
    ));
}

#[tokio::test]
async fn test_missing_person_is_none() {
    let mock = MockTransport::new();
    mock.expect_find("people", 404).return_not_found();

    let system = ams_system(&mock);
    assert!(system.people.find(404).await.unwrap().is_none());
    mock.verify();
}

#[tokio::test]
async fn test_from_config_requires_registered_kind() {
    let config = SystemConfig::new("soap");
    let err = MapperSystem::from_config(&config).unwrap_err();
    assert!(matches!(err, MapperError::NotRegistered { .. }));
}
