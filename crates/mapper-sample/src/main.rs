//! # Resource Mapper Demo
//!
//! Walks through the mapper against canned responses:
//!
//! 1. Finding a [`Person`] and reading typed fields.
//! 2. Reading a sideloaded has-many relationship.
//! 3. Following a has-one link.
//! 4. Saving a draft [`Item`].
//!
//! Nothing leaves the process; a [`MockTransport`] answers every request.
//! Run with `RUST_LOG=debug` to see each request the store issues.

use mapper_sample::lifecycle::MapperSystem;
use mapper_sample::model::{Item, Person};
use resource_mapper::observability::setup_tracing;
use resource_mapper::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, Instrument};

fn canned_responses(mock: &MockTransport) {
    mock.expect_find("people", 1).return_json(json!({
        "person": {
            "id": 1,
            "firstname": "Alice",
            "lastname": "Smith",
            "item_ids": [10, 11],
            "links": {"favorite_item": "/items/11"}
        },
        "items": [
            {"id": 10, "name": "lamp"},
            {"id": 11, "name": "desk"}
        ]
    }));
    mock.expect_get("/items/11")
        .return_json(json!({"item": {"id": 11, "name": "desk"}}));
    mock.expect_create("items")
        .return_json(json!({"item": {"id": 12, "name": "chair"}}));
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    info!("Starting resource mapper demo");

    let mock = MockTransport::new();
    canned_responses(&mock);
    let system = MapperSystem::with_parts(mock.transport(), Arc::new(AmsSerializer::new()));

    let span = tracing::info_span!("person_lookup");
    let person: Person = async {
        info!("Finding person");
        system
            .people
            .find(1)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "person 1 not found".to_string())
    }
    .instrument(span)
    .await?;

    info!(name = %person.full_name(), "Person found");

    let span = tracing::info_span!("relationships");
    let items: Vec<Item> = async {
        info!("Reading sideloaded items");
        system
            .people
            .has_many::<Item>(&person, "items")
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span.clone())
    .await?;

    for item in &items {
        info!(item = ?item.name(), "Owned item");
    }

    let favorite = async {
        info!("Following favorite item link");
        system
            .people
            .has_one::<Item>(&person, "favorite_item")
            .await
    }
    .instrument(span)
    .await;

    match favorite {
        Ok(Some(item)) => info!(item = ?item.name(), "Favorite item loaded"),
        Ok(None) => info!("No favorite item"),
        Err(e) => error!(error = %e, "Favorite item lookup failed"),
    }

    let draft = system
        .items
        .build(json!({"name": "chair"}))
        .map_err(|e| e.to_string())?;
    let saved = system.items.save(&draft).await.map_err(|e| e.to_string())?;
    info!(saved, id = ?draft.id(), "Draft item saved");

    mock.verify();

    info!("Demo completed successfully");
    Ok(())
}
