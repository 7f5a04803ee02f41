//! # System Bootstrap
//!
//! Wiring a mapper together means registering every model schema, choosing a
//! transport and a serializer for a format and handing the resulting
//! [`Store`] to typed clients. [`MapperSystem`] does that once so callers
//! only see `system.people`, `system.items` and friends.
//!
//! ## Two ways in
//!
//! | Constructor | Transport | Use |
//! |-------------|-----------|-----|
//! | [`MapperSystem::from_config`] | whatever kind the registry builds for the format | real services |
//! | [`MapperSystem::new`] | any [`Store`] you built yourself | tests, demos over [`MockTransport`] |
//!
//! ```rust,ignore
//! let config: SystemConfig = serde_json::from_value(json!({
//!     "format": "ams",
//!     "transport": {"hostname": "api.example.com", "namespace": "v1"}
//! }))?;
//! let system = MapperSystem::from_config(&config)?;
//! let person = system.people.find(1).await?;
//! ```

use crate::model::{CellPhone, Item, Person, Thing};
use resource_mapper::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Startup settings for a [`MapperSystem`].
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Registry format name, e.g. `ams` or `json_api`.
    pub format: String,
    /// Transport kind; derived from the format when absent.
    #[serde(default)]
    pub transport_kind: Option<String>,
    /// Serializer kind; derived from the format when absent.
    #[serde(default)]
    pub serializer_kind: Option<String>,
    /// Options handed to the transport factory.
    #[serde(default)]
    pub transport: Value,
    /// Options handed to the serializer factory.
    #[serde(default)]
    pub serializer: Value,
}

impl SystemConfig {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            transport_kind: None,
            serializer_kind: None,
            transport: Value::Null,
            serializer: Value::Null,
        }
    }

    /// Sets REST connection options for the transport.
    pub fn rest(mut self, options: &RestOptions) -> Result<Self> {
        self.transport =
            serde_json::to_value(options).map_err(|e| MapperError::InvalidOptions {
                kind: "RestTransport".to_string(),
                message: e.to_string(),
            })?;
        Ok(self)
    }
}

/// Every sample model type, registered.
pub fn catalog() -> SchemaCatalog {
    SchemaCatalog::new()
        .with_model::<Person>()
        .with_model::<Item>()
        .with_model::<CellPhone>()
        .with_model::<Thing>()
}

/// Typed clients sharing one store.
#[derive(Debug, Clone)]
pub struct MapperSystem {
    pub people: ModelClient<Person>,
    pub items: ModelClient<Item>,
    pub cell_phones: ModelClient<CellPhone>,
    pub things: ModelClient<Thing>,
    store: Store,
}

impl MapperSystem {
    /// Wraps an already wired store.
    pub fn new(store: Store) -> Self {
        Self {
            people: ModelClient::new(store.clone()),
            items: ModelClient::new(store.clone()),
            cell_phones: ModelClient::new(store.clone()),
            things: ModelClient::new(store.clone()),
            store,
        }
    }

    /// A system over `transport` using `serializer` for every sample model.
    pub fn with_parts(transport: Arc<dyn Transport>, serializer: Arc<dyn Serializer>) -> Self {
        Self::new(Store::new(transport, serializer, catalog()))
    }

    /// Builds the store through a private [`Registry`] from `config`.
    pub fn from_config(config: &SystemConfig) -> Result<Self> {
        let mut registry = Registry::new();
        registry.register_model::<Person>();
        registry.register_model::<Item>();
        registry.register_model::<CellPhone>();
        registry.register_model::<Thing>();
        registry.register_transport(
            &config.format,
            config.transport_kind.as_deref(),
            config.transport.clone(),
        )?;
        registry.register_serializer(
            &config.format,
            config.serializer_kind.as_deref(),
            config.serializer.clone(),
        )?;
        let store = registry.set_default(&config.format)?;
        info!(format = %config.format, "Mapper system ready");
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}
