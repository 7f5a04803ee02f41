//! # Format Registry
//!
//! The registry maps a format name (`ams`, `json_api`, ...) to a transport
//! entry and a serializer entry, each recorded as `{ kind, options }`. A
//! kind names a factory that builds the component from its options.
//!
//! | Kind | Builds |
//! |------|--------|
//! | `RestTransport`, `AmsTransport`, `JsonApiTransport` | [`RestTransport`] from [`RestOptions`] |
//! | `AmsSerializer` | [`AmsSerializer`] from [`SerializerOptions`] |
//! | `JsonApiSerializer` | [`JsonApiSerializer`] from [`SerializerOptions`] |
//!
//! When a registration omits the kind, it is derived from the format name:
//! `json_api` becomes `JsonApiTransport` / `JsonApiSerializer`.
//! Re-registering a format replaces the previous entry.
//!
//! A [`Registry`] can be owned directly. The free functions in this module
//! operate on one process-wide instance guarded by a lock, and
//! [`reset`] restores it for tests.
//!
//! ```rust
//! use resource_mapper::registry::Registry;
//! use resource_mapper::schema::EntitySchema;
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! registry.register_transport("ams", None, json!({"hostname": "www.example.com"})).unwrap();
//! registry.register_serializer("ams", None, json!(null)).unwrap();
//! registry.register_schema(EntitySchema::new("Person").field("firstname"));
//!
//! let store = registry.set_default("ams").unwrap();
//! assert_eq!(store.serializer().format(), "ams");
//! assert_eq!(registry.default_format(), Some("ams"));
//! ```

use crate::error::{MapperError, Result};
use crate::naming;
use crate::schema::{EntitySchema, SchemaCatalog};
use crate::serializer::{AmsSerializer, JsonApiSerializer, Serializer, SerializerOptions};
use crate::store::Store;
use crate::transport::{RestOptions, RestTransport, Transport};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

/// Builds a transport from registry options.
pub type TransportFactory = Arc<dyn Fn(&Value) -> Result<Arc<dyn Transport>> + Send + Sync>;

/// Builds a serializer from registry options.
pub type SerializerFactory = Arc<dyn Fn(&Value) -> Result<Arc<dyn Serializer>> + Send + Sync>;

/// One registered component: its kind and the options it is built with.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub kind: String,
    pub options: Value,
}

pub struct Registry {
    transport_kinds: HashMap<String, TransportFactory>,
    serializer_kinds: HashMap<String, SerializerFactory>,
    transports: HashMap<String, RegistryEntry>,
    serializers: HashMap<String, RegistryEntry>,
    catalog: SchemaCatalog,
    default_format: Option<String>,
    default_store: Option<Store>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("transports", &self.transports)
            .field("serializers", &self.serializers)
            .field("types", &self.catalog.len())
            .field("default_format", &self.default_format)
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn rest_transport(options: &Value) -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(RestTransport::new(RestOptions::from_value(options)?)?))
}

impl Registry {
    /// A registry with the built-in kinds and no formats.
    pub fn new() -> Self {
        let mut registry = Self {
            transport_kinds: HashMap::new(),
            serializer_kinds: HashMap::new(),
            transports: HashMap::new(),
            serializers: HashMap::new(),
            catalog: SchemaCatalog::new(),
            default_format: None,
            default_store: None,
        };
        for kind in ["RestTransport", "AmsTransport", "JsonApiTransport"] {
            registry.register_transport_kind(kind, rest_transport);
        }
        registry.register_serializer_kind("AmsSerializer", |options| {
            let options = SerializerOptions::from_value("AmsSerializer", options)?;
            Ok(Arc::new(AmsSerializer::with_options(options)) as Arc<dyn Serializer>)
        });
        registry.register_serializer_kind("JsonApiSerializer", |options| {
            let options = SerializerOptions::from_value("JsonApiSerializer", options)?;
            Ok(Arc::new(JsonApiSerializer::with_options(options)) as Arc<dyn Serializer>)
        });
        registry
    }

    /// Adds or replaces a transport kind.
    pub fn register_transport_kind<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn Transport>> + Send + Sync + 'static,
    {
        self.transport_kinds
            .insert(kind.to_string(), Arc::new(factory));
    }

    /// Adds or replaces a serializer kind.
    pub fn register_serializer_kind<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn Serializer>> + Send + Sync + 'static,
    {
        self.serializer_kinds
            .insert(kind.to_string(), Arc::new(factory));
    }

    /// Registers the transport for `format`. Without `kind`, the kind is
    /// `<Format>Transport`.
    pub fn register_transport(
        &mut self,
        format: &str,
        kind: Option<&str>,
        options: Value,
    ) -> Result<RegistryEntry> {
        let kind = kind.map_or_else(
            || format!("{}Transport", naming::camelize(format)),
            str::to_string,
        );
        if !self.transport_kinds.contains_key(&kind) {
            return Err(MapperError::NotRegistered {
                kind: "transport kind",
                name: kind,
            });
        }
        debug!(format, %kind, "Registered transport");
        let entry = RegistryEntry { kind, options };
        self.transports.insert(format.to_string(), entry.clone());
        self.invalidate_default(format);
        Ok(entry)
    }

    /// Registers the serializer for `format`. Without `kind`, the kind is
    /// `<Format>Serializer`.
    pub fn register_serializer(
        &mut self,
        format: &str,
        kind: Option<&str>,
        options: Value,
    ) -> Result<RegistryEntry> {
        let kind = kind.map_or_else(
            || format!("{}Serializer", naming::camelize(format)),
            str::to_string,
        );
        if !self.serializer_kinds.contains_key(&kind) {
            return Err(MapperError::NotRegistered {
                kind: "serializer kind",
                name: kind,
            });
        }
        debug!(format, %kind, "Registered serializer");
        let entry = RegistryEntry { kind, options };
        self.serializers.insert(format.to_string(), entry.clone());
        self.invalidate_default(format);
        Ok(entry)
    }

    pub fn transport_entry(&self, format: &str) -> Option<&RegistryEntry> {
        self.transports.get(format)
    }

    pub fn serializer_entry(&self, format: &str) -> Option<&RegistryEntry> {
        self.serializers.get(format)
    }

    /// Builds a fresh transport for `format`.
    pub fn get_transport(&self, format: &str) -> Result<Arc<dyn Transport>> {
        let entry = self
            .transports
            .get(format)
            .ok_or_else(|| MapperError::NotRegistered {
                kind: "transport",
                name: format.to_string(),
            })?;
        let factory = self
            .transport_kinds
            .get(&entry.kind)
            .ok_or_else(|| MapperError::NotRegistered {
                kind: "transport kind",
                name: entry.kind.clone(),
            })?;
        factory(&entry.options)
    }

    /// Builds a fresh serializer for `format`.
    pub fn get_serializer(&self, format: &str) -> Result<Arc<dyn Serializer>> {
        let entry = self
            .serializers
            .get(format)
            .ok_or_else(|| MapperError::NotRegistered {
                kind: "serializer",
                name: format.to_string(),
            })?;
        let factory = self
            .serializer_kinds
            .get(&entry.kind)
            .ok_or_else(|| MapperError::NotRegistered {
                kind: "serializer kind",
                name: entry.kind.clone(),
            })?;
        factory(&entry.options)
    }

    /// Registers an entity type for every store built afterwards.
    pub fn register_schema(&mut self, schema: EntitySchema) -> Arc<EntitySchema> {
        self.default_store = None;
        self.catalog.register(schema)
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// A store for `format` over the schemas registered so far.
    pub fn store(&self, format: &str) -> Result<Store> {
        Ok(Store::new(
            self.get_transport(format)?,
            self.get_serializer(format)?,
            self.catalog.clone(),
        ))
    }

    /// Makes `format` the default. The last call wins.
    pub fn set_default(&mut self, format: &str) -> Result<Store> {
        let store = self.store(format)?;
        self.default_format = Some(format.to_string());
        self.default_store = Some(store.clone());
        debug!(format, "Default format selected");
        Ok(store)
    }

    pub fn default_format(&self) -> Option<&str> {
        self.default_format.as_deref()
    }

    /// The store for the default format, rebuilt if registrations changed
    /// since it was selected.
    pub fn default_store(&mut self) -> Result<Store> {
        if let Some(store) = &self.default_store {
            return Ok(store.clone());
        }
        let format = self
            .default_format
            .clone()
            .ok_or(MapperError::NoDefaultFormat)?;
        self.set_default(&format)
    }

    fn invalidate_default(&mut self, format: &str) {
        if self.default_format.as_deref() == Some(format) {
            self.default_store = None;
        }
    }

    /// Drops every format, schema and the default. Built-in kinds remain.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

fn global() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::new()))
}

/// Runs `f` with exclusive access to the process-wide registry.
pub fn with_global<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    let mut registry = global().write().unwrap_or_else(PoisonError::into_inner);
    f(&mut registry)
}

/// [`Registry::register_transport`] on the process-wide registry.
pub fn register_transport(format: &str, kind: Option<&str>, options: Value) -> Result<RegistryEntry> {
    with_global(|registry| registry.register_transport(format, kind, options))
}

/// [`Registry::register_serializer`] on the process-wide registry.
pub fn register_serializer(
    format: &str,
    kind: Option<&str>,
    options: Value,
) -> Result<RegistryEntry> {
    with_global(|registry| registry.register_serializer(format, kind, options))
}

pub fn register_schema(schema: EntitySchema) -> Arc<EntitySchema> {
    with_global(|registry| registry.register_schema(schema))
}

pub fn set_default(format: &str) -> Result<Store> {
    with_global(|registry| registry.set_default(format))
}

pub fn default_store() -> Result<Store> {
    with_global(Registry::default_store)
}

pub fn reset() {
    with_global(Registry::reset);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use serde_json::json;

    #[test]
    fn test_kind_derived_from_format() {
        let mut registry = Registry::new();
        let entry = registry
            .register_transport("json_api", None, json!({"hostname": "www.example.com"}))
            .unwrap();
        assert_eq!(entry.kind, "JsonApiTransport");

        let entry = registry
            .register_serializer("json_api", None, Value::Null)
            .unwrap();
        assert_eq!(entry.kind, "JsonApiSerializer");
        assert_eq!(registry.get_serializer("json_api").unwrap().format(), "json_api");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.register_serializer("xml", None, Value::Null),
            Err(MapperError::NotRegistered { name, .. }) if name == "XmlSerializer"
        ));
        assert!(registry.get_transport("xml").is_err());
    }

    #[test]
    fn test_reregistration_replaces_entry() {
        let mut registry = Registry::new();
        registry
            .register_transport("ams", None, json!({"hostname": "a.example.com"}))
            .unwrap();
        registry
            .register_transport("ams", Some("RestTransport"), json!({"hostname": "b.example.com"}))
            .unwrap();
        let entry = registry.transport_entry("ams").unwrap();
        assert_eq!(entry.kind, "RestTransport");
        assert_eq!(entry.options["hostname"], "b.example.com");
    }

    #[test]
    fn test_invalid_options_surface_on_build() {
        let mut registry = Registry::new();
        registry
            .register_serializer("ams", None, json!({"parse_cache_capacity": "lots"}))
            .unwrap();
        assert!(matches!(
            registry.get_serializer("ams"),
            Err(MapperError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn test_default_store_tracks_registrations() {
        let mock = MockTransport::new();
        let mut registry = Registry::new();
        let handle = mock.clone();
        registry.register_transport_kind("MockTransport", move |_| Ok(handle.transport()));
        registry
            .register_transport("ams", Some("MockTransport"), Value::Null)
            .unwrap();
        registry.register_serializer("ams", None, Value::Null).unwrap();

        assert!(matches!(
            registry.default_store(),
            Err(MapperError::NoDefaultFormat)
        ));
        registry.set_default("ams").unwrap();
        registry.register_schema(EntitySchema::new("Item"));

        let store = registry.default_store().unwrap();
        assert!(store.catalog().contains("Item"));

        registry.reset();
        assert!(registry.default_format().is_none());
        assert!(registry.transport_entry("ams").is_none());
    }
}
