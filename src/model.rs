//! # Typed Models
//!
//! The engine works on dynamic [`Entity`] values. A [`Model`] is a thin typed
//! wrapper around one entity that names its type, declares its schema and
//! exposes typed accessors. [`ModelClient`] wraps a [`Store`] so callers get
//! `Person`s and `Item`s back instead of raw entities.
//!
//! ```rust
//! use resource_mapper::prelude::*;
//!
//! #[derive(Debug, Clone)]
//! struct Item(EntityRef);
//!
//! impl Model for Item {
//!     const TYPE_NAME: &'static str = "Item";
//!
//!     fn schema() -> EntitySchema {
//!         EntitySchema::new(Self::TYPE_NAME).field("name")
//!     }
//!     fn wrap(entity: EntityRef) -> Self {
//!         Self(entity)
//!     }
//!     fn entity(&self) -> &EntityRef {
//!         &self.0
//!     }
//! }
//!
//! let catalog = SchemaCatalog::new().with_model::<Item>();
//! let item = Item::build(&catalog, serde_json::json!({"name": "lamp"})).unwrap();
//! assert!(!item.persisted());
//! ```

use crate::entity::{Entity, EntityRef};
use crate::error::{MapperError, Result};
use crate::registry;
use crate::schema::{EntitySchema, SchemaCatalog};
use crate::store::Store;
use crate::transport::QueryParams;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A typed view over one entity type.
pub trait Model: Sized + Send + Sync {
    /// Registered type name, e.g. `CellPhone`.
    const TYPE_NAME: &'static str;

    /// The schema registered for this type.
    fn schema() -> EntitySchema;

    /// Wraps an entity without checking its type.
    fn wrap(entity: EntityRef) -> Self;

    fn entity(&self) -> &EntityRef;

    /// Wraps an entity after checking it is of this type.
    fn from_entity(entity: EntityRef) -> Result<Self> {
        if entity.type_name() != Self::TYPE_NAME {
            return Err(MapperError::TypeMismatch {
                key: entity.type_name().to_string(),
                expected: Self::TYPE_NAME,
            });
        }
        Ok(Self::wrap(entity))
    }

    /// A new unpersisted draft.
    fn build(catalog: &SchemaCatalog, fields: Value) -> Result<Self> {
        let schema = catalog.get(Self::TYPE_NAME)?;
        Entity::from_fields(schema, fields).map(Self::wrap)
    }

    fn id(&self) -> Option<Value> {
        self.entity().id()
    }

    fn persisted(&self) -> bool {
        self.entity().persisted()
    }
}

impl SchemaCatalog {
    /// Registers `M`'s schema, builder style.
    pub fn with_model<M: Model>(self) -> Self {
        self.with(M::schema())
    }
}

impl registry::Registry {
    /// Registers `M`'s schema.
    pub fn register_model<M: Model>(&mut self) -> Arc<EntitySchema> {
        self.register_schema(M::schema())
    }
}

/// Typed access to one model type through a [`Store`].
pub struct ModelClient<M: Model> {
    store: Store,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for ModelClient<M> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<M: Model> std::fmt::Debug for ModelClient<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClient")
            .field("model", &M::TYPE_NAME)
            .field("store", &self.store)
            .finish()
    }
}

fn wrap_all<T: Model>(entities: impl IntoIterator<Item = EntityRef>) -> Result<Vec<T>> {
    entities.into_iter().map(T::from_entity).collect()
}

impl<M: Model> ModelClient<M> {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            _model: PhantomData,
        }
    }

    /// A client over the process-wide default store.
    pub fn from_default() -> Result<Self> {
        Ok(Self::new(registry::default_store()?))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn build(&self, fields: Value) -> Result<M> {
        M::build(self.store.catalog(), fields)
    }

    #[instrument(skip(self, id), fields(type_name = M::TYPE_NAME))]
    pub async fn find(&self, id: impl Into<Value> + Send) -> Result<Option<M>> {
        debug!("Sending request");
        self.store
            .find(M::TYPE_NAME, id)
            .await?
            .map(M::from_entity)
            .transpose()
    }

    #[instrument(skip(self), fields(type_name = M::TYPE_NAME))]
    pub async fn query(&self, params: QueryParams) -> Result<Vec<M>> {
        debug!("Sending request");
        let collection = self.store.query(M::TYPE_NAME, params).await?;
        wrap_all(collection)
    }

    pub async fn all(&self) -> Result<Vec<M>> {
        self.query(QueryParams::new()).await
    }

    pub async fn save(&self, model: &M) -> Result<bool> {
        self.store.save(model.entity()).await
    }

    pub async fn delete(&self, model: &M) -> Result<bool> {
        self.store.delete(model.entity()).await
    }

    pub async fn reload(&self, model: &M) -> Result<()> {
        self.store.reload(model.entity()).await.map(|_| ())
    }

    /// Cached has-many read, typed as `T`.
    pub async fn has_many<T: Model>(&self, model: &M, name: &str) -> Result<Vec<T>> {
        let collection = self.store.has_many(model.entity(), name).await?;
        wrap_all(collection)
    }

    /// Cached has-one read, typed as `T`.
    pub async fn has_one<T: Model>(&self, model: &M, name: &str) -> Result<Option<T>> {
        self.store
            .has_one(model.entity(), name)
            .await?
            .map(T::from_entity)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::AmsSerializer;
    use crate::transport::MockTransport;
    use serde_json::json;

    #[derive(Debug)]
    struct Item(EntityRef);

    impl Model for Item {
        const TYPE_NAME: &'static str = "Item";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::TYPE_NAME).field("name")
        }

        fn wrap(entity: EntityRef) -> Self {
            Self(entity)
        }

        fn entity(&self) -> &EntityRef {
            &self.0
        }
    }

    fn client(mock: &MockTransport) -> ModelClient<Item> {
        let catalog = SchemaCatalog::new().with_model::<Item>();
        ModelClient::new(Store::new(
            mock.transport(),
            Arc::new(AmsSerializer::new()),
            catalog,
        ))
    }

    #[tokio::test]
    async fn test_find_and_query_are_typed() {
        let mock = MockTransport::new();
        mock.expect_find("items", 1)
            .return_json(json!({"item": {"id": 1, "name": "lamp"}}));
        mock.expect_find_many("items")
            .return_json(json!({"items": [{"id": 1}, {"id": 2}]}));

        let items = client(&mock);
        let lamp = items.find(1).await.unwrap().unwrap();
        assert_eq!(lamp.entity().get_str("name").unwrap().as_deref(), Some("lamp"));
        assert_eq!(items.all().await.unwrap().len(), 2);
        mock.verify();
    }

    #[test]
    fn test_from_entity_checks_type() {
        let other = Entity::new(Arc::new(EntitySchema::new("Person")));
        assert!(matches!(
            Item::from_entity(other),
            Err(MapperError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_assigns_server_id() {
        let mock = MockTransport::new();
        mock.expect_create("items")
            .return_json(json!({"item": {"id": 10, "name": "lamp"}}));

        let items = client(&mock);
        let lamp = items.build(json!({"name": "lamp"})).unwrap();
        assert!(items.save(&lamp).await.unwrap());
        assert_eq!(lamp.id(), Some(json!(10)));
        assert!(lamp.persisted());
    }
}
