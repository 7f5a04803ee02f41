//! # Store
//!
//! The [`Store`] composes a [`Transport`] and a [`Serializer`] over a
//! [`SchemaCatalog`]. It fetches raw bodies, has them extracted, tags every
//! result with its `origin`, and resolves relationships lazily against that
//! origin.
//!
//! ## Operations
//!
//! | Operation | Remote call | Result |
//! |-----------|-------------|--------|
//! | [`find`](Store::find) | `find` | entity, or `None` on not-found |
//! | [`query`](Store::query) | `find_many` | [`Collection`] tagged with origin |
//! | [`has_many`](Store::has_many) / [`has_one`](Store::has_one) | only for links or unloaded parents | cached per entity |
//! | [`save`](Store::save) | `create` or `update` | response merged into the entity |
//! | [`delete`](Store::delete) | `delete` when persisted | `false` if already gone |
//! | [`reload`](Store::reload) | `find` | fresh state merged into the same reference |
//!
//! ## Relationship Caching
//!
//! `has_many` and `has_one` resolve once per entity and relationship and
//! cache the outcome, empty results included. Concurrent readers of one
//! relationship share a single resolution. `find_many_relationship` and
//! `find_single_relationship` bypass the cache.
//!
//! Reloading an entity keeps its cached relationships; call
//! [`Entity::invalidate_relationships`] to drop them.
//!
//! ```rust
//! use resource_mapper::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> resource_mapper::Result<()> {
//!     let mock = MockTransport::new();
//!     mock.expect_find("people", 1).return_json(json!({
//!         "person": {"id": 1, "firstname": "ryan", "item_ids": [2]},
//!         "items": [{"id": 1, "name": "first"}, {"id": 2, "name": "second"}]
//!     }));
//!
//!     let catalog = SchemaCatalog::new()
//!         .with(EntitySchema::new("Person").field("firstname").has_many("items"))
//!         .with(EntitySchema::new("Item").field("name"));
//!     let store = Store::new(mock.transport(), Arc::new(AmsSerializer::new()), catalog);
//!
//!     let person = store.find("Person", 1).await?.expect("person exists");
//!     let items = store.has_many(&person, "items").await?;
//!     assert_eq!(items.len(), 1);
//!     assert_eq!(items[0].get_str("name")?.as_deref(), Some("second"));
//!
//!     mock.verify();
//!     Ok(())
//! }
//! ```

use crate::collection::Collection;
use crate::entity::{identity_key, Entity, EntityRef, RawResponse, Related};
use crate::error::{MapperError, Result};
use crate::schema::{Cardinality, EntitySchema, Relationship, SchemaCatalog};
use crate::serializer::{IdCheck, LinkLoader, Serializer};
use crate::transport::{QueryParams, StatusCategory, Transport, TransportResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct Store {
    transport: Arc<dyn Transport>,
    serializer: Arc<dyn Serializer>,
    catalog: Arc<SchemaCatalog>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("format", &self.serializer.format())
            .field("types", &self.catalog.len())
            .finish()
    }
}

fn failure(operation: &'static str, target: String, status: StatusCategory) -> MapperError {
    warn!(operation, %target, status = status.code(), "Transport failure");
    MapperError::TransportFailure {
        operation,
        target,
        status: status.code(),
    }
}

fn target_of(schema: &EntitySchema, id: &Value) -> String {
    format!(
        "{}/{}",
        schema.plural_key(),
        identity_key(id).unwrap_or_default()
    )
}

impl Store {
    pub fn new(
        transport: Arc<dyn Transport>,
        serializer: Arc<dyn Serializer>,
        catalog: impl Into<Arc<SchemaCatalog>>,
    ) -> Self {
        Self {
            transport,
            serializer,
            catalog: catalog.into(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn serializer(&self) -> &Arc<dyn Serializer> {
        &self.serializer
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    pub fn schema(&self, type_name: &str) -> Result<Arc<EntitySchema>> {
        self.catalog.get(type_name)
    }

    /// A new unpersisted draft of `type_name`.
    pub fn build(&self, type_name: &str, fields: Value) -> Result<EntityRef> {
        Entity::from_fields(self.schema(type_name)?, fields)
    }

    /// Fetches one entity by identifier. A remote not-found is `Ok(None)`.
    #[instrument(skip(self, id))]
    pub async fn find(&self, type_name: &str, id: impl Into<Value>) -> Result<Option<EntityRef>> {
        let id = id.into();
        let schema = self.schema(type_name)?;
        debug!(id = %id, "Sending request");

        let response = self.transport.find(&schema, &id).await?;
        let origin = match response.status {
            StatusCategory::Success => RawResponse::from(response.body),
            StatusCategory::NotFound => {
                debug!(id = %id, "Not found");
                return Ok(None);
            }
            status => return Err(failure("find", target_of(&schema, &id), status)),
        };

        let envelope = self.serializer.parse(&origin)?;
        let found = self
            .serializer
            .extract_single(&schema, IdCheck::Verify(&id), &envelope)?;
        found.set_origin(origin);
        Ok(Some(found))
    }

    /// Fetches the collection endpoint with opaque parameters.
    #[instrument(skip(self))]
    pub async fn query(&self, type_name: &str, params: QueryParams) -> Result<Collection> {
        let schema = self.schema(type_name)?;
        debug!("Sending request");

        let response = self.transport.find_many(&schema, &params).await?;
        if response.status != StatusCategory::Success {
            return Err(failure("query", schema.plural_key(), response.status));
        }
        let origin = RawResponse::from(response.body);
        let envelope = self.serializer.parse(&origin)?;
        let items = self.serializer.extract_many(&schema, &envelope, None)?;
        debug!(count = items.len(), "Extracted collection");
        Ok(Collection::with_origin(items, origin))
    }

    /// [`query`](Self::query) without parameters.
    pub async fn all(&self, type_name: &str) -> Result<Collection> {
        self.query(type_name, QueryParams::new()).await
    }

    fn relationship_of(
        parent: &Entity,
        name: &str,
        expected: Cardinality,
    ) -> Result<Relationship> {
        let relationship = parent.schema().require_relationship(name)?;
        if relationship.cardinality() != expected {
            return Err(MapperError::CardinalityMismatch {
                name: name.to_string(),
                expected: expected.as_str(),
            });
        }
        Ok(relationship.clone())
    }

    /// The parent's origin and parsed envelope, reloading the parent first
    /// if it has never been fetched. The envelope kept at extraction is
    /// preferred over parsing the origin again.
    async fn parent_envelope(&self, parent: &EntityRef) -> Result<(RawResponse, Arc<Value>)> {
        if parent.origin().is_none() {
            debug!(type_name = parent.type_name(), "Parent not loaded, reloading");
            self.reload(parent).await?;
        }
        let origin = parent
            .origin()
            .ok_or_else(|| MapperError::MissingOrigin(parent.type_name().to_string()))?;
        let envelope = match parent.sideload() {
            Some(envelope) => envelope,
            None => self.serializer.parse(&origin)?,
        };
        Ok((origin, envelope))
    }

    /// Resolves a has-many relationship without consulting the cache.
    #[instrument(skip(self, parent), fields(type_name = parent.type_name()))]
    pub async fn find_many_relationship(&self, parent: &EntityRef, name: &str) -> Result<Collection> {
        let relationship = Self::relationship_of(parent, name, Cardinality::Many)?;
        let target = self.schema(relationship.target_type())?;
        let (origin, envelope) = self.parent_envelope(parent).await?;

        let items = self
            .serializer
            .resolve_many_relationship(parent, &relationship, &target, &envelope, self)
            .await?;
        Ok(Collection::with_origin(items, origin))
    }

    /// Resolves a has-one relationship without consulting the cache.
    #[instrument(skip(self, parent), fields(type_name = parent.type_name()))]
    pub async fn find_single_relationship(
        &self,
        parent: &EntityRef,
        name: &str,
    ) -> Result<Option<EntityRef>> {
        let relationship = Self::relationship_of(parent, name, Cardinality::One)?;
        let target = self.schema(relationship.target_type())?;
        let (origin, envelope) = self.parent_envelope(parent).await?;

        let found = self
            .serializer
            .resolve_single_relationship(parent, &relationship, &target, &envelope, self)
            .await?;
        if let Some(entity) = &found {
            entity.adopt_origin(&origin);
        }
        Ok(found)
    }

    /// Cached has-many read.
    pub async fn has_many(&self, parent: &EntityRef, name: &str) -> Result<Collection> {
        Self::relationship_of(parent, name, Cardinality::Many)?;
        let related = parent
            .slot(name)
            .get_or_resolve(|| async {
                self.find_many_relationship(parent, name)
                    .await
                    .map(Related::Many)
            })
            .await?;
        match related {
            Related::Many(collection) => Ok(collection),
            Related::One(_) => Err(MapperError::CardinalityMismatch {
                name: name.to_string(),
                expected: Cardinality::Many.as_str(),
            }),
        }
    }

    /// Cached has-one read.
    pub async fn has_one(&self, parent: &EntityRef, name: &str) -> Result<Option<EntityRef>> {
        Self::relationship_of(parent, name, Cardinality::One)?;
        let related = parent
            .slot(name)
            .get_or_resolve(|| async {
                self.find_single_relationship(parent, name)
                    .await
                    .map(Related::One)
            })
            .await?;
        match related {
            Related::One(entity) => Ok(entity),
            Related::Many(_) => Err(MapperError::CardinalityMismatch {
                name: name.to_string(),
                expected: Cardinality::One.as_str(),
            }),
        }
    }

    async fn fetch(&self, url: &str) -> Result<TransportResponse> {
        debug!(url, "Sending request");
        self.transport.get(url).await
    }

    /// Writes `entity` to the remote and merges the returned representation
    /// back into it. Updates when persisted, creates otherwise.
    #[instrument(skip(self, entity), fields(type_name = entity.type_name(), persisted = entity.persisted()))]
    pub async fn save(&self, entity: &EntityRef) -> Result<bool> {
        let schema = Arc::clone(entity.schema());
        let body = self.serializer.to_wire_format(entity);
        let id = entity.id();

        let (operation, response) = match &id {
            Some(id) => ("update", self.transport.update(&schema, id, &body).await?),
            None => ("create", self.transport.create(&schema, &body).await?),
        };
        if response.status != StatusCategory::Success {
            let target = id
                .as_ref()
                .map_or_else(|| schema.plural_key(), |id| target_of(&schema, id));
            return Err(failure(operation, target, response.status));
        }

        if !response.is_blank() {
            let origin = RawResponse::from(response.body);
            let envelope = self.serializer.parse(&origin)?;
            let check = IdCheck::from_option(id.as_ref());
            let fresh = self.serializer.extract_single(&schema, check, &envelope)?;
            fresh.set_origin(origin);
            self.merge(entity, &fresh);
        }
        info!(operation, id = ?entity.id_key(), "Saved");
        Ok(true)
    }

    /// Deletes the remote record. Unpersisted entities are a successful no-op;
    /// a record that is already gone reports `false`.
    #[instrument(skip(self, entity), fields(type_name = entity.type_name()))]
    pub async fn delete(&self, entity: &EntityRef) -> Result<bool> {
        let Some(id) = entity.id() else {
            debug!("Not persisted, nothing to delete");
            return Ok(true);
        };
        let response = self.transport.delete(entity.schema(), &id).await?;
        match response.status {
            StatusCategory::Success => {
                info!(id = %id, "Deleted");
                Ok(true)
            }
            StatusCategory::NotFound => {
                debug!(id = %id, "Already gone");
                Ok(false)
            }
            status => Err(failure("delete", target_of(entity.schema(), &id), status)),
        }
    }

    /// Re-fetches `entity` and merges the fresh state into the same reference.
    #[instrument(skip(self, entity), fields(type_name = entity.type_name()))]
    pub async fn reload(&self, entity: &EntityRef) -> Result<EntityRef> {
        let id = entity
            .id()
            .ok_or_else(|| MapperError::NotPersisted(entity.type_name().to_string()))?;
        let fresh = self
            .find(entity.type_name(), id.clone())
            .await?
            .ok_or_else(|| MapperError::NotFound {
                type_name: entity.type_name().to_string(),
                id: identity_key(&id).unwrap_or_default(),
            })?;
        info!(id = %id, "Reloaded");
        Ok(self.merge(entity, &fresh))
    }

    /// Copies origin, meta and the shared declared fields of `from` into
    /// `into`, returning `into`.
    pub fn merge(&self, into: &EntityRef, from: &EntityRef) -> EntityRef {
        into.absorb(from);
        Arc::clone(into)
    }
}

#[async_trait]
impl LinkLoader for Store {
    #[instrument(skip(self))]
    async fn load_collection(&self, type_name: &str, url: &str) -> Result<Vec<EntityRef>> {
        let schema = self.schema(type_name)?;
        let response = self.fetch(url).await?;
        if response.status != StatusCategory::Success {
            return Err(failure("load_collection", url.to_string(), response.status));
        }
        let origin = RawResponse::from(response.body);
        let envelope = self.serializer.parse(&origin)?;
        let items = self.serializer.extract_many(&schema, &envelope, None)?;
        for item in &items {
            item.set_origin(Arc::clone(&origin));
        }
        Ok(items)
    }

    #[instrument(skip(self, check))]
    async fn load_single(
        &self,
        type_name: &str,
        check: IdCheck<'_>,
        url: &str,
    ) -> Result<Option<EntityRef>> {
        let schema = self.schema(type_name)?;
        let response = self.fetch(url).await?;
        let origin = match response.status {
            StatusCategory::Success => RawResponse::from(response.body),
            StatusCategory::NotFound => return Ok(None),
            status => return Err(failure("load_single", url.to_string(), status)),
        };
        let envelope = self.serializer.parse(&origin)?;
        let found = self.serializer.extract_single(&schema, check, &envelope)?;
        found.set_origin(origin);
        Ok(Some(found))
    }
}
