//! # Entity Schemas
//!
//! An [`EntitySchema`] is the registration-time description of one entity
//! type: its ordered, closed set of declared fields, the designated
//! identifier field, and its relationship declarations. Schemas are built
//! once with the builder methods below, frozen behind an `Arc`, and looked up
//! by type name through a [`SchemaCatalog`].
//!
//! ```rust
//! use resource_mapper::schema::EntitySchema;
//!
//! let person = EntitySchema::new("Person")
//!     .field("firstname")
//!     .field("lastname")
//!     .has_many("items")
//!     .has_one_of("favorite_item", "Item");
//!
//! assert!(person.has_field("id"));
//! assert_eq!(person.plural_key(), "people");
//! assert_eq!(person.relationship("favorite_item").unwrap().target_type(), "Item");
//! ```

use crate::error::{MapperError, Result};
use crate::naming;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier field used when a type does not declare its own.
pub const DEFAULT_IDENTIFIER: &str = "id";

/// Whether a relationship points at one record or at many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "has_one",
            Self::Many => "has_many",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared has-one or has-many relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    name: String,
    cardinality: Cardinality,
    target_type: String,
}

impl Relationship {
    /// Declares a relationship whose target type is derived from its name
    /// (`items` → `Item`, `favorite_item` → `FavoriteItem`).
    pub fn new(name: impl Into<String>, cardinality: Cardinality) -> Self {
        let name = name.into();
        let target_type = naming::classify(&name);
        Self {
            name,
            cardinality,
            target_type,
        }
    }

    /// Overrides the conventional target type.
    pub fn of(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = target_type.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    /// Field on the parent record carrying the related id(s):
    /// `item_ids` for has-many `items`, `item_id` for has-one `item`.
    pub fn id_key(&self) -> String {
        let singular = naming::singularize(&self.name);
        match self.cardinality {
            Cardinality::Many => format!("{singular}_ids"),
            Cardinality::One => format!("{singular}_id"),
        }
    }

    /// Envelope key under which sideloaded records for this relationship live.
    pub fn sideload_key(&self) -> String {
        naming::pluralize(&self.name)
    }

    /// Auxiliary field written by `to_wire_format` for cached has-one targets.
    pub fn wire_id_key(&self) -> String {
        format!("{}_id", self.name)
    }
}

/// Schema-level description of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    type_name: String,
    identifier: String,
    fields: Vec<String>,
    relationships: Vec<Relationship>,
}

impl EntitySchema {
    /// Starts a schema with the default `id` identifier.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            identifier: DEFAULT_IDENTIFIER.to_string(),
            fields: vec![DEFAULT_IDENTIFIER.to_string()],
            relationships: Vec::new(),
        }
    }

    /// Declares a field. Declaring the same name twice is a no-op.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.fields.contains(&name) {
            self.fields.push(name);
        }
        self
    }

    /// Replaces the default identifier. The new identifier is also a field;
    /// the default `id` field is dropped unless it was declared explicitly
    /// after this call.
    pub fn identifier(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.identifier == DEFAULT_IDENTIFIER && name != DEFAULT_IDENTIFIER {
            self.fields.retain(|f| f != DEFAULT_IDENTIFIER);
        }
        self.identifier = name.clone();
        self.field(name)
    }

    pub fn has_many(self, name: impl Into<String>) -> Self {
        self.relationship_decl(Relationship::new(name, Cardinality::Many))
    }

    pub fn has_many_of(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship_decl(Relationship::new(name, Cardinality::Many).of(target_type))
    }

    pub fn has_one(self, name: impl Into<String>) -> Self {
        self.relationship_decl(Relationship::new(name, Cardinality::One))
    }

    pub fn has_one_of(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship_decl(Relationship::new(name, Cardinality::One).of(target_type))
    }

    /// Adds a fully built declaration, replacing one with the same name.
    pub fn relationship_decl(mut self, relationship: Relationship) -> Self {
        self.relationships.retain(|r| r.name != relationship.name);
        self.relationships.push(relationship);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn identifier_field(&self) -> &str {
        &self.identifier
    }

    /// Declared fields in declaration order, identifier included.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        name == self.identifier || self.fields.iter().any(|f| f == name)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Looks up a relationship, failing loudly when it was never declared.
    pub fn require_relationship(&self, name: &str) -> Result<&Relationship> {
        self.relationship(name)
            .ok_or_else(|| MapperError::UnknownRelationship {
                type_name: self.type_name.clone(),
                name: name.to_string(),
            })
    }

    /// Envelope key for a single record: `cell_phone`.
    pub fn singular_key(&self) -> String {
        naming::underscore(&self.type_name)
    }

    /// Envelope key for a list of records, also the resource path segment:
    /// `cell_phones`.
    pub fn plural_key(&self) -> String {
        naming::pluralize(&self.singular_key())
    }
}

/// Registry of frozen schemas, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, Arc<EntitySchema>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezes and registers a schema, replacing any previous one of the same type.
    pub fn register(&mut self, schema: EntitySchema) -> Arc<EntitySchema> {
        let schema = Arc::new(schema);
        self.schemas
            .insert(schema.type_name().to_string(), Arc::clone(&schema));
        schema
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    pub fn get(&self, type_name: &str) -> Result<Arc<EntitySchema>> {
        self.schemas
            .get(type_name)
            .cloned()
            .ok_or_else(|| MapperError::UnknownType(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
