//! # Serializers
//!
//! A [`Serializer`] knows one JSON wire convention. It turns raw bodies into
//! entities and collections, decides how each relationship resolves, and
//! writes entities back out.
//!
//! | Convention | Type | Single record | Relationships |
//! |------------|------|---------------|---------------|
//! | A | [`AmsSerializer`] | `{ "person": {..} }` | record `links`, then sideloaded arrays |
//! | B | [`JsonApiSerializer`] | `{ "people": [{..}] }` | top-level `links`, then `linked` |
//!
//! ## Relationship Decisions
//!
//! Every relationship read goes through [`Serializer::plan_relationship`],
//! which yields a [`Resolution`]. A link always wins over sideloaded data,
//! and a relationship with neither resolves to empty (many) or `None` (one).
//! Following a link is delegated to a [`LinkLoader`], which the store
//! implements, so serializers never touch the transport.
//!
//! ## Parse Memoization
//!
//! Each serializer owns a [`ParseCache`]. Parsing the same raw body twice
//! returns the same `Arc<Value>`; concurrent first parses of one body may
//! both run, but every caller ends up sharing the stored value.

pub mod ams;
pub mod json_api;

pub use ams::AmsSerializer;
pub use json_api::JsonApiSerializer;

use crate::entity::{identity_key, Entity, EntityRef, Meta, Related};
use crate::error::{MapperError, Result};
use crate::schema::{Cardinality, EntitySchema, Relationship};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// How `extract_single` treats the identifier of the extracted record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdCheck<'a> {
    /// The record must carry this identifier (compared textually).
    Verify(&'a Value),
    /// Accept whichever identifier the record carries.
    Unverified,
}

impl<'a> IdCheck<'a> {
    pub fn from_option(expected: Option<&'a Value>) -> Self {
        match expected {
            Some(id) if !id.is_null() => Self::Verify(id),
            _ => Self::Unverified,
        }
    }
}

/// The outcome of deciding how a relationship resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Fetch the target(s) from this URL.
    Link { url: String },
    /// Build the target(s) from these embedded records. `ids`, when present,
    /// keeps only records whose identifier is listed.
    Sideload {
        records: Vec<Value>,
        ids: Option<Vec<String>>,
    },
    /// Nothing to resolve from.
    Absent,
}

impl Resolution {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Link { .. } => "link",
            Self::Sideload { .. } => "sideload",
            Self::Absent => "absent",
        }
    }
}

/// Follows relationship links on behalf of a serializer.
#[async_trait]
pub trait LinkLoader: Send + Sync {
    /// Fetches `url` and extracts a list of `type_name` entities.
    async fn load_collection(&self, type_name: &str, url: &str) -> Result<Vec<EntityRef>>;

    /// Fetches `url` and extracts one `type_name` entity.
    async fn load_single(
        &self,
        type_name: &str,
        check: IdCheck<'_>,
        url: &str,
    ) -> Result<Option<EntityRef>>;
}

/// Serializer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SerializerOptions {
    /// Distinct raw bodies kept parsed before the oldest is evicted.
    pub parse_cache_capacity: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            parse_cache_capacity: 64,
        }
    }
}

impl SerializerOptions {
    /// Reads options from a registry options value. `null` means defaults.
    pub fn from_value(kind: &str, value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone()).map_err(|e| MapperError::InvalidOptions {
            kind: kind.to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Default)]
struct ParsedBodies {
    values: HashMap<Arc<str>, Arc<Value>>,
    order: VecDeque<Arc<str>>,
}

/// Memo of parsed bodies keyed by their raw text.
#[derive(Debug)]
pub struct ParseCache {
    capacity: usize,
    parsed: Mutex<ParsedBodies>,
    parses: AtomicUsize,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            parsed: Mutex::new(ParsedBodies::default()),
            parses: AtomicUsize::new(0),
        }
    }

    /// Parses `raw`, or returns the value parsed earlier for the same text.
    pub fn parse(&self, raw: &str) -> Result<Arc<Value>> {
        if let Some(value) = self.lookup(raw) {
            return Ok(value);
        }

        self.parses.fetch_add(1, Ordering::Relaxed);
        let value = Arc::new(serde_json::from_str::<Value>(raw)?);

        let mut parsed = self.parsed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = parsed.values.get(raw) {
            return Ok(Arc::clone(existing));
        }
        while parsed.order.len() >= self.capacity {
            if let Some(oldest) = parsed.order.pop_front() {
                parsed.values.remove(&oldest);
            }
        }
        let key: Arc<str> = Arc::from(raw);
        parsed.order.push_back(Arc::clone(&key));
        parsed.values.insert(key, Arc::clone(&value));
        Ok(value)
    }

    fn lookup(&self, raw: &str) -> Option<Arc<Value>> {
        let parsed = self.parsed.lock().unwrap_or_else(PoisonError::into_inner);
        parsed.values.get(raw).cloned()
    }

    /// Number of times a body was actually parsed.
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.parsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(SerializerOptions::default().parse_cache_capacity)
    }
}

/// One JSON wire convention.
#[async_trait]
pub trait Serializer: Send + Sync {
    /// Format name this serializer implements, e.g. `ams`.
    fn format(&self) -> &'static str;

    fn parse_cache(&self) -> &ParseCache;

    /// Parses a raw body through the memo.
    fn parse(&self, raw: &str) -> Result<Arc<Value>> {
        self.parse_cache().parse(raw)
    }

    /// Extracts one entity from a parsed envelope.
    ///
    /// A missing, `null` or empty record is a [`MapperError::MissingKey`];
    /// only the transport decides that a record does not exist.
    fn extract_single(
        &self,
        schema: &Arc<EntitySchema>,
        check: IdCheck<'_>,
        envelope: &Arc<Value>,
    ) -> Result<EntityRef>;

    /// Extracts every entity under the plural key, or under `key` if given.
    fn extract_many(
        &self,
        schema: &Arc<EntitySchema>,
        envelope: &Arc<Value>,
        key: Option<&str>,
    ) -> Result<Vec<EntityRef>> {
        let key = key.map_or_else(|| schema.plural_key(), str::to_string);
        require_array(envelope, &key)?
            .iter()
            .map(|record| build_entity(schema, record, envelope))
            .collect()
    }

    /// Decides where `relationship` of `parent` resolves from.
    fn plan_relationship(
        &self,
        parent: &Entity,
        relationship: &Relationship,
        target: &EntitySchema,
        envelope: &Value,
    ) -> Result<Resolution>;

    /// Resolves a has-many relationship against the parent's envelope.
    async fn resolve_many_relationship(
        &self,
        parent: &Entity,
        relationship: &Relationship,
        target: &Arc<EntitySchema>,
        envelope: &Arc<Value>,
        loader: &dyn LinkLoader,
    ) -> Result<Vec<EntityRef>> {
        let resolution = self.plan_relationship(parent, relationship, target, envelope)?;
        debug!(
            relationship = relationship.name(),
            resolution = resolution.kind(),
            "Resolving has_many"
        );
        match resolution {
            Resolution::Link { url } => loader.load_collection(target.type_name(), &url).await,
            Resolution::Sideload { records, ids } => {
                build_sideloaded(target, &records, ids.as_deref(), envelope)
            }
            Resolution::Absent => Ok(Vec::new()),
        }
    }

    /// Resolves a has-one relationship against the parent's envelope.
    async fn resolve_single_relationship(
        &self,
        parent: &Entity,
        relationship: &Relationship,
        target: &Arc<EntitySchema>,
        envelope: &Arc<Value>,
        loader: &dyn LinkLoader,
    ) -> Result<Option<EntityRef>> {
        let resolution = self.plan_relationship(parent, relationship, target, envelope)?;
        debug!(
            relationship = relationship.name(),
            resolution = resolution.kind(),
            "Resolving has_one"
        );
        match resolution {
            Resolution::Link { url } => {
                let expected = parent
                    .meta()
                    .record_value(&relationship.id_key())
                    .filter(|id| !id.is_null())
                    .cloned();
                let check = IdCheck::from_option(expected.as_ref());
                loader.load_single(target.type_name(), check, &url).await
            }
            Resolution::Sideload { records, ids } => {
                let mut found = build_sideloaded(target, &records, ids.as_deref(), envelope)?;
                Ok(if found.is_empty() {
                    None
                } else {
                    Some(found.swap_remove(0))
                })
            }
            Resolution::Absent => Ok(None),
        }
    }

    /// Writes `entity` in this convention's envelope.
    fn to_wire_format(&self, entity: &Entity) -> Value;
}

/// The value under `key`, which must be an array.
pub fn require_array<'a>(envelope: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    let value = envelope.get(key).ok_or_else(|| MapperError::MissingKey {
        key: key.to_string(),
    })?;
    value.as_array().ok_or_else(|| MapperError::TypeMismatch {
        key: key.to_string(),
        expected: "an array",
    })
}

/// Checks that `record` carries an identifier and that it is the expected one.
pub fn verify_identity(
    schema: &EntitySchema,
    key: &str,
    record: &Value,
    check: IdCheck<'_>,
) -> Result<()> {
    let actual = record
        .get(schema.identifier_field())
        .and_then(identity_key)
        .ok_or_else(|| MapperError::MissingIdentifier {
            key: key.to_string(),
        })?;
    if let IdCheck::Verify(expected) = check {
        let expected = identity_key(expected).unwrap_or_default();
        if expected != actual {
            return Err(MapperError::IdentityMismatch {
                type_name: key.to_string(),
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Builds an entity from one raw record.
///
/// Only declared fields are copied. The record's `links`, the envelope and
/// the record itself are kept in `meta` for relationship resolution.
pub fn build_entity(
    schema: &Arc<EntitySchema>,
    record: &Value,
    envelope: &Arc<Value>,
) -> Result<EntityRef> {
    let Value::Object(fields) = record else {
        return Err(MapperError::TypeMismatch {
            key: schema.singular_key(),
            expected: "an object",
        });
    };
    let entity = Entity::new(Arc::clone(schema));
    for (name, value) in fields {
        if schema.has_field(name) {
            entity.set(name, value.clone())?;
        }
    }
    entity.set_meta(Meta {
        links: fields.get("links").and_then(Value::as_object).cloned(),
        sideload: Some(Arc::clone(envelope)),
        record: Some(record.clone()),
    });
    Ok(entity)
}

fn build_sideloaded(
    target: &Arc<EntitySchema>,
    records: &[Value],
    ids: Option<&[String]>,
    envelope: &Arc<Value>,
) -> Result<Vec<EntityRef>> {
    let wanted: Option<HashSet<&str>> = ids.map(|ids| ids.iter().map(String::as_str).collect());
    let mut entities = Vec::new();
    for record in records {
        if let Some(wanted) = &wanted {
            let id = record.get(target.identifier_field()).and_then(identity_key);
            if !id.is_some_and(|id| wanted.contains(id.as_str())) {
                continue;
            }
        }
        entities.push(build_entity(target, record, envelope)?);
    }
    Ok(entities)
}

/// Identifier list carried by a relationship field: a scalar or an array.
pub fn ids_from(value: &Value) -> Vec<String> {
    match value {
        Value::Array(ids) => ids.iter().filter_map(identity_key).collect(),
        other => identity_key(other).into_iter().collect(),
    }
}

/// Declared fields of `entity` as a wire record.
///
/// The identifier is left out while unpersisted. Cached has-one targets with
/// an identifier add `<name>_id`.
pub fn wire_record(entity: &Entity) -> Map<String, Value> {
    let schema = entity.schema();
    let persisted = entity.persisted();
    let mut record = Map::new();
    for (field, value) in entity.field_values() {
        if field == schema.identifier_field() && !persisted {
            continue;
        }
        record.insert(field, value);
    }
    for relationship in schema.relationships() {
        if relationship.cardinality() != Cardinality::One {
            continue;
        }
        if let Some(Related::One(Some(target))) =
            entity.cached_relationship(relationship.name())
        {
            if let Some(id) = target.id() {
                record.insert(relationship.wire_id_key(), id);
            }
        }
    }
    record
}
