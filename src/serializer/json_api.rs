//! Convention B: strict collections with top-level `links` and `linked`.
//!
//! ```json
//! {
//!   "people": [{ "id": 1, "firstname": "ryan", "links": { "items": [1, 2] } }],
//!   "links": { "items": { "href": "http://example.com/items?person={people.id}" } },
//!   "linked": { "items": [{ "id": 1 }, { "id": 2 }] }
//! }
//! ```
//!
//! Every payload carries the plural key as an array, even for one record.
//! Relationship links live at the top level and may embed a
//! `{<plural>.id}` placeholder for the parent's identifier.

use super::{
    build_entity, ids_from, require_array, verify_identity, wire_record, IdCheck, ParseCache,
    Resolution, Serializer, SerializerOptions,
};
use crate::entity::{Entity, EntityRef};
use crate::error::{MapperError, Result};
use crate::schema::{EntitySchema, Relationship};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct JsonApiSerializer {
    cache: ParseCache,
}

impl JsonApiSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SerializerOptions) -> Self {
        Self {
            cache: ParseCache::new(options.parse_cache_capacity),
        }
    }
}

impl Serializer for JsonApiSerializer {
    fn format(&self) -> &'static str {
        "json_api"
    }

    fn parse_cache(&self) -> &ParseCache {
        &self.cache
    }

    fn extract_single(
        &self,
        schema: &Arc<EntitySchema>,
        check: IdCheck<'_>,
        envelope: &Arc<Value>,
    ) -> Result<EntityRef> {
        let plural = schema.plural_key();
        let record = require_array(envelope, &plural)?
            .first()
            .ok_or_else(|| MapperError::MissingKey {
                key: format!("{plural}[0]"),
            })?;
        verify_identity(schema, &format!("{plural}[0]"), record, check).map_err(|e| match e {
            MapperError::IdentityMismatch {
                expected, actual, ..
            } => MapperError::IdentityMismatch {
                type_name: schema.singular_key(),
                expected,
                actual,
            },
            other => other,
        })?;
        build_entity(schema, record, envelope)
    }

    fn plan_relationship(
        &self,
        parent: &Entity,
        relationship: &Relationship,
        target: &EntitySchema,
        envelope: &Value,
    ) -> Result<Resolution> {
        let name = relationship.name();
        let href = envelope
            .get("links")
            .and_then(|links| links.get(name))
            .and_then(|link| match link {
                Value::String(url) => Some(url.as_str()),
                Value::Object(link) => link.get("href").and_then(Value::as_str),
                _ => None,
            });
        if let Some(href) = href {
            return Ok(Resolution::Link {
                url: expand_template(href, parent),
            });
        }

        let Some(linked) = envelope.get("linked") else {
            return Ok(Resolution::Absent);
        };
        let Some(records) = linked
            .get(name)
            .or_else(|| linked.get(target.plural_key()))
        else {
            return Ok(Resolution::Absent);
        };
        let records = records.as_array().ok_or_else(|| MapperError::TypeMismatch {
            key: format!("linked.{name}"),
            expected: "an array",
        })?;

        let ids = parent
            .meta()
            .record_value("links")
            .and_then(|links| links.get(name))
            .map(linked_ids);
        Ok(Resolution::Sideload {
            records: records.clone(),
            ids,
        })
    }

    fn to_wire_format(&self, entity: &Entity) -> Value {
        let mut envelope = Map::new();
        envelope.insert(
            entity.schema().plural_key(),
            Value::Array(vec![Value::Object(wire_record(entity))]),
        );
        Value::Object(envelope)
    }
}

/// Replaces `{<plural>.id}` with the parent's identifier.
fn expand_template(href: &str, parent: &Entity) -> String {
    let placeholder = format!("{{{}.id}}", parent.schema().plural_key());
    match parent.id_key() {
        Some(id) => href.replace(&placeholder, &id),
        None => href.to_string(),
    }
}

/// Ids a record-level link names: an id, a list, or `{ "ids": [..] }`.
fn linked_ids(link: &Value) -> Vec<String> {
    match link {
        Value::Object(link) => link
            .get("ids")
            .or_else(|| link.get("id"))
            .map(ids_from)
            .unwrap_or_default(),
        other => ids_from(other),
    }
}
