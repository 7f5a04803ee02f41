//! Convention A: links and sideloading.
//!
//! ```json
//! {
//!   "person": { "id": 1, "firstname": "ryan", "item_ids": [1, 2] },
//!   "items": [{ "id": 1, "name": "first" }, { "id": 2, "name": "second" }]
//! }
//! ```
//!
//! A single record lives under the underscored type name, a list under its
//! plural. A relationship reads `links[name]` on the record first. Failing
//! that, the record's `<singular>_ids` / `<singular>_id` field selects
//! records from the sideloaded array named after the relationship (or after
//! the target type).

use super::{
    build_entity, ids_from, verify_identity, wire_record, IdCheck, ParseCache, Resolution,
    Serializer, SerializerOptions,
};
use crate::entity::{Entity, EntityRef};
use crate::error::{MapperError, Result};
use crate::schema::{EntitySchema, Relationship};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct AmsSerializer {
    cache: ParseCache,
}

impl AmsSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SerializerOptions) -> Self {
        Self {
            cache: ParseCache::new(options.parse_cache_capacity),
        }
    }
}

impl Serializer for AmsSerializer {
    fn format(&self) -> &'static str {
        "ams"
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
        let key = schema.singular_key();
        let record = envelope
            .get(&key)
            .filter(|record| !record.is_null())
            .ok_or_else(|| MapperError::MissingKey { key: key.clone() })?;
        if !record.is_object() {
            return Err(MapperError::TypeMismatch {
                key,
                expected: "an object",
            });
        }
        verify_identity(schema, &key, record, check)?;
        build_entity(schema, record, envelope)
    }

    fn plan_relationship(
        &self,
        parent: &Entity,
        relationship: &Relationship,
        target: &EntitySchema,
        envelope: &Value,
    ) -> Result<Resolution> {
        let meta = parent.meta();
        if let Some(url) = meta.link(relationship.name()) {
            return Ok(Resolution::Link {
                url: url.to_string(),
            });
        }

        let record = meta
            .record
            .as_ref()
            .or_else(|| envelope.get(parent.schema().singular_key()));
        let ids = record
            .and_then(|record| record.get(relationship.id_key()))
            .filter(|ids| !ids.is_null());
        let Some(ids) = ids else {
            return Ok(Resolution::Absent);
        };

        let Some(records) = sideloaded(envelope, relationship, target)? else {
            return Ok(Resolution::Absent);
        };
        Ok(Resolution::Sideload {
            records: records.clone(),
            ids: Some(ids_from(ids)),
        })
    }

    fn to_wire_format(&self, entity: &Entity) -> Value {
        let mut envelope = Map::new();
        envelope.insert(
            entity.schema().singular_key(),
            Value::Object(wire_record(entity)),
        );
        Value::Object(envelope)
    }
}

/// The sideloaded array for `relationship`: under its own plural name first,
/// then under the target type's plural key.
fn sideloaded<'a>(
    envelope: &'a Value,
    relationship: &Relationship,
    target: &EntitySchema,
) -> Result<Option<&'a Vec<Value>>> {
    for key in [relationship.sideload_key(), target.plural_key()] {
        if let Some(value) = envelope.get(&key) {
            return value
                .as_array()
                .map(Some)
                .ok_or(MapperError::TypeMismatch {
                    key,
                    expected: "an array",
                });
        }
    }
    Ok(None)
}
