//! # Entity Instances
//!
//! An [`Entity`] is one in-memory record of a registered [`EntitySchema`]:
//! its field values, the `meta` gathered during extraction (links, the
//! sideload envelope, the raw record) and the `origin` response it was built
//! from.
//!
//! Entities are always handled through [`EntityRef`] (`Arc<Entity>`) and use
//! interior mutability, so `Store::merge` and `Store::reload` update the very
//! object every caller already holds.
//!
//! ## Identity
//!
//! Two entities are equal when they share a type and an identifier value.
//! Identifiers compare textually, so `1` and `"1"` are the same record.
//! Unpersisted drafts are only equal to themselves.
//!
//! ## Relationship Slots
//!
//! Each declared relationship owns a slot that moves through
//! [`SlotState::Uncached`] → [`SlotState::Resolving`] → [`SlotState::Cached`].
//! Concurrent readers of the same slot share one resolution; a failed
//! resolution leaves the slot uncached.

use crate::collection::Collection;
use crate::error::{MapperError, Result};
use crate::schema::EntitySchema;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::OnceCell;

/// Shared handle to an entity. Clones point at the same instance.
pub type EntityRef = Arc<Entity>;

/// The raw response body an entity or collection was extracted from.
pub type RawResponse = Arc<str>;

/// Normalizes an identifier value for comparison. `null` has no identity.
pub fn identity_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Extraction metadata attached to an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    /// Relationship name → URL (or `{ "href": url }`) taken from the record.
    pub links: Option<Map<String, Value>>,
    /// The parsed envelope the entity was extracted from.
    pub sideload: Option<Arc<Value>>,
    /// The raw record, including undeclared keys such as `item_ids`.
    pub record: Option<Value>,
}

impl Meta {
    /// URL for `name` in the record's links, if any.
    pub fn link(&self, name: &str) -> Option<&str> {
        match self.links.as_ref()?.get(name)? {
            Value::String(url) => Some(url),
            Value::Object(link) => link.get("href").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Raw value of `key` on the record.
    pub fn record_value(&self, key: &str) -> Option<&Value> {
        self.record.as_ref()?.get(key)
    }
}

/// Observable state of one relationship slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uncached,
    Resolving,
    Cached,
}

/// A resolved relationship value.
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<EntityRef>),
    Many(Collection),
}

#[derive(Debug, Default)]
pub(crate) struct RelationshipSlot {
    cell: OnceCell<Related>,
    resolving: AtomicUsize,
}

struct ResolvingGuard<'a>(&'a AtomicUsize);

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RelationshipSlot {
    fn state(&self) -> SlotState {
        if self.cell.initialized() {
            SlotState::Cached
        } else if self.resolving.load(Ordering::SeqCst) > 0 {
            SlotState::Resolving
        } else {
            SlotState::Uncached
        }
    }

    /// Returns the cached value, or runs `resolve` once and caches its success.
    pub(crate) async fn get_or_resolve<F, Fut>(&self, resolve: F) -> Result<Related>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Related>>,
    {
        if let Some(related) = self.cell.get() {
            return Ok(related.clone());
        }
        self.resolving.fetch_add(1, Ordering::SeqCst);
        let _guard = ResolvingGuard(&self.resolving);
        self.cell.get_or_try_init(resolve).await.cloned()
    }
}

#[derive(Debug, Default)]
struct EntityData {
    values: BTreeMap<String, Value>,
    meta: Meta,
    origin: Option<RawResponse>,
}

/// One instance of a registered entity type.
pub struct Entity {
    schema: Arc<EntitySchema>,
    data: RwLock<EntityData>,
    slots: Mutex<HashMap<String, Arc<RelationshipSlot>>>,
}

impl Entity {
    /// Creates an empty, unpersisted draft.
    pub fn new(schema: Arc<EntitySchema>) -> EntityRef {
        Arc::new(Self {
            schema,
            data: RwLock::new(EntityData::default()),
            slots: Mutex::new(HashMap::new()),
        })
    }

    /// Creates a draft from a JSON object of declared fields.
    ///
    /// Any undeclared key is rejected with [`MapperError::UnknownField`].
    pub fn from_fields(schema: Arc<EntitySchema>, fields: Value) -> Result<EntityRef> {
        let Value::Object(fields) = fields else {
            return Err(MapperError::TypeMismatch {
                key: schema.type_name().to_string(),
                expected: "an object",
            });
        };
        let entity = Self::new(schema);
        for (name, value) in fields {
            entity.set(&name, value)?;
        }
        Ok(entity)
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    fn read(&self) -> RwLockReadGuard<'_, EntityData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntityData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_field(&self, name: &str) -> Result<()> {
        if self.schema.has_field(name) {
            Ok(())
        } else {
            Err(MapperError::UnknownField {
                type_name: self.type_name().to_string(),
                field: name.to_string(),
            })
        }
    }

    /// Reads a declared field. Unset fields read as `null`.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.check_field(name)?;
        Ok(self.read().values.get(name).cloned().unwrap_or(Value::Null))
    }

    /// Reads a declared string field.
    pub fn get_str(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name)?.as_str().map(str::to_string))
    }

    /// Writes a declared field.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.check_field(name)?;
        self.write().values.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Identifier value, `None` while unpersisted.
    pub fn id(&self) -> Option<Value> {
        self.read()
            .values
            .get(self.schema.identifier_field())
            .filter(|v| !v.is_null())
            .cloned()
    }

    /// Identifier in its comparable textual form.
    pub fn id_key(&self) -> Option<String> {
        self.id().as_ref().and_then(identity_key)
    }

    pub fn set_id(&self, id: impl Into<Value>) {
        let field = self.schema.identifier_field().to_string();
        self.write().values.insert(field, id.into());
    }

    pub fn persisted(&self) -> bool {
        self.id_key().is_some()
    }

    /// Snapshot of every declared field, unset ones as `null`, in declaration order.
    pub fn field_values(&self) -> Vec<(String, Value)> {
        let data = self.read();
        self.schema
            .fields()
            .iter()
            .map(|f| (f.clone(), data.values.get(f).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    pub fn meta(&self) -> Meta {
        self.read().meta.clone()
    }

    pub fn set_meta(&self, meta: Meta) {
        self.write().meta = meta;
    }

    /// The parsed envelope this entity was extracted from.
    pub fn sideload(&self) -> Option<Arc<Value>> {
        self.read().meta.sideload.clone()
    }

    pub fn origin(&self) -> Option<RawResponse> {
        self.read().origin.clone()
    }

    pub fn set_origin(&self, origin: RawResponse) {
        self.write().origin = Some(origin);
    }

    /// Sets `origin` only when none is present. Returns whether it was set.
    pub fn adopt_origin(&self, origin: &RawResponse) -> bool {
        let mut data = self.write();
        if data.origin.is_some() {
            return false;
        }
        data.origin = Some(Arc::clone(origin));
        true
    }

    /// Copies origin, meta and the intersection of declared fields from `from`.
    ///
    /// A `null` identifier on `from` never clears the identifier held here.
    /// Relationship slots are untouched.
    pub(crate) fn absorb(&self, from: &Entity) {
        if std::ptr::eq(self, from) {
            return;
        }
        let (origin, meta, values) = {
            let incoming = from.read();
            (
                incoming.origin.clone(),
                incoming.meta.clone(),
                incoming.values.clone(),
            )
        };
        let mut data = self.write();
        data.origin = origin;
        data.meta = meta;
        for field in from.schema.fields() {
            if !self.schema.has_field(field) {
                continue;
            }
            let value = values.get(field).cloned().unwrap_or(Value::Null);
            if value.is_null() && field == self.schema.identifier_field() {
                continue;
            }
            data.values.insert(field.clone(), value);
        }
    }

    pub(crate) fn slot(&self, name: &str) -> Arc<RelationshipSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(name.to_string()).or_default())
    }

    /// Cache state of a relationship slot.
    pub fn relationship_state(&self, name: &str) -> SlotState {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(name)
            .map_or(SlotState::Uncached, |slot| slot.state())
    }

    /// The cached value of a relationship, without resolving it.
    pub fn cached_relationship(&self, name: &str) -> Option<Related> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(name).and_then(|slot| slot.cell.get().cloned())
    }

    /// Drops every cached relationship so the next read resolves again.
    ///
    /// Reloading an entity does not do this on its own.
    pub fn invalidate_relationships(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Identity comparison by type and identifier; drafts compare by reference.
    pub fn same_identity(&self, other: &Entity) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.type_name() != other.type_name() {
            return false;
        }
        match (self.id_key(), other.id_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        f.debug_struct(self.type_name())
            .field("values", &data.values)
            .field("has_origin", &data.origin.is_some())
            .finish()
    }
}
