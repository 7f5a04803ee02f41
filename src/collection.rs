//! # Collections
//!
//! A [`Collection`] is an ordered list of entities that remembers the raw
//! response it came from. Item order is the order of the envelope's array.
//!
//! `map` and `filter` are lazy and yield ordinary iterators rather than new
//! collections, since transformed values are no longer fetchable as
//! relationships.

use crate::entity::{EntityRef, RawResponse};
use std::ops::Index;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Collection {
    items: Vec<EntityRef>,
    origin: Option<RawResponse>,
}

impl Collection {
    /// A collection with no origin.
    pub fn new(items: Vec<EntityRef>) -> Self {
        Self {
            items,
            origin: None,
        }
    }

    /// A collection tagged with `origin`. Every item without an origin of its
    /// own adopts it, so relationships on those items resolve without a fetch.
    pub fn with_origin(items: Vec<EntityRef>, origin: RawResponse) -> Self {
        for item in &items {
            item.adopt_origin(&origin);
        }
        Self {
            items,
            origin: Some(origin),
        }
    }

    pub fn origin(&self) -> Option<&RawResponse> {
        self.origin.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EntityRef> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&EntityRef> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&EntityRef> {
        self.items.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRef> {
        self.items.iter()
    }

    pub fn map<'a, U, F>(&'a self, f: F) -> impl Iterator<Item = U> + 'a
    where
        U: 'a,
        F: FnMut(&'a EntityRef) -> U + 'a,
    {
        self.items.iter().map(f)
    }

    pub fn filter<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a EntityRef> + 'a
    where
        P: FnMut(&EntityRef) -> bool + 'a,
    {
        self.items.iter().filter(move |item| predicate(item))
    }

    /// True if an item with the same identity as `entity` is present.
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.items.iter().any(|item| item == entity)
    }

    /// True if this exact instance is present.
    pub fn contains_instance(&self, entity: &EntityRef) -> bool {
        self.items.iter().any(|item| Arc::ptr_eq(item, entity))
    }

    pub fn into_vec(self) -> Vec<EntityRef> {
        self.items
    }
}

impl Index<usize> for Collection {
    type Output = EntityRef;

    fn index(&self, index: usize) -> &EntityRef {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a EntityRef;
    type IntoIter = std::slice::Iter<'a, EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for Collection {
    type Item = EntityRef;
    type IntoIter = std::vec::IntoIter<EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::schema::EntitySchema;
    use serde_json::json;

    fn items(ids: &[i64]) -> Vec<EntityRef> {
        let schema = Arc::new(EntitySchema::new("Item").field("name"));
        ids.iter()
            .map(|id| {
                Entity::from_fields(Arc::clone(&schema), json!({"id": id, "name": format!("item {id}")}))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_sequence_operations() {
        let collection = Collection::new(items(&[1, 2, 3]));
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.first().unwrap().id(), Some(json!(1)));
        assert_eq!(collection.last().unwrap().id(), Some(json!(3)));
        assert_eq!(collection[1].id(), Some(json!(2)));
        assert!(collection.get(3).is_none());
        assert!(collection.origin().is_none());
    }

    #[test]
    fn test_map_and_filter_are_plain_sequences() {
        let collection = Collection::new(items(&[1, 2, 3]));
        let names: Vec<String> = collection
            .map(|item| item.get_str("name").unwrap().unwrap())
            .collect();
        assert_eq!(names, ["item 1", "item 2", "item 3"]);

        let odd: Vec<&EntityRef> = collection
            .filter(|item| item.id_key().as_deref() != Some("2"))
            .collect();
        assert_eq!(odd.len(), 2);
    }

    #[test]
    fn test_origin_propagates_only_to_items_without_one() {
        let list = items(&[1, 2]);
        list[0].set_origin(Arc::from("first"));

        let collection = Collection::with_origin(list, Arc::from("shared"));
        assert_eq!(collection.origin().map(|o| &**o), Some("shared"));
        assert_eq!(collection[0].origin().as_deref(), Some("first"));
        assert_eq!(collection[1].origin().as_deref(), Some("shared"));
    }
}
