use resource_mapper::prelude::*;

/// A person with owned items, a single featured item and phones.
///
/// # Relationships
/// - `items` / `other_items`: has many [`Item`](super::Item)
/// - `item` / `favorite_item`: has one [`Item`](super::Item)
/// - `cell_phones`: has many [`CellPhone`](super::CellPhone)
#[derive(Debug, Clone)]
pub struct Person(EntityRef);

impl Model for Person {
    const TYPE_NAME: &'static str = "Person";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::TYPE_NAME)
            .field("firstname")
            .field("lastname")
            .has_many("items")
            .has_many_of("other_items", "Item")
            .has_one("item")
            .has_one_of("favorite_item", "Item")
            .has_many("cell_phones")
    }

    fn wrap(entity: EntityRef) -> Self {
        Self(entity)
    }

    fn entity(&self) -> &EntityRef {
        &self.0
    }
}

impl Person {
    pub fn firstname(&self) -> Option<String> {
        self.0.get_str("firstname").ok().flatten()
    }

    pub fn lastname(&self) -> Option<String> {
        self.0.get_str("lastname").ok().flatten()
    }

    pub fn set_firstname(&self, firstname: &str) -> Result<()> {
        self.0.set("firstname", firstname)
    }

    pub fn set_lastname(&self, lastname: &str) -> Result<()> {
        self.0.set("lastname", lastname)
    }

    /// `"firstname lastname"`, with missing parts left empty.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.firstname().unwrap_or_default(),
            self.lastname().unwrap_or_default()
        )
    }
}
