use resource_mapper::prelude::*;

#[derive(Debug, Clone)]
pub struct Item(EntityRef);

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

impl Item {
    pub fn name(&self) -> Option<String> {
        self.0.get_str("name").ok().flatten()
    }

    pub fn set_name(&self, name: &str) -> Result<()> {
        self.0.set("name", name)
    }
}
