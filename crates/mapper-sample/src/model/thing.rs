use resource_mapper::prelude::*;

/// Identified by `uuid` rather than `id`.
#[derive(Debug, Clone)]
pub struct Thing(EntityRef);

impl Model for Thing {
    const TYPE_NAME: &'static str = "Thing";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::TYPE_NAME)
            .identifier("uuid")
            .field("label")
    }

    fn wrap(entity: EntityRef) -> Self {
        Self(entity)
    }

    fn entity(&self) -> &EntityRef {
        &self.0
    }
}

impl Thing {
    pub fn uuid(&self) -> Option<String> {
        self.0.id_key()
    }

    pub fn label(&self) -> Option<String> {
        self.0.get_str("label").ok().flatten()
    }
}
