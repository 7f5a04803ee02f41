use resource_mapper::prelude::*;

/// A phone number. Its wire keys are `cell_phone` / `cell_phones`.
#[derive(Debug, Clone)]
pub struct CellPhone(EntityRef);

impl Model for CellPhone {
    const TYPE_NAME: &'static str = "CellPhone";

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::TYPE_NAME).field("number")
    }

    fn wrap(entity: EntityRef) -> Self {
        Self(entity)
    }

    fn entity(&self) -> &EntityRef {
        &self.0
    }
}

impl CellPhone {
    pub fn number(&self) -> Option<String> {
        self.0.get_str("number").ok().flatten()
    }
}
