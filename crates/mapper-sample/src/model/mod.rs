//! Typed models for the sample API.

mod cell_phone;
mod item;
mod person;
mod thing;

pub use cell_phone::CellPhone;
pub use item::Item;
pub use person::Person;
pub use thing::Thing;

#[cfg(test)]
mod tests {
    use super::*;
    use resource_mapper::prelude::*;
    use serde_json::json;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::new()
            .with_model::<Person>()
            .with_model::<Item>()
            .with_model::<CellPhone>()
            .with_model::<Thing>()
    }

    #[test]
    fn test_person_full_name() {
        let person = Person::build(
            &catalog(),
            json!({"firstname": "ryan", "lastname": "test"}),
        )
        .unwrap();
        assert_eq!(person.full_name(), "ryan test");
        person.set_firstname("testing").unwrap();
        assert_eq!(person.firstname().as_deref(), Some("testing"));
    }

    #[test]
    fn test_relationship_targets() {
        let schema = Person::schema();
        assert_eq!(schema.relationship("other_items").unwrap().target_type(), "Item");
        assert_eq!(schema.relationship("cell_phones").unwrap().target_type(), "CellPhone");
        assert_eq!(
            schema.relationship("favorite_item").unwrap().cardinality(),
            Cardinality::One
        );
    }

    #[test]
    fn test_thing_uses_uuid() {
        let thing = Thing::build(&catalog(), json!({"uuid": "t-1", "label": "x"})).unwrap();
        assert_eq!(thing.uuid().as_deref(), Some("t-1"));
        assert!(thing.persisted());
        assert!(Thing::build(&catalog(), json!({"id": 1})).is_err());
    }
}
