//! Schemas shared by the unit tests.

use crate::schema::{CreateRule, EnumDef, ObjectSchema, ReferenceType, SchemaRegistry, ValueKind};

pub(crate) fn sample_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register_schema(
            ObjectSchema::builder("SimpleObject")
                .scalar("geometry", 10, ValueKind::Str)
                .tuple(
                    "setPosition",
                    15,
                    vec![ValueKind::Float, ValueKind::Float, ValueKind::Float],
                )
                .scalar("mass", 20, ValueKind::Float)
                .scalar("hasCollision", 30, ValueKind::Bool)
                .scalar(
                    "team",
                    40,
                    ValueKind::Enum(EnumDef::new("Team", &["Neutral", "Red", "Blue"])),
                )
                .list("addItem", 50, vec![ValueKind::Str])
                .map("setStrength", 60, ValueKind::Int, vec![ValueKind::Int])
                .nested("physics", 70, "PhysicsBlock")
                .scalar("tags", 80, ValueKind::array(ValueKind::Str))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_schema(
            ObjectSchema::builder("PhysicsBlock")
                .scalar("mass", 1, ValueKind::Float)
                .scalar("friction", 2, ValueKind::Float)
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_schema(
            ObjectSchema::builder("Weapon")
                .scalar("roundsPerMinute", 1, ValueKind::Int)
                .scalar("displayName", 2, ValueKind::Str)
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_reference(ReferenceType::new(
            "ObjectTemplate",
            "SimpleObject",
            CreateRule::TypeThenName,
        ))
        .unwrap();
    registry
        .register_reference(ReferenceType::new(
            "weaponTemplate",
            "Weapon",
            CreateRule::NameOnly,
        ))
        .unwrap();
    registry
}
