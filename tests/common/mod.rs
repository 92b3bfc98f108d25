// Shared fixtures for the integration tests.
#![allow(dead_code)]

use con_core::context::MemoryLineSource;
use con_core::diagnostics::CollectingSink;
use con_core::schema::{CreateRule, EnumDef, ObjectSchema, ReferenceType, SchemaRegistry, ValueKind};
use con_core::ParseContext;
use std::path::PathBuf;
use std::sync::Arc;

pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    let schemas = [
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
        ObjectSchema::builder("PhysicsBlock")
            .scalar("mass", 1, ValueKind::Float)
            .scalar("friction", 2, ValueKind::Float)
            .build()
            .unwrap(),
        ObjectSchema::builder("GenericFireArm")
            .scalar("roundsPerMinute", 1, ValueKind::Int)
            .scalar("displayName", 2, ValueKind::Str)
            .list("addAmmo", 3, vec![ValueKind::Str, ValueKind::Int])
            .build()
            .unwrap(),
    ];
    for schema in schemas {
        registry.register_schema(schema).unwrap();
    }
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
            "GenericFireArm",
            CreateRule::NameOnly,
        ))
        .unwrap();
    registry
}

pub fn context() -> (ParseContext, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let ctx = ParseContext::new(registry()).with_sink(sink.clone());
    (ctx, sink)
}

/// A context that reads `files` from memory instead of disk.
pub fn memory_context(files: &[(&str, &str)]) -> (ParseContext, Arc<CollectingSink>) {
    let mut source = MemoryLineSource::new();
    for (path, text) in files {
        source.insert(path, *text);
    }
    let (ctx, sink) = context();
    (ctx.with_line_source(Arc::new(source)), sink)
}

pub fn fixture_path(subdir: &str, filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(subdir)
        .join(filename)
}
