mod common;

use common::{context, fixture_path, memory_context};
use con_core::diagnostics::Severity;
use con_core::error::ScriptError;
use con_core::value::Scalar;
use con_core::serialization::{flatten, serialize_file};
use con_core::{
    load, parse_str, Attachment, Execution, LoadResult, MissingObjectPolicy, ParseContext, ParseOptions, SerializeOptions,
};
use std::sync::Arc;

#[test]
fn test_round_trip_preserves_flattened_properties() {
    let source = "\
var v_speed = 3
ObjectTemplate.create SimpleObject crate01
ObjectTemplate.setPosition 1 2.25 -3
ObjectTemplate.hasCollision true
ObjectTemplate.addItem \"first item\"
ObjectTemplate.addItem second
ObjectTemplate.setStrength 2 v_speed
ObjectTemplate.physics friction 0.1
weaponTemplate.create knife
weaponTemplate.addAmmo blade 1";
    let (ctx, _) = context();
    let first = parse_str(&ctx, "a.con", source, ParseOptions::default()).unwrap();
    let text = first.to_text().unwrap();
    let second = parse_str(&ctx, "a.con", &text, ParseOptions::default()).unwrap();
    assert_eq!(first.flatten(), second.flatten());
}

const MULTI_MAIN: &str = "\
var v_count = 3
ObjectTemplate.create SimpleObject crate01
ObjectTemplate.geometry crate_geom
run parts/setup.con 55 Red
ObjectTemplate.addItem from_main
include weapons/rifle.con
weaponTemplate.active m16
weaponTemplate.displayName \"Rifle M16\"";

const MULTI_SETUP: &str = "\
rem applied by run
ObjectTemplate.mass v_arg1
ObjectTemplate.team v_arg2
ObjectTemplate.addItem from_setup";

const MULTI_RIFLE: &str = "\
weaponTemplate.create m16
weaponTemplate.roundsPerMinute 800
weaponTemplate.addAmmo 556 30";

// Loads main.con, writes every file it pulled in, loads the written text
// again and returns both workspaces.
fn reload(files: &[(&str, &str)], options: ParseOptions) -> (LoadResult, LoadResult) {
    let (ctx, _) = memory_context(files);
    let first = load(&ctx, "main.con", options).unwrap();
    let written: Vec<(String, String)> = first
        .workspace
        .files()
        .iter()
        .map(|file| {
            let text = serialize_file(&first.workspace, file.id, SerializeOptions::default()).unwrap();
            (file.path.display().to_string(), text)
        })
        .collect();
    let written: Vec<(&str, &str)> = written.iter().map(|(p, t)| (p.as_str(), t.as_str())).collect();
    let (ctx, _) = memory_context(&written);
    let second = load(&ctx, "main.con", options)
        .unwrap_or_else(|e| panic!("written files did not load again: {e}\n{written:?}"));
    (first, second)
}

#[test]
fn test_multi_file_round_trip() {
    let files = [
        ("main.con", MULTI_MAIN),
        ("parts/setup.con", MULTI_SETUP),
        ("weapons/rifle.con", MULTI_RIFLE),
    ];
    let detached = ParseOptions::default()
        .with_execution(Execution::ExecuteInNewScope(Attachment::Detached))
        .with_propagation(true);
    for options in [ParseOptions::default(), detached] {
        let (first, second) = reload(&files, options);
        assert_eq!(first.workspace.files().len(), 3);
        assert_eq!(second.workspace.files().len(), 3);

        let mut total = 0;
        for file in first.workspace.files() {
            let again = second.workspace.find_file(&file.path).unwrap();
            let before = flatten(&first.workspace, file.id);
            let after = flatten(&second.workspace, again);
            assert_eq!(before, after, "{} changed across a round trip", file.path.display());
            total += before.len();
        }
        // geometry, both addItem lines, displayName, mass, team,
        // roundsPerMinute and addAmmo are each written by exactly one file.
        assert_eq!(total, 8, "{options:?}");
    }
}

#[test]
fn test_list_ordering() {
    let source = "\
ObjectTemplate.create SimpleObject crate01
ObjectTemplate.addItem X
ObjectTemplate.addItem Y
ObjectTemplate.addItem Z";
    let (ctx, _) = context();
    let result = parse_str(&ctx, "list.con", source, ParseOptions::default()).unwrap();
    let text = result.to_text().unwrap();
    let lines: Vec<&str> = text.lines().filter(|l| l.contains("addItem")).collect();
    assert_eq!(
        lines,
        vec![
            "ObjectTemplate.addItem X",
            "ObjectTemplate.addItem Y",
            "ObjectTemplate.addItem Z"
        ]
    );
}

#[test]
fn test_map_overwrite() {
    let source = "\
ObjectTemplate.create SimpleObject crate01
ObjectTemplate.setStrength 0 10
ObjectTemplate.setStrength 0 20";
    let (ctx, _) = context();
    let result = parse_str(&ctx, "map.con", source, ParseOptions::default()).unwrap();
    let object = result.object("ObjectTemplate", "crate01").unwrap();
    let entries = object.property("setStrength").unwrap().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].first(), Some(&Scalar::Int(20)));
}

#[test]
fn test_boolean_canonicalization() {
    let (ctx, _) = context();
    let source = "ObjectTemplate.create SimpleObject crate01\nObjectTemplate.hasCollision 1";
    let result = parse_str(&ctx, "bool.con", source, ParseOptions::default()).unwrap();
    let object = result.object("ObjectTemplate", "crate01").unwrap();
    assert_eq!(object.value("hasCollision").and_then(Scalar::as_bool), Some(true));
    let text = result.to_text().unwrap();
    assert!(text.ends_with("ObjectTemplate.hasCollision 1\n"));
}

#[test]
fn test_variable_indirection_without_reparse() {
    let (ctx, _) = context();
    let source = "var v_x = 5\nObjectTemplate.create SimpleObject crate01\nObjectTemplate.mass v_x";
    let mut result = parse_str(&ctx, "var.con", source, ParseOptions::default()).unwrap();
    let scope = result.workspace.file(result.file).scope;
    let v_x = result.workspace.lookup_expression(scope, "v_x").unwrap();
    result.workspace.set_expression_value(v_x, "12.5");

    let text = result.to_text().unwrap();
    assert!(text.starts_with("var v_x = 12.5\n\n"));
    assert!(text.contains("ObjectTemplate.mass 12.5\n"));

    let kept = result
        .to_text_with(SerializeOptions {
            keep_expression_refs: true,
            ..SerializeOptions::default()
        })
        .unwrap();
    assert!(kept.contains("ObjectTemplate.mass v_x\n"));
}

#[test]
fn test_float_precision_option() {
    let (ctx, _) = context();
    let source = "ObjectTemplate.create SimpleObject crate01\nObjectTemplate.mass 0.123456";
    let result = parse_str(&ctx, "f.con", source, ParseOptions::default()).unwrap();
    assert!(result.to_text().unwrap().contains("ObjectTemplate.mass 0.1235\n"));
    let two = SerializeOptions {
        float_precision: 2,
        ..SerializeOptions::default()
    };
    assert!(result.to_text_with(two).unwrap().contains("ObjectTemplate.mass 0.12\n"));
}

#[test]
fn test_missing_object_policies_at_the_root() {
    let source = "ObjectTemplate.active ghost\nObjectTemplate.mass 2";
    let (ctx, _) = context();

    let created = parse_str(
        &ctx,
        "create.con",
        source,
        ParseOptions::default().with_root_policy(MissingObjectPolicy::CreateNew),
    )
    .unwrap();
    let ghost = created.object("ObjectTemplate", "ghost").unwrap();
    assert_eq!(ghost.schema.name, "SimpleObject");
    assert_eq!(ghost.value("mass"), Some(&Scalar::Float(2.0)));

    for policy in [MissingObjectPolicy::CheckParent, MissingObjectPolicy::ThrowError] {
        let err = parse_str(&ctx, "x.con", source, ParseOptions::default().with_root_policy(policy))
            .err()
            .unwrap();
        assert!(matches!(
            err.script_error(),
            Some(ScriptError::MissingRequiredObject { .. })
        ));
    }
}

#[test]
fn test_loaded_object_table() {
    let (ctx, sink) = memory_context(&[
        ("a.con", "ObjectTemplate.create SimpleObject crate01"),
        ("b.con", "ObjectTemplate.create SimpleObject CRATE01\nweaponTemplate.create knife"),
    ]);
    load(&ctx, "a.con", ParseOptions::default()).unwrap();
    assert_eq!(ctx.loaded_objects().len(), 1);

    load(&ctx, "b.con", ParseOptions::default()).unwrap();
    assert_eq!(ctx.loaded_objects().len(), 2);
    let entry = ctx.loaded_objects().get("objecttemplate", "crate01").unwrap();
    assert_eq!(entry.path, std::path::PathBuf::from("b.con"));
    assert_eq!(sink.count(Severity::Warning), 1);

    ctx.loaded_objects().clear();
    assert!(ctx.loaded_objects().is_empty());
}

#[test]
fn test_failed_load_records_nothing() {
    let (ctx, _) = context();
    let source = "ObjectTemplate.create SimpleObject crate01\nbroken line";
    assert!(parse_str(&ctx, "bad.con", source, ParseOptions::default()).is_err());
    assert!(ctx.loaded_objects().is_empty());
}

#[test]
fn test_api_edits() {
    let (ctx, _) = context();
    let source = "\
ObjectTemplate.create SimpleObject crate01
ObjectTemplate.addItem X
ObjectTemplate.addItem Y
ObjectTemplate.addItem Z";
    let mut result = parse_str(&ctx, "edit.con", source, ParseOptions::default()).unwrap();
    let file = result.file;
    let id = result.workspace.file(file).objects[0];

    let removed = result
        .workspace
        .object_mut(id)
        .property_mut("addItem")
        .unwrap()
        .remove_entry(0)
        .unwrap();
    assert_eq!(removed.first(), Some(&Scalar::Str("X".to_string())));

    let scope = result.workspace.file(file).scope;
    result
        .workspace
        .set_property_text(ctx.registry(), scope, id, "mass 4")
        .unwrap();
    result
        .workspace
        .execute(&ctx, file, "ObjectTemplate.geometry crate_geom", ParseOptions::default())
        .unwrap();

    let text = result.to_text().unwrap();
    assert_eq!(
        text,
        "\
ObjectTemplate.create SimpleObject crate01
ObjectTemplate.geometry crate_geom
ObjectTemplate.mass 4.0
ObjectTemplate.addItem Y
ObjectTemplate.addItem Z
"
    );
}

#[test]
fn test_execute_rejects_unclassifiable_text() {
    let (ctx, _) = context();
    let mut result = parse_str(&ctx, "live.con", "", ParseOptions::default()).unwrap();
    let file = result.file;
    let err = result
        .workspace
        .execute(&ctx, file, "just words", ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err, con_core::ConError::Tokenize(_)));
    assert!(result.workspace.file(file).lines.is_empty());
}

#[tokio::test]
async fn test_load_async_runs_independent_files_concurrently() {
    let (ctx, _) = context();
    let ctx = Arc::new(ctx);
    let vehicle = con_core::load_async(
        ctx.clone(),
        fixture_path("ok", "vehicle.con"),
        ParseOptions::default(),
    );
    let crates = con_core::load_async(
        ctx.clone(),
        fixture_path("ok", "forward_reference.con"),
        ParseOptions::default(),
    );
    let (vehicle, crates) = tokio::join!(vehicle, crates);
    assert!(vehicle.unwrap().object("ObjectTemplate", "jeep").is_some());
    assert!(crates.unwrap().object("ObjectTemplate", "crate02").is_some());
    assert_eq!(ctx.loaded_objects().len(), 4);
}

#[tokio::test]
async fn test_load_async_propagates_errors() {
    let ctx: Arc<ParseContext> = Arc::new(context().0);
    let err = con_core::load_async(ctx, fixture_path("err", "unrecognized.con"), ParseOptions::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err.script_error(), Some(ScriptError::UnrecognizedLine { .. })));
}
