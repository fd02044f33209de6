//! Schema Integration Tests
//!
//! Property resolution over records: stored fields, composite properties
//! built from the standard library, updates and read-only properties.

use composite::input;
use composite::library;
use composite::test_fixtures::*;
use composite::{
    composite_from, CompositionDescription, Continuation, GenerationRun, PrimitiveStep, Record,
    Schema, UpdateSpec,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn track_schema() -> Schema {
    // name: nameOverride when set, otherwise the album's name
    let name = composite_from(
        CompositionDescription::new("Track.name")
            .compose(false)
            .step(
                library::expose_dependency_or_continue()
                    .unwrap()
                    .instantiate([("dependency", "nameOverride")])
                    .unwrap(),
            )
            .step(
                library::expose_dependency()
                    .unwrap()
                    .instantiate([("dependency", "albumName")])
                    .unwrap(),
            ),
    )
    .unwrap();

    // color: stored value when set, otherwise derived from `this`
    let color = composite_from(
        CompositionDescription::new("Track.color")
            .compose(false)
            .update(UpdateSpec::new().validate("is color", |value| {
                match value.as_str() {
                    Some(s) if s.starts_with('#') => Ok(()),
                    _ => anyhow::bail!("expected a #rrggbb string"),
                }
            }))
            .step(library::expose_update_value_or_continue().unwrap().with_defaults().unwrap())
            .step(
                PrimitiveStep::compute(composite::deps![input::myself()], |deps| {
                    let id = deps.this().and_then(|t| t.get("id")).and_then(Value::as_str).unwrap_or("");
                    Ok(Continuation::exit(format!("#{:06x}", id.len())))
                })
                .terminal(),
            ),
    )
    .unwrap();

    Schema::new("Track")
        .stored("nameOverride")
        .stored("albumName")
        .composite("name", name)
        .composite("color", color)
}

#[test]
fn test_stored_and_computed_properties() {
    let schema = album_schema().unwrap();
    let record = album_record();
    let mut run = GenerationRun::new();

    assert_eq!(schema.compute(&record, "name", &mut run).unwrap(), json!("First Light"));
    assert_eq!(schema.compute(&record, "title", &mut run).unwrap(), json!("Lumen - First Light"));
}

#[test]
fn test_compute_all_in_declaration_order() {
    let schema = album_schema().unwrap();
    let values = schema.compute_all(&album_record(), &mut GenerationRun::new()).unwrap();
    let keys: Vec<&str> = values.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["name", "artist", "title"]);
}

#[test]
fn test_composite_dependencies_resolve_recursively() {
    let schema = track_schema();
    let mut run = GenerationRun::new();

    let record = Record::new("Track", "track:1").with_field("albumName", "Album Name");
    assert_eq!(schema.compute(&record, "name", &mut run).unwrap(), json!("Album Name"));

    let record = record.with_field("nameOverride", "Override");
    assert_eq!(schema.compute(&record, "name", &mut run).unwrap(), json!("Override"));
}

#[test]
fn test_updating_property_transforms_stored_value() {
    let schema = track_schema();
    let mut run = GenerationRun::new();
    let mut record = Record::new("Track", "track:1");

    assert_eq!(schema.compute(&record, "color", &mut run).unwrap(), json!("#000007"));

    schema.set(&mut record, "color", json!("#abcdef")).unwrap();
    assert_eq!(schema.compute(&record, "color", &mut run).unwrap(), json!("#abcdef"));
}

#[test]
fn test_update_validation_rejects_bad_values() {
    let schema = track_schema();
    let mut record = Record::new("Track", "track:1");

    let err = schema.set(&mut record, "color", json!("blue")).unwrap_err();
    assert_eq!(err.code(), "COMP-053");
    assert!(err.to_string().contains("expected a #rrggbb string"), "{err}");
    assert!(record.field("color").is_none());
}

#[test]
fn test_read_only_and_unknown_properties() {
    let schema = track_schema();
    let mut record = Record::new("Track", "track:1");

    assert_eq!(schema.set(&mut record, "name", json!("x")).unwrap_err().code(), "COMP-052");
    assert_eq!(schema.set(&mut record, "genre", json!("x")).unwrap_err().code(), "COMP-050");
    schema.set(&mut record, "nameOverride", json!("fine")).unwrap();
    assert_eq!(record.field("nameOverride"), Some(&json!("fine")));
}
