//! Test Fixtures for composite
//!
//! Shared templates and compositions for unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use composite::test_fixtures::*;
//!
//! let composition = double_plus_one()?.instantiate([("n", DEP_COUNT)])?.compose()?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::composition::{composite_from, Composition, CompositionDescription};
use crate::error::Result;
use crate::input::{self, InputSpec, ValueType};
use crate::schema::{Record, Schema};
use crate::step::{Continuation, PrimitiveStep};
use crate::template::{template_composite_from, Template, TemplateDescription};

// ═══════════════════════════════════════════════════════════════════════════
// DEPENDENCY NAMES
// ═══════════════════════════════════════════════════════════════════════════

/// Environment name bound to the `n` input of [`double_plus_one`]
pub const DEP_COUNT: &str = "count";

/// A dependency that no fixture step declares
pub const DEP_SECRET: &str = "secret";

// ═══════════════════════════════════════════════════════════════════════════
// TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════

/// Two steps: `#double = n * 2`, then expose `#double + 1`
pub fn double_plus_one() -> Result<Template> {
    template_composite_from(
        TemplateDescription::new("doublePlusOne")
            .compose(false)
            .input("n", input::decl(InputSpec::new().value_type(ValueType::Number)))
            .steps(|| {
                vec![
                    PrimitiveStep::compute(crate::deps![input::named("n")], |deps| {
                        let n = deps.input_or_null("n").as_i64().unwrap_or(0);
                        Ok(Continuation::provide([("#double", n * 2)]))
                    })
                    .into(),
                    PrimitiveStep::compute(["#double"], |deps| {
                        let double = deps.require("#double")?.as_i64().unwrap_or(0);
                        Ok(Continuation::exit(double + 1))
                    })
                    .terminal()
                    .into(),
                ]
            }),
    )
}

/// Raises `#a` and `#b`; only `#a` is declared as an output
pub fn raises_two() -> Result<Template> {
    template_composite_from(
        TemplateDescription::new("raisesTwo")
            .outputs(["#a"])
            .steps(|| {
                vec![PrimitiveStep::compute(Vec::<input::DependencyRef>::new(), |_| {
                    Ok(Continuation::raise_output([("#a", 1), ("#b", 2)]))
                })
                .into()]
            }),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// STEPS
// ═══════════════════════════════════════════════════════════════════════════

/// Cached step exiting with `value * 10`, counting real evaluations
pub fn counting_step(calls: Arc<AtomicUsize>) -> PrimitiveStep {
    PrimitiveStep::compute(["value"], move |deps| {
        calls.fetch_add(1, Ordering::SeqCst);
        let value = deps.get("value").and_then(Value::as_i64).unwrap_or(0);
        Ok(Continuation::exit(value * 10))
    })
    .annotate("times ten")
    .cached()
    .terminal()
}

/// Standalone composition around [`counting_step`]
pub fn counting_composition(calls: Arc<AtomicUsize>) -> Result<Composition> {
    composite_from(CompositionDescription::new("counting").compose(false).step(counting_step(calls)))
}

// ═══════════════════════════════════════════════════════════════════════════
// SCHEMA
// ═══════════════════════════════════════════════════════════════════════════

/// Album with stored `name`/`artist` and a computed `title`
pub fn album_schema() -> Result<Schema> {
    let title = composite_from(
        CompositionDescription::new("Album.title").compose(false).step(
            PrimitiveStep::compute(["name", "artist"], |deps| {
                let name = deps.get("name").and_then(Value::as_str).unwrap_or("Untitled");
                Ok(Continuation::exit(match deps.get("artist").and_then(Value::as_str) {
                    Some(artist) => format!("{artist} - {name}"),
                    None => name.to_string(),
                }))
            })
            .terminal(),
        ),
    )?;

    Ok(Schema::new("Album")
        .stored("name")
        .stored("artist")
        .composite("title", title))
}

pub fn album_record() -> Record {
    Record::new("Album", "album:first-light")
        .with_field("name", "First Light")
        .with_field("artist", "Lumen")
}
