//! Generation Run Tests
//!
//! Memoization, tracing and cache analysis across whole compositions.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use composite::input::{self, DependencyRef, InputSpec};
use composite::test_fixtures::*;
use composite::{
    composite_from, debug_composite, display_composite_cache_analysis, environment,
    template_composite_from, CompositeConfig, Composition, CompositionDescription, Continuation, Deps,
    Environment, EventKind, GenerationRun, PrimitiveStep, TemplateDescription,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// Standalone composition with one cached step exiting `label`
fn labelled(description: CompositionDescription, label: &'static str) -> Composition {
    composite_from(
        description.compose(false).step(
            PrimitiveStep::compute(["n"], move |_| Ok(Continuation::exit(label)))
                .cached()
                .terminal(),
        ),
    )
    .unwrap()
}

/// Counter plus a cached step that every template instance clones
fn shared_step(
    dependency: DependencyRef,
    exit: fn(&Deps) -> Value,
) -> (Arc<AtomicUsize>, PrimitiveStep) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let step = PrimitiveStep::compute(vec![dependency], move |deps| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Continuation::exit(exit(deps)))
    })
    .annotate("shared")
    .cached()
    .terminal();
    (calls, step)
}

#[test]
fn test_cached_step_evaluates_once_per_argument_set() {
    let calls = Arc::new(AtomicUsize::new(0));
    let composition = counting_composition(Arc::clone(&calls)).unwrap();
    let mut run = GenerationRun::new();

    for _ in 0..3 {
        let value = composition.compute(&environment([("value", 4)]), &mut run).unwrap();
        assert_eq!(value, json!(40));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    composition.compute(&environment([("value", 5)]), &mut run).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(run.cache().entries_for("times ten"), 2);
}

#[test]
fn test_cache_is_scoped_to_one_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let composition = counting_composition(Arc::clone(&calls)).unwrap();

    composition.compute(&environment([("value", 1)]), &mut GenerationRun::new()).unwrap();
    composition.compute(&environment([("value", 1)]), &mut GenerationRun::new()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_same_named_steps_keep_separate_results() {
    let anonymous_a = labelled(CompositionDescription::default(), "from A");
    let anonymous_b = labelled(CompositionDescription::default(), "from B");
    let album = labelled(CompositionDescription::new("title"), "album title");
    let track = labelled(CompositionDescription::new("title"), "track title");
    let mut run = GenerationRun::new();
    let env = environment([("n", 1)]);

    assert_eq!(anonymous_a.compute(&env, &mut run).unwrap(), json!("from A"));
    assert_eq!(anonymous_b.compute(&env, &mut run).unwrap(), json!("from B"));
    assert_eq!(album.compute(&env, &mut run).unwrap(), json!("album title"));
    assert_eq!(track.compute(&env, &mut run).unwrap(), json!("track title"));
    assert_eq!(run.cache().len(), 4);
}

#[test]
fn test_cached_transform_keys_on_update_value() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let composition = composite_from(
        CompositionDescription::new("shout").compose(false).step(
            PrimitiveStep::transform(Vec::<DependencyRef>::new(), move |value, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Continuation::exit(format!("{}!", value.as_str().unwrap_or(""))))
            })
            .cached()
            .terminal(),
        ),
    )
    .unwrap();
    let mut run = GenerationRun::new();
    let env = Environment::default();

    assert_eq!(composition.transform(json!("a"), &env, &mut run).unwrap(), json!("a!"));
    assert_eq!(composition.transform(json!("b"), &env, &mut run).unwrap(), json!("b!"));
    assert_eq!(composition.transform(json!("a"), &env, &mut run).unwrap(), json!("a!"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cached_step_keys_on_bound_input() {
    let (calls, step) = shared_step(input::named("n").into(), |deps| deps.input_or_null("n").clone());
    let template = template_composite_from(
        TemplateDescription::new("echo")
            .compose(false)
            .input("n", input::decl(InputSpec::new().accepts_null()))
            .steps(move || vec![step.clone().into()]),
    )
    .unwrap();
    let one = template.instantiate([("n", input::value(1))]).unwrap().compose().unwrap();
    let two = template.instantiate([("n", input::value(2))]).unwrap().compose().unwrap();
    let mut run = GenerationRun::new();

    for _ in 0..2 {
        assert_eq!(one.compute(&Environment::default(), &mut run).unwrap(), json!(1));
        assert_eq!(two.compute(&Environment::default(), &mut run).unwrap(), json!(2));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cached_step_keys_on_static_dependency_name() {
    let (calls, step) = shared_step(input::named("dependency").into(), |deps| {
        json!(deps.static_dependency("dependency"))
    });
    let template = template_composite_from(
        TemplateDescription::new("nameOf")
            .compose(false)
            .input("dependency", input::static_dependency(InputSpec::new().accepts_null()))
            .steps(move || vec![step.clone().into()]),
    )
    .unwrap();
    let a = template.instantiate([("dependency", "a")]).unwrap().compose().unwrap();
    let b = template.instantiate([("dependency", "b")]).unwrap().compose().unwrap();
    let mut run = GenerationRun::new();
    let env = environment([("a", 1), ("b", 1)]);

    assert_eq!(a.compute(&env, &mut run).unwrap(), json!("a"));
    assert_eq!(b.compute(&env, &mut run).unwrap(), json!("b"));
    assert_eq!(a.compute(&env, &mut run).unwrap(), json!("a"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(run.cache().entries_for("shared"), 2);
}

#[test]
fn test_disabled_cache_always_evaluates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let composition = counting_composition(Arc::clone(&calls)).unwrap();
    let mut run = GenerationRun::without_cache();

    composition.compute(&environment([("value", 1)]), &mut run).unwrap();
    composition.compute(&environment([("value", 1)]), &mut run).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(run.cache().is_empty());
}

#[test]
fn test_cache_analysis_counts_reads_and_evaluations() {
    let calls = Arc::new(AtomicUsize::new(0));
    let composition = counting_composition(calls).unwrap();
    let mut run = GenerationRun::new();

    for value in [1, 1, 1, 2] {
        composition.compute(&environment([("value", value)]), &mut run).unwrap();
    }

    let analysis = display_composite_cache_analysis(&run);
    let step = analysis.step("times ten").unwrap();
    assert_eq!(step.evaluations.as_ref().map(|t| t.count), Some(2));
    assert_eq!(step.reads.as_ref().map(|t| t.count), Some(2));
    assert!(analysis.to_string().contains("times ten"));
}

#[test]
fn test_debug_composite_records_events() {
    let composition = double_plus_one()
        .unwrap()
        .instantiate([("n", DEP_COUNT)])
        .unwrap()
        .compose()
        .unwrap();
    let mut run = GenerationRun::new();

    composition.compute(&environment([(DEP_COUNT, 1)]), &mut run).unwrap();
    assert!(run.events().is_empty());

    let value = debug_composite(&mut run, |run| composition.compute(&environment([(DEP_COUNT, 1)]), run))
        .unwrap();
    assert_eq!(value, json!(3));
    assert!(!run.is_tracing());

    let kinds: Vec<&str> = run
        .events()
        .events()
        .iter()
        .map(|e| match &e.kind {
            EventKind::CompositionStarted { .. } => "start",
            EventKind::StepStarted { .. } => "step",
            EventKind::StepFinished { .. } => "done",
            EventKind::CompositionFinished { .. } => "finish",
            EventKind::CompositionFailed { .. } => "failed",
            EventKind::CacheHit { .. } => "hit",
        })
        .collect();
    assert_eq!(kinds, vec!["start", "step", "done", "step", "done", "finish"]);

    let json = run.events().to_json();
    assert_eq!(json[1]["kind"]["inputs"], json!(["n"]));
    assert_eq!(json[3]["kind"]["dependencies"], json!(["#double"]));
    assert_eq!(json[5]["kind"]["directive"], json!("exit"));
}

#[test]
fn test_config_file_drives_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[cache]\nenabled = false\n\n[debug]\ntrace = true").unwrap();

    let config = CompositeConfig::load(file.path()).unwrap();
    let run = GenerationRun::from_config(&config);
    assert!(!run.cache_enabled());
    assert!(run.is_tracing());
}
