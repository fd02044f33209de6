//! `composite_from`: structural checks and flag derivation

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::debug;

use super::description::CompositionDescription;
use super::resolve::resolve_steps;
use crate::error::{CompositeError, ErrorAggregate, Result};
use crate::input::{DependencyRef, InputToken, UpdateSpec};
use crate::step::{Step, StepFlags};

/// A resolved, executable composition.
///
/// Built per use and not cached; only individual step results are
/// memoized, and only when a step opts in.
#[derive(Debug)]
pub struct Composition {
    pub(super) annotation: String,
    pub(super) flags: StepFlags,
    pub(super) update: Option<UpdateSpec>,
    pub(super) steps: Vec<Step>,
    pub(super) input_mapping: IndexMap<String, InputToken>,
    pub(super) input_descriptions: IndexMap<String, InputToken>,
    pub(super) outputs: IndexMap<String, String>,
    pub(super) dependencies: Vec<String>,
    pub(super) dynamic_inputs: Vec<String>,
    pub(super) static_dependencies: IndexMap<String, String>,
}

impl Composition {
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn flags(&self) -> StepFlags {
        self.flags
    }

    /// Merged update description, present iff the composition updates
    pub fn update(&self) -> Option<&UpdateSpec> {
        self.update.as_ref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// External dependency names this composition reads, always with `this`
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Internal output name to raised name
    pub fn outputs(&self) -> &IndexMap<String, String> {
        &self.outputs
    }

    pub fn input_mapping(&self) -> &IndexMap<String, InputToken> {
        &self.input_mapping
    }
}

fn is_external(name: &str) -> bool {
    !name.starts_with('#')
}

/// Build an executable composition from a description.
///
/// Unresolved template instances are resolved first. Structural problems
/// (base step composing inconsistently, non-base steps that don't compose,
/// missing compute/transform, compute steps reading the update value) are
/// aggregated.
pub fn composite_from(description: CompositionDescription) -> Result<Composition> {
    let name = description.name().to_string();
    let CompositionDescription {
        compose,
        update,
        input_mapping,
        input_descriptions,
        outputs,
        steps,
        ..
    } = description;

    let steps = resolve_steps(&name, steps)?;
    validate_steps(&name, compose, &steps)?;

    let any_input_updates = input_mapping
        .values()
        .any(|t| matches!(t, InputToken::UpdateValue(_)));
    let any_step_updates = steps.iter().any(|s| s.flags().update);
    let any_step_reads_update = steps
        .iter()
        .any(|s| matches!(s, Step::Primitive(p) if p.uses_update_value()));

    let flags = StepFlags {
        update: update.is_some() || any_step_updates || any_input_updates || any_step_reads_update,
        expose: steps.iter().any(|s| s.flags().expose),
        compose,
    };

    let merged_update = flags.update.then(|| {
        let mut merged = UpdateSpec::default();
        for step in &steps {
            let step_update = match step {
                Step::Primitive(p) => p.update(),
                Step::Composite(c) => c.update(),
            };
            if let Some(u) = step_update {
                merged.merge(u);
            }
        }
        for token in input_mapping.values() {
            if let InputToken::UpdateValue(Some(u)) = token {
                merged.merge(u);
            }
        }
        if let Some(u) = &update {
            merged.merge(u);
        }
        merged
    });

    let mut dependencies = BTreeSet::from(["this".to_string()]);
    for token in input_mapping.values() {
        if let InputToken::Dependency(dep) = token {
            if is_external(dep) {
                dependencies.insert(dep.clone());
            }
        }
    }
    for step in &steps {
        match step {
            Step::Primitive(p) => {
                for dep in p.dependencies() {
                    if let Some(dep) = dep.dependency_name().filter(|d| is_external(d)) {
                        dependencies.insert(dep.to_string());
                    }
                }
            }
            Step::Composite(c) => dependencies.extend(c.dependencies().iter().cloned()),
        }
    }

    let dynamic_inputs = input_mapping
        .iter()
        .filter(|(input, token)| {
            !matches!(token, InputToken::Value(_))
                && !matches!(input_descriptions.get(*input), Some(InputToken::StaticValue(_)))
        })
        .map(|(input, _)| input.clone())
        .collect();

    let static_dependencies = input_mapping
        .iter()
        .filter_map(|(input, token)| match (input_descriptions.get(input), token) {
            (Some(InputToken::StaticDependency(_)), InputToken::Dependency(dep)) => {
                Some((input.clone(), dep.clone()))
            }
            _ => None,
        })
        .collect();

    debug!(
        composition = %name,
        steps = steps.len(),
        update = flags.update,
        expose = flags.expose,
        compose = flags.compose,
        "built composition"
    );

    Ok(Composition {
        annotation: name,
        flags,
        update: merged_update,
        steps,
        input_mapping,
        input_descriptions,
        outputs,
        dependencies: dependencies.into_iter().collect(),
        dynamic_inputs,
        static_dependencies,
    })
}

fn validate_steps(name: &str, compose: bool, steps: &[Step]) -> Result<()> {
    let mut errors = ErrorAggregate::new();
    let base = steps.len().saturating_sub(1);

    for (i, step) in steps.iter().enumerate() {
        let index = i + 1;
        let flags = step.flags();

        if i == base {
            if compose && !flags.compose {
                errors.push(CompositeError::BaseMustCompose);
            } else if !compose && flags.compose {
                errors.push(CompositeError::BaseMustNotCompose);
            }
        } else if !flags.compose {
            errors.push(CompositeError::StepMustCompose { index });
        }

        let Step::Primitive(primitive) = step else {
            continue;
        };

        if flags.expose && primitive.expose().and_then(|e| e.function.as_ref()).is_none() {
            errors.push(CompositeError::MissingExposeFunction { index });
        }

        if primitive.computes() && primitive.uses_update_value() {
            errors.push(CompositeError::ComputeUsesUpdateValue { index });
        }

        for dep in primitive.dependencies() {
            if let DependencyRef::Token(token) = dep {
                match token {
                    InputToken::Named(_)
                    | InputToken::Dependency(_)
                    | InputToken::Myself
                    | InputToken::UpdateValue(_) => {}
                    other => errors.push(CompositeError::InvalidStepDependency {
                        index,
                        shape: other.shape().to_string(),
                    }),
                }
            }
        }
    }

    errors.into_result(format!("Errors in composition {name}"))
}
