//! Template instances: a template bound to concrete input tokens

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use super::description::{Outputs, StaticInputs, Steps, UpdateSource};
use super::Template;
use crate::composition::{composite_from, resolve_steps, Composition, CompositionDescription};
use crate::error::{CompositeError, ErrorAggregate, Result};
use crate::input::{DependencyRef, InputToken};
use crate::step::StepItem;

const ORDINARY_EXPECTS: &str =
    "a dependency name, input.value(), input.dependency(), input.myself(), input.updateValue() or input(name)";
const STATIC_DEPENDENCY_EXPECTS: &str = "a dependency name or input.dependency()";
const STATIC_VALUE_EXPECTS: &str = "input.value()";

/// Lightweight binding produced by [`Template::instantiate`]
#[derive(Clone)]
pub struct TemplateInstance {
    template: Template,
    bindings: IndexMap<String, DependencyRef>,
    output_mapping: IndexMap<String, String>,
}

impl fmt::Debug for TemplateInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateInstance")
            .field("template", &self.annotation())
            .field("bindings", &self.bindings)
            .field("output_mapping", &self.output_mapping)
            .finish()
    }
}

/// Bind and validate input options against a template's declarations.
///
/// Literal `input.value()` payloads are checked here, once.
pub(super) fn instantiate(
    template: &Template,
    options: IndexMap<String, DependencyRef>,
) -> Result<TemplateInstance> {
    let description = template.description();
    let mut errors = ErrorAggregate::new();

    let unexpected: Vec<String> = options
        .keys()
        .filter(|name| !description.inputs.contains_key(*name))
        .cloned()
        .collect();
    if !unexpected.is_empty() {
        errors.push(CompositeError::UnexpectedInputs { names: unexpected });
    }

    let missing: Vec<String> = description
        .inputs
        .iter()
        .filter(|(name, decl)| {
            !options.contains_key(*name) && decl.spec().is_some_and(|s| s.is_required())
        })
        .map(|(name, _)| name.clone())
        .collect();
    if !missing.is_empty() {
        errors.push(CompositeError::MissingInputs { names: missing });
    }

    for (name, binding) in &options {
        let Some(decl) = description.inputs.get(name) else {
            continue;
        };

        let expected = match decl {
            InputToken::StaticValue(_) => {
                matches!(binding, DependencyRef::Token(InputToken::Value(_)))
                    .then_some(())
                    .ok_or(STATIC_VALUE_EXPECTS)
            }
            InputToken::StaticDependency(_) => binding
                .dependency_name()
                .map(|_| ())
                .ok_or(STATIC_DEPENDENCY_EXPECTS),
            _ => match binding {
                DependencyRef::Name(_)
                | DependencyRef::Token(
                    InputToken::Value(_)
                    | InputToken::Dependency(_)
                    | InputToken::Myself
                    | InputToken::UpdateValue(_)
                    | InputToken::Named(_),
                ) => Ok(()),
                _ => Err(ORDINARY_EXPECTS),
            },
        };

        if let Err(expected) = expected {
            errors.push(CompositeError::InputShapeMismatch {
                input: name.clone(),
                expected,
                actual: binding.describe(),
            });
            continue;
        }

        if let (DependencyRef::Token(InputToken::Value(value)), Some(spec)) = (binding, decl.spec())
        {
            if let Err(reason) = spec.check(value) {
                errors.push(CompositeError::InvalidInputValue {
                    input: name.clone(),
                    reason,
                });
            }
        }
    }

    errors.into_result(format!(
        "Errors in input options passed to {}",
        template.annotation()
    ))?;

    debug!(
        template = template.annotation(),
        inputs = options.len(),
        "instantiated template"
    );

    Ok(TemplateInstance {
        template: template.clone(),
        bindings: options,
        output_mapping: IndexMap::new(),
    })
}

impl TemplateInstance {
    pub fn annotation(&self) -> &str {
        self.template.annotation()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Rename internal outputs: `.outputs([("#availability", "#hasAlbum")])`
    pub fn outputs<K, V>(mut self, mapping: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.output_mapping
            .extend(mapping.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Materialize the final description.
    ///
    /// Unbound inputs take their default value or default dependency,
    /// static inputs are collected for the outputs and update functions,
    /// and declared outputs are mapped to their caller-chosen names.
    pub fn to_description(&self) -> Result<CompositionDescription> {
        let description = self.template.description();
        let mut errors = ErrorAggregate::new();

        let mut input_mapping = IndexMap::new();
        let mut statics = StaticInputs::default();

        for (name, decl) in &description.inputs {
            let token = match self.bindings.get(name) {
                Some(binding) => binding.clone().into_token(),
                None => match decl.spec() {
                    Some(spec) => match (&spec.default_value, &spec.default_dependency) {
                        (Some(value), _) => InputToken::Value(value.clone()),
                        (None, Some(dependency)) => dependency.as_ref().clone().into_token(),
                        (None, None) => continue,
                    },
                    None => continue,
                },
            };

            match (decl, &token) {
                (InputToken::StaticDependency(_), InputToken::Dependency(dependency)) => {
                    statics.insert_dependency(name, dependency)
                }
                (InputToken::StaticValue(_), InputToken::Value(value)) => {
                    statics.insert_value(name, value.clone())
                }
                _ => {}
            }

            input_mapping.insert(name.clone(), token);
        }

        let declared = match &description.outputs {
            None => Vec::new(),
            Some(Outputs::List(list)) => list.clone(),
            Some(Outputs::Computed(f)) => {
                let computed = f(&statics);
                for output in computed.iter().filter(|o| !o.starts_with('#')) {
                    errors.push(CompositeError::OutputNotInternal {
                        output: output.clone(),
                    });
                }
                computed
            }
        };

        let unexpected: Vec<String> = self
            .output_mapping
            .keys()
            .filter(|k| !declared.contains(k))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            errors.push(CompositeError::UnexpectedOutputs { names: unexpected });
        }

        errors.into_result(format!("Errors describing {}", self.annotation()))?;

        let outputs = declared
            .into_iter()
            .map(|internal| {
                let external = self
                    .output_mapping
                    .get(&internal)
                    .cloned()
                    .unwrap_or_else(|| internal.clone());
                (internal, external)
            })
            .collect();

        let update = description.update.as_ref().map(|source| match source {
            UpdateSource::Fixed(spec) => spec.clone(),
            UpdateSource::Computed(f) => f(&statics),
        });

        let steps: Vec<StepItem> = match &description.steps {
            Some(Steps::Factory(factory)) => factory(),
            Some(Steps::Eager(steps)) => steps.clone(),
            None => Vec::new(),
        };

        Ok(CompositionDescription {
            annotation: description.annotation.clone(),
            compose: description.compose,
            update,
            input_mapping,
            input_descriptions: description.inputs.clone(),
            outputs,
            steps,
        })
    }

    /// Describe, then resolve every nested template instance into a
    /// runnable composite step.
    pub fn to_resolved_composition(&self) -> Result<CompositionDescription> {
        let mut description = self.to_description()?;
        let items = std::mem::take(&mut description.steps);
        description.steps = resolve_steps(self.annotation(), items)?
            .into_iter()
            .map(StepItem::Step)
            .collect();
        Ok(description)
    }

    /// Resolve and build the executable composition
    pub fn compose(&self) -> Result<Composition> {
        composite_from(self.to_resolved_composition()?)
    }
}
