//! Execution engine
//!
//! Steps run strictly in order. Each sees the environment built by the
//! steps before it, filtered down to the dependencies it declared.

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;

use super::compose::Composition;
use crate::error::{CompositeError, ErrorAggregate, Result};
use crate::input::{DependencyRef, InputToken};
use crate::runtime::GenerationRun;
use crate::step::{CacheMode, Continuation, Deps, Environment, ExposeFn, PrimitiveStep, Provided, Step};

/// What a caller sees once a composition has finished
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A non-composing composition exited with this value
    Exposed(Value),
    /// A composing composition raised these outputs
    Outputs {
        outputs: Provided,
        value: Option<Value>,
    },
}

/// Everything a composition may read from whatever invoked it
pub(crate) struct Scope<'a> {
    pub env: &'a Environment,
    pub inputs: &'a FxHashMap<String, Value>,
    pub value: Option<&'a Value>,
}

impl Composition {
    /// Compute the exposed value for a read-only composition.
    ///
    /// Composing compositions return their raised outputs as an object.
    pub fn compute(&self, env: &Environment, run: &mut GenerationRun) -> Result<Value> {
        if self.flags.update {
            return Err(CompositeError::WrongEntryPoint {
                composition: self.annotation.clone(),
                expected: "transform()",
            });
        }
        if !self.flags.expose {
            return Err(CompositeError::NotExposed {
                composition: self.annotation.clone(),
            });
        }
        match self.run(None, env, run)? {
            Outcome::Exposed(value) => Ok(value),
            Outcome::Outputs { outputs, .. } => Ok(Value::Object(outputs)),
        }
    }

    /// Transform an update value through an updating composition
    pub fn transform(
        &self,
        value: Value,
        env: &Environment,
        run: &mut GenerationRun,
    ) -> Result<Value> {
        if !self.flags.update {
            return Err(CompositeError::WrongEntryPoint {
                composition: self.annotation.clone(),
                expected: "compute()",
            });
        }
        if !self.flags.expose {
            return Ok(value);
        }
        match self.run(Some(value), env, run)? {
            Outcome::Exposed(value) => Ok(value),
            Outcome::Outputs { value, .. } => Ok(value.unwrap_or(Value::Null)),
        }
    }

    /// Run as the outermost composition.
    ///
    /// Exit is only legal here when the composition does not compose.
    pub fn run(
        &self,
        value: Option<Value>,
        env: &Environment,
        run: &mut GenerationRun,
    ) -> Result<Outcome> {
        let inputs = FxHashMap::default();
        let scope = Scope {
            env,
            inputs: &inputs,
            value: value.as_ref(),
        };

        match self.execute(&scope, run)? {
            Continuation::Exit(_) if self.flags.compose => {
                Err(CompositeError::ExitFromComposingComposition {
                    composition: self.annotation.clone(),
                })
            }
            Continuation::Exit(value) => Ok(Outcome::Exposed(value)),
            Continuation::Continue { dependencies, value } => Ok(Outcome::Outputs {
                outputs: dependencies,
                value,
            }),
            Continuation::RaiseOutput(_) | Continuation::RaiseOutputAbove(_) => {
                Err(CompositeError::RaiseAboveWithoutParent {
                    composition: self.annotation.clone(),
                })
            }
        }
    }

    /// Run against a parent scope.
    ///
    /// Returns `Continue` with mapped outputs when this composition raised,
    /// `RaiseOutput` when it raised above (the parent raises those), or
    /// `Exit` to unwind to the outermost composition.
    pub(crate) fn execute(&self, scope: &Scope<'_>, run: &mut GenerationRun) -> Result<Continuation> {
        run.enter_composition(&self.annotation);
        let result = self.execute_steps(scope, run);
        run.leave_composition(&self.annotation, &result);
        result.map_err(|e| CompositeError::composition_failed(&self.annotation, e))
    }

    fn execute_steps(&self, scope: &Scope<'_>, run: &mut GenerationRun) -> Result<Continuation> {
        let inputs = self.resolve_inputs(scope)?;

        let mut env: Environment = self
            .dependencies
            .iter()
            .filter_map(|name| scope.env.get(name).map(|v| (name.clone(), v.clone())))
            .collect();
        let mut value = if self.flags.update {
            scope.value.cloned()
        } else {
            None
        };

        let base = self.steps.len().saturating_sub(1);
        for (i, step) in self.steps.iter().enumerate() {
            let continuation = {
                let step_scope = Scope {
                    env: &env,
                    inputs: &inputs,
                    value: value.as_ref(),
                };
                match step {
                    Step::Primitive(primitive) => self.run_primitive(i, primitive, &step_scope, run)?,
                    Step::Composite(child) => child.execute(&step_scope, run)?,
                }
            };
            run.step_finished(&self.annotation, i + 1, continuation.directive());

            match continuation {
                Continuation::Continue {
                    dependencies,
                    value: next,
                } => {
                    if self.flags.update && next.is_some() {
                        value = next;
                    }
                    env.extend(dependencies);
                    if i == base {
                        return Ok(self.finish(&env, value, run));
                    }
                }
                Continuation::Exit(exit_value) => return Ok(Continuation::Exit(exit_value)),
                Continuation::RaiseOutput(raised) => {
                    env.extend(raised);
                    return Ok(Continuation::Continue {
                        dependencies: self.map_outputs(&env, run),
                        value,
                    });
                }
                Continuation::RaiseOutputAbove(raised) => return Ok(Continuation::RaiseOutput(raised)),
            }
        }

        Ok(self.finish(&env, value, run))
    }

    /// The base step continued: raise if nestable, otherwise exit
    fn finish(&self, env: &Environment, value: Option<Value>, run: &GenerationRun) -> Continuation {
        if self.flags.compose {
            Continuation::Continue {
                dependencies: self.map_outputs(env, run),
                value,
            }
        } else {
            Continuation::Exit(value.unwrap_or(Value::Null))
        }
    }

    /// Map the environment onto declared outputs.
    ///
    /// A declared `#name` missing from the environment falls back to `name`.
    /// Outputs missing under both names raise as null.
    fn map_outputs(&self, env: &Environment, run: &GenerationRun) -> Provided {
        self.outputs
            .iter()
            .map(|(internal, external)| {
                let value = match env.get(internal) {
                    Some(value) => value.clone(),
                    None => match internal.strip_prefix('#').and_then(|bare| env.get(bare)) {
                        Some(value) => {
                            run.output_fallback(&self.annotation, internal);
                            value.clone()
                        }
                        None => Value::Null,
                    },
                };
                (external.clone(), value)
            })
            .collect()
    }

    /// Resolve input tokens against the invoking scope and revalidate the
    /// dynamic ones
    fn resolve_inputs(&self, scope: &Scope<'_>) -> Result<FxHashMap<String, Value>> {
        let mut values = FxHashMap::default();
        let mut errors = ErrorAggregate::new();

        for (name, token) in &self.input_mapping {
            let value = match token {
                InputToken::Value(value) => value.clone(),
                InputToken::Dependency(dep) => scope.env.get(dep).cloned().unwrap_or(Value::Null),
                InputToken::Named(input) => scope.inputs.get(input).cloned().unwrap_or(Value::Null),
                InputToken::Myself => scope.env.get("this").cloned().unwrap_or(Value::Null),
                InputToken::UpdateValue(_) => match scope.value {
                    Some(value) => value.clone(),
                    None => {
                        return Err(CompositeError::UpdateValueUnavailable {
                            composition: self.annotation.clone(),
                        })
                    }
                },
                InputToken::Input(_) | InputToken::StaticDependency(_) | InputToken::StaticValue(_) => {
                    Value::Null
                }
            };

            if self.dynamic_inputs.contains(name) {
                if let Some(spec) = self.input_descriptions.get(name).and_then(InputToken::spec) {
                    if let Err(reason) = spec.check(&value) {
                        errors.push(CompositeError::DynamicInputInvalid {
                            input: name.clone(),
                            reason,
                        });
                    }
                }
            }

            values.insert(name.clone(), value);
        }

        errors.into_result(format!("Errors in input values provided to {}", self.annotation))?;
        Ok(values)
    }

    fn run_primitive(
        &self,
        index: usize,
        step: &PrimitiveStep,
        scope: &Scope<'_>,
        run: &mut GenerationRun,
    ) -> Result<Continuation> {
        let Some(function) = step.expose().and_then(|e| e.function.as_ref()) else {
            return Ok(Continuation::proceed());
        };

        let deps = self.filter_dependencies(index, step.dependencies(), scope)?;
        let annotation = step
            .annotation()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#{}", self.annotation, index + 1));
        run.step_started(&self.annotation, index + 1, &annotation, &deps);

        let working = scope.value.cloned().unwrap_or(Value::Null);
        let invoke = || match function {
            ExposeFn::Compute(f) => f(&deps),
            ExposeFn::Transform(f) => f(&working, &deps),
        };

        let result = if step.cache_mode() == CacheMode::Aggressive && run.cache_enabled() {
            let mut args = Vec::new();
            if matches!(function, ExposeFn::Transform(_)) {
                args.push(working.clone());
            }
            args.extend(deps.flatten());
            run.cached(step.id(), &annotation, args, invoke)
        } else {
            invoke()
        };

        result.map_err(|source| CompositeError::StepFailed {
            index: index + 1,
            annotation,
            source,
        })
    }

    /// Least access: a step only ever sees what it declared
    fn filter_dependencies(
        &self,
        index: usize,
        declared: &[DependencyRef],
        scope: &Scope<'_>,
    ) -> Result<Deps> {
        let mut deps = Deps::new();

        for dependency in declared {
            match dependency {
                DependencyRef::Name(name) | DependencyRef::Token(InputToken::Dependency(name)) => {
                    if let Some(value) = scope.env.get(name) {
                        deps.insert_name(name, value.clone());
                    }
                }
                DependencyRef::Token(InputToken::Named(input)) => {
                    let value = scope.inputs.get(input).cloned().unwrap_or(Value::Null);
                    deps.insert_input(input, value);
                    if let Some(bound) = self.static_dependencies.get(input) {
                        deps.insert_static_name(input, bound);
                    }
                }
                DependencyRef::Token(InputToken::Myself) => {
                    let this = scope.env.get("this").cloned().unwrap_or(Value::Null);
                    deps.insert_name("this", this);
                }
                DependencyRef::Token(InputToken::UpdateValue(_)) => match scope.value {
                    Some(value) => deps.set_update_value(value.clone()),
                    None => {
                        return Err(CompositeError::UpdateValueUnavailable {
                            composition: self.annotation.clone(),
                        })
                    }
                },
                DependencyRef::Token(other) => {
                    return Err(CompositeError::InvalidStepDependency {
                        index: index + 1,
                        shape: other.shape().to_string(),
                    })
                }
            }
        }

        trace!(
            composition = %self.annotation,
            step = index + 1,
            available = scope.env.len(),
            visible = ?deps.names().collect::<Vec<_>>(),
            "filtered dependencies"
        );
        Ok(deps)
    }
}
