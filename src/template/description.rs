//! Template descriptions: the static definition a template is built from

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::input::{InputToken, UpdateSpec};
use crate::step::StepItem;

pub type StepsFactory = Arc<dyn Fn() -> Vec<StepItem> + Send + Sync>;
pub type OutputsFn = Arc<dyn Fn(&StaticInputs) -> Vec<String> + Send + Sync>;
pub type UpdateFn = Arc<dyn Fn(&StaticInputs) -> UpdateSpec + Send + Sync>;

/// How a description supplies its steps
#[derive(Clone)]
pub enum Steps {
    /// Deferred, evaluated each time the template is described
    Factory(StepsFactory),
    /// Already-built list (rejected by validation)
    Eager(Vec<StepItem>),
}

/// Declared outputs, literal or derived from static inputs
#[derive(Clone)]
pub enum Outputs {
    List(Vec<String>),
    Computed(OutputsFn),
}

#[derive(Clone)]
pub enum UpdateSource {
    Fixed(UpdateSpec),
    Computed(UpdateFn),
}

/// Values of static inputs, known once a template is instantiated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticInputs {
    dependencies: IndexMap<String, String>,
    values: IndexMap<String, Value>,
}

impl StaticInputs {
    /// Dependency name bound to a static-dependency input
    pub fn dependency(&self, input: &str) -> Option<&str> {
        self.dependencies.get(input).map(String::as_str)
    }

    /// Literal bound to a static-value input
    pub fn value(&self, input: &str) -> Option<&Value> {
        self.values.get(input)
    }

    pub(crate) fn insert_dependency(&mut self, input: &str, dependency: &str) {
        self.dependencies
            .insert(input.to_string(), dependency.to_string());
    }

    pub(crate) fn insert_value(&mut self, input: &str, value: Value) {
        self.values.insert(input.to_string(), value);
    }
}

/// Definition of a template, before validation
#[derive(Clone)]
pub struct TemplateDescription {
    pub annotation: Option<String>,
    pub inputs: IndexMap<String, InputToken>,
    pub outputs: Option<Outputs>,
    pub update: Option<UpdateSource>,
    pub steps: Option<Steps>,
    pub compose: bool,
}

impl Default for TemplateDescription {
    fn default() -> Self {
        Self {
            annotation: None,
            inputs: IndexMap::new(),
            outputs: None,
            update: None,
            steps: None,
            compose: true,
        }
    }
}

impl TemplateDescription {
    pub fn new(annotation: impl Into<String>) -> Self {
        Self {
            annotation: Some(annotation.into()),
            ..Self::default()
        }
    }

    pub fn input(mut self, name: impl Into<String>, token: InputToken) -> Self {
        self.inputs.insert(name.into(), token);
        self
    }

    pub fn outputs<S: Into<String>>(mut self, outputs: impl IntoIterator<Item = S>) -> Self {
        self.outputs = Some(Outputs::List(outputs.into_iter().map(Into::into).collect()));
        self
    }

    pub fn outputs_with(
        mut self,
        f: impl Fn(&StaticInputs) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.outputs = Some(Outputs::Computed(Arc::new(f)));
        self
    }

    pub fn update(mut self, update: UpdateSpec) -> Self {
        self.update = Some(UpdateSource::Fixed(update));
        self
    }

    pub fn update_with(
        mut self,
        f: impl Fn(&StaticInputs) -> UpdateSpec + Send + Sync + 'static,
    ) -> Self {
        self.update = Some(UpdateSource::Computed(Arc::new(f)));
        self
    }

    pub fn steps(mut self, factory: impl Fn() -> Vec<StepItem> + Send + Sync + 'static) -> Self {
        self.steps = Some(Steps::Factory(Arc::new(factory)));
        self
    }

    pub fn eager_steps(mut self, steps: Vec<StepItem>) -> Self {
        self.steps = Some(Steps::Eager(steps));
        self
    }

    pub fn compose(mut self, compose: bool) -> Self {
        self.compose = compose;
        self
    }

    pub fn name(&self) -> &str {
        self.annotation.as_deref().unwrap_or("(anonymous template)")
    }
}

impl fmt::Debug for TemplateDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDescription")
            .field("annotation", &self.annotation)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("compose", &self.compose)
            .finish_non_exhaustive()
    }
}
