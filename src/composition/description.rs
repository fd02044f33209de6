//! Materialized composition descriptions

use indexmap::IndexMap;

use crate::input::{InputToken, UpdateSpec};
use crate::step::StepItem;

/// Everything [`composite_from`](super::composite_from) needs to build a
/// composition.
///
/// Produced by [`TemplateInstance::to_description`](crate::template::TemplateInstance::to_description),
/// or written by hand for a one-off property.
#[derive(Debug, Clone)]
pub struct CompositionDescription {
    pub annotation: Option<String>,
    pub compose: bool,
    pub update: Option<UpdateSpec>,
    /// Input name to the token it was bound to (defaults already applied)
    pub input_mapping: IndexMap<String, InputToken>,
    /// Input name to its declaration
    pub input_descriptions: IndexMap<String, InputToken>,
    /// Internal output name to the name raised to the parent
    pub outputs: IndexMap<String, String>,
    pub steps: Vec<StepItem>,
}

impl Default for CompositionDescription {
    fn default() -> Self {
        Self {
            annotation: None,
            compose: true,
            update: None,
            input_mapping: IndexMap::new(),
            input_descriptions: IndexMap::new(),
            outputs: IndexMap::new(),
            steps: Vec::new(),
        }
    }
}

impl CompositionDescription {
    pub fn new(annotation: impl Into<String>) -> Self {
        Self {
            annotation: Some(annotation.into()),
            ..Self::default()
        }
    }

    pub fn step(mut self, step: impl Into<StepItem>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn compose(mut self, compose: bool) -> Self {
        self.compose = compose;
        self
    }

    pub fn update(mut self, update: UpdateSpec) -> Self {
        self.update = Some(update);
        self
    }

    /// Declare an output, raised under the same name
    pub fn output(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.outputs.insert(name.clone(), name);
        self
    }

    pub fn name(&self) -> &str {
        self.annotation.as_deref().unwrap_or("(anonymous composition)")
    }
}
