//! Templates: named, parameterized composition definitions
//!
//! ```text
//! TemplateDescription ──template_composite_from──▶ Template
//!                                                     │ instantiate(options)
//!                                                     ▼
//!                                             TemplateInstance
//!                                   │ to_description / to_resolved_composition
//!                                   ▼
//!                           CompositionDescription ──composite_from──▶ Composition
//! ```

mod description;
mod instance;
mod validate;

use std::sync::Arc;

use indexmap::IndexMap;

pub use description::{
    Outputs, OutputsFn, StaticInputs, Steps, StepsFactory, TemplateDescription, UpdateFn,
    UpdateSource,
};
pub use instance::TemplateInstance;
pub use validate::validate_description;

use crate::error::Result;
use crate::input::DependencyRef;

/// A validated, immutable template definition.
///
/// Cloning is cheap; instances share the description.
#[derive(Debug, Clone)]
pub struct Template {
    description: Arc<TemplateDescription>,
}

/// Validate a description and turn it into a template
pub fn template_composite_from(description: TemplateDescription) -> Result<Template> {
    validate_description(&description)?;
    Ok(Template {
        description: Arc::new(description),
    })
}

impl Template {
    pub fn annotation(&self) -> &str {
        self.description.name()
    }

    pub fn description(&self) -> &TemplateDescription {
        &self.description
    }

    /// Bind input options: `template.instantiate([("from", input::myself())])`
    pub fn instantiate<K, V>(
        &self,
        options: impl IntoIterator<Item = (K, V)>,
    ) -> Result<TemplateInstance>
    where
        K: Into<String>,
        V: Into<DependencyRef>,
    {
        let options: IndexMap<String, DependencyRef> = options
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        instance::instantiate(self, options)
    }

    /// Instantiate with no input options
    pub fn with_defaults(&self) -> Result<TemplateInstance> {
        instance::instantiate(self, IndexMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{self, InputSpec, InputToken, ValueType};
    use crate::step::{Continuation, PrimitiveStep};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn adder() -> Template {
        template_composite_from(
            TemplateDescription::new("add")
                .input("n", input::decl(InputSpec::new().value_type(ValueType::Number)))
                .input("by", input::decl(InputSpec::new().default_value(1)))
                .input(
                    "label",
                    input::static_value(InputSpec::new().value_type(ValueType::String).default_value("sum")),
                )
                .outputs(["#sum"])
                .steps(|| {
                    vec![PrimitiveStep::compute(
                        crate::deps![input::named("n"), input::named("by")],
                        |deps| {
                            let n = deps.input_or_null("n").as_i64().unwrap_or(0);
                            let by = deps.input_or_null("by").as_i64().unwrap_or(0);
                            Ok(Continuation::raise_output([("#sum", n + by)]))
                        },
                    )
                    .into()]
                }),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_required_input() {
        let err = adder().with_defaults().unwrap_err();
        let text = err.related()[0].to_string();
        assert!(text.contains("Required these inputs: n"), "{text}");
        assert!(err.to_string().contains("Errors in input options passed to add"));
    }

    #[test]
    fn test_unexpected_and_missing_reported_together() {
        let err = adder().instantiate([("zzz", "x")]).unwrap_err();
        let codes: Vec<_> = err.related().iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec!["COMP-020", "COMP-021"]);
    }

    #[test]
    fn test_static_value_requires_literal() {
        let err = adder()
            .instantiate([
                ("n", DependencyRef::from("count")),
                ("label", DependencyRef::from("someName")),
            ])
            .unwrap_err();
        assert_eq!(err.related()[0].code(), "COMP-022");
    }

    #[test]
    fn test_literal_checked_at_instantiation() {
        let err = adder().instantiate([("n", input::value("five"))]).unwrap_err();
        assert_eq!(err.related()[0].code(), "COMP-023");
        assert!(err.related()[0].to_string().contains("Expected number"));
    }

    #[test]
    fn test_dependency_binding_not_checked_at_instantiation() {
        assert!(adder().instantiate([("n", input::dependency("count"))]).is_ok());
    }

    #[test]
    fn test_description_fills_defaults_and_maps_outputs() {
        let description = adder()
            .instantiate([("n", "count")])
            .unwrap()
            .outputs([("#sum", "#total")])
            .to_description()
            .unwrap();

        assert_eq!(
            description.input_mapping.get("n"),
            Some(&InputToken::Dependency("count".into()))
        );
        assert_eq!(description.input_mapping.get("by"), Some(&input::value(1)));
        assert_eq!(description.input_mapping.get("label"), Some(&input::value(json!("sum"))));
        assert_eq!(description.outputs.get("#sum"), Some(&"#total".to_string()));
    }

    #[test]
    fn test_unknown_output_rename_rejected() {
        let err = adder()
            .instantiate([("n", "count")])
            .unwrap()
            .outputs([("#nope", "#x")])
            .to_description()
            .unwrap_err();
        assert!(err.has_code("COMP-024"));
    }

    #[test]
    fn test_steps_factory_runs_per_description() {
        let instance = adder().instantiate([("n", "count")]).unwrap();
        let a = instance.to_description().unwrap();
        let b = instance.to_description().unwrap();
        assert_eq!(a.steps.len(), 1);
        assert_eq!(b.steps.len(), 1);
    }
}
