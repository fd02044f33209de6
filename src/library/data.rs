//! Data-shaping templates

use serde_json::Value;

use crate::error::Result;
use crate::input::{self, InputSpec, ValueType};
use crate::step::{Continuation, PrimitiveStep};
use crate::template::{template_composite_from, Template, TemplateDescription};

/// `#object.property` for a bound object dependency, `#value` when unbound
fn property_output(source: Option<&str>, property: Option<&str>) -> String {
    match (source, property) {
        (Some(source), Some(property)) => {
            format!("#{}.{}", source.trim_start_matches('#'), property)
        }
        _ => "#value".to_string(),
    }
}

/// Raise `#object.property` read from an object dependency
pub fn with_property_from_object() -> Result<Template> {
    template_composite_from(
        TemplateDescription::new("withPropertyFromObject")
            .input(
                "object",
                input::static_dependency(InputSpec::new().value_type(ValueType::Object).accepts_null()),
            )
            .input("property", input::static_value(InputSpec::new().value_type(ValueType::String)))
            .outputs_with(|statics| {
                vec![property_output(
                    statics.dependency("object"),
                    statics.value("property").and_then(Value::as_str),
                )]
            })
            .steps(|| {
                vec![PrimitiveStep::compute(
                    crate::deps![input::named("object"), input::named("property")],
                    |deps| {
                        let property = deps.input_or_null("property").as_str();
                        let output = property_output(deps.static_dependency("object"), property);
                        let value = match (deps.input_or_null("object"), property) {
                            (Value::Object(object), Some(property)) => {
                                object.get(property).cloned().unwrap_or(Value::Null)
                            }
                            _ => Value::Null,
                        };
                        Ok(Continuation::raise_output([(output, value)]))
                    },
                )
                .into()]
            }),
    )
}

/// Raise `#list.property`: `property` read from each object in a list.
///
/// Items that aren't objects (or lack the property) map to null.
pub fn with_property_from_list() -> Result<Template> {
    template_composite_from(
        TemplateDescription::new("withPropertyFromList")
            .input(
                "list",
                input::static_dependency(InputSpec::new().value_type(ValueType::Array).accepts_null()),
            )
            .input("property", input::static_value(InputSpec::new().value_type(ValueType::String)))
            .outputs_with(|statics| {
                vec![property_output(
                    statics.dependency("list"),
                    statics.value("property").and_then(Value::as_str),
                )]
            })
            .steps(|| {
                vec![PrimitiveStep::compute(
                    crate::deps![input::named("list"), input::named("property")],
                    |deps| {
                        let property = deps.input_or_null("property").as_str();
                        let output = property_output(deps.static_dependency("list"), property);
                        let value = match (deps.input_or_null("list"), property) {
                            (Value::Array(items), Some(property)) => Value::Array(
                                items
                                    .iter()
                                    .map(|item| item.get(property).cloned().unwrap_or(Value::Null))
                                    .collect(),
                            ),
                            _ => Value::Null,
                        };
                        Ok(Continuation::raise_output([(output, value)]))
                    },
                )
                .into()]
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_output_names() {
        assert_eq!(property_output(Some("album"), Some("name")), "#album.name");
        assert_eq!(property_output(Some("#track"), Some("artist")), "#track.artist");
        assert_eq!(property_output(None, Some("name")), "#value");
    }
}
