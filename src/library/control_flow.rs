//! Control-flow templates: expose, exit early or raise early

use serde_json::{Map, Value};

use super::availability::{mode_input, with_result_of_availability_check, AVAILABILITY};
use crate::error::Result;
use crate::input::{self, InputSpec, ValueType};
use crate::step::{Continuation, Deps, PrimitiveStep};
use crate::template::{template_composite_from, Template, TemplateDescription, TemplateInstance};

fn availability_of(from: input::InputToken) -> Result<TemplateInstance> {
    with_result_of_availability_check()?
        .instantiate([("from", from), ("mode", input::named("mode"))])
}

fn is_available(deps: &Deps) -> bool {
    deps.get(AVAILABILITY).and_then(Value::as_bool).unwrap_or(false)
}

/// Expose a dependency as the property value
pub fn expose_dependency() -> Result<Template> {
    template_composite_from(
        TemplateDescription::new("exposeDependency")
            .compose(false)
            .input(
                "dependency",
                input::static_dependency(InputSpec::new().accepts_null()),
            )
            .steps(|| {
                vec![PrimitiveStep::compute(crate::deps![input::named("dependency")], |deps| {
                    Ok(Continuation::exit(deps.input_or_null("dependency").clone()))
                })
                .terminal()
                .into()]
            }),
    )
}

/// Expose a literal as the property value
pub fn expose_constant() -> Result<Template> {
    template_composite_from(
        TemplateDescription::new("exposeConstant")
            .compose(false)
            .input("value", input::static_value(InputSpec::new().accepts_null()))
            .steps(|| {
                vec![PrimitiveStep::compute(crate::deps![input::named("value")], |deps| {
                    Ok(Continuation::exit(deps.input_or_null("value").clone()))
                })
                .terminal()
                .into()]
            }),
    )
}

/// Exit with `dependency` when it's available, otherwise continue
pub fn expose_dependency_or_continue() -> Result<Template> {
    let check = availability_of(input::named("dependency"))?;
    template_composite_from(
        TemplateDescription::new("exposeDependencyOrContinue")
            .input("dependency", input::decl(InputSpec::new().accepts_null()))
            .input("mode", input::decl(mode_input()))
            .steps(move || {
                vec![
                    check.clone().into(),
                    PrimitiveStep::compute([AVAILABILITY], |deps| {
                        Ok(if is_available(deps) {
                            Continuation::proceed()
                        } else {
                            Continuation::raise_output(Map::new())
                        })
                    })
                    .into(),
                    PrimitiveStep::compute(crate::deps![input::named("dependency")], |deps| {
                        Ok(Continuation::exit(deps.input_or_null("dependency").clone()))
                    })
                    .into(),
                ]
            }),
    )
}

/// Exit with the update value when it's available, otherwise continue
pub fn expose_update_value_or_continue() -> Result<Template> {
    let check = availability_of(input::update_value())?;
    template_composite_from(
        TemplateDescription::new("exposeUpdateValueOrContinue")
            .input("mode", input::decl(mode_input()))
            .steps(move || {
                vec![
                    check.clone().into(),
                    PrimitiveStep::compute([AVAILABILITY], |deps| {
                        Ok(if is_available(deps) {
                            Continuation::proceed()
                        } else {
                            Continuation::raise_output(Map::new())
                        })
                    })
                    .into(),
                    PrimitiveStep::transform(Vec::<input::DependencyRef>::new(), |value, _| {
                        Ok(Continuation::exit(value.clone()))
                    })
                    .into(),
                ]
            }),
    )
}

/// Exit with `value` (default null) when `dependency` is unavailable
pub fn exit_without_dependency() -> Result<Template> {
    let check = availability_of(input::named("dependency"))?;
    template_composite_from(
        TemplateDescription::new("exitWithoutDependency")
            .input("dependency", input::decl(InputSpec::new().accepts_null()))
            .input("mode", input::decl(mode_input()))
            .input("value", input::static_value(InputSpec::new().default_value(Value::Null)))
            .steps(move || {
                vec![
                    check.clone().into(),
                    PrimitiveStep::compute(crate::deps![AVAILABILITY, input::named("value")], |deps| {
                        Ok(if is_available(deps) {
                            Continuation::proceed()
                        } else {
                            Continuation::exit(deps.input_or_null("value").clone())
                        })
                    })
                    .into(),
                ]
            }),
    )
}

/// End the enclosing composition early, raising `output`, when
/// `dependency` is unavailable
pub fn raise_output_without_dependency() -> Result<Template> {
    let check = availability_of(input::named("dependency"))?;
    template_composite_from(
        TemplateDescription::new("raiseOutputWithoutDependency")
            .input("dependency", input::decl(InputSpec::new().accepts_null()))
            .input("mode", input::decl(mode_input()))
            .input(
                "output",
                input::static_value(
                    InputSpec::new()
                        .value_type(ValueType::Object)
                        .default_value(Value::Object(Map::new())),
                ),
            )
            .outputs_with(|statics| {
                statics
                    .value("output")
                    .and_then(Value::as_object)
                    .map(|output| output.keys().cloned().collect())
                    .unwrap_or_default()
            })
            .steps(move || {
                vec![
                    check.clone().into(),
                    PrimitiveStep::compute(crate::deps![AVAILABILITY, input::named("output")], |deps| {
                        if is_available(deps) {
                            return Ok(Continuation::proceed());
                        }
                        let output = deps
                            .input_or_null("output")
                            .as_object()
                            .cloned()
                            .unwrap_or_default();
                        Ok(Continuation::RaiseOutputAbove(output))
                    })
                    .into(),
                ]
            }),
    )
}
