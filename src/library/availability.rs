//! Availability checks shared by the control-flow templates

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::Result;
use crate::input::{self, InputSpec, ValueType};
use crate::step::{Continuation, PrimitiveStep};
use crate::template::{template_composite_from, Template, TemplateDescription};

/// Output raised by [`with_result_of_availability_check`]
pub const AVAILABILITY: &str = "#availability";

/// How strictly a value counts as available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AvailabilityMode {
    /// Anything except null
    #[default]
    Null,
    /// Not null, and not an empty array, string or object
    Empty,
    /// Not null, false, zero, an empty string or an empty array
    Falsy,
}

impl AvailabilityMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Empty => "empty",
            Self::Falsy => "falsy",
        }
    }

    pub fn is_available(self, value: &Value) -> bool {
        match self {
            Self::Null => !value.is_null(),
            Self::Empty => match value {
                Value::Null => false,
                Value::Array(items) => !items.is_empty(),
                Value::String(s) => !s.is_empty(),
                Value::Object(map) => !map.is_empty(),
                _ => true,
            },
            Self::Falsy => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(_) => true,
            },
        }
    }
}

impl fmt::Display for AvailabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvailabilityMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "null" => Ok(Self::Null),
            "empty" => Ok(Self::Empty),
            "falsy" => Ok(Self::Falsy),
            other => anyhow::bail!("expected one of null, empty, falsy; got '{other}'"),
        }
    }
}

/// Read a mode from an input value already validated by [`mode_input`]
pub(crate) fn mode_from(value: &Value) -> anyhow::Result<AvailabilityMode> {
    match value {
        Value::Null => Ok(AvailabilityMode::default()),
        Value::String(s) => s.parse(),
        other => anyhow::bail!("availability mode must be a string, got {other}"),
    }
}

/// Declaration of a `mode` input, defaulting to `null`
pub fn mode_input() -> InputSpec {
    InputSpec::new()
        .value_type(ValueType::String)
        .default_value(AvailabilityMode::Null.as_str())
        .validate("is availability mode", |value| mode_from(value).map(|_| ()))
}

/// `#availability`: whether `from` is available under `mode`
pub fn with_result_of_availability_check() -> Result<Template> {
    template_composite_from(
        TemplateDescription::new("withResultOfAvailabilityCheck")
            .input("from", input::decl(InputSpec::new().accepts_null()))
            .input("mode", input::decl(mode_input()))
            .outputs([AVAILABILITY])
            .steps(|| {
                vec![PrimitiveStep::compute(
                    crate::deps![input::named("from"), input::named("mode")],
                    |deps| {
                        let mode = mode_from(deps.input_or_null("mode"))?;
                        let available = mode.is_available(deps.input_or_null("from"));
                        Ok(Continuation::raise_output([(AVAILABILITY, available)]))
                    },
                )
                .into()]
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_modes() {
        let cases = [
            (json!(null), [false, false, false]),
            (json!(0), [true, true, false]),
            (json!(""), [true, false, false]),
            (json!([]), [true, false, false]),
            (json!({}), [true, false, true]),
            (json!(false), [true, true, false]),
            (json!("x"), [true, true, true]),
        ];
        for (value, expected) in cases {
            let got = [
                AvailabilityMode::Null.is_available(&value),
                AvailabilityMode::Empty.is_available(&value),
                AvailabilityMode::Falsy.is_available(&value),
            ];
            assert_eq!(got, expected, "{value}");
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("empty".parse::<AvailabilityMode>().unwrap(), AvailabilityMode::Empty);
        assert!("sometimes".parse::<AvailabilityMode>().is_err());
        assert!(mode_input().check(&json!("falsy")).is_ok());
        assert!(mode_input().check(&json!("never")).is_err());
    }
}
