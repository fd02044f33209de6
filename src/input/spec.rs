//! Input constraints and update descriptions
//!
//! An [`InputSpec`] is the payload of an input declaration: defaults,
//! nullability, an expected JSON type and an optional predicate.
//! An [`UpdateSpec`] describes how a value flowing through an updating
//! composition is validated.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::token::DependencyRef;

// ═══════════════════════════════════════════════════════════════
// VALIDATOR
// ═══════════════════════════════════════════════════════════════

type CheckFn = dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync;

/// Named predicate over a value.
///
/// Two validators are equal only if they share the same closure.
#[derive(Clone)]
pub struct Validator {
    name: Arc<str>,
    check: Arc<CheckFn>,
}

impl Validator {
    pub fn new(
        name: impl Into<Arc<str>>,
        check: impl Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &Value) -> anyhow::Result<()> {
        (self.check)(value)
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.check, &other.check)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.name)
    }
}

// ═══════════════════════════════════════════════════════════════
// VALUE TYPES
// ═══════════════════════════════════════════════════════════════

/// JSON type an input may be constrained to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short description of a value's type for error messages
pub fn type_appearance(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) if s.chars().count() > 24 => {
            format!("string \"{}...\"", s.chars().take(24).collect::<String>())
        }
        Value::String(s) => format!("string \"{s}\""),
        Value::Array(a) => format!("array of {} items", a.len()),
        Value::Object(o) => format!("object with {} keys", o.len()),
    }
}

// ═══════════════════════════════════════════════════════════════
// INPUT SPEC
// ═══════════════════════════════════════════════════════════════

/// Constraints carried by an input declaration.
///
/// An input with neither `default_value` nor `default_dependency` is
/// required when the template is instantiated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSpec {
    pub default_value: Option<Value>,
    pub default_dependency: Option<Box<DependencyRef>>,
    pub value_type: Option<ValueType>,
    pub accepts_null: bool,
    pub validate: Option<Validator>,
}

impl InputSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn default_dependency(mut self, dependency: impl Into<DependencyRef>) -> Self {
        self.default_dependency = Some(Box::new(dependency.into()));
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn accepts_null(mut self) -> Self {
        self.accepts_null = true;
        self
    }

    pub fn validate(
        mut self,
        name: impl Into<Arc<str>>,
        check: impl Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Validator::new(name, check));
        self
    }

    pub fn is_required(&self) -> bool {
        self.default_value.is_none() && self.default_dependency.is_none()
    }

    /// Check a concrete value against these constraints.
    ///
    /// Null passes only when the input accepts null or defaults to null.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            if self.accepts_null || matches!(self.default_value, Some(Value::Null)) {
                return Ok(());
            }
            return Err(match self.value_type {
                Some(t) => format!("Expected {t}, got null"),
                None => "Expected a value, got null".to_string(),
            });
        }

        if let Some(t) = self.value_type {
            if !t.matches(value) {
                return Err(format!("Expected {t}, got {}", type_appearance(value)));
            }
        }

        if let Some(validator) = &self.validate {
            validator
                .check(value)
                .map_err(|e| format!("{} rejected value: {e:#}", validator.name()))?;
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
// UPDATE SPEC
// ═══════════════════════════════════════════════════════════════

/// Validation for a value entering an updating composition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    pub validate: Option<Validator>,
    pub default: Option<Value>,
}

impl UpdateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(
        mut self,
        name: impl Into<Arc<str>>,
        check: impl Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Validator::new(name, check));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Overlay `other` onto this spec; fields set in `other` win.
    pub fn merge(&mut self, other: &UpdateSpec) {
        if other.validate.is_some() {
            self.validate.clone_from(&other.validate);
        }
        if other.default.is_some() {
            self.default.clone_from(&other.default);
        }
    }

    pub fn check(&self, value: &Value) -> anyhow::Result<()> {
        match &self.validate {
            Some(validator) => validator.check(value),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_without_defaults() {
        assert!(InputSpec::new().is_required());
        assert!(!InputSpec::new().default_value(1).is_required());
        assert!(!InputSpec::new().default_dependency("name").is_required());
    }

    #[test]
    fn test_null_handling() {
        let spec = InputSpec::new().value_type(ValueType::Number);
        assert_eq!(spec.check(&Value::Null).unwrap_err(), "Expected number, got null");
        assert!(spec.clone().accepts_null().check(&Value::Null).is_ok());
        assert!(InputSpec::new().default_value(Value::Null).check(&Value::Null).is_ok());
    }

    #[test]
    fn test_type_mismatch_message() {
        let spec = InputSpec::new().value_type(ValueType::Array);
        let err = spec.check(&json!("abc")).unwrap_err();
        assert_eq!(err, "Expected array, got string \"abc\"");
    }

    #[test]
    fn test_predicate_runs_after_type() {
        let spec = InputSpec::new()
            .value_type(ValueType::Number)
            .validate("isPositive", |v| {
                anyhow::ensure!(v.as_f64().unwrap_or(0.0) > 0.0, "must be positive");
                Ok(())
            });
        assert!(spec.check(&json!(3)).is_ok());
        let err = spec.check(&json!(-1)).unwrap_err();
        assert!(err.contains("isPositive"));
        assert!(err.contains("must be positive"));
    }

    #[test]
    fn test_update_spec_merge_prefers_later() {
        let mut base = UpdateSpec::new().default_value(1);
        base.merge(&UpdateSpec::new().default_value(2));
        assert_eq!(base.default, Some(json!(2)));

        let keep = UpdateSpec::new().validate("any", |_| Ok(()));
        let mut merged = keep.clone();
        merged.merge(&UpdateSpec::new());
        assert_eq!(merged.validate, keep.validate);
    }

    #[test]
    fn test_validator_equality_is_identity() {
        let a = Validator::new("a", |_| Ok(()));
        let b = Validator::new("a", |_| Ok(()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
