//! Input tokens: how a parameter receives its data

use std::fmt;

use serde_json::Value;

use super::spec::{InputSpec, UpdateSpec};
use crate::error::{CompositeError, Result};

/// Tagged descriptor of how a template input or step dependency is fed.
///
/// The first three variants declare inputs on a template description.
/// The rest bind (or reference) concrete data.
#[derive(Debug, Clone, PartialEq)]
pub enum InputToken {
    /// Ordinary input declaration, resolved per call
    Input(InputSpec),
    /// Declaration of an input bound to a dependency name at instantiation
    StaticDependency(InputSpec),
    /// Declaration of an input bound to a literal at instantiation
    StaticValue(InputSpec),
    /// Reads the named input of the enclosing template
    Named(String),
    /// Literal value
    Value(Value),
    /// Reads a dependency from the environment
    Dependency(String),
    /// The record being computed (`this`)
    Myself,
    /// The value currently flowing through an update, with extra validation
    UpdateValue(Option<UpdateSpec>),
}

/// Shape tag of an [`InputToken`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputShape {
    Input,
    StaticDependency,
    StaticValue,
    Named,
    Value,
    Dependency,
    Myself,
    UpdateValue,
}

impl InputShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::StaticDependency => "input.staticDependency",
            Self::StaticValue => "input.staticValue",
            Self::Named => "input(name)",
            Self::Value => "input.value",
            Self::Dependency => "input.dependency",
            Self::Myself => "input.myself",
            Self::UpdateValue => "input.updateValue",
        }
    }

    /// Shapes that may appear in a template's `inputs` table
    pub fn is_declaration(self) -> bool {
        matches!(self, Self::Input | Self::StaticDependency | Self::StaticValue)
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload carried by a token, borrowed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenPayload<'a> {
    Spec(&'a InputSpec),
    Name(&'a str),
    Value(&'a Value),
    Update(Option<&'a UpdateSpec>),
    None,
}

impl InputToken {
    pub fn shape(&self) -> InputShape {
        match self {
            Self::Input(_) => InputShape::Input,
            Self::StaticDependency(_) => InputShape::StaticDependency,
            Self::StaticValue(_) => InputShape::StaticValue,
            Self::Named(_) => InputShape::Named,
            Self::Value(_) => InputShape::Value,
            Self::Dependency(_) => InputShape::Dependency,
            Self::Myself => InputShape::Myself,
            Self::UpdateValue(_) => InputShape::UpdateValue,
        }
    }

    pub fn payload(&self) -> TokenPayload<'_> {
        match self {
            Self::Input(spec) | Self::StaticDependency(spec) | Self::StaticValue(spec) => {
                TokenPayload::Spec(spec)
            }
            Self::Named(name) | Self::Dependency(name) => TokenPayload::Name(name),
            Self::Value(value) => TokenPayload::Value(value),
            Self::UpdateValue(update) => TokenPayload::Update(update.as_ref()),
            Self::Myself => TokenPayload::None,
        }
    }

    /// Constraints of a declaration token
    pub fn spec(&self) -> Option<&InputSpec> {
        match self {
            Self::Input(spec) | Self::StaticDependency(spec) | Self::StaticValue(spec) => Some(spec),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// DEPENDENCY REFERENCES
// ═══════════════════════════════════════════════════════════════

/// A plain dependency name or an input token.
///
/// Plain names are shorthand for [`InputToken::Dependency`] wherever a
/// token is accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyRef {
    Name(String),
    Token(InputToken),
}

impl DependencyRef {
    pub fn is_input_token(&self) -> bool {
        matches!(self, Self::Token(_))
    }

    /// Shape of the wrapped token; plain names are not tokens
    pub fn shape(&self) -> Result<InputShape> {
        self.token().map(InputToken::shape)
    }

    pub fn token(&self) -> Result<&InputToken> {
        match self {
            Self::Token(token) => Ok(token),
            Self::Name(name) => Err(CompositeError::NotAnInputToken { name: name.clone() }),
        }
    }

    /// Dependency name for names and `input.dependency` tokens
    pub fn dependency_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) | Self::Token(InputToken::Dependency(name)) => Some(name),
            _ => None,
        }
    }

    /// Normalize into a token (names become `input.dependency`)
    pub fn into_token(self) -> InputToken {
        match self {
            Self::Name(name) => InputToken::Dependency(name),
            Self::Token(token) => token,
        }
    }

    /// Human-readable form for error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Name(name) => format!("dependency name '{name}'"),
            Self::Token(token) => token.shape().to_string(),
        }
    }
}

impl From<&str> for DependencyRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for DependencyRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<InputToken> for DependencyRef {
    fn from(token: InputToken) -> Self {
        Self::Token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input;
    use serde_json::json;

    #[test]
    fn test_shapes() {
        assert_eq!(input::value(1).shape(), InputShape::Value);
        assert_eq!(input::dependency("n").shape(), InputShape::Dependency);
        assert_eq!(input::myself().shape(), InputShape::Myself);
        assert_eq!(input::update_value().shape(), InputShape::UpdateValue);
        assert_eq!(input::named("from").shape(), InputShape::Named);
        assert!(input::decl(InputSpec::new()).shape().is_declaration());
        assert!(!input::value(1).shape().is_declaration());
    }

    #[test]
    fn test_tokens_compare_by_shape_and_payload() {
        assert_eq!(input::value(json!([1, 2])), input::value(json!([1, 2])));
        assert_ne!(input::value(1), input::value(2));
        assert_ne!(input::dependency("a"), input::named("a"));
    }

    #[test]
    fn test_plain_names_are_not_tokens() {
        let name = DependencyRef::from("album");
        assert!(!name.is_input_token());
        let err = name.shape().unwrap_err();
        assert_eq!(err.code(), "COMP-001");

        let token = DependencyRef::from(input::dependency("album"));
        assert!(token.is_input_token());
        assert_eq!(token.dependency_name(), Some("album"));
        assert_eq!(name.dependency_name(), Some("album"));
    }

    #[test]
    fn test_payload_access() {
        let token = input::value("x");
        assert_eq!(token.payload(), TokenPayload::Value(&json!("x")));
        assert_eq!(input::myself().payload(), TokenPayload::None);
        assert_eq!(input::named("n").payload(), TokenPayload::Name("n"));
    }

    #[test]
    fn test_names_normalize_to_dependency_tokens() {
        assert_eq!(
            DependencyRef::from("n").into_token(),
            InputToken::Dependency("n".into())
        );
    }
}
