//! Input token model
//!
//! Constructors mirror how templates are written:
//!
//! ```rust,ignore
//! use composite::input::{self, InputSpec, ValueType};
//!
//! // Declarations, in a template's inputs table
//! input::decl(InputSpec::new().value_type(ValueType::Number));
//! input::static_value(InputSpec::new().default_value("null"));
//!
//! // Bindings, when instantiating a template
//! input::value(5);
//! input::dependency("album");
//! input::myself();
//! input::update_value();
//!
//! // Inside a template's steps, refer to its own inputs
//! input::named("from");
//! ```

mod spec;
mod token;

use serde_json::Value;

pub use spec::{type_appearance, InputSpec, UpdateSpec, ValueType, Validator};
pub use token::{DependencyRef, InputShape, InputToken, TokenPayload};

/// Declare an ordinary input
pub fn decl(spec: InputSpec) -> InputToken {
    InputToken::Input(spec)
}

/// Declare an input bound to a dependency name at instantiation
pub fn static_dependency(spec: InputSpec) -> InputToken {
    InputToken::StaticDependency(spec)
}

/// Declare an input bound to a literal at instantiation
pub fn static_value(spec: InputSpec) -> InputToken {
    InputToken::StaticValue(spec)
}

/// Refer to an input of the enclosing template
pub fn named(name: impl Into<String>) -> InputToken {
    InputToken::Named(name.into())
}

pub fn value(value: impl Into<Value>) -> InputToken {
    InputToken::Value(value.into())
}

pub fn dependency(name: impl Into<String>) -> InputToken {
    InputToken::Dependency(name.into())
}

pub fn myself() -> InputToken {
    InputToken::Myself
}

pub fn update_value() -> InputToken {
    InputToken::UpdateValue(None)
}

/// Update value with extra validation merged into the composition's update
pub fn update_value_with(update: UpdateSpec) -> InputToken {
    InputToken::UpdateValue(Some(update))
}

pub fn is_input_token(candidate: &DependencyRef) -> bool {
    candidate.is_input_token()
}
