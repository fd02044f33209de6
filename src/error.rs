// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! Composite Error Types with Error Codes
//!
//! Error code ranges:
//! - COMP-000-009: Input token errors
//! - COMP-010-019: Template description errors
//! - COMP-020-029: Instantiation (input options) errors
//! - COMP-030-039: Composition structure errors
//! - COMP-040-049: Execution errors
//! - COMP-050-059: Schema / record errors
//! - COMP-060-069: Aggregates
//! - COMP-070-079: Configuration errors
//!
//! Structural errors are always collected through [`ErrorAggregate`] so that
//! every problem in a description is reported in one pass. Execution errors
//! are wrapped in [`CompositeError::CompositionFailed`] so nested failures
//! read as a cause chain.

use std::error::Error as StdError;
use std::fmt::Write as _;

use colored::Colorize;
use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompositeError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for terminal display of aggregate trees.
#[derive(Error, Debug, Diagnostic)]
pub enum CompositeError {
    // ═══════════════════════════════════════════
    // INPUT TOKEN ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[COMP-001] Expected an input token, got dependency name '{name}'")]
    #[diagnostic(
        code(composite::not_an_input_token),
        help("Check is_input_token() before reading a token's shape or value")
    )]
    NotAnInputToken { name: String },

    // ═══════════════════════════════════════════
    // DESCRIPTION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[COMP-010] Steps must be provided as a factory function, not a bare list")]
    #[diagnostic(
        code(composite::steps_not_factory),
        help("Use steps(|| vec![...]) so steps can reference the template's inputs")
    )]
    StepsNotFactory,

    #[error("[COMP-011] Input '{input}' is declared with {shape}; expected input, input.staticDependency or input.staticValue")]
    #[diagnostic(code(composite::invalid_input_declaration))]
    InvalidInputDeclaration { input: String, shape: String },

    #[error("[COMP-012] Output '{output}' must be an internal name prefixed with '#'")]
    #[diagnostic(code(composite::output_not_internal), help("Rename the output to '#{output}'"))]
    OutputNotInternal { output: String },

    // ═══════════════════════════════════════════
    // INSTANTIATION ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[COMP-020] Unexpected input names: {}", .names.join(", "))]
    #[diagnostic(code(composite::unexpected_inputs))]
    UnexpectedInputs { names: Vec<String> },

    #[error("[COMP-021] Required these inputs: {}", .names.join(", "))]
    #[diagnostic(
        code(composite::missing_inputs),
        help("Provide a binding for each input, or declare a default value or dependency")
    )]
    MissingInputs { names: Vec<String> },

    #[error("[COMP-022] Input '{input}' expects {expected}, got {actual}")]
    #[diagnostic(code(composite::input_shape_mismatch))]
    InputShapeMismatch {
        input: String,
        expected: &'static str,
        actual: String,
    },

    #[error("[COMP-023] Invalid value for input '{input}': {reason}")]
    #[diagnostic(code(composite::invalid_input_value))]
    InvalidInputValue { input: String, reason: String },

    #[error("[COMP-024] Unexpected output names: {}", .names.join(", "))]
    #[diagnostic(code(composite::unexpected_outputs))]
    UnexpectedOutputs { names: Vec<String> },

    // ═══════════════════════════════════════════
    // COMPOSITION STRUCTURE ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[COMP-030] Base step must compose, this composition is nestable")]
    #[diagnostic(code(composite::base_must_compose))]
    BaseMustCompose,

    #[error("[COMP-031] Base step must not compose, this composition isn't nestable")]
    #[diagnostic(code(composite::base_must_not_compose))]
    BaseMustNotCompose,

    #[error("[COMP-032] Step #{index} must compose; only the base step may stand alone")]
    #[diagnostic(code(composite::step_must_compose))]
    StepMustCompose { index: usize },

    #[error("[COMP-033] Step #{index} exposes but has no compute or transform")]
    #[diagnostic(code(composite::missing_expose_function))]
    MissingExposeFunction { index: usize },

    #[error("[COMP-034] Step #{index} computes but depends on input.updateValue()")]
    #[diagnostic(
        code(composite::compute_uses_update_value),
        help("Only transform steps can read the update value")
    )]
    ComputeUsesUpdateValue { index: usize },

    #[error("[COMP-035] Step #{index} cannot depend on {shape}")]
    #[diagnostic(
        code(composite::invalid_step_dependency),
        help("Step dependencies are names, input(\"name\"), input.myself() or input.updateValue()")
    )]
    InvalidStepDependency { index: usize, shape: String },

    // ═══════════════════════════════════════════
    // EXECUTION ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[COMP-040] Exit is not allowed in '{composition}' because it composes into a parent")]
    #[diagnostic(
        code(composite::exit_from_composing),
        help("Raise outputs instead, or declare the composition with compose(false)")
    )]
    ExitFromComposingComposition { composition: String },

    #[error("[COMP-041] '{composition}' raised output above, but has no parent composition")]
    #[diagnostic(code(composite::raise_above_without_parent))]
    RaiseAboveWithoutParent { composition: String },

    #[error("[COMP-042] input.updateValue() used in '{composition}' while no update is in flight")]
    #[diagnostic(code(composite::update_value_unavailable))]
    UpdateValueUnavailable { composition: String },

    #[error("[COMP-043] '{composition}' must be run with {expected}")]
    #[diagnostic(code(composite::wrong_entry_point))]
    WrongEntryPoint {
        composition: String,
        expected: &'static str,
    },

    #[error("[COMP-044] Step #{index} ({annotation}) failed")]
    #[diagnostic(code(composite::step_failed))]
    StepFailed {
        index: usize,
        annotation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("[COMP-045] Error computing composition {name}")]
    #[diagnostic(code(composite::composition_failed))]
    CompositionFailed {
        name: String,
        #[source]
        source: Box<CompositeError>,
    },

    #[error("[COMP-046] Invalid value for input '{input}' at runtime: {reason}")]
    #[diagnostic(code(composite::dynamic_input_invalid))]
    DynamicInputInvalid { input: String, reason: String },

    #[error("[COMP-047] '{composition}' does not expose a value")]
    #[diagnostic(code(composite::not_exposed))]
    NotExposed { composition: String },

    // ═══════════════════════════════════════════
    // SCHEMA ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[COMP-050] Unknown property '{property}' on {kind}")]
    #[diagnostic(code(composite::unknown_property))]
    UnknownProperty { kind: String, property: String },

    #[error("[COMP-051] Property dependency cycle: {cycle}")]
    #[diagnostic(code(composite::property_cycle))]
    PropertyCycle { cycle: String },

    #[error("[COMP-052] Property '{property}' is computed and cannot be set")]
    #[diagnostic(code(composite::read_only_property))]
    ReadOnlyProperty { property: String },

    #[error("[COMP-053] Value rejected for property '{property}': {reason}")]
    #[diagnostic(code(composite::update_rejected))]
    UpdateRejected { property: String, reason: String },

    // ═══════════════════════════════════════════
    // AGGREGATES (060-069)
    // ═══════════════════════════════════════════
    #[error("[COMP-060] {message}")]
    #[diagnostic(code(composite::aggregate))]
    Aggregate {
        message: String,
        #[related]
        errors: Vec<CompositeError>,
    },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (070-079)
    // ═══════════════════════════════════════════
    #[error("[COMP-070] Configuration error: {reason}")]
    #[diagnostic(
        code(composite::config_error),
        help("Check composite.toml syntax, or remove it to use defaults")
    )]
    ConfigError { reason: String },
}

impl CompositeError {
    /// Error code (e.g. `COMP-021`)
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnInputToken { .. } => "COMP-001",
            Self::StepsNotFactory => "COMP-010",
            Self::InvalidInputDeclaration { .. } => "COMP-011",
            Self::OutputNotInternal { .. } => "COMP-012",
            Self::UnexpectedInputs { .. } => "COMP-020",
            Self::MissingInputs { .. } => "COMP-021",
            Self::InputShapeMismatch { .. } => "COMP-022",
            Self::InvalidInputValue { .. } => "COMP-023",
            Self::UnexpectedOutputs { .. } => "COMP-024",
            Self::BaseMustCompose => "COMP-030",
            Self::BaseMustNotCompose => "COMP-031",
            Self::StepMustCompose { .. } => "COMP-032",
            Self::MissingExposeFunction { .. } => "COMP-033",
            Self::ComputeUsesUpdateValue { .. } => "COMP-034",
            Self::InvalidStepDependency { .. } => "COMP-035",
            Self::ExitFromComposingComposition { .. } => "COMP-040",
            Self::RaiseAboveWithoutParent { .. } => "COMP-041",
            Self::UpdateValueUnavailable { .. } => "COMP-042",
            Self::WrongEntryPoint { .. } => "COMP-043",
            Self::StepFailed { .. } => "COMP-044",
            Self::CompositionFailed { .. } => "COMP-045",
            Self::DynamicInputInvalid { .. } => "COMP-046",
            Self::NotExposed { .. } => "COMP-047",
            Self::UnknownProperty { .. } => "COMP-050",
            Self::PropertyCycle { .. } => "COMP-051",
            Self::ReadOnlyProperty { .. } => "COMP-052",
            Self::UpdateRejected { .. } => "COMP-053",
            Self::Aggregate { .. } => "COMP-060",
            Self::ConfigError { .. } => "COMP-070",
        }
    }

    /// Sibling errors of an aggregate (empty for every other variant)
    pub fn related(&self) -> &[CompositeError] {
        match self {
            Self::Aggregate { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Walk the cause chain and return the innermost composite error.
    ///
    /// Stops at the first non-composite cause (a step's own error).
    pub fn root_cause(&self) -> &CompositeError {
        match self {
            Self::CompositionFailed { source, .. } => source.root_cause(),
            _ => self,
        }
    }

    /// True if this is (or wraps) an error with the given code
    pub fn has_code(&self, code: &str) -> bool {
        self.code() == code
            || self.related().iter().any(|e| e.has_code(code))
            || matches!(self, Self::CompositionFailed { source, .. } if source.has_code(code))
    }

    pub(crate) fn composition_failed(name: &str, source: CompositeError) -> Self {
        Self::CompositionFailed {
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

impl FixSuggestion for CompositeError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            CompositeError::NotAnInputToken { .. } => {
                Some("Check is_input_token() before reading a token's shape or value")
            }
            CompositeError::StepsNotFactory => {
                Some("Use steps(|| vec![...]) so steps can reference the template's inputs")
            }
            CompositeError::InvalidInputDeclaration { .. } => {
                Some("Declare inputs with input::decl(), input::static_dependency() or input::static_value()")
            }
            CompositeError::OutputNotInternal { .. } => Some("Prefix output names with '#'"),
            CompositeError::UnexpectedInputs { .. } => {
                Some("Remove the extra inputs or declare them on the template")
            }
            CompositeError::MissingInputs { .. } => {
                Some("Provide a binding for each input, or declare a default")
            }
            CompositeError::InputShapeMismatch { .. } => {
                Some("Static values take input::value(); static dependencies take a name")
            }
            CompositeError::UnexpectedOutputs { .. } => {
                Some("Only rename outputs the template declares")
            }
            CompositeError::BaseMustCompose
            | CompositeError::BaseMustNotCompose
            | CompositeError::StepMustCompose { .. } => {
                Some("Only the last step of a compose(false) composition may stand alone")
            }
            CompositeError::ComputeUsesUpdateValue { .. } => {
                Some("Only transform steps can read the update value")
            }
            CompositeError::ExitFromComposingComposition { .. } => {
                Some("Raise outputs instead, or declare the composition with compose(false)")
            }
            CompositeError::WrongEntryPoint { .. } => {
                Some("Updating compositions run through transform(), others through compute()")
            }
            CompositeError::PropertyCycle { .. } => {
                Some("Break the cycle by reading one of the properties from stored data")
            }
            CompositeError::ConfigError { .. } => {
                Some("Check composite.toml syntax, or remove it to use defaults")
            }
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// AGGREGATION
// ═══════════════════════════════════════════════════════════════

/// Collects structural errors instead of failing on the first one.
#[derive(Debug, Default)]
pub struct ErrorAggregate {
    errors: Vec<CompositeError>,
}

impl ErrorAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CompositeError) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` if nothing was collected, otherwise one aggregate error
    pub fn into_result(self, message: impl Into<String>) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CompositeError::Aggregate {
                message: message.into(),
                errors: self.errors,
            })
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// TREE RENDERING
// ═══════════════════════════════════════════════════════════════

/// Render an error with its full cause chain and sibling errors.
///
/// Aggregates list their children indented below them; causes follow
/// with a `caused by:` prefix. Colors are dropped when stderr isn't a tty
/// (handled by `colored`).
pub fn render_error_tree(error: &CompositeError) -> String {
    let mut out = String::new();
    render_into(&mut out, error, 0);
    out
}

fn render_into(out: &mut String, error: &CompositeError, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{}{}", pad, error.to_string().red());

    if let CompositeError::CompositionFailed { source, .. } = error {
        let _ = write!(out, "{}{} ", pad, "caused by:".dimmed());
        render_into(out, source, depth + 1);
        return;
    }

    // Causes of leaf errors (step failures) are foreign error types
    let mut cause = error.source();
    while let Some(inner) = cause {
        let _ = writeln!(out, "{}  {} {}", pad, "caused by:".dimmed(), inner);
        cause = inner.source();
    }

    for child in error.related() {
        render_into(out, child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_message() {
        let err = CompositeError::MissingInputs {
            names: vec!["n".into(), "m".into()],
        };
        assert_eq!(err.to_string(), "[COMP-021] Required these inputs: n, m");
        assert_eq!(err.code(), "COMP-021");
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn test_aggregate_collects_everything() {
        let mut agg = ErrorAggregate::new();
        agg.push(CompositeError::StepsNotFactory);
        agg.push(CompositeError::OutputNotInternal {
            output: "x".into(),
        });
        assert_eq!(agg.len(), 2);

        let err = agg.into_result("Errors in template").unwrap_err();
        assert_eq!(err.related().len(), 2);
        assert!(err.has_code("COMP-012"));
    }

    #[test]
    fn test_empty_aggregate_is_ok() {
        assert!(ErrorAggregate::new().into_result("unused").is_ok());
    }

    #[test]
    fn test_root_cause_unwraps_chain() {
        let err = CompositeError::composition_failed(
            "outer",
            CompositeError::composition_failed("inner", CompositeError::BaseMustCompose),
        );
        assert_eq!(err.root_cause().code(), "COMP-030");
        assert!(err.to_string().contains("Error computing composition outer"));
    }

    #[test]
    fn test_render_tree_includes_causes_and_siblings() {
        colored::control::set_override(false);
        let step = CompositeError::StepFailed {
            index: 1,
            annotation: "double".into(),
            source: anyhow::anyhow!("n is not a number"),
        };
        let err = CompositeError::composition_failed("doubleAndAdd", step);
        let rendered = render_error_tree(&err);
        assert!(rendered.contains("Error computing composition doubleAndAdd"));
        assert!(rendered.contains("caused by:"));
        assert!(rendered.contains("n is not a number"));

        let agg = CompositeError::Aggregate {
            message: "Errors in input options passed to double".into(),
            errors: vec![
                CompositeError::MissingInputs { names: vec!["n".into()] },
                CompositeError::UnexpectedInputs { names: vec!["z".into()] },
            ],
        };
        let rendered = render_error_tree(&agg);
        assert!(rendered.contains("  [COMP-021]"));
        assert!(rendered.contains("  [COMP-020]"));
    }
}
