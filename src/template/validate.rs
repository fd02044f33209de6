//! Structural validation of template descriptions
//!
//! Runs once, when a template is defined. Every problem is collected
//! before reporting.

use tracing::debug;

use super::description::{Outputs, Steps, TemplateDescription};
use crate::error::{CompositeError, ErrorAggregate, Result};

pub fn validate_description(description: &TemplateDescription) -> Result<()> {
    let mut errors = ErrorAggregate::new();

    if let Some(Steps::Eager(_)) = description.steps {
        errors.push(CompositeError::StepsNotFactory);
    }

    for (name, token) in &description.inputs {
        let shape = token.shape();
        if !shape.is_declaration() {
            errors.push(CompositeError::InvalidInputDeclaration {
                input: name.clone(),
                shape: shape.to_string(),
            });
        }
    }

    if let Some(Outputs::List(outputs)) = &description.outputs {
        for output in outputs {
            if !output.starts_with('#') {
                errors.push(CompositeError::OutputNotInternal {
                    output: output.clone(),
                });
            }
        }
    }

    debug!(
        template = description.name(),
        problems = errors.len(),
        "validated template description"
    );

    errors.into_result(format!(
        "Errors in description of template {}",
        description.name()
    ))
}
