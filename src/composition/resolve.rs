//! Resolver: flattens nested template instances into runnable steps

use std::sync::Arc;

use tracing::trace;

use super::compose::composite_from;
use crate::error::{CompositeError, ErrorAggregate, Result};
use crate::step::{Step, StepItem};

/// Resolve every template instance in `items` into a composite step.
///
/// Each nested instance carries its own input bindings into the resolved
/// composition. Failures are indexed by step position (1-based) and
/// reported together.
pub fn resolve_steps(composition: &str, items: Vec<StepItem>) -> Result<Vec<Step>> {
    let mut errors = ErrorAggregate::new();
    let mut steps = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        match item {
            StepItem::Step(step) => steps.push(step),
            StepItem::Template(instance) => {
                trace!(composition, step = index + 1, template = instance.annotation(), "resolving nested template");
                match instance.to_resolved_composition().and_then(composite_from) {
                    Ok(resolved) => steps.push(Step::Composite(Arc::new(resolved))),
                    Err(e) => errors.push(CompositeError::Aggregate {
                        message: format!("Errors in step #{} ({})", index + 1, instance.annotation()),
                        errors: vec![e],
                    }),
                }
            }
        }
    }

    errors.into_result(format!("Errors resolving composition {composition}"))?;
    Ok(steps)
}
