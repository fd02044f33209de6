//! Steps: the atomic units of a composition
//!
//! - [`PrimitiveStep`]: dependency list plus a compute or transform closure
//! - [`Step`]: a primitive step or a resolved nested composition
//! - [`StepItem`]: what a template's `steps()` factory returns, which may
//!   still contain unresolved template instances
//! - [`Continuation`]: what a step hands back to the engine

mod continuation;
mod deps;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

pub use continuation::{Continuation, Directive, Provided};
pub use deps::{environment, Deps, Environment};

use crate::composition::Composition;
use crate::input::{DependencyRef, InputToken, UpdateSpec};
use crate::template::TemplateInstance;

/// Build a dependency list mixing plain names and tokens:
/// `deps!["n", input::named("from")]`
#[macro_export]
macro_rules! deps {
    ($($dep:expr),* $(,)?) => {
        ::std::vec![$($crate::input::DependencyRef::from($dep)),*]
    };
}

pub type ComputeFn = Arc<dyn Fn(&Deps) -> anyhow::Result<Continuation> + Send + Sync>;
pub type TransformFn = Arc<dyn Fn(&Value, &Deps) -> anyhow::Result<Continuation> + Send + Sync>;

/// Which entry point a step exposes
#[derive(Clone)]
pub enum ExposeFn {
    Compute(ComputeFn),
    Transform(TransformFn),
}

impl fmt::Debug for ExposeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute(_) => f.write_str("Compute(..)"),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// Expose description of a full-form step
#[derive(Debug, Clone, Default)]
pub struct Expose {
    pub dependencies: Vec<DependencyRef>,
    pub function: Option<ExposeFn>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepFlags {
    pub update: bool,
    pub expose: bool,
    pub compose: bool,
}

/// Memoization policy for a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    None,
    /// Reuse results for argument-equal invocations within one run
    Aggressive,
}

/// Identity of a constructed step, shared by its clones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(u64);

impl StepId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PrimitiveStep {
    id: StepId,
    annotation: Option<String>,
    flags: StepFlags,
    update: Option<UpdateSpec>,
    expose: Option<Expose>,
    cache: CacheMode,
}

impl PrimitiveStep {
    /// Shorthand compute step: exposes and composes
    pub fn compute<D>(
        dependencies: impl IntoIterator<Item = D>,
        f: impl Fn(&Deps) -> anyhow::Result<Continuation> + Send + Sync + 'static,
    ) -> Self
    where
        D: Into<DependencyRef>,
    {
        Self {
            id: StepId::next(),
            annotation: None,
            flags: StepFlags {
                update: false,
                expose: true,
                compose: true,
            },
            update: None,
            expose: Some(Expose {
                dependencies: dependencies.into_iter().map(Into::into).collect(),
                function: Some(ExposeFn::Compute(Arc::new(f))),
            }),
            cache: CacheMode::None,
        }
    }

    /// Shorthand transform step: updates, exposes and composes
    pub fn transform<D>(
        dependencies: impl IntoIterator<Item = D>,
        f: impl Fn(&Value, &Deps) -> anyhow::Result<Continuation> + Send + Sync + 'static,
    ) -> Self
    where
        D: Into<DependencyRef>,
    {
        Self {
            id: StepId::next(),
            annotation: None,
            flags: StepFlags {
                update: true,
                expose: true,
                compose: true,
            },
            update: None,
            expose: Some(Expose {
                dependencies: dependencies.into_iter().map(Into::into).collect(),
                function: Some(ExposeFn::Transform(Arc::new(f))),
            }),
            cache: CacheMode::None,
        }
    }

    /// Full form with explicit flags
    pub fn full(flags: StepFlags, update: Option<UpdateSpec>, expose: Option<Expose>) -> Self {
        Self {
            id: StepId::next(),
            annotation: None,
            flags,
            update,
            expose,
            cache: CacheMode::None,
        }
    }

    pub fn annotate(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Opt into aggressive memoization
    pub fn cached(mut self) -> Self {
        self.cache = CacheMode::Aggressive;
        self
    }

    /// Mark as a standalone base step (does not compose)
    pub fn terminal(mut self) -> Self {
        self.flags.compose = false;
        self
    }

    pub fn with_update(mut self, update: UpdateSpec) -> Self {
        self.flags.update = true;
        self.update = Some(update);
        self
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn flags(&self) -> StepFlags {
        self.flags
    }

    pub fn update(&self) -> Option<&UpdateSpec> {
        self.update.as_ref()
    }

    pub fn expose(&self) -> Option<&Expose> {
        self.expose.as_ref()
    }

    pub fn cache_mode(&self) -> CacheMode {
        self.cache
    }

    pub fn dependencies(&self) -> &[DependencyRef] {
        self.expose
            .as_ref()
            .map(|e| e.dependencies.as_slice())
            .unwrap_or(&[])
    }

    pub fn computes(&self) -> bool {
        matches!(
            self.expose.as_ref().and_then(|e| e.function.as_ref()),
            Some(ExposeFn::Compute(_))
        )
    }

    pub(crate) fn uses_update_value(&self) -> bool {
        self.dependencies()
            .iter()
            .any(|d| matches!(d, DependencyRef::Token(InputToken::UpdateValue(_))))
    }
}

/// A runnable step
#[derive(Debug, Clone)]
pub enum Step {
    Primitive(PrimitiveStep),
    Composite(Arc<Composition>),
}

impl Step {
    pub fn flags(&self) -> StepFlags {
        match self {
            Self::Primitive(step) => step.flags(),
            Self::Composite(composition) => composition.flags(),
        }
    }

    pub fn annotation(&self) -> Option<&str> {
        match self {
            Self::Primitive(step) => step.annotation(),
            Self::Composite(composition) => Some(composition.annotation()),
        }
    }
}

impl From<PrimitiveStep> for Step {
    fn from(step: PrimitiveStep) -> Self {
        Self::Primitive(step)
    }
}

impl From<Composition> for Step {
    fn from(composition: Composition) -> Self {
        Self::Composite(Arc::new(composition))
    }
}

/// Element of a steps list before resolution
#[derive(Debug, Clone)]
pub enum StepItem {
    Step(Step),
    Template(TemplateInstance),
}

impl StepItem {
    pub fn annotation(&self) -> Option<&str> {
        match self {
            Self::Step(step) => step.annotation(),
            Self::Template(instance) => Some(instance.annotation()),
        }
    }
}

impl From<Step> for StepItem {
    fn from(step: Step) -> Self {
        Self::Step(step)
    }
}

impl From<PrimitiveStep> for StepItem {
    fn from(step: PrimitiveStep) -> Self {
        Self::Step(step.into())
    }
}

impl From<TemplateInstance> for StepItem {
    fn from(instance: TemplateInstance) -> Self {
        Self::Template(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input;

    #[test]
    fn test_shorthand_flags() {
        let step = PrimitiveStep::compute(["n"], |_| Ok(Continuation::proceed()));
        assert_eq!(
            step.flags(),
            StepFlags {
                update: false,
                expose: true,
                compose: true
            }
        );
        assert!(step.computes());

        let step = PrimitiveStep::transform(Vec::<DependencyRef>::new(), |v, _| {
            Ok(Continuation::transformed(v.clone()))
        })
        .terminal();
        assert!(step.flags().update);
        assert!(!step.flags().compose);
        assert!(!step.computes());
    }

    #[test]
    fn test_deps_macro_mixes_names_and_tokens() {
        let list = deps!["n", input::named("from"), input::update_value()];
        assert_eq!(list.len(), 3);
        assert!(!list[0].is_input_token());
        assert!(list[1].is_input_token());

        let step = PrimitiveStep::compute(list, |_| Ok(Continuation::proceed()));
        assert!(step.uses_update_value());
    }

    #[test]
    fn test_annotation_and_cache_builders() {
        let step = PrimitiveStep::compute(["n"], |_| Ok(Continuation::proceed()))
            .annotate("double")
            .cached();
        assert_eq!(step.annotation(), Some("double"));
        assert_eq!(step.cache_mode(), CacheMode::Aggressive);
    }

    #[test]
    fn test_step_identity_survives_clone_only() {
        let make = || PrimitiveStep::compute(["n"], |_| Ok(Continuation::proceed())).annotate("same");
        let a = make();
        let b = make();
        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), b.id());
    }
}
