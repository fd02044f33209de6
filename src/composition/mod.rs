//! Compositions: validated step lists and the engine that runs them
//!
//! - `description`: [`CompositionDescription`], the materialized form
//! - `resolve`: template instances in a step list become nested compositions
//! - `compose`: [`composite_from`] validates and derives flags/dependencies
//! - `execute`: `compute`/`transform`/`run` entry points

mod compose;
mod description;
mod execute;
mod resolve;

pub use compose::{composite_from, Composition};
pub use description::CompositionDescription;
pub use execute::Outcome;
pub use resolve::resolve_steps;
