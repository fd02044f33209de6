//! composite - composition engine for computed record properties (v0.3)
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  input/     Input tokens and their constraints               │
//! │  step/      Primitive steps, Deps, Continuation              │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  template/     Template, instantiate, describe               │
//! │  composition/  composite_from, resolution, execution         │
//! │  library/      Standard control-flow templates               │
//! │  schema/       Property tables over records                  │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  runtime/   GenerationRun (per-run state)                    │
//! │  cache/     Step memoization and timing analysis             │
//! │  event/     Execution trace (EventLog, EventKind)            │
//! │  util/      Logging setup                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`input`] | `InputToken` sum type, `InputSpec`, `UpdateSpec` |
//! | [`step`] | `PrimitiveStep`, least-access `Deps`, `Continuation` |
//! | [`template`] | Template definition, input option validation, descriptions |
//! | [`composition`] | Structural checks, flag derivation, the execution engine |
//! | [`library`] | `expose_dependency`, availability checks, early exits |
//! | [`schema`] | `Schema`/`Record` and the property resolver |
//! | [`runtime`] | `GenerationRun`, `debug_composite`, cache analysis |
//! | [`cache`] | Argument-keyed step cache with timing samples |
//! | [`event`] | Event log recorded while tracing |
//! | [`error`] | Error types with codes and fix suggestions |
//! | [`config`] | `composite.toml` plus environment overrides |

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - tokens and steps
// ═══════════════════════════════════════════════════════════════
pub mod input;
pub mod step;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - templates, compositions, records
// ═══════════════════════════════════════════════════════════════
pub mod composition;
pub mod library;
pub mod schema;
pub mod template;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - run state, caching, events
// ═══════════════════════════════════════════════════════════════
pub mod cache;
pub mod event;
pub mod runtime;
pub mod util;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - Error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_fixtures;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{render_error_tree, CompositeError, ErrorAggregate, FixSuggestion, Result};

// Config types
pub use config::CompositeConfig;

// Token types
pub use input::{DependencyRef, InputShape, InputSpec, InputToken, UpdateSpec, ValueType};

// Step types
pub use step::{environment, Continuation, Deps, Directive, Environment, PrimitiveStep, Step, StepId, StepItem};

// Template and composition types
pub use composition::{composite_from, Composition, CompositionDescription, Outcome};
pub use template::{template_composite_from, Template, TemplateDescription, TemplateInstance};

// Records
pub use schema::{PropertyDescriptor, Record, Schema};

// Run state
pub use cache::{CacheAnalysis, StepCache};
pub use event::{Event, EventKind, EventLog};
pub use runtime::{debug_composite, display_composite_cache_analysis, GenerationRun};
pub use util::init_logging;
