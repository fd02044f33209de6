//! Runtime Module - per-run execution state
//!
//! - `run`: [`GenerationRun`] (cache, tracing, event log) plus the
//!   `debug_composite` and `display_composite_cache_analysis` helpers
//!
//! The engine itself lives in `composition`; this module is the state it
//! threads through one run.

mod run;

pub use run::{debug_composite, display_composite_cache_analysis, GenerationRun};
