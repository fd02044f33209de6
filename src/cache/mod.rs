//! Opt-in memoization of step results
//!
//! - `store`: per-step tables keyed by flattened argument tuples
//! - `analysis`: read/evaluate timing distributions for profiling

mod analysis;
mod store;

pub use analysis::{summarize, CacheAnalysis, StepAnalysis, TimingSummary};
pub use store::{hash_args, CacheStatus, StepCache, StepTimings};
