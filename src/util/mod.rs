//! Utilities Module - shared infrastructure
//!
//! - `logging`: `tracing-subscriber` setup driven by `COMPOSITE_LOG`

mod logging;

pub use logging::{init_logging, ENV_LOG};
