//! Execution events, recorded while tracing is enabled

mod log;

pub use log::{Event, EventKind, EventLog};
