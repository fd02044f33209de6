//! EventLog - execution trace of one generation run
//!
//! - Event: envelope with id + elapsed time + kind
//! - EventKind: composition and step level events
//! - EventLog: append-only, owned by the run

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the execution log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since the run started (µs)
    pub elapsed_us: u64,
    /// Event type and data
    pub kind: EventKind,
}

/// All recorded event types
///
/// Uses Arc<str> for composition names to keep cloning cheap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // COMPOSITION LEVEL
    // ═══════════════════════════════════════════
    CompositionStarted {
        composition: Arc<str>,
        depth: usize,
    },
    CompositionFinished {
        composition: Arc<str>,
        directive: String,
    },
    CompositionFailed {
        composition: Arc<str>,
        error: String,
    },

    // ═══════════════════════════════════════════
    // STEP LEVEL
    // ═══════════════════════════════════════════
    StepStarted {
        composition: Arc<str>,
        index: usize,
        step: String,
        /// Names the step actually observed after filtering
        dependencies: Vec<String>,
        inputs: Vec<String>,
    },
    CacheHit {
        step: String,
    },
    StepFinished {
        composition: Arc<str>,
        index: usize,
        directive: String,
    },
}

impl EventKind {
    /// Composition this event belongs to (None for cache events)
    pub fn composition(&self) -> Option<&str> {
        match self {
            Self::CompositionStarted { composition, .. }
            | Self::CompositionFinished { composition, .. }
            | Self::CompositionFailed { composition, .. }
            | Self::StepStarted { composition, .. }
            | Self::StepFinished { composition, .. } => Some(composition),
            Self::CacheHit { .. } => None,
        }
    }
}

pub struct EventLog {
    events: Vec<Event>,
    start_time: Instant,
    next_id: u64,
}

impl EventLog {
    /// Create a new event log (call at run start)
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
            next_id: 0,
        }
    }

    /// Append an event, returning its ID
    pub fn emit(&mut self, kind: EventKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(Event {
            id,
            elapsed_us: self.start_time.elapsed().as_micros() as u64,
            kind,
        });
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events for one composition
    pub fn filter_composition(&self, composition: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.kind.composition() == Some(composition))
            .collect()
    }

    /// Serialize to JSON for debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.events).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}
