//! GenerationRun: explicit state for one data-generation run
//!
//! Owns the step cache and the event log. Create one per run over a fixed
//! set of records and drop it afterwards; cached results are only valid
//! while the records are unchanged.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheAnalysis, CacheStatus, StepCache};
use crate::config::CompositeConfig;
use crate::error::Result;
use crate::event::{EventKind, EventLog};
use crate::step::{Continuation, Deps, Directive, StepId};

#[derive(Debug)]
pub struct GenerationRun {
    cache: StepCache,
    cache_enabled: bool,
    tracing: bool,
    fallback_warnings: bool,
    events: EventLog,
    depth: usize,
}

impl Default for GenerationRun {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationRun {
    /// Cache enabled, tracing off
    pub fn new() -> Self {
        Self::from_config(&CompositeConfig::default())
    }

    pub fn from_config(config: &CompositeConfig) -> Self {
        Self {
            cache: StepCache::new(),
            cache_enabled: config.cache.enabled,
            tracing: config.debug.trace,
            fallback_warnings: config.debug.output_fallback_warnings,
            events: EventLog::new(),
            depth: 0,
        }
    }

    /// Every step evaluates, even those marked cached
    pub fn without_cache() -> Self {
        let mut config = CompositeConfig::default();
        config.cache.enabled = false;
        Self::from_config(&config)
    }

    pub fn cache(&self) -> &StepCache {
        &self.cache
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn is_tracing(&self) -> bool {
        self.tracing
    }

    /// Toggle tracing, returning the previous setting
    pub fn set_tracing(&mut self, tracing: bool) -> bool {
        std::mem::replace(&mut self.tracing, tracing)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Current composition nesting depth (0 outside any composition)
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth.saturating_sub(1))
    }

    // ═══════════════════════════════════════════
    // ENGINE HOOKS
    // ═══════════════════════════════════════════

    pub(crate) fn enter_composition(&mut self, composition: &str) {
        self.depth += 1;
        if self.tracing {
            info!("{}begin composition {}", self.indent(), composition);
            self.events.emit(EventKind::CompositionStarted {
                composition: Arc::from(composition),
                depth: self.depth,
            });
        } else {
            debug!(composition, depth = self.depth, "begin composition");
        }
    }

    pub(crate) fn leave_composition(&mut self, composition: &str, result: &Result<Continuation>) {
        if self.tracing {
            match result {
                Ok(continuation) => {
                    info!(
                        "{}end composition {} - {}",
                        self.indent(),
                        composition,
                        continuation.directive()
                    );
                    self.events.emit(EventKind::CompositionFinished {
                        composition: Arc::from(composition),
                        directive: continuation.directive().to_string(),
                    });
                }
                Err(e) => {
                    info!("{}end composition {} - error: {}", self.indent(), composition, e);
                    self.events.emit(EventKind::CompositionFailed {
                        composition: Arc::from(composition),
                        error: e.to_string(),
                    });
                }
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn step_started(&mut self, composition: &str, index: usize, step: &str, deps: &Deps) {
        if !self.tracing {
            return;
        }
        let dependencies: Vec<String> = deps.names().map(str::to_string).collect();
        let inputs: Vec<String> = deps.input_names().map(str::to_string).collect();
        info!(
            "{}  step #{} ({}) deps={:?} inputs={:?}",
            self.indent(),
            index,
            step,
            dependencies,
            inputs
        );
        self.events.emit(EventKind::StepStarted {
            composition: Arc::from(composition),
            index,
            step: step.to_string(),
            dependencies,
            inputs,
        });
    }

    pub(crate) fn step_finished(&mut self, composition: &str, index: usize, directive: Directive) {
        if self.tracing {
            info!("{}  step #{} -> {}", self.indent(), index, directive);
            self.events.emit(EventKind::StepFinished {
                composition: Arc::from(composition),
                index,
                directive: directive.to_string(),
            });
        }
    }

    pub(crate) fn cached(
        &mut self,
        id: StepId,
        step: &str,
        args: Vec<Value>,
        evaluate: impl FnOnce() -> anyhow::Result<Continuation>,
    ) -> anyhow::Result<Continuation> {
        let (continuation, status) = self.cache.get_or_evaluate(id, step, args, evaluate)?;
        if status == CacheStatus::Hit && self.tracing {
            info!("{}  step {} served from cache", self.indent(), step);
            self.events.emit(EventKind::CacheHit {
                step: step.to_string(),
            });
        }
        Ok(continuation)
    }

    pub(crate) fn output_fallback(&self, composition: &str, output: &str) {
        if self.fallback_warnings {
            warn!(
                composition,
                output, "output resolved from its name without the '#' prefix"
            );
        }
    }
}

/// Run `f` with verbose per-step tracing, restoring the previous setting
pub fn debug_composite<T>(run: &mut GenerationRun, f: impl FnOnce(&mut GenerationRun) -> T) -> T {
    let previous = run.set_tracing(true);
    let result = f(run);
    run.set_tracing(previous);
    result
}

/// Build the cache timing report and log it
pub fn display_composite_cache_analysis(run: &GenerationRun) -> CacheAnalysis {
    let analysis = CacheAnalysis::from_cache(run.cache());
    for line in analysis.to_string().lines() {
        info!("{line}");
    }
    analysis
}
