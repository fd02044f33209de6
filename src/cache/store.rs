//! Step result cache
//!
//! Tables are scoped per step identity; the annotation only labels them
//! for reporting. Within a table, entries are bucketed by an xxh3 hash of the canonical serialization of the
//! flattened arguments, and a hit requires deep equality of the arguments.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

use crate::step::{Continuation, StepId};

#[derive(Debug, Clone)]
struct CacheEntry {
    args: Vec<Value>,
    continuation: Continuation,
}

#[derive(Debug, Default)]
struct StepTable {
    name: String,
    buckets: FxHashMap<u64, Vec<CacheEntry>>,
    entries: usize,
}

impl StepTable {
    fn get(&self, hash: u64, args: &[Value]) -> Option<&Continuation> {
        self.buckets
            .get(&hash)?
            .iter()
            .find(|entry| entry.args == args)
            .map(|entry| &entry.continuation)
    }

    fn insert(&mut self, hash: u64, args: Vec<Value>, continuation: Continuation) {
        self.buckets.entry(hash).or_default().push(CacheEntry {
            args,
            continuation,
        });
        self.entries += 1;
    }
}

/// Timing samples for one step
#[derive(Debug, Clone, Default)]
pub struct StepTimings {
    pub reads: Vec<Duration>,
    pub evaluations: Vec<Duration>,
}

/// Whether a lookup was served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Memoized step results for one generation run.
///
/// Never shared across runs: results are valid only while the underlying
/// records are unchanged.
#[derive(Debug, Default)]
pub struct StepCache {
    tables: FxHashMap<StepId, StepTable>,
    timings: FxHashMap<String, StepTimings>,
}

/// Stable hash of a flattened argument tuple
pub fn hash_args(args: &[Value]) -> u64 {
    // serde_json sorts object keys (no preserve_order), so equal values
    // serialize identically
    let bytes = serde_json::to_vec(args).unwrap_or_default();
    xxh3_64(&bytes)
}

impl StepCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay a stored continuation, or evaluate and store it.
    ///
    /// Failed evaluations are not stored.
    pub fn get_or_evaluate(
        &mut self,
        id: StepId,
        step: &str,
        args: Vec<Value>,
        evaluate: impl FnOnce() -> anyhow::Result<Continuation>,
    ) -> anyhow::Result<(Continuation, CacheStatus)> {
        let hash = hash_args(&args);

        let started = Instant::now();
        let hit = self
            .tables
            .get(&id)
            .and_then(|table| table.get(hash, &args))
            .cloned();
        if let Some(continuation) = hit {
            self.timings
                .entry(step.to_string())
                .or_default()
                .reads
                .push(started.elapsed());
            trace!(step, %id, hash, "cache hit");
            return Ok((continuation, CacheStatus::Hit));
        }

        let started = Instant::now();
        let continuation = evaluate()?;
        self.timings
            .entry(step.to_string())
            .or_default()
            .evaluations
            .push(started.elapsed());

        self.tables
            .entry(id)
            .or_insert_with(|| StepTable {
                name: step.to_string(),
                ..StepTable::default()
            })
            .insert(hash, args, continuation.clone());
        trace!(step, %id, hash, "cache miss, stored");
        Ok((continuation, CacheStatus::Miss))
    }

    /// Number of stored entries across the steps annotated `step`
    pub fn entries_for(&self, step: &str) -> usize {
        self.tables
            .values()
            .filter(|t| t.name == step)
            .map(|t| t.entries)
            .sum()
    }

    /// Total stored entries across all steps
    pub fn len(&self) -> usize {
        self.tables.values().map(|t| t.entries).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn timings(&self) -> &FxHashMap<String, StepTimings> {
        &self.timings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_second_call_is_replayed() {
        let mut cache = StepCache::new();
        let id = StepId::next();
        let calls = Cell::new(0);
        let eval = || {
            calls.set(calls.get() + 1);
            Ok(Continuation::exit(42))
        };

        let (first, status) = cache.get_or_evaluate(id, "s", vec![json!(1)], eval).unwrap();
        assert_eq!(status, CacheStatus::Miss);
        let (second, status) = cache
            .get_or_evaluate(id, "s", vec![json!(1)], || {
                calls.set(calls.get() + 1);
                Ok(Continuation::exit(0))
            })
            .unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_scoped_per_step() {
        let mut cache = StepCache::new();
        cache
            .get_or_evaluate(StepId::next(), "a", vec![json!(1)], || Ok(Continuation::exit(1)))
            .unwrap();
        let (_, status) = cache
            .get_or_evaluate(StepId::next(), "b", vec![json!(1)], || Ok(Continuation::exit(2)))
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.entries_for("a"), 1);
    }

    #[test]
    fn test_same_annotation_different_steps_do_not_share() {
        let mut cache = StepCache::new();
        let (first, _) = cache
            .get_or_evaluate(StepId::next(), "title", vec![json!(1)], || Ok(Continuation::exit("album")))
            .unwrap();
        let (second, status) = cache
            .get_or_evaluate(StepId::next(), "title", vec![json!(1)], || Ok(Continuation::exit("track")))
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(first, Continuation::exit("album"));
        assert_eq!(second, Continuation::exit("track"));
        assert_eq!(cache.entries_for("title"), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache = StepCache::new();
        let result = cache.get_or_evaluate(StepId::next(), "s", vec![], || Err(anyhow::anyhow!("boom")));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_object_key_order_does_not_matter() {
        let a = json!({"x": 1, "y": [1, 2]});
        let b: Value = serde_json::from_str(r#"{"y": [1, 2], "x": 1}"#).unwrap();
        assert_eq!(hash_args(&[a]), hash_args(&[b]));
    }

    #[test]
    fn test_timings_recorded() {
        let mut cache = StepCache::new();
        let id = StepId::next();
        for _ in 0..3 {
            cache
                .get_or_evaluate(id, "s", vec![json!("k")], || Ok(Continuation::proceed()))
                .unwrap();
        }
        let timings = &cache.timings()["s"];
        assert_eq!(timings.evaluations.len(), 1);
        assert_eq!(timings.reads.len(), 2);
    }
}
