//! Cache timing analysis

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::store::{StepCache, StepTimings};

/// Distribution of one kind of sample, in microseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSummary {
    pub count: usize,
    pub min_us: f64,
    pub avg_us: f64,
    pub p50_us: f64,
    pub p90_us: f64,
    pub p99_us: f64,
    pub max_us: f64,
}

/// Summarize samples; `None` when there are none
pub fn summarize(samples: &[Duration]) -> Option<TimingSummary> {
    if samples.is_empty() {
        return None;
    }
    let mut micros: Vec<f64> = samples.iter().map(|d| d.as_nanos() as f64 / 1000.0).collect();
    micros.sort_by(f64::total_cmp);

    // nearest-rank percentile
    let pick = |p: f64| {
        let rank = ((p / 100.0) * micros.len() as f64).ceil() as usize;
        micros[rank.clamp(1, micros.len()) - 1]
    };

    Some(TimingSummary {
        count: micros.len(),
        min_us: micros[0],
        avg_us: micros.iter().sum::<f64>() / micros.len() as f64,
        p50_us: pick(50.0),
        p90_us: pick(90.0),
        p99_us: pick(99.0),
        max_us: micros[micros.len() - 1],
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepAnalysis {
    pub step: String,
    pub entries: usize,
    pub reads: Option<TimingSummary>,
    pub evaluations: Option<TimingSummary>,
}

impl StepAnalysis {
    fn total_evaluation_us(&self) -> f64 {
        self.evaluations
            .as_ref()
            .map_or(0.0, |e| e.avg_us * e.count as f64)
    }
}

/// Per-step cache report, slowest evaluations first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheAnalysis {
    pub steps: Vec<StepAnalysis>,
}

impl CacheAnalysis {
    pub fn from_cache(cache: &StepCache) -> Self {
        let mut steps: Vec<StepAnalysis> = cache
            .timings()
            .iter()
            .map(|(step, StepTimings { reads, evaluations })| StepAnalysis {
                step: step.clone(),
                entries: cache.entries_for(step),
                reads: summarize(reads),
                evaluations: summarize(evaluations),
            })
            .collect();
        steps.sort_by(|a, b| {
            b.total_evaluation_us()
                .total_cmp(&a.total_evaluation_us())
                .then_with(|| a.step.cmp(&b.step))
        });
        Self { steps }
    }

    pub fn step(&self, name: &str) -> Option<&StepAnalysis> {
        self.steps.iter().find(|s| s.step == name)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn write_summary(f: &mut fmt::Formatter<'_>, label: &str, summary: &Option<TimingSummary>) -> fmt::Result {
    match summary {
        None => writeln!(f, "    {label:<6} -"),
        Some(s) => writeln!(
            f,
            "    {label:<6} n={:<6} min={:.1}µs avg={:.1}µs p50={:.1}µs p90={:.1}µs p99={:.1}µs max={:.1}µs",
            s.count, s.min_us, s.avg_us, s.p50_us, s.p90_us, s.p99_us, s.max_us
        ),
    }
}

impl fmt::Display for CacheAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return writeln!(f, "composite cache: no cached steps ran");
        }
        writeln!(f, "composite cache: {} cached steps", self.steps.len())?;
        for step in &self.steps {
            writeln!(f, "  {} ({} entries)", step.step, step.entries)?;
            write_summary(f, "read", &step.reads)?;
            write_summary(f, "eval", &step.evaluations)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{Continuation, StepId};
    use serde_json::json;

    fn us(n: u64) -> Duration {
        Duration::from_micros(n)
    }

    #[test]
    fn test_summary_percentiles() {
        let samples: Vec<Duration> = (1..=100).map(us).collect();
        let s = summarize(&samples).unwrap();
        assert_eq!(s.count, 100);
        assert_eq!(s.min_us, 1.0);
        assert_eq!(s.max_us, 100.0);
        assert_eq!(s.p50_us, 50.0);
        assert_eq!(s.p90_us, 90.0);
        assert_eq!(s.p99_us, 99.0);
        assert!((s.avg_us - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample() {
        let s = summarize(&[us(7)]).unwrap();
        assert_eq!(s.p50_us, 7.0);
        assert_eq!(s.p99_us, 7.0);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_analysis_from_cache() {
        let mut cache = StepCache::new();
        let id = StepId::next();
        for i in 0..3 {
            cache
                .get_or_evaluate(id, "lookup", vec![json!(i % 2)], || Ok(Continuation::proceed()))
                .unwrap();
        }
        let analysis = CacheAnalysis::from_cache(&cache);
        let step = analysis.step("lookup").unwrap();
        assert_eq!(step.entries, 2);
        assert_eq!(step.evaluations.as_ref().unwrap().count, 2);
        assert_eq!(step.reads.as_ref().unwrap().count, 1);

        let text = analysis.to_string();
        assert!(text.contains("lookup (2 entries)"));
        assert!(text.contains("p90="));
    }

    #[test]
    fn test_empty_analysis_display() {
        let analysis = CacheAnalysis::from_cache(&StepCache::new());
        assert!(analysis.is_empty());
        assert!(analysis.to_string().contains("no cached steps"));
    }
}
