//! Memoized evaluation.
//!
//! Results are keyed by the canonical JSON serialization of the full
//! `CalculationInputs`. Equal inputs never reach the wrapped evaluator
//! twice; any field difference is a miss. There is no expiry. Failed
//! evaluations are not cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::lock;
use crate::compliance::voltage_drop::{
    CalcError, CalculationResult, Evaluator, VoltageDropCalculator,
};
use crate::ucs::schema::CalculationInputs;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Evaluator wrapper with an input-fingerprint cache
pub struct MemoizedEvaluator {
    inner: Arc<dyn Evaluator>,
    cache: Mutex<HashMap<String, CalculationResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoizedEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: lock(&self.cache).len(),
        }
    }

    /// Drop every cached result
    pub fn clear(&self) {
        lock(&self.cache).clear();
    }
}

impl Default for MemoizedEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(VoltageDropCalculator::default()))
    }
}

impl Evaluator for MemoizedEvaluator {
    fn evaluate(&self, inputs: &CalculationInputs) -> Result<CalculationResult, CalcError> {
        let key = inputs
            .fingerprint()
            .map_err(|e| CalcError::Other(format!("Failed to fingerprint inputs: {}", e)))?;

        if let Some(hit) = lock(&self.cache).get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }

        // Evaluate outside the lock; a racing duplicate just computes twice.
        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = self.inner.evaluate(inputs)?;
        lock(&self.cache).insert(key, result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ucs::schema::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingEvaluator {
        calls: AtomicUsize,
    }

    impl Evaluator for CountingEvaluator {
        fn evaluate(&self, inputs: &CalculationInputs) -> Result<CalculationResult, CalcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            VoltageDropCalculator::default().evaluate(inputs)
        }
    }

    fn scenario_inputs() -> CalculationInputs {
        let record = CircuitRecord::new("B-1")
            .with_conductor("12 AWG", ConductorMaterial::Copper, 20.0)
            .with_supply(230.0, PhaseConfiguration::Single)
            .with_load(20.0, 0.9);
        CalculationInputs::from_record(record, &InstallationDefaults::default())
    }

    #[test]
    fn test_identical_inputs_hit_cache() {
        let counter = Arc::new(CountingEvaluator { calls: AtomicUsize::new(0) });
        let memo = MemoizedEvaluator::new(counter.clone());

        let first = memo.evaluate(&scenario_inputs()).unwrap();
        let second = memo.evaluate(&scenario_inputs()).unwrap();

        assert_eq!(first, second);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.stats(), MemoStats { hits: 1, misses: 1, entries: 1 });
    }

    #[test]
    fn test_any_field_change_is_a_miss() {
        let counter = Arc::new(CountingEvaluator { calls: AtomicUsize::new(0) });
        let memo = MemoizedEvaluator::new(counter.clone());

        let base = scenario_inputs();
        let mut tweaked = base.clone();
        tweaked.record.description = "renamed".to_string();

        memo.evaluate(&base).unwrap();
        memo.evaluate(&tweaked).unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let counter = Arc::new(CountingEvaluator { calls: AtomicUsize::new(0) });
        let memo = MemoizedEvaluator::new(counter.clone());

        let mut bad = scenario_inputs();
        bad.record.conductor_size = "bogus".to_string();

        assert!(memo.evaluate(&bad).is_err());
        assert!(memo.evaluate(&bad).is_err());
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(memo.stats().entries, 0);
    }

    #[test]
    fn test_clear() {
        let memo = MemoizedEvaluator::default();
        memo.evaluate(&scenario_inputs()).unwrap();
        memo.clear();
        assert_eq!(memo.stats().entries, 0);
    }
}
