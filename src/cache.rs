//! Per-cycle memoization of metric values.

use crate::error::Result;
use crate::registry::{MetricId, MetricRegistry};
use std::collections::HashMap;

/// Memoizes one outcome per metric per collection cycle.
///
/// Entries are tagged with the cycle sequence number they were computed in.
/// An entry whose tag differs from the requested sequence is stale and is
/// recomputed, so `advance` never has to clear anything. Failed outcomes are
/// cached too: a missing sensor is asked once per cycle, not once per consumer.
#[derive(Debug, Default)]
pub struct CycleCache {
    current: u64,
    entries: HashMap<MetricId, (Result<f64>, u64)>,
    computations: u64,
}

impl CycleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current cycle sequence number.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Start a new cycle and return its sequence number.
    pub fn advance(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    /// Value of `id` for cycle `seq`, computing it through `registry` if the
    /// stored entry belongs to another cycle.
    pub fn get(&mut self, id: &MetricId, seq: u64, registry: &mut MetricRegistry) -> Result<f64> {
        if let Some((outcome, tag)) = self.entries.get(id) {
            if *tag == seq {
                return outcome.clone();
            }
        }

        let outcome = registry.resolve(id);
        self.computations += 1;
        self.entries.insert(*id, (outcome.clone(), seq));
        outcome
    }

    /// Value of `id` for the current cycle.
    pub fn get_current(&mut self, id: &MetricId, registry: &mut MetricRegistry) -> Result<f64> {
        let seq = self.current;
        self.get(id, seq, registry)
    }

    /// Whether `id` holds a value computed in cycle `seq`.
    pub fn is_fresh(&self, id: &MetricId, seq: u64) -> bool {
        self.entries.get(id).is_some_and(|(_, tag)| *tag == seq)
    }

    /// Number of times the registry was asked to compute, over the cache's life.
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VitalsError;
    use crate::metrics::MetricProvider;
    use crate::registry::{MetricKind, MetricSpec, Unit};
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Idle percent climbs by one on every read.
    struct Ticking {
        reads: Arc<AtomicU64>,
    }

    impl MetricProvider for Ticking {
        fn core_count(&self) -> Result<usize> {
            Ok(0)
        }
        fn core_load(&mut self, _core: usize) -> Result<f64> {
            Ok(0.0)
        }
        fn load_average(&self) -> Result<f64> {
            Ok(0.0)
        }
        fn idle_percent(&mut self) -> Result<f64> {
            Ok(self.reads.fetch_add(1, Ordering::SeqCst) as f64)
        }
        fn cpu_temp_celsius(&self) -> Result<f64> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Err(VitalsError::unavailable("cpu_temp", "no sensor"))
        }
        fn mem_available_bytes(&self) -> Result<u64> {
            Ok(0)
        }
        fn disk_available_bytes(&self, _path: &Path) -> Result<u64> {
            Ok(0)
        }
    }

    fn registry(reads: Arc<AtomicU64>) -> MetricRegistry {
        let specs = vec![
            MetricSpec::new(MetricId::scalar(MetricKind::CpuIdle), Unit::Percent, |p| {
                p.idle_percent()
            }),
            MetricSpec::new(MetricId::scalar(MetricKind::CpuTemp), Unit::Celsius, |p| {
                p.cpu_temp_celsius()
            }),
        ];
        MetricRegistry::from_specs(Box::new(Ticking { reads }), specs, 0)
    }

    #[test]
    fn same_cycle_computes_once() {
        let reads = Arc::new(AtomicU64::new(0));
        let mut registry = registry(reads.clone());
        let mut cache = CycleCache::new();
        let idle = MetricId::scalar(MetricKind::CpuIdle);

        let seq = cache.advance();
        let first = cache.get(&idle, seq, &mut registry).unwrap();
        let second = cache.get(&idle, seq, &mut registry).unwrap();
        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(cache.is_fresh(&idle, seq));
    }

    #[test]
    fn advance_forces_one_recomputation() {
        let reads = Arc::new(AtomicU64::new(0));
        let mut registry = registry(reads.clone());
        let mut cache = CycleCache::new();
        let idle = MetricId::scalar(MetricKind::CpuIdle);

        let seq = cache.advance();
        let old = cache.get(&idle, seq, &mut registry).unwrap();

        let seq = cache.advance();
        assert!(!cache.is_fresh(&idle, seq));
        let new = cache.get(&idle, seq, &mut registry).unwrap();
        let again = cache.get(&idle, seq, &mut registry).unwrap();
        assert_ne!(old, new);
        assert_eq!(new, again);
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn failures_are_cached_for_the_cycle() {
        let reads = Arc::new(AtomicU64::new(0));
        let mut registry = registry(reads.clone());
        let mut cache = CycleCache::new();
        let temp = MetricId::scalar(MetricKind::CpuTemp);

        assert!(cache.get_current(&temp, &mut registry).is_err());
        assert!(cache.get_current(&temp, &mut registry).is_err());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }
}
