#![allow(dead_code)]
//! A fake metric provider that counts how often each reading is taken.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use vitalstats::error::Result;
use vitalstats::{MetricProvider, VitalsError};

/// Clones share their counters and switches, so a test can keep one clone
/// while the service owns another.
#[derive(Debug, Clone)]
pub struct FakeProvider {
    cores: usize,
    calls: Arc<Mutex<BTreeMap<String, u64>>>,
    temp_available: Arc<AtomicBool>,
    failing_cores: Arc<Mutex<HashSet<usize>>>,
}

impl FakeProvider {
    pub fn new(cores: usize) -> Self {
        Self {
            cores,
            calls: Arc::new(Mutex::new(BTreeMap::new())),
            temp_available: Arc::new(AtomicBool::new(true)),
            failing_cores: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn set_temp_available(&self, available: bool) {
        self.temp_available.store(available, Ordering::SeqCst);
    }

    pub fn fail_core(&self, core: usize) {
        self.failing_cores.lock().unwrap().insert(core);
    }

    /// Number of times `reading` was taken.
    pub fn calls(&self, reading: &str) -> u64 {
        self.calls.lock().unwrap().get(reading).copied().unwrap_or(0)
    }

    /// Readings taken across every kind.
    pub fn total_calls(&self) -> u64 {
        self.calls.lock().unwrap().values().sum()
    }

    /// Record one call and return how many there have been, so successive
    /// readings differ.
    fn tick(&self, reading: &str) -> u64 {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(reading.to_string()).or_default();
        *count += 1;
        *count
    }
}

impl MetricProvider for FakeProvider {
    fn core_count(&self) -> Result<usize> {
        Ok(self.cores)
    }

    fn core_load(&mut self, core: usize) -> Result<f64> {
        let n = self.tick(&format!("cpu_load_{}", core));
        if self.failing_cores.lock().unwrap().contains(&core) {
            return Err(VitalsError::provider(format!("cpu{}", core), "counter went backwards"));
        }
        Ok(10.0 * core as f64 + n as f64)
    }

    fn load_average(&self) -> Result<f64> {
        Ok(self.tick("cpu_loadavg") as f64 / 100.0)
    }

    fn idle_percent(&mut self) -> Result<f64> {
        Ok(50.0 + self.tick("cpu_idle") as f64)
    }

    fn cpu_temp_celsius(&self) -> Result<f64> {
        let n = self.tick("cpu_temp");
        if self.temp_available.load(Ordering::SeqCst) {
            Ok(40.0 + n as f64)
        } else {
            Err(VitalsError::unavailable("cpu_temp", "no matching sensor"))
        }
    }

    fn mem_available_bytes(&self) -> Result<u64> {
        Ok(1024 * 1024 * self.tick("mem_avail"))
    }

    fn disk_available_bytes(&self, _path: &Path) -> Result<u64> {
        Ok(1024 * 1024 * 1024 * self.tick("disk_avail"))
    }
}
