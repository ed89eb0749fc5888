//! Operating-system readings behind the vital statistics.

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod temperature;

use crate::error::Result;
use std::path::{Path, PathBuf};

pub use cpu::CpuCollector;
pub use memory::MemoryCollector;
pub use temperature::TemperatureCollector;

/// Raw readings the registry computes its metrics from.
///
/// Every call is a synchronous local read. Readings that track deltas
/// (`core_load`, `idle_percent`) advance their internal snapshot on each call,
/// hence `&mut self`.
pub trait MetricProvider: Send {
    /// Number of logical cores; asked once at startup.
    fn core_count(&self) -> Result<usize>;

    /// Busy percentage of one core since that core was last read.
    fn core_load(&mut self, core: usize) -> Result<f64>;

    /// Whole-machine 5-minute load average.
    fn load_average(&self) -> Result<f64>;

    /// Aggregate idle percentage since the previous read.
    fn idle_percent(&mut self) -> Result<f64>;

    /// CPU temperature in degrees Celsius.
    fn cpu_temp_celsius(&self) -> Result<f64>;

    /// Physical memory available, in bytes.
    fn mem_available_bytes(&self) -> Result<u64>;

    /// Space available to unprivileged users on the filesystem holding `path`.
    fn disk_available_bytes(&self, path: &Path) -> Result<u64>;
}

/// Provider reading /proc and /sys on Linux.
pub struct LinuxProvider {
    cpu: CpuCollector,
    memory: MemoryCollector,
    temperature: TemperatureCollector,
}

impl LinuxProvider {
    pub fn new(temp_sensors: Vec<String>) -> Self {
        Self {
            cpu: CpuCollector::new(),
            memory: MemoryCollector::new(),
            temperature: TemperatureCollector::new(temp_sensors),
        }
    }

    /// Provider rooted at alternative /proc and /sys trees.
    pub fn with_roots(
        proc_root: impl Into<PathBuf>,
        sys_root: impl Into<PathBuf>,
        temp_sensors: Vec<String>,
    ) -> Self {
        let proc_root = proc_root.into();
        Self {
            cpu: CpuCollector::with_root(proc_root.clone()),
            memory: MemoryCollector::with_root(proc_root),
            temperature: TemperatureCollector::with_root(sys_root, temp_sensors),
        }
    }
}

impl MetricProvider for LinuxProvider {
    fn core_count(&self) -> Result<usize> {
        self.cpu.core_count()
    }

    fn core_load(&mut self, core: usize) -> Result<f64> {
        self.cpu.core_load(core)
    }

    fn load_average(&self) -> Result<f64> {
        self.cpu.load_average_5m()
    }

    fn idle_percent(&mut self) -> Result<f64> {
        self.cpu.idle_percent()
    }

    fn cpu_temp_celsius(&self) -> Result<f64> {
        self.temperature.celsius()
    }

    fn mem_available_bytes(&self) -> Result<u64> {
        self.memory.available_bytes()
    }

    fn disk_available_bytes(&self, path: &Path) -> Result<u64> {
        Ok(disk::fs_space(path)?.available_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_proc(dir: &Path) {
        fs::write(
            dir.join("stat"),
            "cpu  10 0 10 80 0 0 0 0\ncpu0 5 0 5 40 0 0 0 0\ncpu1 5 0 5 40 0 0 0 0\n",
        )
        .unwrap();
        fs::write(dir.join("loadavg"), "0.10 0.20 0.30 1/100 42\n").unwrap();
        fs::write(dir.join("meminfo"), "MemTotal: 1000 kB\nMemAvailable: 600 kB\n").unwrap();
    }

    #[test]
    fn linux_provider_reads_fake_trees() {
        let proc_dir = TempDir::new().unwrap();
        let sys_dir = TempDir::new().unwrap();
        fake_proc(proc_dir.path());

        let mut provider = LinuxProvider::with_roots(proc_dir.path(), sys_dir.path(), vec![]);
        assert_eq!(provider.core_count().unwrap(), 2);
        assert!((provider.core_load(1).unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(provider.load_average().unwrap(), 0.20);
        assert_eq!(provider.mem_available_bytes().unwrap(), 600 * 1024);
        assert!(provider.cpu_temp_celsius().is_err());
        assert!(provider.disk_available_bytes(proc_dir.path()).is_ok());
    }
}
