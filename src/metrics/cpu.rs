//! CPU readings from /proc/stat and /proc/loadavg.

use crate::error::{Result, VitalsError};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Raw CPU time values from /proc/stat
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Busy share of the time elapsed between `prev` and `self`, in percent.
    ///
    /// `None` when no time has elapsed, as there is nothing to measure.
    pub fn busy_percent_since(&self, prev: &CpuTimes) -> Option<f64> {
        let total_delta = self.total().saturating_sub(prev.total());
        if total_delta == 0 {
            return None;
        }
        let idle_delta = (self.idle + self.iowait).saturating_sub(prev.idle + prev.iowait);
        let busy = 100.0 * (1.0 - (idle_delta as f64 / total_delta as f64));
        Some(busy.clamp(0.0, 100.0))
    }

    /// Idle share of user + system + idle time elapsed since `prev`, in percent.
    /// Nice, iowait and interrupt time are not part of the denominator.
    pub fn idle_percent_since(&self, prev: &CpuTimes) -> Option<f64> {
        let user = self.user.saturating_sub(prev.user);
        let system = self.system.saturating_sub(prev.system);
        let idle = self.idle.saturating_sub(prev.idle);
        let denom = user + system + idle;
        if denom == 0 {
            return None;
        }
        Some(100.0 * idle as f64 / denom as f64)
    }
}

/// Collector for CPU readings with state for delta calculations.
///
/// Every core keeps its own previous snapshot, so reading core 2 never
/// disturbs the delta seen by core 3. The first read of a core or of the
/// aggregate line compares against zero, i.e. the counters since boot.
/// A read that finds the counters unchanged is unavailable and keeps the
/// previous snapshot, so the next read measures from it.
pub struct CpuCollector {
    proc_root: PathBuf,
    prev_total_times: Option<CpuTimes>,
    prev_core_times: HashMap<usize, CpuTimes>,
}

impl CpuCollector {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Collector reading `stat` and `loadavg` below `proc_root` instead of /proc.
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            prev_total_times: None,
            prev_core_times: HashMap::new(),
        }
    }

    fn read_stat(&self) -> Result<String> {
        let path = self.proc_root.join("stat");
        fs::read_to_string(&path).map_err(|e| VitalsError::from_io(path.display().to_string(), &e))
    }

    /// Number of logical cores listed in /proc/stat.
    pub fn core_count(&self) -> Result<usize> {
        let stat = self.read_stat()?;
        Ok(stat.lines().filter_map(parse_core_id).count())
    }

    /// Busy percentage of one core since its previous read.
    pub fn core_load(&mut self, core: usize) -> Result<f64> {
        let stat = self.read_stat()?;
        let line = stat
            .lines()
            .find(|line| parse_core_id(line) == Some(core))
            .ok_or_else(|| VitalsError::unavailable(format!("cpu{}", core), "core not listed in /proc/stat"))?;
        let times = parse_cpu_line(line)?;

        let prev = self.prev_core_times.get(&core).copied().unwrap_or_default();
        let load = times
            .busy_percent_since(&prev)
            .ok_or_else(|| VitalsError::unavailable(format!("cpu{}", core), "no time elapsed since the last read"))?;
        self.prev_core_times.insert(core, times);
        Ok(load)
    }

    /// Aggregate idle percentage since the previous read.
    pub fn idle_percent(&mut self) -> Result<f64> {
        let stat = self.read_stat()?;
        let line = stat
            .lines()
            .find(|line| line.starts_with("cpu "))
            .ok_or_else(|| VitalsError::provider("/proc/stat", "missing aggregate cpu line"))?;
        let times = parse_cpu_line(line)?;

        let prev = self.prev_total_times.unwrap_or_default();
        let idle = times
            .idle_percent_since(&prev)
            .ok_or_else(|| VitalsError::unavailable("cpu", "no time elapsed since the last read"))?;
        self.prev_total_times = Some(times);
        Ok(idle)
    }

    /// The 5-minute load average (run-queue length across all CPUs).
    pub fn load_average_5m(&self) -> Result<f64> {
        let path = self.proc_root.join("loadavg");
        let content = fs::read_to_string(&path)
            .map_err(|e| VitalsError::from_io(path.display().to_string(), &e))?;

        content
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| VitalsError::provider(path.display().to_string(), "malformed load average"))
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Core index of a per-core line like "cpu3 ...", None for anything else.
fn parse_core_id(line: &str) -> Option<usize> {
    let rest = line.strip_prefix("cpu")?;
    let id = rest.split_whitespace().next()?;
    id.parse().ok()
}

fn parse_cpu_line(line: &str) -> Result<CpuTimes> {
    let parts: Vec<u64> = line
        .split_whitespace()
        .skip(1) // Skip "cpu" or "cpuN"
        .map(|s| s.parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| VitalsError::provider("/proc/stat", format!("bad counter in {:?}: {}", line, e)))?;

    if parts.len() < 4 {
        return Err(VitalsError::provider("/proc/stat", format!("short cpu line {:?}", line)));
    }

    let field = |i: usize| parts.get(i).copied().unwrap_or(0);
    Ok(CpuTimes {
        user: field(0),
        nice: field(1),
        system: field(2),
        idle: field(3),
        iowait: field(4),
        irq: field(5),
        softirq: field(6),
        steal: field(7),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_stat(dir: &TempDir, body: &str) {
        fs::write(dir.path().join("stat"), body).unwrap();
    }

    const STAT_A: &str = "\
cpu  100 0 100 800 0 0 0 0 0 0
cpu0 50 0 50 400 0 0 0 0 0 0
cpu1 50 0 50 400 0 0 0 0 0 0
intr 12345
ctxt 999
";

    const STAT_B: &str = "\
cpu  200 0 200 1000 0 0 0 0 0 0
cpu0 130 0 70 400 0 0 0 0 0 0
cpu1 50 0 50 500 0 0 0 0 0 0
intr 12345
ctxt 1999
";

    #[test]
    fn counts_cores() {
        let dir = TempDir::new().unwrap();
        write_stat(&dir, STAT_A);
        let collector = CpuCollector::with_root(dir.path());
        assert_eq!(collector.core_count().unwrap(), 2);
    }

    #[test]
    fn first_core_read_uses_counters_since_boot() {
        let dir = TempDir::new().unwrap();
        write_stat(&dir, STAT_A);
        let mut collector = CpuCollector::with_root(dir.path());
        let load = collector.core_load(0).unwrap();
        assert!((load - 20.0).abs() < 1e-9);
    }

    #[test]
    fn core_load_uses_per_core_delta() {
        let dir = TempDir::new().unwrap();
        write_stat(&dir, STAT_A);
        let mut collector = CpuCollector::with_root(dir.path());
        collector.core_load(0).unwrap();
        collector.core_load(1).unwrap();

        write_stat(&dir, STAT_B);
        // core0: +100 busy, +0 idle -> fully busy
        assert!((collector.core_load(0).unwrap() - 100.0).abs() < 1e-9);
        // core1: +0 busy, +100 idle -> idle
        assert!(collector.core_load(1).unwrap().abs() < 1e-9);
    }

    #[test]
    fn unknown_core_is_unavailable() {
        let dir = TempDir::new().unwrap();
        write_stat(&dir, STAT_A);
        let mut collector = CpuCollector::with_root(dir.path());
        assert!(matches!(
            collector.core_load(7),
            Err(VitalsError::Unavailable { .. })
        ));
    }

    #[test]
    fn idle_percent_over_user_system_idle() {
        let dir = TempDir::new().unwrap();
        write_stat(&dir, STAT_A);
        let mut collector = CpuCollector::with_root(dir.path());
        assert!((collector.idle_percent().unwrap() - 80.0).abs() < 1e-9);

        write_stat(&dir, STAT_B);
        // +100 user, +100 system, +200 idle
        assert!((collector.idle_percent().unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unchanged_counters_are_unavailable() {
        let dir = TempDir::new().unwrap();
        write_stat(&dir, STAT_A);
        let mut collector = CpuCollector::with_root(dir.path());
        collector.core_load(0).unwrap();
        collector.idle_percent().unwrap();

        // Same /proc/stat again: no elapsed time, no reading
        assert!(matches!(collector.core_load(0), Err(VitalsError::Unavailable { .. })));
        assert!(matches!(collector.idle_percent(), Err(VitalsError::Unavailable { .. })));

        // The snapshot from the first read is still the baseline
        write_stat(&dir, STAT_B);
        assert!((collector.core_load(0).unwrap() - 100.0).abs() < 1e-9);
        assert!((collector.idle_percent().unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn busy_percent_stays_in_range_after_counter_reset() {
        let prev = CpuTimes { user: 300, system: 100, idle: 50, ..Default::default() };
        // user went backwards while idle jumped: idle delta exceeds total delta
        let now = CpuTimes { user: 100, system: 100, idle: 400, ..Default::default() };
        assert_eq!(now.busy_percent_since(&prev), Some(0.0));
    }

    #[test]
    fn reads_five_minute_load_average() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("loadavg"), "0.52 0.75 0.91 2/345 6789\n").unwrap();
        let collector = CpuCollector::with_root(dir.path());
        assert_eq!(collector.load_average_5m().unwrap(), 0.75);
    }

    #[test]
    fn garbage_counter_is_provider_error() {
        let dir = TempDir::new().unwrap();
        write_stat(&dir, "cpu  1 2 x 4\n");
        let mut collector = CpuCollector::with_root(dir.path());
        assert!(matches!(
            collector.idle_percent(),
            Err(VitalsError::Provider { .. })
        ));
    }
}
