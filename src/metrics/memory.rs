//! Memory readings from /proc/meminfo.

use crate::error::{Result, VitalsError};
use std::fs;
use std::path::PathBuf;

/// Memory figures from /proc/meminfo, in bytes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    pub available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
}

impl MemInfo {
    /// Physical memory available for new work.
    ///
    /// Kernels older than 3.14 have no MemAvailable line; free + buffers +
    /// cached is the usual estimate there.
    pub fn available_bytes(&self) -> u64 {
        self.available
            .unwrap_or(self.free + self.buffers + self.cached)
    }
}

/// Memory collector
pub struct MemoryCollector {
    proc_root: PathBuf,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Read and parse /proc/meminfo
    pub fn collect(&self) -> Result<MemInfo> {
        let path = self.proc_root.join("meminfo");
        let meminfo = fs::read_to_string(&path)
            .map_err(|e| VitalsError::from_io(path.display().to_string(), &e))?;

        let info = parse_meminfo(&meminfo);
        if info.total == 0 {
            return Err(VitalsError::provider(
                path.display().to_string(),
                "no MemTotal line",
            ));
        }
        Ok(info)
    }

    pub fn available_bytes(&self) -> Result<u64> {
        Ok(self.collect()?.available_bytes())
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_meminfo(content: &str) -> MemInfo {
    let mut info = MemInfo::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let value: u64 = parts[1].parse().unwrap_or(0) * 1024; // Convert from KB to bytes

        match parts[0] {
            "MemTotal:" => info.total = value,
            "MemFree:" => info.free = value,
            "MemAvailable:" => info.available = Some(value),
            "Buffers:" => info.buffers = value,
            "Cached:" => info.cached = value,
            _ => {}
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_mem_available() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("meminfo"),
            "MemTotal:        8000000 kB\nMemFree:         1000000 kB\nMemAvailable:    4000000 kB\nBuffers:          100000 kB\nCached:          2000000 kB\n",
        )
        .unwrap();
        let collector = MemoryCollector::with_root(dir.path());
        assert_eq!(collector.available_bytes().unwrap(), 4_000_000 * 1024);
    }

    #[test]
    fn estimates_when_mem_available_missing() {
        let info = parse_meminfo("MemTotal: 100 kB\nMemFree: 10 kB\nBuffers: 5 kB\nCached: 20 kB\n");
        assert_eq!(info.available_bytes(), 35 * 1024);
    }

    #[test]
    fn missing_meminfo_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let collector = MemoryCollector::with_root(dir.path());
        assert!(matches!(
            collector.available_bytes(),
            Err(VitalsError::Unavailable { .. })
        ));
    }
}
