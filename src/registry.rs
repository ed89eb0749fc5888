//! Metric identifiers and the registry that computes them on demand.

use crate::error::{Result, VitalsError};
use crate::metrics::MetricProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The families of metrics this plugin provides. Configuration addresses kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Per-core busy percentage, one identifier per detected core
    CpuLoad,
    /// Whole-machine 5-minute load average
    CpuLoadavg,
    CpuIdle,
    CpuTemp,
    MemAvail,
    DiskAvail,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::CpuLoad,
        MetricKind::CpuLoadavg,
        MetricKind::CpuIdle,
        MetricKind::CpuTemp,
        MetricKind::MemAvail,
        MetricKind::DiskAvail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::CpuLoad => "cpu_load",
            MetricKind::CpuLoadavg => "cpu_loadavg",
            MetricKind::CpuIdle => "cpu_idle",
            MetricKind::CpuTemp => "cpu_temp",
            MetricKind::MemAvail => "mem_avail",
            MetricKind::DiskAvail => "disk_avail",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            MetricKind::CpuLoad | MetricKind::CpuIdle => Unit::Percent,
            MetricKind::CpuLoadavg => Unit::Count,
            MetricKind::CpuTemp => Unit::Celsius,
            MetricKind::MemAvail | MetricKind::DiskAvail => Unit::Bytes,
        }
    }

    /// Kind of a record field name such as `cpu_load_2` or `mem_avail`.
    pub fn from_field(field: &str) -> Option<MetricKind> {
        if let Some(kind) = MetricKind::ALL.into_iter().find(|k| k.name() == field) {
            return (kind != MetricKind::CpuLoad).then_some(kind);
        }
        let (base, core) = field.rsplit_once('_')?;
        (base == MetricKind::CpuLoad.name() && core.parse::<usize>().is_ok()).then_some(MetricKind::CpuLoad)
    }

    pub fn description(self) -> &'static str {
        match self {
            MetricKind::CpuLoad => "busy time of one CPU core",
            MetricKind::CpuLoadavg => "5 minute load average (run queue length) across all CPUs",
            MetricKind::CpuIdle => "idle (neither user nor system) CPU time",
            MetricKind::CpuTemp => "CPU core temperature",
            MetricKind::MemAvail => "physical memory available",
            MetricKind::DiskAvail => "disk space available",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| VitalsError::Config(format!("unknown metric {:?}", wanted)))
    }
}

/// Unit of a metric's computed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Celsius,
    Bytes,
    Count,
}

impl Unit {
    /// The host's unit group for observation types measured in this unit.
    pub fn group(self) -> &'static str {
        match self {
            Unit::Percent => "group_percent",
            Unit::Celsius => "group_temperature",
            Unit::Bytes => "group_data",
            Unit::Count => "group_count",
        }
    }
}

/// One concrete metric: a kind, plus the core index for per-core kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    pub kind: MetricKind,
    pub core: Option<usize>,
}

impl MetricId {
    pub fn scalar(kind: MetricKind) -> Self {
        Self { kind, core: None }
    }

    pub fn cpu_load(core: usize) -> Self {
        Self {
            kind: MetricKind::CpuLoad,
            core: Some(core),
        }
    }

    /// Field name written into records, e.g. `cpu_load_3` or `mem_avail`.
    pub fn field_name(&self) -> String {
        match self.core {
            Some(core) => format!("{}_{}", self.kind.name(), core),
            None => self.kind.name().to_string(),
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field_name())
    }
}

type ComputeFn = Box<dyn Fn(&mut dyn MetricProvider) -> Result<f64> + Send>;

/// A metric identifier bound to the function computing it.
pub struct MetricSpec {
    pub id: MetricId,
    pub unit: Unit,
    compute: ComputeFn,
}

impl MetricSpec {
    pub fn new<F>(id: MetricId, unit: Unit, compute: F) -> Self
    where
        F: Fn(&mut dyn MetricProvider) -> Result<f64> + Send + 'static,
    {
        Self {
            id,
            unit,
            compute: Box::new(compute),
        }
    }
}

impl fmt::Debug for MetricSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSpec")
            .field("id", &self.id)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

/// Maps every known metric to the function computing it from the provider.
///
/// The set of identifiers is fixed at construction: the core count is asked
/// once and assumed stable for the process lifetime.
pub struct MetricRegistry {
    provider: Box<dyn MetricProvider>,
    specs: Vec<MetricSpec>,
    index: HashMap<MetricId, usize>,
    core_count: usize,
}

impl MetricRegistry {
    /// Register the standard metrics, reading disk space for `disk_path`.
    pub fn new(provider: Box<dyn MetricProvider>, disk_path: PathBuf) -> Result<Self> {
        let core_count = provider.core_count()?;

        let mut specs = Vec::with_capacity(core_count + 5);
        for core in 0..core_count {
            specs.push(MetricSpec::new(MetricId::cpu_load(core), Unit::Percent, move |p| {
                p.core_load(core)
            }));
        }
        specs.push(MetricSpec::new(
            MetricId::scalar(MetricKind::CpuLoadavg),
            Unit::Count,
            |p| p.load_average(),
        ));
        specs.push(MetricSpec::new(
            MetricId::scalar(MetricKind::CpuIdle),
            Unit::Percent,
            |p| p.idle_percent(),
        ));
        specs.push(MetricSpec::new(
            MetricId::scalar(MetricKind::CpuTemp),
            Unit::Celsius,
            |p| p.cpu_temp_celsius(),
        ));
        specs.push(MetricSpec::new(
            MetricId::scalar(MetricKind::MemAvail),
            Unit::Bytes,
            |p| p.mem_available_bytes().map(|b| b as f64),
        ));
        specs.push(MetricSpec::new(
            MetricId::scalar(MetricKind::DiskAvail),
            Unit::Bytes,
            move |p| p.disk_available_bytes(&disk_path).map(|b| b as f64),
        ));

        Ok(Self::from_specs(provider, specs, core_count))
    }

    /// Registry over an explicit list of specs.
    pub fn from_specs(provider: Box<dyn MetricProvider>, specs: Vec<MetricSpec>, core_count: usize) -> Self {
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.id, i))
            .collect();
        Self {
            provider,
            specs,
            index,
            core_count,
        }
    }

    pub fn core_count(&self) -> usize {
        self.core_count
    }

    /// All registered identifiers, per-core loads first.
    pub fn ids(&self) -> impl Iterator<Item = MetricId> + '_ {
        self.specs.iter().map(|spec| spec.id)
    }

    /// Look up a registered identifier by its record field name.
    pub fn lookup_field(&self, field: &str) -> Option<MetricId> {
        self.specs
            .iter()
            .map(|spec| spec.id)
            .find(|id| id.field_name() == field)
    }

    /// Compute the current value of `id` from the provider.
    pub fn resolve(&mut self, id: &MetricId) -> Result<f64> {
        let spec = self
            .index
            .get(id)
            .map(|&i| &self.specs[i])
            .ok_or_else(|| VitalsError::unavailable(id.field_name(), "metric not registered"))?;
        (spec.compute)(self.provider.as_mut())
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("specs", &self.specs)
            .field("core_count", &self.core_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct FixedProvider {
        cores: usize,
    }

    impl MetricProvider for FixedProvider {
        fn core_count(&self) -> Result<usize> {
            Ok(self.cores)
        }
        fn core_load(&mut self, core: usize) -> Result<f64> {
            Ok(10.0 * core as f64)
        }
        fn load_average(&self) -> Result<f64> {
            Ok(0.5)
        }
        fn idle_percent(&mut self) -> Result<f64> {
            Ok(90.0)
        }
        fn cpu_temp_celsius(&self) -> Result<f64> {
            Err(VitalsError::unavailable("cpu_temp", "no sensor"))
        }
        fn mem_available_bytes(&self) -> Result<u64> {
            Ok(1024)
        }
        fn disk_available_bytes(&self, path: &Path) -> Result<u64> {
            if path == Path::new("/") {
                Ok(4096)
            } else {
                Err(VitalsError::unavailable(path.display().to_string(), "missing"))
            }
        }
    }

    #[test]
    fn registers_one_load_per_core() {
        let registry =
            MetricRegistry::new(Box::new(FixedProvider { cores: 4 }), PathBuf::from("/")).unwrap();
        let loads: Vec<_> = registry
            .ids()
            .filter(|id| id.kind == MetricKind::CpuLoad)
            .map(|id| id.field_name())
            .collect();
        assert_eq!(loads, vec!["cpu_load_0", "cpu_load_1", "cpu_load_2", "cpu_load_3"]);
        assert_eq!(registry.ids().count(), 9);
    }

    #[test]
    fn resolves_through_provider() {
        let mut registry =
            MetricRegistry::new(Box::new(FixedProvider { cores: 2 }), PathBuf::from("/")).unwrap();
        assert_eq!(registry.resolve(&MetricId::cpu_load(1)).unwrap(), 10.0);
        assert_eq!(registry.resolve(&MetricId::scalar(MetricKind::MemAvail)).unwrap(), 1024.0);
        assert_eq!(registry.resolve(&MetricId::scalar(MetricKind::DiskAvail)).unwrap(), 4096.0);
        assert!(matches!(
            registry.resolve(&MetricId::scalar(MetricKind::CpuTemp)),
            Err(VitalsError::Unavailable { .. })
        ));
        assert!(registry.resolve(&MetricId::cpu_load(5)).is_err());
    }

    #[test]
    fn disk_path_is_configurable() {
        let mut registry =
            MetricRegistry::new(Box::new(FixedProvider { cores: 1 }), PathBuf::from("/nope")).unwrap();
        assert!(registry
            .resolve(&MetricId::scalar(MetricKind::DiskAvail))
            .is_err());
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!("CPU_Idle".parse::<MetricKind>().unwrap(), MetricKind::CpuIdle);
        assert!(matches!(
            "cpu_fan".parse::<MetricKind>(),
            Err(VitalsError::Config(_))
        ));
        let registry =
            MetricRegistry::new(Box::new(FixedProvider { cores: 2 }), PathBuf::from("/")).unwrap();
        assert_eq!(registry.lookup_field("cpu_load_1"), Some(MetricId::cpu_load(1)));
        assert_eq!(registry.lookup_field("cpu_load_2"), None);
    }

    #[test]
    fn kind_of_field_names() {
        assert_eq!(MetricKind::from_field("cpu_load_12"), Some(MetricKind::CpuLoad));
        assert_eq!(MetricKind::from_field("cpu_loadavg"), Some(MetricKind::CpuLoadavg));
        assert_eq!(MetricKind::from_field("disk_avail"), Some(MetricKind::DiskAvail));
        assert_eq!(MetricKind::from_field("cpu_load"), None);
        assert_eq!(MetricKind::from_field("cpu_load_x"), None);
        assert_eq!(MetricKind::from_field("outTemp"), None);
    }
}
