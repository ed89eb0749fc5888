//! CPU temperature from Linux thermal zones and hwmon chips.

use crate::error::{Result, VitalsError};
use std::fs;
use std::path::{Path, PathBuf};

/// Sensor names tried when none are configured.
pub const DEFAULT_SENSORS: &[&str] = &["cpu_thermal", "cpu-thermal", "x86_pkg_temp", "coretemp", "k10temp"];

/// A sensor found under sysfs
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub name: String,
    pub input: PathBuf,
}

/// Temperature collector
///
/// Thermal zones are matched on their `type` file first, then hwmon chips on
/// their `name` file. The first configured name with a match wins.
pub struct TemperatureCollector {
    sys_root: PathBuf,
    sensors: Vec<String>,
}

impl TemperatureCollector {
    pub fn new(sensors: Vec<String>) -> Self {
        Self::with_root("/sys", sensors)
    }

    pub fn with_root(sys_root: impl Into<PathBuf>, sensors: Vec<String>) -> Self {
        let sensors = if sensors.is_empty() {
            DEFAULT_SENSORS.iter().map(|s| s.to_string()).collect()
        } else {
            sensors
        };
        Self {
            sys_root: sys_root.into(),
            sensors,
        }
    }

    /// Every temperature sensor visible under sysfs, in discovery order.
    pub fn discover(&self) -> Vec<Sensor> {
        let mut found = scan(
            &self.sys_root.join("class/thermal"),
            "thermal_zone",
            "type",
            "temp",
        );
        found.extend(scan(
            &self.sys_root.join("class/hwmon"),
            "hwmon",
            "name",
            "temp1_input",
        ));
        found
    }

    /// Locate the first configured sensor present on this host.
    pub fn find_sensor(&self) -> Option<Sensor> {
        let available = self.discover();
        self.sensors.iter().find_map(|wanted| {
            available
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(wanted))
                .cloned()
        })
    }

    /// Current temperature in degrees Celsius.
    pub fn celsius(&self) -> Result<f64> {
        let sensor = self.find_sensor().ok_or_else(|| {
            VitalsError::unavailable(
                "cpu_temp",
                format!("no sensor named any of {}", self.sensors.join(", ")),
            )
        })?;

        let raw = fs::read_to_string(&sensor.input)
            .map_err(|e| VitalsError::from_io(sensor.input.display().to_string(), &e))?;
        let millidegrees: f64 = raw.trim().parse().map_err(|_| {
            VitalsError::provider(
                sensor.input.display().to_string(),
                format!("unparsable reading {:?}", raw.trim()),
            )
        })?;

        Ok(millidegrees / 1000.0)
    }
}

/// Directories under `root` whose name starts with `prefix`, labelled by the
/// contents of `label_file` and read from `input_file`.
fn scan(root: &Path, prefix: &str, label_file: &str, input_file: &str) -> Vec<Sensor> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    dirs.sort();

    dirs.into_iter()
        .filter_map(|dir| {
            let name = fs::read_to_string(dir.join(label_file)).ok()?;
            let input = dir.join(input_file);
            input.exists().then(|| Sensor {
                name: name.trim().to_string(),
                input,
            })
        })
        .collect()
}
