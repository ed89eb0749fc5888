//! The host-owned output object being augmented.

use crate::error::{Result, VitalsError};
use crate::registry::Unit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Unit system of a record. Serialized as the host's numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "u8", try_from = "u8")]
pub enum UnitSystem {
    Us,
    #[default]
    Metric,
    Metricwx,
}

impl UnitSystem {
    pub fn code(self) -> u8 {
        match self {
            UnitSystem::Us => 1,
            UnitSystem::Metric => 16,
            UnitSystem::Metricwx => 17,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(UnitSystem::Us),
            16 => Some(UnitSystem::Metric),
            17 => Some(UnitSystem::Metricwx),
            _ => None,
        }
    }

    /// Convert `value`, expressed in `unit`, into this unit system.
    pub fn convert(self, unit: Unit, value: f64) -> f64 {
        match (unit, self) {
            (Unit::Celsius, UnitSystem::Us) => value * 9.0 / 5.0 + 32.0,
            _ => value,
        }
    }

    /// The host's unit label for `unit` in this unit system.
    pub fn label(self, unit: Unit) -> &'static str {
        match (unit, self) {
            (Unit::Percent, _) => "percent",
            (Unit::Count, _) => "count",
            (Unit::Bytes, _) => "byte",
            (Unit::Celsius, UnitSystem::Us) => "degree_F",
            (Unit::Celsius, _) => "degree_C",
        }
    }
}

impl From<UnitSystem> for u8 {
    fn from(system: UnitSystem) -> u8 {
        system.code()
    }
}

impl TryFrom<u8> for UnitSystem {
    type Error = VitalsError;

    fn try_from(code: u8) -> Result<Self> {
        UnitSystem::from_code(code)
            .ok_or_else(|| VitalsError::Config(format!("unknown usUnits code {}", code)))
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitSystem::Us => "US",
            UnitSystem::Metric => "METRIC",
            UnitSystem::Metricwx => "METRICWX",
        };
        f.write_str(name)
    }
}

impl FromStr for UnitSystem {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(UnitSystem::Us),
            "METRIC" => Ok(UnitSystem::Metric),
            "METRICWX" => Ok(UnitSystem::Metricwx),
            other => Err(VitalsError::Config(format!("unknown unit system {:?}", other))),
        }
    }
}

/// A loop packet or archive record: a timestamp, a unit system and named
/// numeric observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Epoch seconds
    #[serde(rename = "dateTime")]
    pub date_time: i64,
    #[serde(rename = "usUnits")]
    pub us_units: UnitSystem,
    /// Archive interval in minutes (archive records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,
}

impl Record {
    pub fn new(date_time: i64, us_units: UnitSystem) -> Self {
        Self {
            date_time,
            us_units,
            interval: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_interval(mut self, minutes: u32) -> Self {
        self.interval = Some(minutes);
        self
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: f64) {
        self.fields.insert(field.into(), value);
    }
}
