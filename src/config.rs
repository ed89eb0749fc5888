//! Configuration management for vitalstats
//!
//! Settings are layered with `figment`: built-in defaults, then an optional
//! TOML file, then environment variables prefixed `VITALSTATS_` (nested keys
//! use a double underscore, e.g. `VITALSTATS_BINDINGS__CPU_IDLE=loop`).
//!
//! Bindings stay stringly typed only until [`Config::channel_filter`] runs the
//! validation pass; after that every metric name and channel name is known.

use crate::augment::CycleMode;
use crate::channel::{ChannelFilter, ChannelSet};
use crate::error::{Result, VitalsError};
use crate::registry::MetricKind;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A binding value: `"loop,archive"` or `["loop", "archive"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingValue {
    List(Vec<String>),
    Text(String),
}

impl BindingValue {
    pub fn to_channel_set(&self) -> Result<ChannelSet> {
        match self {
            BindingValue::Text(text) => ChannelSet::parse_list(text),
            BindingValue::List(items) => ChannelSet::parse(items.iter().map(String::as_str)),
        }
    }
}

impl From<&str> for BindingValue {
    fn from(text: &str) -> Self {
        BindingValue::Text(text.to_string())
    }
}

/// The main configuration struct for the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The logging level used by the stand-in host.
    pub log_level: String,
    /// When a new collection cycle starts.
    pub cycle_mode: CycleMode,
    /// Path whose filesystem is reported by `disk_avail`.
    pub disk_path: PathBuf,
    /// Temperature sensor names to try, in order. Empty means the built-in list.
    pub temp_sensors: Vec<String>,
    /// Metric name -> channels it is emitted into. Absent metrics go to archive.
    pub bindings: BTreeMap<String, BindingValue>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cycle_mode: CycleMode::PerRecord,
            disk_path: PathBuf::from("/"),
            temp_sensors: Vec::new(),
            bindings: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the optional file and the environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(VitalsError::ConfigLoad(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed("VITALSTATS_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (defaults fill the gaps).
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()?;
        Ok(config)
    }

    /// Validate the bindings and build the channel filter from them.
    pub fn channel_filter(&self) -> Result<ChannelFilter> {
        let mut filter = ChannelFilter::new();
        for (name, value) in &self.bindings {
            let kind: MetricKind = name.parse()?;
            let set = value.to_channel_set().map_err(|e| match e {
                VitalsError::Config(msg) => VitalsError::Config(format!("binding for {}: {}", kind, msg)),
                other => other,
            })?;
            filter.set(kind, set);
        }
        Ok(filter)
    }

    /// Full validation pass; nothing is started on error.
    pub fn validate(&self) -> Result<ChannelFilter> {
        if self.disk_path.as_os_str().is_empty() {
            return Err(VitalsError::Config("disk_path must not be empty".into()));
        }
        self.channel_filter()
    }
}
