//! Writes the applicable metrics into a host record.

use crate::cache::CycleCache;
use crate::channel::{Channel, ChannelFilter};
use crate::error::{Result, VitalsError};
use crate::record::{Record, UnitSystem};
use crate::registry::{MetricId, MetricRegistry};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// When a new collection cycle begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleMode {
    /// Every record is its own cycle.
    #[default]
    PerRecord,
    /// Records stamped with the same `dateTime` share one cycle, so a loop
    /// packet and an archive record for the same moment report identical values.
    PerTimestamp,
}

/// Outcome of augmenting one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AugmentReport {
    /// Cycle sequence number the values belong to
    pub cycle: u64,
    pub written: Vec<String>,
    pub omitted: Vec<String>,
}

/// Owns the registry, cycle cache and channel filter for one plugin instance.
#[derive(Debug)]
pub struct RecordAugmenter {
    registry: MetricRegistry,
    cache: CycleCache,
    filter: ChannelFilter,
    mode: CycleMode,
    last_stamp: Option<i64>,
}

impl RecordAugmenter {
    pub fn new(registry: MetricRegistry, filter: ChannelFilter, mode: CycleMode) -> Self {
        Self {
            registry,
            cache: CycleCache::new(),
            filter,
            mode,
            last_stamp: None,
        }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn filter(&self) -> &ChannelFilter {
        &self.filter
    }

    pub fn cache(&self) -> &CycleCache {
        &self.cache
    }

    /// Identifiers emitted into `channel`, in registry order.
    pub fn ids_on(&self, channel: Channel) -> Vec<MetricId> {
        self.registry
            .ids()
            .filter(|id| self.filter.applies_to(id, channel))
            .collect()
    }

    /// Start the cycle for a record stamped `date_time`, returning its sequence.
    fn begin_cycle(&mut self, date_time: i64) -> u64 {
        match self.mode {
            CycleMode::PerRecord => self.cache.advance(),
            CycleMode::PerTimestamp => {
                if self.last_stamp == Some(date_time) && self.cache.current() > 0 {
                    self.cache.current()
                } else {
                    self.last_stamp = Some(date_time);
                    self.cache.advance()
                }
            }
        }
    }

    /// Add every metric bound to `channel` into `record`.
    ///
    /// A metric that cannot be read is left out of the record; the others are
    /// still written.
    pub fn augment(&mut self, record: &mut Record, channel: Channel) -> AugmentReport {
        let seq = self.begin_cycle(record.date_time);
        let mut report = AugmentReport {
            cycle: seq,
            ..Default::default()
        };

        for id in self.ids_on(channel) {
            let field = id.field_name();
            match self.cache.get(&id, seq, &mut self.registry) {
                Ok(value) => {
                    let unit = id.kind.unit();
                    let converted = record.us_units.convert(unit, value);
                    debug!("{} {}={} {}", channel, field, converted, record.us_units.label(unit));
                    record.insert(field.clone(), converted);
                    report.written.push(field);
                }
                Err(err) => {
                    log_omission(channel, &field, &err);
                    report.omitted.push(field);
                }
            }
        }

        report
    }

    /// Start a cycle outside any record, for on-demand readers.
    pub fn advance(&mut self) -> u64 {
        self.last_stamp = None;
        self.cache.advance()
    }

    /// Value of the metric named `field` within the current cycle, converted
    /// to `unit_system`. `None` when no such metric is registered.
    pub fn query(&mut self, field: &str, unit_system: UnitSystem) -> Option<Result<f64>> {
        let id = self.registry.lookup_field(field)?;
        let value = self.cache.get_current(&id, &mut self.registry);
        Some(value.map(|v| unit_system.convert(id.kind.unit(), v)))
    }
}

fn log_omission(channel: Channel, field: &str, err: &VitalsError) {
    match err {
        VitalsError::Provider { .. } => warn!("{} {} omitted: {}", channel, field, err),
        _ => debug!("{} {} omitted: {}", channel, field, err),
    }
}
