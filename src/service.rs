//! The host-facing side of the plugin: registration, per-record callbacks
//! and on-demand queries.

use crate::augment::{AugmentReport, RecordAugmenter};
use crate::channel::Channel;
use crate::config::Config;
use crate::error::Result;
use crate::metrics::MetricProvider;
use crate::record::{Record, UnitSystem};
use crate::registry::{MetricRegistry, Unit};
use log::{debug, info, warn};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Which record events the host should deliver to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bindings {
    pub new_loop_packet: bool,
    pub new_archive_record: bool,
}

impl Bindings {
    pub fn is_empty(&self) -> bool {
        !self.new_loop_packet && !self.new_archive_record
    }
}

/// An observation type announced to the host
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationType {
    pub name: String,
    pub unit: Unit,
    pub group: &'static str,
    pub description: &'static str,
}

/// On-demand access to observation types, independent of record emission.
pub trait TypeHandler {
    /// Current value of `obs_type` in `unit_system`.
    ///
    /// `Ok(None)` means the type is not provided by this handler.
    fn get_scalar(&mut self, obs_type: &str, unit_system: UnitSystem) -> Result<Option<f64>>;
}

/// One plugin instance, constructed per host registration.
pub struct VitalStatsService {
    augmenter: RecordAugmenter,
    bindings: Bindings,
}

impl VitalStatsService {
    /// Validate `config` and build the service over `provider`.
    ///
    /// Configuration errors are returned before anything is bound.
    pub fn new(config: &Config, provider: Box<dyn MetricProvider>) -> Result<Self> {
        debug!("VitalStatsService {} starting", VERSION);

        let filter = config.validate()?;
        let registry = MetricRegistry::new(provider, config.disk_path.clone())?;
        let augmenter = RecordAugmenter::new(registry, filter, config.cycle_mode);

        let loop_kinds = augmenter.filter().kinds_on(Channel::Loop);
        let archive_kinds = augmenter.filter().kinds_on(Channel::Archive);
        debug!(
            "VitalStatsService loop_stats={:?} archive_stats={:?}",
            loop_kinds, archive_kinds
        );

        let bindings = Bindings {
            new_loop_packet: augmenter.filter().any_on(Channel::Loop),
            new_archive_record: augmenter.filter().any_on(Channel::Archive),
        };
        if bindings.is_empty() {
            warn!("VitalStatsService no stat bindings, not binding to any records");
        } else {
            info!(
                "VitalStatsService {}: {} cores, loop={}, archive={}, cycle mode {:?}",
                VERSION,
                augmenter.registry().core_count(),
                bindings.new_loop_packet,
                bindings.new_archive_record,
                config.cycle_mode
            );
        }

        Ok(Self { augmenter, bindings })
    }

    pub fn bindings(&self) -> Bindings {
        self.bindings
    }

    /// Every observation type this service can produce, for unit registration.
    pub fn observation_types(&self) -> Vec<ObservationType> {
        self.augmenter
            .registry()
            .ids()
            .map(|id| {
                let unit = id.kind.unit();
                ObservationType {
                    name: id.field_name(),
                    unit,
                    group: unit.group(),
                    description: id.kind.description(),
                }
            })
            .collect()
    }

    /// Loop packet callback.
    pub fn new_loop_packet(&mut self, packet: &mut Record) -> AugmentReport {
        self.handle(packet, Channel::Loop)
    }

    /// Archive record callback.
    pub fn new_archive_record(&mut self, record: &mut Record) -> AugmentReport {
        self.handle(record, Channel::Archive)
    }

    fn handle(&mut self, record: &mut Record, channel: Channel) -> AugmentReport {
        let bound = match channel {
            Channel::Loop => self.bindings.new_loop_packet,
            Channel::Archive => self.bindings.new_archive_record,
        };
        if !bound {
            return AugmentReport::default();
        }
        self.augmenter.augment(record, channel)
    }

    /// Start a fresh cycle so the next on-demand queries re-read the system.
    pub fn refresh(&mut self) -> u64 {
        self.augmenter.advance()
    }

    /// Stop contributing to records.
    pub fn shut_down(&mut self) {
        debug!("VitalStatsService shutdown");
        self.bindings = Bindings::default();
    }
}

impl TypeHandler for VitalStatsService {
    fn get_scalar(&mut self, obs_type: &str, unit_system: UnitSystem) -> Result<Option<f64>> {
        self.augmenter.query(obs_type, unit_system).transpose()
    }
}
