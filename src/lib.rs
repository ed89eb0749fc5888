//! vitalstats - host vital statistics for a weather-station data service
//!
//! Adds observation types describing the machine the station software runs
//! on (per-core CPU load, load average, CPU idle, CPU temperature, available
//! memory and disk space) to loop packets and archive records.
//!
//! The pieces, leaf first:
//! - [`metrics`]: raw readings from the operating system
//! - [`registry`]: metric identifiers and their compute functions
//! - [`cache`]: one computed value per metric per collection cycle
//! - [`channel`]: which metrics go into loop packets and archive records
//! - [`augment`]: writes the applicable values into a record
//! - [`service`]: what the host framework registers and calls

pub mod augment;
pub mod cache;
pub mod channel;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod service;

pub use augment::{AugmentReport, CycleMode, RecordAugmenter};
pub use cache::CycleCache;
pub use channel::{Channel, ChannelFilter, ChannelSet};
pub use config::Config;
pub use error::VitalsError;
pub use metrics::{LinuxProvider, MetricProvider};
pub use record::{Record, UnitSystem};
pub use registry::{MetricId, MetricKind, MetricRegistry, MetricSpec, Unit};
pub use service::{Bindings, TypeHandler, VitalStatsService};
