//! Which metrics go into loop packets and which into archive records.

use crate::error::{Result, VitalsError};
use crate::registry::{MetricId, MetricKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The two output streams of the host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Every loop packet (high frequency)
    Loop,
    /// Every archive record (periodic)
    Archive,
}

impl Channel {
    pub fn name(self) -> &'static str {
        match self {
            Channel::Loop => "loop",
            Channel::Archive => "archive",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loop" => Ok(Channel::Loop),
            "archive" => Ok(Channel::Archive),
            other => Err(VitalsError::Config(format!(
                "unknown channel {:?} (expected \"loop\" or \"archive\")",
                other
            ))),
        }
    }
}

/// Subset of {loop, archive}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelSet {
    pub on_loop: bool,
    pub on_archive: bool,
}

impl ChannelSet {
    pub const NONE: ChannelSet = ChannelSet {
        on_loop: false,
        on_archive: false,
    };

    /// Membership of a metric absent from configuration.
    pub const DEFAULT: ChannelSet = ChannelSet {
        on_loop: false,
        on_archive: true,
    };

    pub fn contains(&self, channel: Channel) -> bool {
        match channel {
            Channel::Loop => self.on_loop,
            Channel::Archive => self.on_archive,
        }
    }

    pub fn insert(&mut self, channel: Channel) {
        match channel {
            Channel::Loop => self.on_loop = true,
            Channel::Archive => self.on_archive = true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.on_loop && !self.on_archive
    }

    /// Parse channel names, e.g. `loop,archive`.
    ///
    /// Names are trimmed and case-insensitive; empty entries are skipped, so
    /// an empty string yields the empty set.
    pub fn parse<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut set = ChannelSet::NONE;
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            set.insert(name.parse()?);
        }
        Ok(set)
    }

    pub fn parse_list(list: &str) -> Result<Self> {
        Self::parse(list.split(','))
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.on_loop, self.on_archive) {
            (true, true) => f.write_str("loop,archive"),
            (true, false) => f.write_str("loop"),
            (false, true) => f.write_str("archive"),
            (false, false) => f.write_str("(none)"),
        }
    }
}

/// Decides, per metric, which channels it is emitted into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelFilter {
    memberships: HashMap<MetricKind, ChannelSet>,
}

impl ChannelFilter {
    /// Filter with every metric at its default membership.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (metric name, channel list) pairs.
    ///
    /// Unknown metric names or channel names fail the whole build.
    pub fn from_lists<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut filter = Self::new();
        for (metric, list) in entries {
            let kind: MetricKind = metric.parse()?;
            let set = ChannelSet::parse_list(list)
                .map_err(|e| match e {
                    VitalsError::Config(msg) => VitalsError::Config(format!("{} = {:?}: {}", kind, list, msg)),
                    other => other,
                })?;
            filter.set(kind, set);
        }
        Ok(filter)
    }

    pub fn set(&mut self, kind: MetricKind, set: ChannelSet) {
        self.memberships.insert(kind, set);
    }

    pub fn membership(&self, kind: MetricKind) -> ChannelSet {
        self.memberships
            .get(&kind)
            .copied()
            .unwrap_or(ChannelSet::DEFAULT)
    }

    pub fn applies_to(&self, id: &MetricId, channel: Channel) -> bool {
        self.membership(id.kind).contains(channel)
    }

    /// Whether any metric is emitted into `channel`.
    pub fn any_on(&self, channel: Channel) -> bool {
        MetricKind::ALL
            .iter()
            .any(|&kind| self.membership(kind).contains(channel))
    }

    /// Kinds emitted into `channel`, in declaration order.
    pub fn kinds_on(&self, channel: Channel) -> Vec<MetricKind> {
        MetricKind::ALL
            .into_iter()
            .filter(|&kind| self.membership(kind).contains(channel))
            .collect()
    }
}
