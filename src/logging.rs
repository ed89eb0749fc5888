//! Record sinks for the stand-in host: JSON Lines, human-readable text, and a
//! run summary.

use crate::channel::Channel;
use crate::display::format_field;
use crate::record::Record;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// One emitted record, tagged with the channel it went out on
#[derive(Debug, Clone, Serialize)]
pub struct EmittedRecord<'a> {
    pub channel: Channel,
    #[serde(flatten)]
    pub record: &'a Record,
}

/// Logger for writing records to a JSON Lines file
pub struct RecordLogger {
    writer: BufWriter<File>,
    records_written: u64,
}

impl RecordLogger {
    /// Create a new logger writing to the specified file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path.as_ref())
            .context("Failed to create log file")?;

        Ok(Self {
            writer: BufWriter::new(file),
            records_written: 0,
        })
    }

    /// Append a record to the log file
    pub fn log(&mut self, channel: Channel, record: &Record) -> Result<()> {
        let json = serde_json::to_string(&EmittedRecord { channel, record })?;
        writeln!(self.writer, "{}", json)?;
        self.records_written += 1;

        // Flush every 10 records to avoid losing data on crash
        if self.records_written % 10 == 0 {
            self.writer.flush()?;
        }

        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl Drop for RecordLogger {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Logger for writing human-readable record lines to a file
pub struct TextLogger {
    writer: BufWriter<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path.as_ref())
            .context("Failed to create text log file")?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        writeln!(logger.writer, "# Host Vital Statistics Log")?;
        writeln!(logger.writer, "# Started: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(logger.writer, "#")?;
        writeln!(logger.writer, "# cpu_load_N  - busy time of core N (%)")?;
        writeln!(logger.writer, "# cpu_loadavg - 5 minute load average")?;
        writeln!(logger.writer, "# cpu_idle    - idle CPU time (%)")?;
        writeln!(logger.writer, "# cpu_temp    - CPU temperature")?;
        writeln!(logger.writer, "# mem_avail   - physical memory available")?;
        writeln!(logger.writer, "# disk_avail  - disk space available")?;
        writeln!(logger.writer, "#")?;
        writeln!(logger.writer, "{:<8} {:<7} Observations", "Time", "Channel")?;
        writeln!(logger.writer, "{}", "-".repeat(80))?;

        Ok(logger)
    }

    /// Log a record in human-readable format
    pub fn log(&mut self, channel: Channel, record: &Record) -> Result<()> {
        writeln!(self.writer, "{}", format_record_line(channel, record))?;
        // Flush every record for real-time logging
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for TextLogger {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// `HH:MM:SS channel field=value ...` for one record
pub fn format_record_line(channel: Channel, record: &Record) -> String {
    let timestamp = Local
        .timestamp_opt(record.date_time, 0)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| record.date_time.to_string());

    let observations: Vec<String> = record
        .fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, format_field(name, *value, record.us_units)))
        .collect();

    format!("{:<8} {:<7} {}", timestamp, channel.name(), observations.join(" "))
}

/// Min/avg/max of one field over a run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Summary statistics calculated from the emitted records
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub duration_secs: f64,
    pub loop_packets: u64,
    pub archive_records: u64,
    /// Per field, over every record that carried it
    pub fields: BTreeMap<String, FieldSummary>,
    /// Per field, records that should have carried it but did not
    pub omissions: BTreeMap<String, u64>,
}

/// Running count, min, max and sum of one field
#[derive(Debug, Clone, Copy)]
struct FieldStats {
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
}

impl Default for FieldStats {
    fn default() -> Self {
        Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }
}

impl FieldStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
    }

    fn summary(&self) -> FieldSummary {
        FieldSummary {
            count: self.count,
            min: self.min,
            max: self.max,
            avg: if self.count == 0 { 0.0 } else { self.sum / self.count as f64 },
        }
    }
}

/// Accumulator for building the run summary
#[derive(Debug, Default)]
pub struct SummaryAccumulator {
    start_time: Option<DateTime<Utc>>,
    last_time: Option<DateTime<Utc>>,
    loop_packets: u64,
    archive_records: u64,
    fields: BTreeMap<String, FieldStats>,
    omissions: BTreeMap<String, u64>,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an emitted record and the fields that were left out of it
    pub fn add_record(&mut self, channel: Channel, record: &Record, omitted: &[String]) {
        let at = Utc.timestamp_opt(record.date_time, 0).single();
        if self.start_time.is_none() {
            self.start_time = at;
        }
        if at.is_some() {
            self.last_time = at;
        }

        match channel {
            Channel::Loop => self.loop_packets += 1,
            Channel::Archive => self.archive_records += 1,
        }
        for (name, value) in &record.fields {
            self.fields.entry(name.clone()).or_default().add(*value);
        }
        for name in omitted {
            *self.omissions.entry(name.clone()).or_default() += 1;
        }
    }

    pub fn generate_summary(&self) -> Option<RunSummary> {
        if self.loop_packets + self.archive_records == 0 {
            return None;
        }

        let duration_secs = match (self.start_time, self.last_time) {
            (Some(first), Some(last)) => (last - first).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        };

        let fields = self
            .fields
            .iter()
            .map(|(name, stats)| (name.clone(), stats.summary()))
            .collect();

        Some(RunSummary {
            duration_secs,
            loop_packets: self.loop_packets,
            archive_records: self.archive_records,
            fields,
            omissions: self.omissions.clone(),
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
