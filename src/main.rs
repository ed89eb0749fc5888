//! vitalstats - Host vital statistics for a weather-station record pipeline.
//!
//! Stands in for the host framework: emits loop packets and archive records on
//! a schedule, lets the service augment them, and writes the result to stdout,
//! log files or a live terminal display.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info, warn};
use ratatui::{prelude::CrosstermBackend, style::Color, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use vitalstats::{
    display::{self, format_field, BusyHistory, VitalRow},
    logging::{format_record_line, EmittedRecord, RecordLogger, SummaryAccumulator, TextLogger},
    service::VERSION,
    AugmentReport, Channel, Config, LinuxProvider, Record, TypeHandler, UnitSystem, VitalStatsService,
};

/// Host vital statistics for loop packets and archive records
#[derive(Parser, Debug)]
#[command(name = "vitalstats")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between loop packets
    #[arg(short = 'i', long, default_value = "2")]
    loop_interval: f64,

    /// Seconds between archive records (a whole number of minutes)
    #[arg(short, long, default_value = "60", value_parser = parse_archive_interval)]
    archive_interval: u64,

    /// Run for specified duration (seconds), then exit with summary
    #[arg(short, long)]
    duration: Option<u64>,

    /// Unit system of the emitted records (US, METRIC, METRICWX)
    #[arg(short, long, default_value = "METRIC")]
    unit_system: UnitSystem,

    /// Print records to stdout as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log every record to a JSON Lines file
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Log every record to a human-readable text file
    #[arg(short = 'o', long)]
    text_log: Option<PathBuf>,

    /// Generate summary report at end
    #[arg(long)]
    summary: bool,

    /// Print the current value of one observation type and exit
    #[arg(short, long)]
    query: Option<String>,

    /// List the observation types and exit
    #[arg(long)]
    list: bool,

    /// Show the live status display instead of printing records
    #[arg(long)]
    tui: bool,
}

/// Archive records carry their interval in minutes, so only whole minutes are accepted.
fn parse_archive_interval(arg: &str) -> std::result::Result<u64, String> {
    let secs: u64 = arg.parse().map_err(|e| format!("{}", e))?;
    if secs == 0 || secs % 60 != 0 {
        return Err(format!("{} is not a whole number of minutes (use 60, 300, ...)", secs));
    }
    Ok(secs)
}

/// Application state
struct App {
    service: VitalStatsService,
    unit_system: UnitSystem,
    archive_interval: u64,
    json: bool,

    record_logger: Option<RecordLogger>,
    text_logger: Option<TextLogger>,
    accumulator: SummaryAccumulator,

    last_loop: Option<Record>,
    last_archive: Option<Record>,
    rows: Vec<VitalRow>,
    busy_history: BusyHistory,

    status_message: Option<(String, Instant)>,
    tui_mode: bool, // Whether running in TUI mode (no stdout records)
}

impl App {
    fn new(args: &Args, service: VitalStatsService) -> Result<Self> {
        let record_logger = match args.log {
            Some(ref path) => Some(RecordLogger::new(path)?),
            None => None,
        };
        let text_logger = match args.text_log {
            Some(ref path) => Some(TextLogger::new(path)?),
            None => None,
        };

        Ok(Self {
            service,
            unit_system: args.unit_system,
            archive_interval: args.archive_interval,
            json: args.json,
            record_logger,
            text_logger,
            accumulator: SummaryAccumulator::new(),
            last_loop: None,
            last_archive: None,
            rows: Vec::new(),
            busy_history: BusyHistory::default(),
            status_message: None,
            tui_mode: args.tui,
        })
    }

    /// Emit one loop packet if the service is bound to them.
    fn emit_loop(&mut self) -> Result<()> {
        if !self.service.bindings().new_loop_packet {
            return Ok(());
        }
        let mut packet = Record::new(Utc::now().timestamp(), self.unit_system);
        let report = self.service.new_loop_packet(&mut packet);
        self.emit(Channel::Loop, packet, report)
    }

    /// Emit one archive record stamped at the start of the current interval.
    fn emit_archive(&mut self) -> Result<()> {
        if !self.service.bindings().new_archive_record {
            return Ok(());
        }
        let now = Utc::now().timestamp();
        let stamp = now - now.rem_euclid(self.archive_interval as i64);
        let minutes = (self.archive_interval / 60) as u32;
        let mut record = Record::new(stamp, self.unit_system).with_interval(minutes);
        let report = self.service.new_archive_record(&mut record);
        self.emit(Channel::Archive, record, report)
    }

    fn emit(&mut self, channel: Channel, record: Record, report: AugmentReport) -> Result<()> {
        if let Some(ref mut logger) = self.record_logger {
            logger.log(channel, &record)?;
        }
        if let Some(ref mut logger) = self.text_logger {
            logger.log(channel, &record)?;
        }
        self.accumulator.add_record(channel, &record, &report.omitted);

        if !self.tui_mode {
            if self.json {
                println!("{}", serde_json::to_string(&EmittedRecord { channel, record: &record })?);
            } else {
                println!("{}", format_record_line(channel, &record));
            }
        }

        match channel {
            Channel::Loop => self.last_loop = Some(record),
            Channel::Archive => self.last_archive = Some(record),
        }
        Ok(())
    }

    /// Read every observation type on demand for the status panel.
    fn update_rows(&mut self) {
        let types = self.service.observation_types();
        let mut rows = Vec::with_capacity(types.len());
        for obs in types {
            let value = match self.service.get_scalar(&obs.name, self.unit_system) {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Err("not provided".to_string()),
                Err(e) => Err(e.to_string()),
            };
            if obs.name == "cpu_idle" {
                if let Ok(idle) = value {
                    self.busy_history.push(idle);
                }
            }
            rows.push(VitalRow {
                name: obs.name,
                unit: obs.unit,
                value,
            });
        }
        self.rows = rows;
    }

    fn set_status(&mut self, msg: &str) {
        self.status_message = Some((msg.to_string(), Instant::now()));
    }

    /// Status message, cleared after 3 seconds
    fn get_status(&self) -> Option<&str> {
        self.status_message
            .as_ref()
            .filter(|(_, at)| at.elapsed() < Duration::from_secs(3))
            .map(|(msg, _)| msg.as_str())
    }

    fn finish(&mut self) -> Result<()> {
        self.service.shut_down();
        if let Some(ref mut logger) = self.record_logger {
            logger.flush()?;
            info!("{} records written to JSON log", logger.records_written());
        }
        Ok(())
    }

    fn print_summary(&self) {
        let Some(summary) = self.accumulator.generate_summary() else {
            println!("No records were emitted.");
            return;
        };

        println!("\n{}", "=".repeat(60));
        println!("                   VITAL STATISTICS SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "Duration: {:.1}s  Loop packets: {}  Archive records: {}",
            summary.duration_secs, summary.loop_packets, summary.archive_records
        );
        println!();
        println!("{:<14} {:>6} {:>10} {:>10} {:>10}", "Field", "Count", "Min", "Avg", "Max");
        for (name, field) in &summary.fields {
            println!(
                "{:<14} {:>6} {:>10} {:>10} {:>10}",
                name,
                field.count,
                format_field(name, field.min, self.unit_system),
                format_field(name, field.avg, self.unit_system),
                format_field(name, field.max, self.unit_system),
            );
        }

        if !summary.omissions.is_empty() {
            println!();
            println!("Omitted readings:");
            for (name, count) in &summary.omissions {
                println!("  • {}: {} records", name, count);
            }
        }
        println!("{}", "=".repeat(60));
    }
}

fn run_tui(mut app: App, loop_interval: Duration, duration: Option<Duration>) -> Result<App> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let archive_period = Duration::from_secs(app.archive_interval);
    let start_time = Instant::now();
    let mut last_tick = Instant::now();
    let mut last_archive = Instant::now();

    let result = (|| -> Result<()> {
        app.service.refresh();
        app.update_rows();

        loop {
            if let Some(dur) = duration {
                if start_time.elapsed() >= dur {
                    break;
                }
            }

            terminal.draw(|f| {
                let (vitals, loop_area, archive_area, history, help) = display::layout(f.area());
                display::render_vitals(f, vitals, &app.rows, app.unit_system);
                display::render_record(f, loop_area, "Loop packet", app.last_loop.as_ref(), Color::Green);
                display::render_record(f, archive_area, "Archive record", app.last_archive.as_ref(), Color::Yellow);
                display::render_busy_history(f, history, &app.busy_history);
                display::render_help_bar(f, help, app.get_status());
            })?;

            let timeout = loop_interval.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => break,
                            KeyCode::Char('r') => {
                                app.accumulator.clear();
                                app.set_status("Summary reset");
                            }
                            _ => {}
                        }
                    }
                }
            }

            let archive_due = last_archive.elapsed() >= archive_period;
            if archive_due {
                app.emit_archive()?;
                last_archive = Instant::now();
            }

            if last_tick.elapsed() >= loop_interval {
                // The panel reads from the cycle of the record just emitted
                if app.service.bindings().new_loop_packet {
                    app.emit_loop()?;
                } else if !(archive_due && app.service.bindings().new_archive_record) {
                    app.service.refresh();
                }
                app.update_rows();
                last_tick = Instant::now();
            }
        }
        Ok(())
    })();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result.map(|_| app)
}

async fn run_no_tui(mut app: App, loop_interval: Duration, duration: Option<Duration>) -> Result<App> {
    let mut loop_tick = tokio::time::interval(loop_interval);
    loop_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // First archive record lands on the next interval boundary
    let now = Utc::now().timestamp();
    let period = app.archive_interval as i64;
    let until_boundary = Duration::from_secs((period - now.rem_euclid(period)) as u64);
    let mut archive_tick = tokio::time::interval_at(
        tokio::time::Instant::now() + until_boundary,
        Duration::from_secs(app.archive_interval),
    );

    let deadline = async {
        match duration {
            Some(dur) => tokio::time::sleep(dur).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = loop_tick.tick() => app.emit_loop()?,
            _ = archive_tick.tick() => app.emit_archive()?,
            _ = &mut deadline => break,
            _ = &mut shutdown => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(app)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).unwrap_or_else(|err| {
        env_logger::init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("vitalstats {} starting up...", VERSION);
    info!("Cycle mode: {:?}", config.cycle_mode);
    info!("Disk path: {}", config.disk_path.display());
    info!("Unit system: {}", args.unit_system);

    let provider = LinuxProvider::new(config.temp_sensors.clone());
    let mut service = VitalStatsService::new(&config, Box::new(provider))
        .context("Failed to start the vital statistics service")?;

    if args.list {
        for obs in service.observation_types() {
            println!("{:<14} {:<18} {}", obs.name, obs.group, obs.description);
        }
        return Ok(());
    }

    if let Some(ref field) = args.query {
        service.refresh();
        match service.get_scalar(field, args.unit_system)? {
            Some(value) => println!("{}={}", field, format_field(field, value, args.unit_system)),
            None => anyhow::bail!("unknown observation type {:?}", field),
        }
        return Ok(());
    }

    if service.bindings().is_empty() {
        warn!("Nothing is bound; records will pass through unchanged");
    }

    let loop_interval = Duration::from_secs_f64(args.loop_interval.max(0.1));
    let duration = args.duration.map(Duration::from_secs);
    let summary = args.summary || args.duration.is_some();

    let app = App::new(&args, service)?;

    let result = if args.tui {
        run_tui(app, loop_interval, duration)
    } else {
        run_no_tui(app, loop_interval, duration).await
    };

    match result {
        Ok(mut app) => {
            app.finish()?;
            if summary {
                app.print_summary();
            }
        }
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    }

    if let Some(ref log_path) = args.log {
        eprintln!("Records logged to: {}", log_path.display());
    }
    if let Some(ref log_path) = args.text_log {
        eprintln!("Text log written to: {}", log_path.display());
    }

    Ok(())
}
