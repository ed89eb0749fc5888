//! Terminal live status display using ratatui, plus value formatting shared
//! with the text log.

use crate::record::{Record, UnitSystem};
use crate::registry::{MetricKind, Unit};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline},
    Frame,
};

/// Get the last N elements from a slice to fit the graph width
/// The sparkline uses 1 char per data point, so we use area.width - 2 (for borders)
fn slice_for_width(data: &[u64], area: Rect) -> &[u64] {
    let graph_width = area.width.saturating_sub(2) as usize;
    if data.len() <= graph_width {
        data
    } else {
        &data[data.len() - graph_width..]
    }
}

/// Compact byte count for narrow columns, e.g. `3.2G` or `512M`
pub fn format_bytes_short(bytes: u64) -> String {
    const SCALES: [(&str, u32); 4] = [("T", 40), ("G", 30), ("M", 20), ("K", 10)];

    for (suffix, shift) in SCALES {
        let scale = 1u64 << shift;
        if bytes >= scale {
            let scaled = bytes as f64 / scale as f64;
            return if shift >= 30 {
                format!("{:.1}{}", scaled, suffix)
            } else {
                format!("{:.0}{}", scaled, suffix)
            };
        }
    }
    format!("{}B", bytes)
}

/// Format a value already expressed in `system` for display
pub fn format_value(unit: Unit, value: f64, system: UnitSystem) -> String {
    match unit {
        Unit::Percent => format!("{:.1}%", value),
        Unit::Count => format!("{:.2}", value),
        Unit::Bytes => format_bytes_short(value.max(0.0) as u64),
        Unit::Celsius => match system {
            UnitSystem::Us => format!("{:.1}°F", value),
            _ => format!("{:.1}°C", value),
        },
    }
}

/// Format a record field by looking up its unit from the field name
pub fn format_field(field: &str, value: f64, system: UnitSystem) -> String {
    match MetricKind::from_field(field) {
        Some(kind) => format_value(kind.unit(), value, system),
        None => format!("{}", value),
    }
}

/// Get color based on percentage value
fn percentage_color(value: f64, warn_threshold: f64, crit_threshold: f64) -> Color {
    if value >= crit_threshold {
        Color::Red
    } else if value >= warn_threshold {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Helper to render a labeled progress bar with readable text
fn render_progress_bar(
    label: &str,
    value: &str,
    percent: f64,
    width: usize,
    warn: f64,
    crit: f64,
) -> Line<'static> {
    let bar_width = width.saturating_sub(label.len() + value.len() + 5);
    let pct = percent.clamp(0.0, 100.0);
    let filled = ((pct / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);
    let color = percentage_color(pct, warn, crit);

    Line::from(vec![
        Span::raw(label.to_string()),
        Span::raw(" ["),
        Span::styled("█".repeat(filled), Style::default().fg(color)),
        Span::styled("░".repeat(empty), Style::default().fg(Color::DarkGray)),
        Span::raw("] "),
        Span::styled(value.to_string(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ])
}

/// One row of the live status panel
#[derive(Debug, Clone)]
pub struct VitalRow {
    pub name: String,
    pub unit: Unit,
    /// The value, or why it could not be read
    pub value: Result<f64, String>,
}

/// Render the on-demand readings of every observation type
pub fn render_vitals(f: &mut Frame, area: Rect, rows: &[VitalRow], system: UnitSystem) {
    let block = Block::default()
        .title(" Vitals ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let width = inner.width as usize;
    let lines: Vec<Line> = rows
        .iter()
        .map(|row| match (&row.value, row.unit) {
            (Ok(value), Unit::Percent) => {
                let label = format!("{:<12}", row.name);
                // Busy figures go red when high, idle goes red when low
                let busy = if row.name == MetricKind::CpuIdle.name() {
                    100.0 - value
                } else {
                    *value
                };
                render_progress_bar(&label, &format!("{:>6.1}%", value), busy, width, 70.0, 90.0)
            }
            (Ok(value), unit) => Line::from(vec![
                Span::raw(format!("{:<12} ", row.name)),
                Span::styled(
                    format_value(unit, *value, system),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
            ]),
            (Err(reason), _) => Line::from(vec![
                Span::raw(format!("{:<12} ", row.name)),
                Span::styled("N/A", Style::default().fg(Color::DarkGray)),
                Span::styled(format!("  {}", reason), Style::default().fg(Color::DarkGray)),
            ]),
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}

/// Render the most recent record emitted on one channel
pub fn render_record(f: &mut Frame, area: Rect, title: &str, record: Option<&Record>, color: Color) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines: Vec<Line> = match record {
        Some(record) => {
            let mut lines = vec![Line::from(vec![
                Span::raw("dateTime: "),
                Span::styled(record.date_time.to_string(), Style::default().fg(Color::Gray)),
                Span::raw("  usUnits: "),
                Span::styled(record.us_units.to_string(), Style::default().fg(Color::Gray)),
            ])];
            lines.extend(record.fields.iter().map(|(name, value)| {
                Line::from(vec![
                    Span::raw(format!("{:<12} ", name)),
                    Span::styled(
                        format_field(name, *value, record.us_units),
                        Style::default().fg(color),
                    ),
                ])
            }));
            lines
        }
        None => vec![Line::from(Span::styled(
            "waiting for first record",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    f.render_widget(Paragraph::new(lines), inner);
}

/// Busy-CPU history for sparkline display
pub struct BusyHistory {
    pub busy: Vec<u64>, // 100 - cpu_idle (0-100)
    pub max_samples: usize,
}

impl BusyHistory {
    pub fn new(max_samples: usize) -> Self {
        Self {
            busy: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn push(&mut self, idle_percent: f64) {
        if self.busy.len() >= self.max_samples {
            self.busy.remove(0);
        }
        self.busy.push((100.0 - idle_percent).clamp(0.0, 100.0) as u64);
    }
}

impl Default for BusyHistory {
    fn default() -> Self {
        Self::new(500) // Large buffer, display will use graph width
    }
}

/// Render the busy-CPU sparkline
pub fn render_busy_history(f: &mut Frame, area: Rect, history: &BusyHistory) {
    let data = slice_for_width(&history.busy, area);
    let max_val = data.iter().max().copied().unwrap_or(0);
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(" CPU busy % (max {}%) ", max_val)),
        )
        .data(data)
        .max(100)
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(sparkline, area);
}

/// Split the screen into vitals / records / history / help bar areas
pub fn layout(area: Rect) -> (Rect, Rect, Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // Vitals + records
            Constraint::Length(6), // History sparkline
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(rows[0]);

    (columns[0], columns[1], columns[2], rows[1], rows[2])
}

/// Render help bar at the bottom
pub fn render_help_bar(f: &mut Frame, area: Rect, status: Option<&str>) {
    let (text, style) = if let Some(msg) = status {
        (
            format!(" {} ", msg),
            Style::default().fg(Color::White).bg(Color::Blue),
        )
    } else {
        (
            " q: Quit | r: Reset summary ".to_string(),
            Style::default().fg(Color::Black).bg(Color::Gray),
        )
    };

    let paragraph = Paragraph::new(text).style(style);
    f.render_widget(paragraph, area);
}
