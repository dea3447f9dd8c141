// Console renderers - one view model, two layouts picked by terminal width
use crate::application::acquisition_service::HistoryPhase;
use crate::presentation::dashboard::DashboardFrame;
use std::fmt::Write;

const WIDE_THRESHOLD_COLUMNS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    Wide,
    Compact,
}

impl Viewport {
    /// Pick the layout from the terminal width; unknown width means the
    /// safe compact layout.
    pub fn detect() -> Self {
        Self::from_columns(
            std::env::var("COLUMNS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok()),
        )
    }

    pub fn from_columns(columns: Option<usize>) -> Self {
        match columns {
            Some(c) if c >= WIDE_THRESHOLD_COLUMNS => Viewport::Wide,
            _ => Viewport::Compact,
        }
    }
}

pub fn render(frame: &DashboardFrame, viewport: Viewport) -> String {
    match viewport {
        Viewport::Wide => render_wide(frame),
        Viewport::Compact => render_compact(frame),
    }
}

fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1} {unit}"),
        None => "--".to_string(),
    }
}

fn history_line(phase: &HistoryPhase) -> String {
    match phase {
        HistoryPhase::Idle => "history: not requested".to_string(),
        HistoryPhase::Loading => "history: loading...".to_string(),
        HistoryPhase::Ready => "history:".to_string(),
        HistoryPhase::Failed(reason) => format!("history unavailable: {reason}"),
    }
}

fn render_wide(frame: &DashboardFrame) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "pitwall | {} ({:?}) | range {} .. {}",
        frame.email,
        frame.role,
        frame.range.start().format("%Y-%m-%d %H:%M"),
        frame.range.end().format("%Y-%m-%d %H:%M"),
    );
    match frame.snapshot_time {
        Some(time) => {
            let _ = writeln!(out, "live snapshot at {}", time.format("%H:%M:%S"));
        }
        None => {
            let _ = writeln!(out, "live snapshot pending");
        }
    }

    if frame.alerts.is_empty() {
        let _ = writeln!(out, "alerts: none");
    } else {
        let _ = writeln!(out, "alerts:");
        for alert in &frame.alerts {
            let _ = writeln!(
                out,
                "  [{}] {} ({})",
                alert.level,
                alert.message,
                alert.raised_at.format("%H:%M:%S")
            );
        }
    }

    let _ = writeln!(
        out,
        "{:<24} {:>14} {:>10}   {:<30}",
        "sensor", "value", "max", "history (min / max / last)"
    );
    for (gauge, summary) in frame.gauges.iter().zip(&frame.summaries) {
        let history = if summary.samples == 0 {
            "--".to_string()
        } else {
            format!(
                "{} / {} / {}  ({} samples)",
                format_value(summary.min, &summary.unit),
                format_value(summary.max, &summary.unit),
                format_value(summary.last, &summary.unit),
                summary.samples,
            )
        };
        let _ = writeln!(
            out,
            "{:<24} {:>14} {:>10}   {:<30}",
            gauge.label,
            format_value(gauge.value, &gauge.unit),
            format!("{:.0} {}", gauge.max_value, gauge.unit),
            history,
        );
    }

    if !matches!(frame.history_phase, HistoryPhase::Ready) {
        let _ = writeln!(out, "{}", history_line(&frame.history_phase));
    }

    out
}

fn render_compact(frame: &DashboardFrame) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{} ({:?})", frame.email, frame.role);

    for alert in &frame.alerts {
        let _ = writeln!(out, "! {} {}", alert.level, alert.message);
    }

    for gauge in &frame.gauges {
        let _ = writeln!(
            out,
            "{}: {}",
            gauge.label,
            format_value(gauge.value, &gauge.unit)
        );
    }

    let _ = writeln!(out, "{}", history_line(&frame.history_phase));
    if matches!(frame.history_phase, HistoryPhase::Ready) {
        for summary in &frame.summaries {
            if summary.samples > 0 {
                let _ = writeln!(
                    out,
                    "  {}: {} .. {}",
                    summary.label,
                    format_value(summary.min, &summary.unit),
                    format_value(summary.max, &summary.unit),
                );
            }
        }
    }

    out
}
