//! gov-metrics
//!
//! Read access to the latest metrics snapshot (JSON) and the metrics history
//! (CSV, oldest row first), plus the trailing-median baselines the evaluators
//! compare against.
//!
//! Numeric fields are optional everywhere. A value that is missing, `null`,
//! non-numeric or non-finite is *absent*; nothing here defaults to zero.

mod history;
mod snapshot;

pub use history::{append_history_row, load_history, median, MetricsHistory, BASELINE_WINDOW};
pub use snapshot::{load_latest, write_latest, MetricsSnapshot};

/// Numeric columns shared by the snapshot and the history file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    SharpeRatio,
    ProfitFactor,
    WinRate,
    MaxDrawdown,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::SharpeRatio,
        Metric::ProfitFactor,
        Metric::WinRate,
        Metric::MaxDrawdown,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Metric::SharpeRatio => "sharpe_ratio",
            Metric::ProfitFactor => "profit_factor",
            Metric::WinRate => "win_rate",
            Metric::MaxDrawdown => "max_drawdown",
        }
    }

    pub fn from_column(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.column() == name.trim())
    }
}

/// Lenient numeric parse: trims, rejects empty and non-finite.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}
