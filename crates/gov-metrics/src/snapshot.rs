use crate::{parse_number, Metric};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Latest-run metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_drawdown: Option<f64>,
}

impl MetricsSnapshot {
    pub fn get(&self, m: Metric) -> Option<f64> {
        match m {
            Metric::SharpeRatio => self.sharpe_ratio,
            Metric::ProfitFactor => self.profit_factor,
            Metric::WinRate => self.win_rate,
            Metric::MaxDrawdown => self.max_drawdown,
        }
    }

    pub fn set(&mut self, m: Metric, v: Option<f64>) {
        let slot = match m {
            Metric::SharpeRatio => &mut self.sharpe_ratio,
            Metric::ProfitFactor => &mut self.profit_factor,
            Metric::WinRate => &mut self.win_rate,
            Metric::MaxDrawdown => &mut self.max_drawdown,
        };
        *slot = v;
    }

    /// Build from an arbitrary JSON object. Numbers and numeric strings are
    /// accepted; anything else leaves the field absent. Unknown keys are ignored.
    pub fn from_json_value(v: &Value) -> Self {
        let mut snap = MetricsSnapshot::default();
        let Some(obj) = v.as_object() else {
            return snap;
        };
        for m in Metric::ALL {
            snap.set(m, obj.get(m.column()).and_then(number_of));
        }
        snap.timestamp = match obj.get("timestamp") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        snap
    }
}

fn number_of(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Load the latest snapshot. A missing or unparsable file is data
/// unavailability: it is logged and yields an empty snapshot.
pub fn load_latest(path: impl AsRef<Path>) -> MetricsSnapshot {
    let path = path.as_ref();
    match read_latest(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "latest metrics unavailable");
            MetricsSnapshot::default()
        }
    }
}

fn read_latest(path: &Path) -> Result<MetricsSnapshot> {
    let raw = fs::read_to_string(path).with_context(|| format!("read latest metrics {:?}", path))?;
    let v: Value = serde_json::from_str(raw.trim_start_matches('\u{feff}'))
        .context("latest metrics must be a JSON object")?;
    Ok(MetricsSnapshot::from_json_value(&v))
}

/// Write the snapshot as pretty JSON, creating parent dirs.
pub fn write_latest(path: impl AsRef<Path>, snap: &MetricsSnapshot) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
    }
    let body = serde_json::to_string_pretty(snap).context("serialize latest metrics")?;
    fs::write(path, body).with_context(|| format!("write latest metrics {:?}", path))
}
