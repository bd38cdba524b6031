//! Shared fixtures for scenario tests: a reference policy, metric builders
//! and a scratch directory that lays out the files a decision run reads.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use gov_metrics::{append_history_row, write_latest, MetricsHistory, MetricsSnapshot};
use gov_policy::{load_policy_from_strings, Policy};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Reference policy used across scenarios.
///
/// warn: sharpe_min_short, pf_min_short · degrade: winrate_drop_pp,
/// psi_retrain · halt: mdd_spike_factor · drawdown cap 10.
pub const STANDARD_POLICY_YAML: &str = r#"
risk:
  portfolio:
    max_daily_loss_pct: 2.0
    max_drawdown_pct: 10.0
  per_trade:
    max_leverage: 3.0
    stop:
      min_stop_pct: 0.5
      max_stop_pct: 4.0
retraining:
  performance_triggers:
    pf_min_short: 1.05
    sharpe_min_short: 0.5
    winrate_drop_pp: 10.0
    mdd_spike_factor: 1.5
  drift_triggers:
    feature_drift:
      psi_warn: 0.2
      psi_retrain: 0.3
    residual_drift:
      adwin_delta: 0.002
  actions:
    warn_only_thresholds: [pf_min_short, sharpe_min_short]
    degrade_then_retrain: [winrate_drop_pp, feature_drift.psi_retrain]
    halt_and_retrain: [mdd_spike_factor]
  cadence:
    time_based_hours: 12
    min_hours_between_retrains: 6
  resume_conditions:
    require_back_to_baseline: true
    min_hours_after_retrain: 2
risk_degradation:
  on_warn:
    position_size_multiplier: 0.75
  on_degrade:
    position_size_multiplier: 0.5
    disable_shorts: true
    tighten_stops_factor: 1.25
"#;

pub fn standard_policy() -> Policy {
    load_policy_from_strings(&[STANDARD_POLICY_YAML])
        .expect("reference policy must load")
        .policy
}

/// Fixed clock for deterministic decisions.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0)
        .single()
        .expect("valid test timestamp")
}

pub fn snapshot(sharpe: f64, win_rate: f64, max_drawdown: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        sharpe_ratio: Some(sharpe),
        win_rate: Some(win_rate),
        max_drawdown: Some(max_drawdown),
        ..Default::default()
    }
}

/// History rows from `(win_rate, max_drawdown)` pairs, oldest first.
pub fn history(rows: &[(f64, f64)]) -> MetricsHistory {
    MetricsHistory::from_rows(
        rows.iter()
            .enumerate()
            .map(|(i, (wr, mdd))| MetricsSnapshot {
                timestamp: Some(format!("t{}", i + 1)),
                win_rate: Some(*wr),
                max_drawdown: Some(*mdd),
                ..Default::default()
            })
            .collect(),
    )
}

/// Temp directory with conventional file names for one deployment.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create scratch dir")?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn policy_path(&self) -> PathBuf {
        self.root().join("config").join("governance_policy.yaml")
    }

    pub fn latest_path(&self) -> PathBuf {
        self.root().join("monitoring").join("latest_metrics.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.root().join("monitoring").join("metrics_history.csv")
    }

    pub fn decisions_path(&self) -> PathBuf {
        self.root().join("monitoring").join("governance_decisions.jsonl")
    }

    pub fn write_policy(&self, yaml: &str) -> Result<PathBuf> {
        self.write(self.policy_path(), yaml)
    }

    pub fn write_latest(&self, snap: &MetricsSnapshot) -> Result<PathBuf> {
        let p = self.latest_path();
        write_latest(&p, snap)?;
        Ok(p)
    }

    pub fn write_history(&self, h: &MetricsHistory) -> Result<PathBuf> {
        let p = self.history_path();
        if p.exists() {
            fs::remove_file(&p).with_context(|| format!("reset {:?}", p))?;
        }
        for row in h.rows() {
            append_history_row(&p, row)?;
        }
        Ok(p)
    }

    /// Write arbitrary content relative to the scratch root.
    pub fn write_file(&self, rel: &str, content: &str) -> Result<PathBuf> {
        self.write(self.root().join(rel), content)
    }

    fn write(&self, path: PathBuf, content: &str) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }
        fs::write(&path, content).with_context(|| format!("write {:?}", path))?;
        Ok(path)
    }
}

/// Histogram JSON for a single feature.
pub fn histogram_json(feature: &str, counts: &[f64]) -> String {
    let bins: Vec<f64> = (0..=counts.len()).map(|i| i as f64).collect();
    serde_json::json!({ feature: { "bins": bins, "counts": counts } }).to_string()
}
