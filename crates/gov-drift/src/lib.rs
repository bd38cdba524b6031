//! gov-drift
//!
//! Two independent drift detectors:
//! - PSI over feature histograms (baseline vs current) → `feature_drift.psi_warn`
//!   (warn) or `feature_drift.psi_retrain` (severe)
//! - Page-Hinkley over the model residual stream → `residual_drift` (severe)
//!
//! Artifact problems (missing file, bad JSON, missing `residual` column) are
//! logged and read as "no signal". Nothing in this crate fails a decision run.

mod page_hinkley;
mod psi;

pub use page_hinkley::PageHinkley;
pub use psi::{compute_psi, compute_psi_multi, histograms_from_json, Histogram, HistogramMap, PSI_EPSILON};

use anyhow::{bail, Context, Result};
use gov_policy::Policy;
use gov_schemas::{labels, Triggers};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The residual detector only runs on series strictly longer than this.
pub const MIN_RESIDUALS: usize = 20;

/// Optional drift artifacts for one decision run.
#[derive(Debug, Clone, Default)]
pub struct DriftInputs {
    pub features_baseline: Option<PathBuf>,
    pub features_current: Option<PathBuf>,
    pub residuals: Option<PathBuf>,
}

impl DriftInputs {
    pub fn is_empty(&self) -> bool {
        self.features_baseline.is_none() && self.features_current.is_none() && self.residuals.is_none()
    }
}

/// Evaluate every drift artifact that is present.
pub fn evaluate_drift(policy: &Policy, inputs: &DriftInputs) -> Triggers {
    let mut out = Triggers::default();

    if let (Some(base_path), Some(curr_path)) = (&inputs.features_baseline, &inputs.features_current) {
        match (load_histograms(base_path), load_histograms(curr_path)) {
            (Ok(base), Ok(curr)) => out.merge(evaluate_psi(policy, &base, &curr)),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %format!("{e:#}"), "PSI evaluation skipped");
            }
        }
    }

    if let Some(path) = &inputs.residuals {
        match load_residuals(path) {
            Ok(series) => out.merge(evaluate_residuals(policy, &series)),
            Err(e) => warn!(error = %format!("{e:#}"), "residual drift evaluation skipped"),
        }
    }

    out
}

/// Classify the aggregate PSI against the policy thresholds.
pub fn evaluate_psi(policy: &Policy, base: &HistogramMap, curr: &HistogramMap) -> Triggers {
    let mut out = Triggers::default();
    let psi = compute_psi_multi(base, curr);
    let th = policy.feature_drift();
    debug!(psi, psi_warn = ?th.psi_warn, psi_retrain = ?th.psi_retrain, "feature drift");

    if th.psi_retrain.is_some_and(|t| psi >= t) {
        out.push_severe(labels::PSI_RETRAIN);
    } else if th.psi_warn.is_some_and(|t| psi >= t) {
        out.push_warn(labels::PSI_WARN);
    }
    out
}

/// Page-Hinkley over the residual series; `adwin_delta` supplies δ when set.
pub fn evaluate_residuals(policy: &Policy, series: &[f64]) -> Triggers {
    let mut out = Triggers::default();
    if series.len() <= MIN_RESIDUALS {
        debug!(len = series.len(), "residual series too short");
        return out;
    }
    let detector = policy
        .adwin_delta()
        .map(PageHinkley::with_delta)
        .unwrap_or_default();
    if let Some(at) = detector.first_detection(series) {
        debug!(index = at, len = series.len(), "residual mean shift detected");
        out.push_severe(labels::RESIDUAL_DRIFT);
    }
    out
}

pub fn load_histograms(path: &Path) -> Result<HistogramMap> {
    let raw = fs::read_to_string(path).with_context(|| format!("read histograms {:?}", path))?;
    let v: Value = serde_json::from_str(&raw).with_context(|| format!("parse histograms {:?}", path))?;
    if !v.is_object() {
        bail!("histogram file {:?} must be a JSON object keyed by feature", path);
    }
    Ok(histograms_from_json(&v))
}

/// Read the `residual` column; blank or non-numeric cells are dropped.
pub fn load_residuals(path: &Path) -> Result<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open residuals csv: {}", path.display()))?;
    let idx = rdr
        .headers()
        .context("read residuals header")?
        .iter()
        .position(|h| h == "residual")
        .with_context(|| format!("residuals csv {:?} has no 'residual' column", path))?;

    let mut out = Vec::new();
    for rec in rdr.records() {
        let Ok(rec) = rec else { continue };
        if let Some(v) = rec.get(idx).and_then(|s| s.parse::<f64>().ok()).filter(|v| v.is_finite()) {
            out.push(v);
        }
    }
    Ok(out)
}
