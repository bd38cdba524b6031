//! Population Stability Index over binned feature histograms.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Guards `ln(0)` for empty bins.
pub const PSI_EPSILON: f64 = 1e-12;

/// One feature's histogram: `bins` are numeric edges or category labels and
/// only their count matters; `counts` are the per-bin frequencies, normalised
/// before comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    #[serde(default)]
    pub bins: Option<Vec<Value>>,
    pub counts: Vec<f64>,
}

pub type HistogramMap = BTreeMap<String, Histogram>;

/// Parse `{feature: {bins, counts}}`. Entries that do not parse are dropped
/// individually; a non-object document yields an empty map.
pub fn histograms_from_json(v: &Value) -> HistogramMap {
    let mut out = HistogramMap::new();
    let Some(obj) = v.as_object() else {
        return out;
    };
    for (feature, entry) in obj {
        match serde_json::from_value::<Histogram>(entry.clone()) {
            Ok(h) => {
                out.insert(feature.clone(), h);
            }
            Err(e) => warn!(feature = %feature, error = %e, "skipping malformed histogram"),
        }
    }
    out
}

/// PSI between a baseline and a current count vector.
///
/// `None` when the shapes differ, the vectors are empty, or a count is
/// negative / non-finite. A histogram with zero total mass compares as 0.
pub fn compute_psi(base_counts: &[f64], curr_counts: &[f64]) -> Option<f64> {
    if base_counts.is_empty() || base_counts.len() != curr_counts.len() {
        return None;
    }
    if base_counts
        .iter()
        .chain(curr_counts)
        .any(|c| !c.is_finite() || *c < 0.0)
    {
        return None;
    }
    let base_total: f64 = base_counts.iter().sum();
    let curr_total: f64 = curr_counts.iter().sum();
    if base_total == 0.0 || curr_total == 0.0 {
        return Some(0.0);
    }

    let psi = base_counts
        .iter()
        .zip(curr_counts)
        .map(|(b, c)| {
            let p = b / base_total;
            let q = c / curr_total;
            (q - p) * ((q + PSI_EPSILON) / (p + PSI_EPSILON)).ln()
        })
        .sum();
    Some(psi)
}

fn feature_psi(base: &Histogram, curr: &Histogram) -> Option<f64> {
    if let (Some(bb), Some(cb)) = (&base.bins, &curr.bins) {
        if bb.len() != cb.len() {
            return None;
        }
    }
    compute_psi(&base.counts, &curr.counts)
}

/// Mean PSI over features present in both maps. Features that cannot be
/// compared are skipped; 0 when nothing is comparable.
pub fn compute_psi_multi(base: &HistogramMap, curr: &HistogramMap) -> f64 {
    let psis: Vec<f64> = base
        .iter()
        .filter_map(|(feature, b)| {
            let c = curr.get(feature)?;
            let psi = feature_psi(b, c);
            if psi.is_none() {
                warn!(feature = %feature, "histogram shapes not comparable; skipped");
            }
            psi
        })
        .filter(|v| v.is_finite())
        .collect();

    if psis.is_empty() {
        0.0
    } else {
        psis.iter().sum::<f64>() / psis.len() as f64
    }
}
