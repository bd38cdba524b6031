//! Policy consumption map + unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes of the policy keys the
//! governance core actually reads. A leaf under any consumed prefix is
//! consumed; every other leaf is reported as unused so typos in a policy
//! (e.g. `sharpe_min_shrot`) surface instead of silently disabling a trigger.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Consumed JSON-pointer prefixes used for this analysis (sorted, unique)
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Keys read by the decision engine, the evaluators and the runtime adapter.
///
/// Keep this in step with the typed `Policy`: a field added there without a
/// pointer here shows up as "unused" in every report.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/risk/portfolio/max_daily_loss_pct",
    "/risk/portfolio/max_drawdown_pct",
    "/risk/per_trade/max_leverage",
    "/risk/per_trade/stop/min_stop_pct",
    "/risk/per_trade/stop/max_stop_pct",
    "/retraining/performance_triggers",
    "/retraining/drift_triggers/feature_drift/psi_warn",
    "/retraining/drift_triggers/feature_drift/psi_retrain",
    "/retraining/drift_triggers/residual_drift/adwin_delta",
    "/retraining/actions/warn_only_thresholds",
    "/retraining/actions/degrade_then_retrain",
    "/retraining/actions/halt_and_retrain",
    "/retraining/cadence/time_based_hours",
    "/retraining/cadence/min_hours_between_retrains",
    "/retraining/resume_conditions/require_back_to_baseline",
    "/retraining/resume_conditions/min_hours_after_retrain",
    "/risk_degradation/on_warn/position_size_multiplier",
    "/risk_degradation/on_degrade/position_size_multiplier",
    "/risk_degradation/on_degrade/tighten_stops_factor",
    "/risk_degradation/on_degrade/disable_shorts",
];

/// Produce an unused-key report for a merged policy document.
/// `Fail` errors when unused keys exist; `Warn` always returns the report.
pub fn report_unused_keys(policy_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = CONSUMED_POINTERS.iter().map(|p| normalize_pointer(p)).collect();
    let consumed_prefixes: Vec<String> = consumed.into_iter().collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(policy_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "POLICY_UNUSED_KEYS: {} unused policy leaf key(s) detected. First few: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

pub(crate) fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, vv) in map {
                let next = format!("{}/{}", prefix, k.replace('~', "~0").replace('/', "~1"));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, vv) in arr.iter().enumerate() {
                collect_leaf_pointers(vv, &format!("{}/{}", prefix, i), out);
            }
        }
        _ => out.push(if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }),
    }
}
