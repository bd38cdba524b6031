//! gov-policy
//!
//! Loads the governance policy document (YAML), merges overlays, computes a
//! stable policy hash and constructs the typed, validated [`Policy`].
//!
//! Loading is the only fatal step of a decision run: an unreadable or
//! unparsable policy fails here, loudly, and never inside the engine.

mod consumption;
mod policy;

pub use consumption::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport, CONSUMED_POINTERS};
pub use policy::*;

use anyhow::{bail, Context, Result};
use gov_schemas::labels;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct LoadedPolicy {
    pub policy: Policy,
    /// sha256 of `canonical_json`.
    pub policy_hash: String,
    pub canonical_json: String,
    pub policy_json: Value,
}

/// Load a single policy file.
pub fn load_policy(path: impl AsRef<Path>) -> Result<LoadedPolicy> {
    load_policy_layered(&[path.as_ref()])
}

/// Load policy files in merge order (base first, later files override).
pub fn load_policy_layered<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedPolicy> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let p = p.as_ref();
        let raw = fs::read_to_string(p)
            .with_context(|| format!("failed to read policy path: {}", p.display()))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_policy_from_strings(&doc_refs)
}

pub fn load_policy_from_strings(yaml_docs: &[&str]) -> Result<LoadedPolicy> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid policy yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document contributes nothing.
        if v_json.is_null() {
            continue;
        }
        if !v_json.is_object() {
            bail!("POLICY_NOT_A_MAPPING: policy document must be a key/value mapping");
        }
        merged = deep_merge(merged, v_json);
    }

    let policy: Policy =
        serde_json::from_value(merged.clone()).context("policy does not match schema")?;
    validate(&policy)?;

    // serde_json::Map is ordered by key, so this rendering is canonical.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let policy_hash = sha256_hex(canonical_json.as_bytes());

    Ok(LoadedPolicy {
        policy,
        policy_hash,
        canonical_json,
        policy_json: merged,
    })
}

/// Structural checks the typed parse cannot express, plus a warning for each
/// action label no evaluator emits.
pub fn validate(policy: &Policy) -> Result<()> {
    check_structure(policy)?;
    for label in policy.retraining.actions.all_labels() {
        if !labels::ALL.contains(&label) {
            warn!(label = %label, "policy action set names a label no evaluator emits");
        }
    }
    Ok(())
}

/// Typed policy from one file, without merge, hash or warnings. For callers
/// that re-read the policy on every bar.
pub fn read_policy_typed(path: impl AsRef<Path>) -> Result<Policy> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read policy path: {}", path.display()))?;
    let doc: serde_yaml::Value = serde_yaml::from_str(&raw).context("invalid policy yaml")?;
    let policy = match doc {
        serde_yaml::Value::Null => Policy::default(),
        serde_yaml::Value::Mapping(_) => {
            serde_yaml::from_value(doc).context("policy does not match schema")?
        }
        _ => bail!("POLICY_NOT_A_MAPPING: policy document must be a key/value mapping"),
    };
    check_structure(&policy)?;
    Ok(policy)
}

fn check_structure(policy: &Policy) -> Result<()> {
    let actions = &policy.retraining.actions;
    let mut owner: BTreeMap<&str, &str> = BTreeMap::new();
    for (set, members) in [
        ("warn_only_thresholds", &actions.warn_only_thresholds),
        ("degrade_then_retrain", &actions.degrade_then_retrain),
        ("halt_and_retrain", &actions.halt_and_retrain),
    ] {
        for label in members {
            if let Some(prev) = owner.insert(label.as_str(), set) {
                if prev != set {
                    bail!(
                        "POLICY_LABEL_OVERLAP: label '{}' appears in both {} and {}",
                        label,
                        prev,
                        set
                    );
                }
            }
        }
    }

    let numbers = [
        ("risk.portfolio.max_daily_loss_pct", policy.risk.portfolio.max_daily_loss_pct),
        ("risk.portfolio.max_drawdown_pct", policy.risk.portfolio.max_drawdown_pct),
        ("risk.per_trade.max_leverage", policy.risk.per_trade.max_leverage),
        ("risk.per_trade.stop.min_stop_pct", policy.risk.per_trade.stop.min_stop_pct),
        ("risk.per_trade.stop.max_stop_pct", policy.risk.per_trade.stop.max_stop_pct),
        ("feature_drift.psi_warn", policy.feature_drift().psi_warn),
        ("feature_drift.psi_retrain", policy.feature_drift().psi_retrain),
        ("residual_drift.adwin_delta", policy.adwin_delta()),
        ("performance_triggers.winrate_drop_pp", policy.triggers().winrate_drop_pp),
        ("performance_triggers.mdd_spike_factor", policy.triggers().mdd_spike_factor),
        ("cadence.time_based_hours", Some(policy.cadence().time_based_hours)),
        (
            "cadence.min_hours_between_retrains",
            Some(policy.cadence().min_hours_between_retrains),
        ),
        (
            "on_warn.position_size_multiplier",
            Some(policy.on_warn().position_size_multiplier),
        ),
        (
            "on_degrade.position_size_multiplier",
            Some(policy.on_degrade().position_size_multiplier),
        ),
        (
            "on_degrade.tighten_stops_factor",
            Some(policy.on_degrade().tighten_stops_factor),
        ),
    ];
    for (name, v) in numbers {
        if let Some(x) = v {
            if !x.is_finite() || x < 0.0 {
                bail!("POLICY_INVALID_VALUE: {} must be a finite non-negative number (got {})", name, x);
            }
        }
    }

    // Sharpe / PF minimums may legitimately be negative; only finiteness matters.
    for (name, v) in [
        ("performance_triggers.sharpe_min_short", policy.triggers().sharpe_min_short),
        ("performance_triggers.pf_min_short", policy.triggers().pf_min_short),
    ] {
        if matches!(v, Some(x) if !x.is_finite()) {
            bail!("POLICY_INVALID_VALUE: {} must be finite", name);
        }
    }

    if let (Some(lo), Some(hi)) = (
        policy.risk.per_trade.stop.min_stop_pct,
        policy.risk.per_trade.stop.max_stop_pct,
    ) {
        if lo > hi {
            bail!("POLICY_INVALID_VALUE: min_stop_pct {} exceeds max_stop_pct {}", lo, hi);
        }
    }

    Ok(())
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
