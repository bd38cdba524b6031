//! `govctl decide`: one decision run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gov_drift::DriftInputs;
use gov_log::DecisionLog;
use gov_policy::{load_policy_layered, report_unused_keys, UnusedKeyPolicy};
use std::path::PathBuf;
use tracing::{info, warn};

pub struct DecideArgs {
    pub policy_paths: Vec<PathBuf>,
    pub latest: PathBuf,
    pub history: PathBuf,
    pub out: PathBuf,
    pub drift: DriftInputs,
    pub now: Option<DateTime<Utc>>,
    pub strict_keys: bool,
}

/// Policy failures are fatal; metric and drift inputs degrade to "no trigger".
pub fn run(args: DecideArgs) -> Result<()> {
    let loaded = load_policy_layered(args.policy_paths.as_slice()).context("governance policy load failed")?;

    let key_policy = if args.strict_keys {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.policy_json, key_policy)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "policy key not used by governance");
    }

    let latest = gov_metrics::load_latest(&args.latest);
    let history = gov_metrics::load_history(&args.history);
    let log = DecisionLog::create(&args.out)?;
    let drift = (!args.drift.is_empty()).then_some(&args.drift);

    let decision = gov_engine::decide(&loaded.policy, &latest, &history, &log, drift, args.now);

    log.append(&decision)?;
    info!(
        policy_hash = %loaded.policy_hash,
        status = %decision.status,
        reason = ?decision.reason,
        history_rows = history.len(),
        out = %log.path().display(),
        "governance decision appended"
    );

    println!("{}", gov_log::canonical_json_line(&decision)?);
    Ok(())
}
