//! Read-mostly commands: runtime state, retrain schedule, log health,
//! policy hash and metrics recording.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use gov_engine::{retrain_due, RetrainCheck};
use gov_log::DecisionLog;
use gov_metrics::{append_history_row, load_latest, Metric};
use gov_policy::{load_policy_layered, report_unused_keys, UnusedKeyPolicy};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn state(policy: &Path, decisions: &Path) -> Result<()> {
    let st = gov_runtime::get_governance_state(policy, decisions);
    let json = serde_json::to_string_pretty(&st).context("serialize governance state failed")?;
    println!("{}", json);
    Ok(())
}

/// Prints the check; launching training belongs to the caller, so this
/// always exits 0 once the log has been read.
pub fn retrain_check(decisions: &Path, force: bool, now: Option<DateTime<Utc>>) -> Result<()> {
    let now = now.unwrap_or_else(Utc::now);
    let last = match DecisionLog::at(decisions).last_decision() {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "decision log unreadable");
            None
        }
    };
    let check = retrain_due(last.as_ref(), now);

    let due = force || check.is_due();
    println!("retrain_due={}", due);
    if force && !check.is_due() {
        println!("reason=forced ({})", check.describe());
    } else {
        println!("reason={}", check.describe());
    }
    if let RetrainCheck::Pending { due_at, .. } | RetrainCheck::Due { due_at, .. } = &check {
        println!("scheduled_at={}", gov_schemas::format_utc(due_at));
    }
    Ok(())
}

pub fn record_metrics(latest: &Path, history: &Path) -> Result<()> {
    let mut snap = load_latest(latest);
    if Metric::ALL.iter().all(|m| snap.get(*m).is_none()) {
        bail!(
            "METRICS_SNAPSHOT_EMPTY: no usable metrics in {}; nothing recorded",
            latest.display()
        );
    }
    if snap.timestamp.is_none() {
        snap.timestamp = Some(gov_schemas::format_utc(&Utc::now()));
    }
    append_history_row(history, &snap)?;
    info!(history = %history.display(), "metrics snapshot recorded");
    println!("recorded=true history={}", history.display());
    Ok(())
}

pub fn policy_hash(paths: &[PathBuf]) -> Result<()> {
    let loaded = load_policy_layered(paths)?;
    let report = report_unused_keys(&loaded.policy_json, UnusedKeyPolicy::Warn)?;
    println!("policy_hash={}", loaded.policy_hash);
    println!("{}", loaded.canonical_json);
    for ptr in &report.unused_leaf_pointers {
        println!("unused_key={}", ptr);
    }
    Ok(())
}

pub fn log_check(decisions: &Path) -> Result<()> {
    let scan = DecisionLog::at(decisions).scan()?;
    println!(
        "lines={} valid={} malformed={}",
        scan.lines,
        scan.valid,
        scan.malformed.len()
    );
    if !scan.is_clean() {
        let nums: Vec<String> = scan.malformed.iter().map(|n| n.to_string()).collect();
        println!("malformed_lines={}", nums.join(","));
    }
    Ok(())
}
