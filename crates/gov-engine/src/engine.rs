use crate::performance::{evaluate_performance, winrate_drop_pp};
use crate::schedule::compute_schedule;
use chrono::{DateTime, Utc};
use gov_drift::{evaluate_drift, DriftInputs};
use gov_log::DecisionLog;
use gov_metrics::{MetricsHistory, MetricsSnapshot};
use gov_policy::Policy;
use gov_schemas::{labels, Decision, DecisionActions, DecisionStatus, Triggers};
use tracing::{debug, warn};

/// Compute the next decision.
///
/// Reads the last well-formed entry of `log` as the previous decision (an
/// unreadable log counts as empty), evaluates drift artifacts when given,
/// and delegates to [`decide_with_previous`]. Does not write to the log.
pub fn decide(
    policy: &Policy,
    latest: &MetricsSnapshot,
    history: &MetricsHistory,
    log: &DecisionLog,
    drift: Option<&DriftInputs>,
    now: Option<DateTime<Utc>>,
) -> Decision {
    let prev = match log.last_decision() {
        Ok(d) => d,
        Err(e) => {
            warn!(path = %log.path().display(), error = %format!("{e:#}"), "decision log unreadable; treating as empty");
            None
        }
    };
    let drift_triggers = drift
        .map(|inputs| evaluate_drift(policy, inputs))
        .unwrap_or_default();

    decide_with_previous(
        policy,
        latest,
        history,
        prev.as_ref(),
        drift_triggers,
        now.unwrap_or_else(Utc::now),
    )
}

/// Pure core of [`decide`].
pub fn decide_with_previous(
    policy: &Policy,
    latest: &MetricsSnapshot,
    history: &MetricsHistory,
    prev: Option<&Decision>,
    drift: Triggers,
    now: DateTime<Utc>,
) -> Decision {
    let prev_status = prev.map(|d| d.status).unwrap_or_default();

    let mut triggers = evaluate_performance(policy, latest, history);
    triggers.merge(drift);

    if let (Some(cap), Some(mdd)) = (policy.max_drawdown_cap(), latest.max_drawdown) {
        if mdd >= cap {
            triggers.push_severe(labels::MAX_DRAWDOWN_CAP);
        }
    }

    let halt = triggers
        .severe
        .iter()
        .any(|l| policy.is_halt_label(l) || labels::HARD_HALT.contains(&l.as_str()));

    let (status, actions) = if halt {
        (
            DecisionStatus::Halt,
            DecisionActions {
                risk_multiplier: Some(0.0),
                tighten_stop_factor: Some(policy.on_degrade().tighten_stops_factor),
                disable_shorts: Some(true),
                schedule_retrain_at: Some(compute_schedule(policy, prev, now)),
            },
        )
    } else if !triggers.severe.is_empty() {
        let d = policy.on_degrade();
        (
            DecisionStatus::Degrade,
            DecisionActions {
                risk_multiplier: Some(d.position_size_multiplier),
                tighten_stop_factor: Some(d.tighten_stops_factor),
                disable_shorts: Some(d.disable_shorts),
                schedule_retrain_at: Some(compute_schedule(policy, prev, now)),
            },
        )
    } else if !triggers.warn.is_empty() {
        (
            DecisionStatus::Warn,
            DecisionActions {
                risk_multiplier: Some(policy.on_warn().position_size_multiplier),
                tighten_stop_factor: Some(1.0),
                disable_shorts: Some(false),
                schedule_retrain_at: None,
            },
        )
    } else if prev_status.is_restricted() && resume_eligible(policy, latest, history) {
        (DecisionStatus::Resume, DecisionActions::full_risk())
    } else {
        (DecisionStatus::None, DecisionActions::default())
    };

    debug!(
        prev = %prev_status,
        status = %status,
        warn = ?triggers.warn,
        severe = ?triggers.severe,
        "decision computed"
    );

    Decision {
        timestamp: Some(now),
        status,
        reason: triggers.reason(),
        actions,
    }
}

/// Back-to-baseline check gating RESUME. When the policy requires it, the
/// latest Sharpe must clear `sharpe_min_short` and the win-rate drop must stay
/// under `winrate_drop_pp`; a configured check with missing data fails.
pub fn resume_eligible(policy: &Policy, latest: &MetricsSnapshot, history: &MetricsHistory) -> bool {
    if !policy.resume().require_back_to_baseline {
        return true;
    }
    let th = policy.triggers();

    if let Some(min) = th.sharpe_min_short {
        match latest.sharpe_ratio {
            Some(s) if s >= min => {}
            _ => return false,
        }
    }

    if let Some(limit) = th.winrate_drop_pp {
        match winrate_drop_pp(latest, history) {
            Some(drop) if drop < limit => {}
            _ => return false,
        }
    }

    true
}
