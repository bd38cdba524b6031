use gov_metrics::{Metric, MetricsHistory, MetricsSnapshot};
use gov_policy::{ActionBucket, Policy};
use gov_schemas::{labels, Triggers};
use tracing::{debug, warn};

/// Compare the latest snapshot and trailing-median baselines against the
/// performance triggers. Pure; absent data means the trigger does not apply.
pub fn evaluate_performance(
    policy: &Policy,
    latest: &MetricsSnapshot,
    history: &MetricsHistory,
) -> Triggers {
    let mut out = Triggers::default();
    let th = policy.triggers();

    if let (Some(min), Some(sharpe)) = (th.sharpe_min_short, latest.sharpe_ratio) {
        if sharpe < min {
            route(policy, labels::SHARPE_MIN_SHORT, &mut out);
        }
    }

    // PF is frequently unavailable; absent means "not evaluated".
    if let (Some(min), Some(pf)) = (th.pf_min_short, latest.profit_factor) {
        if pf < min {
            route(policy, labels::PF_MIN_SHORT, &mut out);
        }
    }

    if let (Some(limit), Some(drop)) = (th.winrate_drop_pp, winrate_drop_pp(latest, history)) {
        debug!(drop_pp = drop, limit, "win-rate drop vs trailing median");
        if drop >= limit {
            route(policy, labels::WINRATE_DROP_PP, &mut out);
        }
    }

    if let Some(factor) = th.mdd_spike_factor {
        let baseline = history.baseline_median(Metric::MaxDrawdown);
        if let (Some(base), Some(mdd)) = (baseline, latest.max_drawdown) {
            // Escalates regardless of the action mapping.
            if base > 0.0 && mdd > factor * base {
                out.push_severe(labels::MDD_SPIKE_FACTOR);
            }
        }
    }

    out
}

/// `max(0, trailing median win rate − latest win rate)` in percentage points;
/// `None` when either side is unavailable.
pub fn winrate_drop_pp(latest: &MetricsSnapshot, history: &MetricsHistory) -> Option<f64> {
    let baseline = history.baseline_median(Metric::WinRate)?;
    let current = latest.win_rate?;
    Some((baseline - current).max(0.0))
}

fn route(policy: &Policy, label: &str, out: &mut Triggers) {
    match policy.bucket_for(label) {
        Some(ActionBucket::WarnOnly) => out.push_warn(label),
        Some(ActionBucket::DegradeThenRetrain) | Some(ActionBucket::HaltAndRetrain) => {
            out.push_severe(label)
        }
        None => {
            warn!(label, "trigger fired but no action set maps it; dropped");
        }
    }
}
