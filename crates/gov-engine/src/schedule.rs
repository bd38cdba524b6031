use chrono::{DateTime, Duration, Utc};
use gov_policy::Policy;
use gov_schemas::{Decision, DecisionStatus};

/// Fractional hours as a duration (millisecond resolution).
pub fn hours(h: f64) -> Duration {
    if !h.is_finite() || h <= 0.0 {
        return Duration::zero();
    }
    let ms = (h * 3_600_000.0).round();
    Duration::milliseconds(ms.min(i64::MAX as f64 / 2.0) as i64)
}

fn add_hours(ts: DateTime<Utc>, h: f64) -> DateTime<Utc> {
    ts.checked_add_signed(hours(h)).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Next retrain time: `now + time_based_hours`, but never earlier than the
/// previous schedule plus the cooldown `min_hours_between_retrains`.
pub fn compute_schedule(policy: &Policy, prev: Option<&Decision>, now: DateTime<Utc>) -> DateTime<Utc> {
    let cadence = policy.cadence();
    let next = add_hours(now, cadence.time_based_hours);
    match prev.and_then(|d| d.actions.schedule_retrain_at) {
        Some(prev_at) => next.max(add_hours(prev_at, cadence.min_hours_between_retrains)),
        None => next,
    }
}

/// Outcome of checking the current decision for a due retrain.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrainCheck {
    NoDecision,
    NotScheduled,
    Pending {
        due_at: DateTime<Utc>,
        remaining: Duration,
    },
    Due {
        due_at: DateTime<Utc>,
        status: DecisionStatus,
        reasons: Vec<String>,
    },
}

impl RetrainCheck {
    pub fn is_due(&self) -> bool {
        matches!(self, RetrainCheck::Due { .. })
    }

    /// One-line human summary.
    pub fn describe(&self) -> String {
        match self {
            RetrainCheck::NoDecision => "no decision available".to_string(),
            RetrainCheck::NotScheduled => "no retraining scheduled".to_string(),
            RetrainCheck::Pending { due_at, remaining } => format!(
                "retrain scheduled at {} (in {}m)",
                gov_schemas::format_utc(due_at),
                remaining.num_minutes()
            ),
            RetrainCheck::Due {
                status, reasons, ..
            } => format!(
                "scheduled retrain reached (status: {}, reasons: {})",
                status,
                reasons.join(", ")
            ),
        }
    }
}

/// Whether `decision.actions.schedule_retrain_at` has been reached at `now`.
pub fn retrain_due(decision: Option<&Decision>, now: DateTime<Utc>) -> RetrainCheck {
    let Some(d) = decision else {
        return RetrainCheck::NoDecision;
    };
    let Some(due_at) = d.actions.schedule_retrain_at else {
        return RetrainCheck::NotScheduled;
    };
    if now >= due_at {
        RetrainCheck::Due {
            due_at,
            status: d.status,
            reasons: d.reason.clone(),
        }
    } else {
        RetrainCheck::Pending {
            due_at,
            remaining: due_at - now,
        }
    }
}
