//! gov-schemas
//!
//! Record types shared by the decision engine, the decision log and the
//! runtime adapter. A `Decision` is immutable once written; the wire form is
//! one JSON object per log line:
//!
//! `{"actions":{...},"reason":[...],"status":"halt","timestamp":"...Z"}`

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Trigger labels emitted by the evaluators and referenced by policy action sets.
pub mod labels {
    pub const SHARPE_MIN_SHORT: &str = "sharpe_min_short";
    pub const PF_MIN_SHORT: &str = "pf_min_short";
    pub const WINRATE_DROP_PP: &str = "winrate_drop_pp";
    pub const MDD_SPIKE_FACTOR: &str = "mdd_spike_factor";
    pub const MAX_DRAWDOWN_CAP: &str = "max_drawdown_cap";
    pub const PSI_WARN: &str = "feature_drift.psi_warn";
    pub const PSI_RETRAIN: &str = "feature_drift.psi_retrain";
    pub const RESIDUAL_DRIFT: &str = "residual_drift";

    /// Reason recorded when no trigger fired.
    pub const OK: &str = "ok";

    /// Labels that escalate straight to HALT regardless of the policy mapping.
    pub const HARD_HALT: &[&str] = &[MDD_SPIKE_FACTOR, MAX_DRAWDOWN_CAP];

    /// Every label the evaluators can produce.
    pub const ALL: &[&str] = &[
        SHARPE_MIN_SHORT,
        PF_MIN_SHORT,
        WINRATE_DROP_PP,
        MDD_SPIKE_FACTOR,
        MAX_DRAWDOWN_CAP,
        PSI_WARN,
        PSI_RETRAIN,
        RESIDUAL_DRIFT,
    ];
}

/// Governance status. Ordering of variants carries no meaning; priority is
/// resolved by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    #[default]
    None,
    Warn,
    Degrade,
    Halt,
    Resume,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::None => "none",
            DecisionStatus::Warn => "warn",
            DecisionStatus::Degrade => "degrade",
            DecisionStatus::Halt => "halt",
            DecisionStatus::Resume => "resume",
        }
    }

    /// True for the states a RESUME can recover from.
    pub fn is_restricted(&self) -> bool {
        matches!(self, DecisionStatus::Halt | DecisionStatus::Degrade)
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status-dependent risk actions. Empty for `none`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tighten_stop_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_shorts: Option<bool>,
    /// A malformed value here does not invalidate the rest of the line.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_utc"
    )]
    pub schedule_retrain_at: Option<DateTime<Utc>>,
}

impl DecisionActions {
    pub fn is_empty(&self) -> bool {
        *self == DecisionActions::default()
    }

    /// Full risk restored (used by RESUME).
    pub fn full_risk() -> Self {
        Self {
            risk_multiplier: Some(1.0),
            tighten_stop_factor: Some(1.0),
            disable_shorts: Some(false),
            schedule_retrain_at: None,
        }
    }
}

/// One governance decision. A line is valid when `status` parses; an
/// absent or unreadable `timestamp` is kept as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_utc"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    pub status: DecisionStatus,
    #[serde(default)]
    pub reason: Vec<String>,
    #[serde(default)]
    pub actions: DecisionActions,
}

/// Evaluator output: labels that fired, split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Triggers {
    pub warn: Vec<String>,
    pub severe: Vec<String>,
}

impl Triggers {
    pub fn is_empty(&self) -> bool {
        self.warn.is_empty() && self.severe.is_empty()
    }

    pub fn push_warn(&mut self, label: &str) {
        self.warn.push(label.to_string());
    }

    pub fn push_severe(&mut self, label: &str) {
        self.severe.push(label.to_string());
    }

    pub fn merge(&mut self, other: Triggers) {
        self.warn.extend(other.warn);
        self.severe.extend(other.severe);
    }

    /// Sorted, deduplicated union of both severities; `["ok"]` when nothing fired.
    pub fn reason(&self) -> Vec<String> {
        let set: std::collections::BTreeSet<&String> =
            self.severe.iter().chain(self.warn.iter()).collect();
        if set.is_empty() {
            return vec![labels::OK.to_string()];
        }
        set.into_iter().cloned().collect()
    }
}

/// RFC 3339 UTC rendering with a `Z` suffix (sub-second digits only when non-zero).
pub fn format_utc(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an RFC 3339 timestamp into UTC. Accepts `Z` or numeric offsets;
/// a date-time without an offset is read as UTC.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
        return Some(d.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|n| n.and_utc())
}

/// Accepts any scalar so a bad timestamp value degrades to `None`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_utc<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawTimestamp> = Option::deserialize(de)?;
    Ok(raw.and_then(|r| match r {
        RawTimestamp::Text(s) => parse_utc(&s),
        RawTimestamp::Other(_) => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn none_decision_serializes_empty_actions() {
        let d = Decision {
            timestamp: Utc.with_ymd_and_hms(2025, 10, 13, 12, 0, 0).single(),
            status: DecisionStatus::None,
            reason: vec![labels::OK.to_string()],
            actions: DecisionActions::default(),
        };
        let s = serde_json::to_string(&d).unwrap();
        assert!(s.contains("\"actions\":{}"), "{s}");
        assert!(s.contains("\"timestamp\":\"2025-10-13T12:00:00Z\""), "{s}");
        assert!(s.contains("\"status\":\"none\""), "{s}");
    }

    #[test]
    fn bad_schedule_value_does_not_poison_line() {
        let line = r#"{"timestamp":"2025-10-13T12:00:00Z","status":"halt","reason":["max_drawdown_cap"],
            "actions":{"risk_multiplier":0.0,"schedule_retrain_at":"not-a-date"}}"#;
        let d: Decision = serde_json::from_str(line).unwrap();
        assert_eq!(d.status, DecisionStatus::Halt);
        assert_eq!(d.actions.risk_multiplier, Some(0.0));
        assert_eq!(d.actions.schedule_retrain_at, None);
    }

    #[test]
    fn timestamp_does_not_decide_line_validity() {
        let missing = r#"{"status":"halt","reason":[],"actions":{"risk_multiplier":0.0}}"#;
        let d: Decision = serde_json::from_str(missing).unwrap();
        assert_eq!(d.status, DecisionStatus::Halt);
        assert_eq!(d.timestamp, None);

        let garbage = r#"{"timestamp":17,"status":"degrade","actions":{}}"#;
        let d: Decision = serde_json::from_str(garbage).unwrap();
        assert_eq!(d.status, DecisionStatus::Degrade);
        assert_eq!(d.timestamp, None);

        let naive = r#"{"timestamp":"2025-10-13T12:00:00","status":"halt","actions":{}}"#;
        let d: Decision = serde_json::from_str(naive).unwrap();
        assert_eq!(d.timestamp, Utc.with_ymd_and_hms(2025, 10, 13, 12, 0, 0).single());
    }

    #[test]
    fn missing_timestamp_is_not_written_as_null() {
        let d = Decision {
            timestamp: None,
            status: DecisionStatus::Warn,
            reason: vec![],
            actions: DecisionActions::default(),
        };
        let s = serde_json::to_string(&d).unwrap();
        assert!(!s.contains("timestamp"), "{s}");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let line = r#"{"timestamp":"2025-10-13T12:00:00Z","status":"panic","reason":[],"actions":{}}"#;
        assert!(serde_json::from_str::<Decision>(line).is_err());
    }

    #[test]
    fn reason_is_sorted_union_or_ok() {
        let mut t = Triggers::default();
        assert_eq!(t.reason(), vec!["ok".to_string()]);
        t.push_warn(labels::SHARPE_MIN_SHORT);
        t.push_severe(labels::MAX_DRAWDOWN_CAP);
        t.push_warn(labels::SHARPE_MIN_SHORT);
        assert_eq!(
            t.reason(),
            vec!["max_drawdown_cap".to_string(), "sharpe_min_short".to_string()]
        );
    }

    #[test]
    fn format_utc_uses_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_utc(&ts), "2025-01-02T03:04:05Z");
        assert_eq!(parse_utc("2025-01-02T05:04:05+02:00"), Some(ts));
        assert_eq!(parse_utc("2025-01-02 03:04:05"), Some(ts));
        assert_eq!(parse_utc("yesterday"), None);
    }
}
