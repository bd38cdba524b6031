//! Typed view over the governance policy document.
//!
//! Every field mirrors a YAML key. Optional thresholds are `None` when the key
//! is absent or `null` (trigger disabled). Defaults for the non-optional
//! knobs match the values the decider has always assumed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub risk: RiskSection,
    pub retraining: RetrainingSection,
    pub risk_degradation: RiskDegradation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub portfolio: PortfolioCaps,
    pub per_trade: PerTradeLimits,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioCaps {
    /// Informational: no metric currently feeds a daily-loss check.
    pub max_daily_loss_pct: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerTradeLimits {
    pub max_leverage: Option<f64>,
    pub stop: StopBounds,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopBounds {
    pub min_stop_pct: Option<f64>,
    pub max_stop_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrainingSection {
    pub performance_triggers: PerformanceTriggers,
    pub drift_triggers: DriftTriggers,
    pub actions: ActionSets,
    pub cadence: Cadence,
    pub resume_conditions: ResumeConditions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceTriggers {
    pub pf_min_short: Option<f64>,
    pub sharpe_min_short: Option<f64>,
    pub winrate_drop_pp: Option<f64>,
    pub mdd_spike_factor: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftTriggers {
    pub feature_drift: FeatureDrift,
    pub residual_drift: ResidualDrift,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureDrift {
    pub psi_warn: Option<f64>,
    pub psi_retrain: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidualDrift {
    /// Slack (δ) of the residual Page-Hinkley detector.
    pub adwin_delta: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSets {
    pub warn_only_thresholds: Vec<String>,
    pub degrade_then_retrain: Vec<String>,
    pub halt_and_retrain: Vec<String>,
}

impl ActionSets {
    /// Every mapped label, in set order.
    pub fn all_labels(&self) -> impl Iterator<Item = &str> {
        self.warn_only_thresholds
            .iter()
            .chain(&self.degrade_then_retrain)
            .chain(&self.halt_and_retrain)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cadence {
    pub time_based_hours: f64,
    pub min_hours_between_retrains: f64,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            time_based_hours: 12.0,
            min_hours_between_retrains: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeConditions {
    pub require_back_to_baseline: bool,
    /// Informational; RESUME is not delayed by it.
    pub min_hours_after_retrain: f64,
}

impl Default for ResumeConditions {
    fn default() -> Self {
        Self {
            require_back_to_baseline: true,
            min_hours_after_retrain: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskDegradation {
    pub on_warn: OnWarn,
    pub on_degrade: OnDegrade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnWarn {
    pub position_size_multiplier: f64,
}

impl Default for OnWarn {
    fn default() -> Self {
        Self {
            position_size_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnDegrade {
    pub position_size_multiplier: f64,
    pub tighten_stops_factor: f64,
    pub disable_shorts: bool,
}

impl Default for OnDegrade {
    fn default() -> Self {
        Self {
            position_size_multiplier: 0.5,
            tighten_stops_factor: 1.0,
            disable_shorts: false,
        }
    }
}

/// Severity bucket a trigger label is mapped to by `retraining.actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionBucket {
    WarnOnly,
    DegradeThenRetrain,
    HaltAndRetrain,
}

impl Policy {
    /// Bucket for `label`, or `None` when no action set lists it.
    pub fn bucket_for(&self, label: &str) -> Option<ActionBucket> {
        let a = &self.retraining.actions;
        if a.warn_only_thresholds.iter().any(|l| l == label) {
            Some(ActionBucket::WarnOnly)
        } else if a.degrade_then_retrain.iter().any(|l| l == label) {
            Some(ActionBucket::DegradeThenRetrain)
        } else if a.halt_and_retrain.iter().any(|l| l == label) {
            Some(ActionBucket::HaltAndRetrain)
        } else {
            None
        }
    }

    pub fn is_halt_label(&self, label: &str) -> bool {
        self.retraining
            .actions
            .halt_and_retrain
            .iter()
            .any(|l| l == label)
    }

    /// Absolute drawdown cap; a zero cap counts as disabled.
    pub fn max_drawdown_cap(&self) -> Option<f64> {
        self.risk.portfolio.max_drawdown_pct.filter(|v| *v > 0.0)
    }

    pub fn triggers(&self) -> &PerformanceTriggers {
        &self.retraining.performance_triggers
    }

    pub fn feature_drift(&self) -> &FeatureDrift {
        &self.retraining.drift_triggers.feature_drift
    }

    pub fn adwin_delta(&self) -> Option<f64> {
        self.retraining.drift_triggers.residual_drift.adwin_delta
    }

    pub fn cadence(&self) -> &Cadence {
        &self.retraining.cadence
    }

    pub fn resume(&self) -> &ResumeConditions {
        &self.retraining.resume_conditions
    }

    pub fn on_warn(&self) -> &OnWarn {
        &self.risk_degradation.on_warn
    }

    pub fn on_degrade(&self) -> &OnDegrade {
        &self.risk_degradation.on_degrade
    }
}
