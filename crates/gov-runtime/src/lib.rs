//! gov-runtime
//!
//! Read-only view of governance for the trading loop. Combines the policy's
//! per-trade bounds with the actions of the last logged decision.
//!
//! [`get_governance_state`] never fails. Each input is loaded through its own
//! `Result` step and any failure falls back to full-risk defaults for that
//! input only, so a broken policy file does not hide a logged HALT.

use anyhow::Result;
use gov_log::DecisionLog;
use gov_policy::{read_policy_typed, Policy};
use gov_schemas::{Decision, DecisionStatus};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_POLICY_PATH: &str = "config/governance_policy.yaml";
pub const DEFAULT_DECISIONS_PATH: &str = "monitoring/governance_decisions.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovernanceState {
    pub status: DecisionStatus,
    pub risk_multiplier: f64,
    pub tighten_stop_factor: f64,
    pub disable_shorts: bool,
    pub max_leverage: Option<f64>,
    pub min_stop_pct: Option<f64>,
    pub max_stop_pct: Option<f64>,
}

impl Default for GovernanceState {
    fn default() -> Self {
        Self {
            status: DecisionStatus::None,
            risk_multiplier: 1.0,
            tighten_stop_factor: 1.0,
            disable_shorts: false,
            max_leverage: None,
            min_stop_pct: None,
            max_stop_pct: None,
        }
    }
}

impl GovernanceState {
    /// Copy per-trade bounds from the policy.
    pub fn with_policy(mut self, policy: &Policy) -> Self {
        let pt = &policy.risk.per_trade;
        self.max_leverage = pt.max_leverage;
        self.min_stop_pct = pt.stop.min_stop_pct;
        self.max_stop_pct = pt.stop.max_stop_pct;
        self
    }

    /// Apply the actions of a logged decision. Absent or out-of-range values
    /// keep their defaults; an explicit risk multiplier of 0.0 is honoured.
    pub fn with_decision(mut self, decision: &Decision) -> Self {
        let a = &decision.actions;
        self.status = decision.status;
        self.risk_multiplier = a
            .risk_multiplier
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(1.0);
        self.tighten_stop_factor = a
            .tighten_stop_factor
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(1.0);
        self.disable_shorts = a.disable_shorts.unwrap_or(false);
        self
    }

    pub fn is_halted(&self) -> bool {
        self.status == DecisionStatus::Halt
    }

    /// Entry gate: nothing opens under HALT, shorts stay closed while disabled.
    pub fn allows_entry(&self, side: Side) -> bool {
        if self.is_halted() {
            return false;
        }
        match side {
            Side::Long => true,
            Side::Short => !self.disable_shorts,
        }
    }

    pub fn scale_stake(&self, stake: f64) -> f64 {
        stake * self.risk_multiplier
    }

    pub fn cap_leverage(&self, proposed: f64) -> f64 {
        match self.max_leverage {
            Some(max) => proposed.min(max),
            None => proposed,
        }
    }

    /// Stop distance in percent: `base` divided by the tighten factor, then
    /// clamped into the policy's `[min_stop_pct, max_stop_pct]`.
    pub fn stop_pct(&self, base: f64) -> f64 {
        let mut pct = base / self.tighten_stop_factor;
        if let Some(max) = self.max_stop_pct {
            pct = pct.min(max);
        }
        if let Some(min) = self.min_stop_pct {
            pct = pct.max(min);
        }
        pct
    }
}

/// Current governance state for the trading loop.
pub fn get_governance_state(
    policy_path: impl AsRef<Path>,
    decisions_path: impl AsRef<Path>,
) -> GovernanceState {
    let mut state = GovernanceState::default();

    match read_policy_typed(policy_path.as_ref()) {
        Ok(p) => state = state.with_policy(&p),
        Err(e) => warn!(error = %format!("{e:#}"), "governance policy unavailable; per-trade bounds unset"),
    }

    match read_last_decision(decisions_path.as_ref()) {
        Ok(Some(d)) => state = state.with_decision(&d),
        Ok(None) => debug!("no governance decision logged yet"),
        Err(e) => warn!(error = %format!("{e:#}"), "decision log unavailable; running at full risk"),
    }

    state
}

/// [`get_governance_state`] at the conventional deployment paths.
pub fn get_default_governance_state() -> GovernanceState {
    get_governance_state(DEFAULT_POLICY_PATH, DEFAULT_DECISIONS_PATH)
}

fn read_last_decision(path: &Path) -> Result<Option<Decision>> {
    DecisionLog::at(path).last_decision()
}
