use chrono::Duration;
use gov_drift::DriftInputs;
use gov_engine::{decide, decide_with_previous};
use gov_log::DecisionLog;
use gov_metrics::{MetricsHistory, MetricsSnapshot};
use gov_policy::load_policy_from_strings;
use gov_schemas::{Decision, DecisionActions, DecisionStatus, Triggers};
use gov_testkit::{at, histogram_json, history, snapshot, standard_policy, Scratch, STANDARD_POLICY_YAML};

fn calm_history() -> MetricsHistory {
    history(&[(56.0, 4.0), (55.5, 4.5)])
}

fn prior(status: DecisionStatus) -> Decision {
    Decision {
        timestamp: Some(at(13, 8)),
        status,
        reason: vec!["winrate_drop_pp".to_string()],
        actions: DecisionActions {
            risk_multiplier: Some(0.5),
            ..Default::default()
        },
    }
}

#[test]
fn no_breach_from_none_is_none_ok() {
    let d = decide_with_previous(
        &standard_policy(),
        &snapshot(1.2, 55.0, 5.0),
        &calm_history(),
        None,
        Triggers::default(),
        at(13, 12),
    );
    assert_eq!(d.status, DecisionStatus::None);
    assert_eq!(d.reason, vec!["ok".to_string()]);
    assert!(d.actions.is_empty());
    assert_eq!(d.timestamp, Some(at(13, 12)));
}

#[test]
fn warn_scenario_low_sharpe() {
    let d = decide_with_previous(
        &standard_policy(),
        &snapshot(0.3, 55.0, 5.0),
        &calm_history(),
        None,
        Triggers::default(),
        at(13, 12),
    );
    assert_eq!(d.status, DecisionStatus::Warn);
    assert_eq!(d.reason, vec!["sharpe_min_short".to_string()]);
    assert_eq!(d.actions.risk_multiplier, Some(0.75));
    assert_eq!(d.actions.tighten_stop_factor, Some(1.0));
    assert_eq!(d.actions.disable_shorts, Some(false));
    assert_eq!(d.actions.schedule_retrain_at, None);
}

#[test]
fn degrade_scenario_win_rate_collapse() {
    let h = history(&[(60.0, 4.0), (58.0, 4.5), (59.0, 4.2), (57.0, 4.0), (55.0, 4.3)]);
    let now = at(13, 12);
    let d = decide_with_previous(
        &standard_policy(),
        &snapshot(0.8, 40.0, 5.0),
        &h,
        None,
        Triggers::default(),
        now,
    );
    assert_eq!(d.status, DecisionStatus::Degrade);
    assert_eq!(d.reason, vec!["winrate_drop_pp".to_string()]);
    assert_eq!(d.actions.risk_multiplier, Some(0.5));
    assert_eq!(d.actions.disable_shorts, Some(true));
    assert_eq!(d.actions.tighten_stop_factor, Some(1.25));
    assert_eq!(d.actions.schedule_retrain_at, Some(now + Duration::hours(12)));
}

#[test]
fn halt_scenario_drawdown_cap() {
    let now = at(13, 12);
    let d = decide_with_previous(
        &standard_policy(),
        &snapshot(1.0, 55.0, 12.0),
        &calm_history(),
        None,
        Triggers::default(),
        now,
    );
    assert_eq!(d.status, DecisionStatus::Halt);
    assert_eq!(d.actions.risk_multiplier, Some(0.0));
    assert_eq!(d.actions.disable_shorts, Some(true));
    assert_eq!(d.actions.tighten_stop_factor, Some(1.25));
    let sched = d.actions.schedule_retrain_at.unwrap();
    assert!(sched >= now + Duration::hours(12));
    // 12 > 1.5 × 4.0 as well, so both hard-halt labels appear, sorted.
    assert_eq!(
        d.reason,
        vec!["max_drawdown_cap".to_string(), "mdd_spike_factor".to_string()]
    );
}

#[test]
fn halt_wins_over_simultaneous_warn_and_degrade() {
    let h = history(&[(60.0, 4.0), (58.0, 4.5), (59.0, 4.2), (57.0, 4.0), (55.0, 4.3)]);
    let mut drift = Triggers::default();
    drift.push_warn("feature_drift.psi_warn");
    let d = decide_with_previous(
        &standard_policy(),
        &snapshot(0.1, 40.0, 11.0),
        &h,
        None,
        drift,
        at(13, 12),
    );
    assert_eq!(d.status, DecisionStatus::Halt);
    for label in ["sharpe_min_short", "winrate_drop_pp", "feature_drift.psi_warn", "max_drawdown_cap"] {
        assert!(d.reason.iter().any(|r| r == label), "missing {label} in {:?}", d.reason);
    }
}

#[test]
fn halt_mapping_is_honoured_for_policy_labels() {
    let yaml = STANDARD_POLICY_YAML.replace(
        "halt_and_retrain: [mdd_spike_factor]",
        "halt_and_retrain: [mdd_spike_factor, residual_drift]",
    );
    let p = load_policy_from_strings(&[yaml.as_str()]).unwrap().policy;
    let mut drift = Triggers::default();
    drift.push_severe("residual_drift");

    let d = decide_with_previous(&p, &snapshot(1.0, 55.0, 5.0), &calm_history(), None, drift.clone(), at(13, 12));
    assert_eq!(d.status, DecisionStatus::Halt);

    // Unmapped in the standard policy → severe but not halt.
    let d = decide_with_previous(&standard_policy(), &snapshot(1.0, 55.0, 5.0), &calm_history(), None, drift, at(13, 12));
    assert_eq!(d.status, DecisionStatus::Degrade);
}

#[test]
fn resume_after_recovery_from_degrade() {
    let h = history(&[(60.0, 4.0), (58.0, 4.5), (59.0, 4.2), (57.0, 4.0)]);
    let prev = prior(DecisionStatus::Degrade);
    let d = decide_with_previous(
        &standard_policy(),
        &snapshot(0.6, 58.0, 5.0),
        &h,
        Some(&prev),
        Triggers::default(),
        at(13, 16),
    );
    assert_eq!(d.status, DecisionStatus::Resume);
    assert_eq!(d.reason, vec!["ok".to_string()]);
    assert_eq!(d.actions, DecisionActions::full_risk());
}

#[test]
fn resume_only_from_restricted_states() {
    let h = history(&[(60.0, 4.0), (58.0, 4.5), (59.0, 4.2), (57.0, 4.0)]);
    for status in [DecisionStatus::Warn, DecisionStatus::None, DecisionStatus::Resume] {
        let prev = prior(status);
        let d = decide_with_previous(
            &standard_policy(),
            &snapshot(0.6, 58.0, 5.0),
            &h,
            Some(&prev),
            Triggers::default(),
            at(13, 16),
        );
        assert_eq!(d.status, DecisionStatus::None, "prev={status}");
    }
}

#[test]
fn resume_blocked_when_baseline_data_missing() {
    let prev = prior(DecisionStatus::Halt);
    let latest = MetricsSnapshot {
        sharpe_ratio: Some(0.9),
        ..Default::default()
    };
    let d = decide_with_previous(
        &standard_policy(),
        &latest,
        &MetricsHistory::default(),
        Some(&prev),
        Triggers::default(),
        at(13, 16),
    );
    assert_eq!(d.status, DecisionStatus::None);
    assert!(d.actions.is_empty());
}

#[test]
fn resume_without_baseline_requirement() {
    let yaml = STANDARD_POLICY_YAML.replace("require_back_to_baseline: true", "require_back_to_baseline: false");
    let p = load_policy_from_strings(&[yaml.as_str()]).unwrap().policy;
    let prev = prior(DecisionStatus::Halt);
    let d = decide_with_previous(
        &p,
        &MetricsSnapshot::default(),
        &MetricsHistory::default(),
        Some(&prev),
        Triggers::default(),
        at(13, 16),
    );
    assert_eq!(d.status, DecisionStatus::Resume);
}

#[test]
fn warn_beats_resume_when_prev_halted() {
    let prev = prior(DecisionStatus::Halt);
    let d = decide_with_previous(
        &standard_policy(),
        &snapshot(0.3, 55.0, 5.0),
        &calm_history(),
        Some(&prev),
        Triggers::default(),
        at(13, 16),
    );
    assert_eq!(d.status, DecisionStatus::Warn);
}

#[test]
fn decide_reads_previous_from_log_and_applies_cooldown() -> anyhow::Result<()> {
    let scratch = Scratch::new()?;
    let log = DecisionLog::create(scratch.decisions_path())?;

    // Previous halt scheduled a retrain 20h out.
    let mut prev = prior(DecisionStatus::Halt);
    prev.actions.schedule_retrain_at = Some(at(14, 4));
    log.append(&prev)?;
    let before = std::fs::read_to_string(log.path())?;

    let now = at(13, 12);
    let d = decide(
        &standard_policy(),
        &snapshot(1.0, 55.0, 12.0),
        &calm_history(),
        &log,
        None,
        Some(now),
    );
    assert_eq!(d.status, DecisionStatus::Halt);
    // max(now + 12h = 14T00, prev + 6h = 14T10) = 14T10.
    assert_eq!(d.actions.schedule_retrain_at, Some(at(14, 10)));

    // decide never writes.
    assert_eq!(std::fs::read_to_string(log.path())?, before);
    Ok(())
}

#[test]
fn decide_resumes_from_logged_degrade() -> anyhow::Result<()> {
    let scratch = Scratch::new()?;
    let log = DecisionLog::create(scratch.decisions_path())?;
    let h = history(&[(60.0, 4.0), (58.0, 4.5), (59.0, 4.2), (57.0, 4.0)]);

    let d1 = decide(&standard_policy(), &snapshot(0.6, 45.0, 5.0), &h, &log, None, Some(at(13, 12)));
    assert_eq!(d1.status, DecisionStatus::Degrade);
    log.append(&d1)?;

    let d2 = decide(&standard_policy(), &snapshot(0.6, 58.0, 5.0), &h, &log, None, Some(at(13, 16)));
    assert_eq!(d2.status, DecisionStatus::Resume);
    assert_eq!(d2.actions.risk_multiplier, Some(1.0));
    Ok(())
}

#[test]
fn drift_artifacts_feed_the_decision() -> anyhow::Result<()> {
    let scratch = Scratch::new()?;
    let log = DecisionLog::at(scratch.decisions_path());
    let base = scratch.write_file("drift/base.json", &histogram_json("rsi", &[50.0, 50.0]))?;
    let curr = scratch.write_file("drift/curr.json", &histogram_json("rsi", &[80.0, 20.0]))?;
    let inputs = DriftInputs {
        features_baseline: Some(base),
        features_current: Some(curr),
        residuals: Some(scratch.root().join("drift/missing_residuals.csv")),
    };

    let d = decide(&standard_policy(), &snapshot(1.0, 55.0, 5.0), &calm_history(), &log, Some(&inputs), Some(at(13, 12)));
    assert_eq!(d.status, DecisionStatus::Degrade);
    assert_eq!(d.reason, vec!["feature_drift.psi_retrain".to_string()]);
    Ok(())
}
