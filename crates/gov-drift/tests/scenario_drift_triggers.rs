use gov_drift::{
    compute_psi, compute_psi_multi, evaluate_drift, evaluate_psi, evaluate_residuals,
    histograms_from_json,
    DriftInputs,
};
use gov_policy::load_policy_from_strings;
use serde_json::json;
use std::io::Write;

const POLICY: &str = r#"
retraining:
  drift_triggers:
    feature_drift: { psi_warn: 0.2, psi_retrain: 0.3 }
    residual_drift: { adwin_delta: 0.002 }
"#;

fn policy() -> gov_policy::Policy {
    load_policy_from_strings(&[POLICY]).unwrap().policy
}

#[test]
fn psi_invariant_under_consistent_bin_permutation() {
    let base = [5.0, 40.0, 30.0, 25.0];
    let curr = [20.0, 10.0, 35.0, 35.0];
    let perm = [2usize, 0, 3, 1];
    let pb: Vec<f64> = perm.iter().map(|&i| base[i]).collect();
    let pc: Vec<f64> = perm.iter().map(|&i| curr[i]).collect();

    let a = compute_psi(&base, &curr).unwrap();
    let b = compute_psi(&pb, &pc).unwrap();
    assert!((a - b).abs() < 1e-12);
}

#[test]
fn multi_feature_mean_skips_incomparable_features() {
    let base = histograms_from_json(&json!({
        "rsi":   {"bins": [0, 30, 70, 100], "counts": [10, 80, 10]},
        "atr":   {"bins": [0, 1, 2],        "counts": [50, 50]},
        "vol":   {"bins": [0, 1, 2],        "counts": [50, 50]},
        "extra": {"bins": [0, 1],           "counts": [1]},
        "junk":  "not a histogram"
    }));
    let curr = histograms_from_json(&json!({
        "rsi": {"bins": [0, 30, 70, 100], "counts": [10, 80, 10]},
        "atr": {"bins": [0, 1, 2],        "counts": [90, 10]},
        "vol": {"bins": [0, 1, 2, 3],     "counts": [50, 25, 25]}
    }));
    assert_eq!(base.len(), 4, "junk entry dropped at parse");

    let atr = compute_psi(&[50.0, 50.0], &[90.0, 10.0]).unwrap();
    let mean = compute_psi_multi(&base, &curr);
    // rsi (0) and atr count; vol has a shape mismatch; extra is absent from current.
    assert!((mean - atr / 2.0).abs() < 1e-12, "mean={mean} atr={atr}");
}

#[test]
fn categorical_bins_feed_psi() {
    let base = histograms_from_json(&json!({
        "regime": {"bins": ["bear", "flat", "bull"], "counts": [10, 80, 10]}
    }));
    let curr = histograms_from_json(&json!({
        "regime": {"bins": ["bear", "flat", "bull"], "counts": [70, 20, 10]}
    }));
    assert_eq!(base.len(), 1);

    let expected = compute_psi(&[10.0, 80.0, 10.0], &[70.0, 20.0, 10.0]).unwrap();
    let psi = compute_psi_multi(&base, &curr);
    assert!((psi - expected).abs() < 1e-12);
    assert!(psi > 0.3, "psi={psi}");

    let t = evaluate_psi(&policy(), &base, &curr);
    assert_eq!(t.severe, vec!["feature_drift.psi_retrain".to_string()]);
}

#[test]
fn categorical_bins_with_different_cardinality_are_skipped() {
    let base = histograms_from_json(&json!({
        "regime": {"bins": ["bear", "flat", "bull"], "counts": [10, 80, 10]}
    }));
    let curr = histograms_from_json(&json!({
        "regime": {"bins": ["bear", "bull"], "counts": [70, 30, 0]}
    }));
    assert_eq!(compute_psi_multi(&base, &curr), 0.0);
}

#[test]
fn psi_classification_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.json");
    let curr = dir.path().join("curr.json");
    std::fs::write(&base, json!({"f": {"bins": [0, 1, 2], "counts": [50, 50]}}).to_string()).unwrap();

    let inputs = DriftInputs {
        features_baseline: Some(base.clone()),
        features_current: Some(curr.clone()),
        residuals: None,
    };

    // Identical → no signal.
    std::fs::write(&curr, json!({"f": {"bins": [0, 1, 2], "counts": [50, 50]}}).to_string()).unwrap();
    assert!(evaluate_drift(&policy(), &inputs).is_empty());

    // PSI([.5,.5] → [.8,.2]) ≈ 0.416 → retrain.
    std::fs::write(&curr, json!({"f": {"bins": [0, 1, 2], "counts": [80, 20]}}).to_string()).unwrap();
    let t = evaluate_drift(&policy(), &inputs);
    assert_eq!(t.severe, vec!["feature_drift.psi_retrain".to_string()]);
    assert!(t.warn.is_empty());

    // PSI([.5,.5] → [.75,.25]) ≈ 0.275 → warn only.
    std::fs::write(&curr, json!({"f": {"bins": [0, 1, 2], "counts": [75, 25]}}).to_string()).unwrap();
    let t = evaluate_drift(&policy(), &inputs);
    assert_eq!(t.warn, vec!["feature_drift.psi_warn".to_string()]);
    assert!(t.severe.is_empty());

    // Corrupt current file → no signal, no panic.
    std::fs::write(&curr, "{ not json").unwrap();
    assert!(evaluate_drift(&policy(), &inputs).is_empty());
}

#[test]
fn residual_drift_requires_more_than_twenty_points() {
    let mut xs = vec![0.0; 10];
    xs.extend(std::iter::repeat(10.0).take(10));
    assert_eq!(xs.len(), 20);
    assert!(evaluate_residuals(&policy(), &xs).is_empty());

    let mut long = vec![0.0; 30];
    long.extend(std::iter::repeat(10.0).take(30));
    let t = evaluate_residuals(&policy(), &long);
    assert_eq!(t.severe, vec!["residual_drift".to_string()]);
}

#[test]
fn constant_residuals_from_csv_do_not_fire() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("residuals.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "ts,residual").unwrap();
    for i in 0..200 {
        writeln!(f, "{i},0.25").unwrap();
    }
    drop(f);

    let inputs = DriftInputs {
        residuals: Some(path),
        ..Default::default()
    };
    assert!(evaluate_drift(&policy(), &inputs).is_empty());
}

#[test]
fn residual_file_without_column_is_no_signal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("residuals.csv");
    std::fs::write(&path, "ts,error\n1,2\n").unwrap();
    let inputs = DriftInputs {
        residuals: Some(path),
        ..Default::default()
    };
    assert!(evaluate_drift(&policy(), &inputs).is_empty());
}
