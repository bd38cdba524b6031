use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "govctl")]
#[command(about = "Risk-governance decision tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate policy + metrics + drift, append one decision to the log and print it
    Decide {
        /// Policy paths in merge order (base first, overlays after)
        #[arg(long = "policy", default_value = "config/governance_policy.yaml")]
        policy_paths: Vec<PathBuf>,

        #[arg(long, default_value = "monitoring/latest_metrics.json")]
        latest: PathBuf,

        #[arg(long, default_value = "monitoring/metrics_history.csv")]
        history: PathBuf,

        /// Decision log (JSONL) to append to
        #[arg(long, default_value = "monitoring/governance_decisions.jsonl")]
        out: PathBuf,

        /// Baseline feature histograms (JSON)
        #[arg(long)]
        features_baseline: Option<PathBuf>,

        /// Current feature histograms (JSON)
        #[arg(long)]
        features_current: Option<PathBuf>,

        /// Residual series (CSV with a `residual` column)
        #[arg(long)]
        residuals: Option<PathBuf>,

        /// Evaluation time, RFC 3339 (defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Refuse policies containing keys nothing reads
        #[arg(long, default_value_t = false)]
        strict_keys: bool,
    },

    /// Print the runtime governance state as JSON
    State {
        #[arg(long, default_value = gov_runtime::DEFAULT_POLICY_PATH)]
        policy: PathBuf,

        #[arg(long, default_value = gov_runtime::DEFAULT_DECISIONS_PATH)]
        decisions: PathBuf,
    },

    /// Report whether the last decision's scheduled retrain has been reached
    RetrainCheck {
        #[arg(long, default_value = gov_runtime::DEFAULT_DECISIONS_PATH)]
        decisions: PathBuf,

        /// Report due regardless of schedule
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Check time, RFC 3339 (defaults to now)
        #[arg(long)]
        now: Option<String>,
    },

    /// Append the latest metrics snapshot to the history CSV
    RecordMetrics {
        #[arg(long, default_value = "monitoring/latest_metrics.json")]
        latest: PathBuf,

        #[arg(long, default_value = "monitoring/metrics_history.csv")]
        history: PathBuf,
    },

    /// Compute layered policy hash + print canonical JSON
    PolicyHash {
        /// Paths in merge order (base -> overlays)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Count valid and malformed lines in a decision log
    LogCheck {
        #[arg(long, default_value = gov_runtime::DEFAULT_DECISIONS_PATH)]
        decisions: PathBuf,
    },
}

fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Decide {
            policy_paths,
            latest,
            history,
            out,
            features_baseline,
            features_current,
            residuals,
            now,
            strict_keys,
        } => commands::decide::run(commands::decide::DecideArgs {
            policy_paths,
            latest,
            history,
            out,
            drift: gov_drift::DriftInputs {
                features_baseline,
                features_current,
                residuals,
            },
            now: commands::parse_now(now.as_deref())?,
            strict_keys,
        })?,

        Commands::State { policy, decisions } => commands::inspect::state(&policy, &decisions)?,

        Commands::RetrainCheck {
            decisions,
            force,
            now,
        } => commands::inspect::retrain_check(&decisions, force, commands::parse_now(now.as_deref())?)?,

        Commands::RecordMetrics { latest, history } => {
            commands::inspect::record_metrics(&latest, &history)?
        }

        Commands::PolicyHash { paths } => commands::inspect::policy_hash(&paths)?,

        Commands::LogCheck { decisions } => commands::inspect::log_check(&decisions)?,
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
