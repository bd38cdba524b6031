//! gov-engine
//!
//! Decision engine: turns (policy, latest metrics, history, drift signals,
//! previous decision, now) into one [`Decision`](gov_schemas::Decision).
//!
//! Deterministic, pure logic apart from reading the previous decision in
//! [`decide`]. Nothing here writes: appending to the log is the caller's job.
//!
//! Status priority is strict: HALT > DEGRADE > WARN > RESUME / NONE.

mod engine;
mod performance;
mod schedule;

pub use engine::{decide, decide_with_previous, resume_eligible};
pub use performance::{evaluate_performance, winrate_drop_pp};
pub use schedule::{compute_schedule, hours, retrain_due, RetrainCheck};
