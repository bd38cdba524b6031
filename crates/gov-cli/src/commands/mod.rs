//! Command handler modules for govctl.

pub mod decide;
pub mod inspect;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Parse an optional `--now` override; absent means the wall clock.
pub fn parse_now(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw {
        None => Ok(None),
        Some(s) => gov_schemas::parse_utc(s)
            .map(Some)
            .with_context(|| format!("invalid --now '{}': expected RFC 3339, e.g. 2025-10-13T12:00:00Z", s)),
    }
}
