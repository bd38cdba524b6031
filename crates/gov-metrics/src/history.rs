use crate::{parse_number, Metric, MetricsSnapshot};
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::warn;

/// Upper bound on the number of rows in a baseline window.
pub const BASELINE_WINDOW: usize = 20;

const DEFAULT_COLUMNS: [&str; 5] = [
    "timestamp",
    "sharpe_ratio",
    "profit_factor",
    "win_rate",
    "max_drawdown",
];

/// Historical snapshots, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsHistory {
    rows: Vec<MetricsSnapshot>,
}

impl MetricsHistory {
    pub fn from_rows(rows: Vec<MetricsSnapshot>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MetricsSnapshot] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows used as the comparison baseline: the final row (the run being
    /// evaluated) is excluded, then the trailing `min(20, len - 1)` rows are kept.
    pub fn baseline_window(&self) -> &[MetricsSnapshot] {
        let Some((_, prior)) = self.rows.split_last() else {
            return &[];
        };
        let n = prior.len().min(BASELINE_WINDOW);
        &prior[prior.len() - n..]
    }

    /// Median of the present values of `m` over the baseline window.
    pub fn baseline_median(&self, m: Metric) -> Option<f64> {
        let values: Vec<f64> = self.baseline_window().iter().filter_map(|r| r.get(m)).collect();
        median(&values)
    }
}

/// Median; `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) / 2.0)
    } else {
        Some(v[mid])
    }
}

/// Load the history CSV. A missing file yields an empty history; rows that
/// fail to parse as CSV are skipped individually. Unknown columns are ignored.
pub fn load_history(path: impl AsRef<Path>) -> MetricsHistory {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "metrics history not found");
        return MetricsHistory::default();
    }
    match read_history(path) {
        Ok(h) => h,
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "metrics history unreadable");
            MetricsHistory::default()
        }
    }
}

fn read_history(path: &Path) -> Result<MetricsHistory> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open metrics history csv: {}", path.display()))?;

    let headers = rdr.headers().context("read history header")?.clone();
    let ts_idx = headers.iter().position(|h| h == "timestamp");
    let metric_idx: Vec<(Metric, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| Metric::from_column(h).map(|m| (m, i)))
        .collect();

    let mut rows = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = match rec {
            Ok(r) => r,
            Err(e) => {
                warn!(row = i + 1, error = %e, "skipping malformed history row");
                continue;
            }
        };
        let mut snap = MetricsSnapshot::default();
        for (m, idx) in &metric_idx {
            snap.set(*m, rec.get(*idx).and_then(parse_number));
        }
        snap.timestamp = ts_idx
            .and_then(|idx| rec.get(idx))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        rows.push(snap);
    }
    Ok(MetricsHistory::from_rows(rows))
}

/// Append one snapshot to the history CSV. A new (or empty) file gets the
/// default header; an existing file keeps its own column order and columns
/// this crate does not know are left blank.
pub fn append_history_row(path: impl AsRef<Path>, snap: &MetricsSnapshot) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
    }

    let existing_header: Option<Vec<String>> = if path.exists() && fs::metadata(path)?.len() > 0 {
        let mut rdr = csv::Reader::from_path(path)
            .with_context(|| format!("open metrics history csv: {}", path.display()))?;
        Some(rdr.headers()?.iter().map(|h| h.trim().to_string()).collect())
    } else {
        None
    };

    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open metrics history for append {:?}", path))?;
    // A hand-edited file may lack the final newline; keep the last row intact.
    if existing_header.is_some() && !ends_with_newline(path)? {
        f.write_all(b"\n").context("terminate last history row")?;
    }
    let mut w = csv::Writer::from_writer(f);

    let columns: Vec<String> = match existing_header {
        Some(h) => h,
        None => {
            let h: Vec<String> = DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect();
            w.write_record(&h).context("write history header")?;
            h
        }
    };

    let record: Vec<String> = columns
        .iter()
        .map(|c| {
            if c == "timestamp" {
                snap.timestamp.clone().unwrap_or_default()
            } else {
                Metric::from_column(c)
                    .and_then(|m| snap.get(m))
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }
        })
        .collect();
    w.write_record(&record).context("write history row")?;
    w.flush().context("flush history csv")?;
    Ok(())
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut f = File::open(path).with_context(|| format!("open metrics history {:?}", path))?;
    if f.metadata()?.len() == 0 {
        return Ok(true);
    }
    f.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    f.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wr(values: &[f64]) -> MetricsHistory {
        MetricsHistory::from_rows(
            values
                .iter()
                .map(|v| MetricsSnapshot {
                    win_rate: Some(*v),
                    ..Default::default()
                })
                .collect(),
        )
    }

    #[test]
    fn window_excludes_final_row() {
        let h = wr(&[60.0, 58.0, 59.0, 57.0, 55.0]);
        assert_eq!(h.baseline_window().len(), 4);
        assert_eq!(h.baseline_median(Metric::WinRate), Some(58.5));
    }

    #[test]
    fn window_capped_at_twenty() {
        let values: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let h = wr(&values);
        let w = h.baseline_window();
        assert_eq!(w.len(), BASELINE_WINDOW);
        assert_eq!(w[0].win_rate, Some(9.0));
        assert_eq!(w[19].win_rate, Some(28.0));
    }

    #[test]
    fn single_row_has_no_baseline() {
        assert_eq!(wr(&[50.0]).baseline_median(Metric::WinRate), None);
        assert_eq!(MetricsHistory::default().baseline_median(Metric::WinRate), None);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
