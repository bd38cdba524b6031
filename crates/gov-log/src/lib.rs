//! gov-log
//!
//! Append-only decision log, JSON Lines (one decision per line). The last
//! line that parses as a [`Decision`] is the current governance state;
//! earlier lines are the audit trail.
//!
//! Single writer per log file. No locking is taken: running two decision
//! schedulers against the same file is a deployment error.

use anyhow::{Context, Result};
use gov_schemas::Decision;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle on a decision log file.
#[derive(Debug, Clone)]
pub struct DecisionLog {
    path: PathBuf,
}

impl DecisionLog {
    /// Handle for reading; touches nothing on disk.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Handle for writing; ensures parent dirs exist.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one decision as a single compact line and flush.
    pub fn append(&self, decision: &Decision) -> Result<()> {
        let line = canonical_json_line(decision)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open decision log {:?}", self.path))?;
        // One write per line so a crash leaves at most one partial trailing line.
        let mut buf = line.into_bytes();
        buf.push(b'\n');
        f.write_all(&buf).context("write decision line failed")?;
        f.flush().context("flush decision log failed")?;
        Ok(())
    }

    /// Last well-formed decision. A missing file is an empty log.
    pub fn last_decision(&self) -> Result<Option<Decision>> {
        match self.open_reader()? {
            Some(r) => last_decision_in(r),
            None => Ok(None),
        }
    }

    /// Every well-formed decision, oldest first.
    pub fn read_all(&self) -> Result<Vec<Decision>> {
        let mut out = Vec::new();
        if let Some(r) = self.open_reader()? {
            for_each_line(r, |_, parsed| {
                if let Some(d) = parsed {
                    out.push(d);
                }
            })?;
        }
        Ok(out)
    }

    /// Count valid and malformed lines.
    pub fn scan(&self) -> Result<LogScan> {
        match self.open_reader()? {
            Some(r) => scan_reader(r),
            None => Ok(LogScan::default()),
        }
    }

    fn open_reader(&self) -> Result<Option<BufReader<File>>> {
        match File::open(&self.path) {
            Ok(f) => Ok(Some(BufReader::new(f))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("open decision log {:?}", self.path)),
        }
    }
}

/// Result of scanning a log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogScan {
    /// Non-blank lines seen.
    pub lines: usize,
    pub valid: usize,
    /// 1-based line numbers that failed to parse.
    pub malformed: Vec<usize>,
}

impl LogScan {
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty()
    }
}

/// Stream `reader` and keep the last line that parses as a decision.
/// Blank, non-UTF-8 and unparsable lines (e.g. a torn final write) are skipped.
pub fn last_decision_in(reader: impl BufRead) -> Result<Option<Decision>> {
    let mut last = None;
    for_each_line(reader, |_, parsed| {
        if parsed.is_some() {
            last = parsed;
        }
    })?;
    Ok(last)
}

pub fn scan_reader(reader: impl BufRead) -> Result<LogScan> {
    let mut scan = LogScan::default();
    for_each_line(reader, |line_no, parsed| {
        scan.lines += 1;
        match parsed {
            Some(_) => scan.valid += 1,
            None => scan.malformed.push(line_no),
        }
    })?;
    Ok(scan)
}

fn for_each_line(
    mut reader: impl BufRead,
    mut f: impl FnMut(usize, Option<Decision>),
) -> Result<()> {
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .context("read decision log failed")?;
        if n == 0 {
            break;
        }
        line_no += 1;
        let trimmed = trim_ascii(&buf);
        if trimmed.is_empty() {
            continue;
        }
        let parsed = serde_json::from_slice::<Decision>(trimmed).ok();
        if parsed.is_none() {
            debug!(line = line_no, "skipping malformed decision line");
        }
        f(line_no, parsed);
    }
    Ok(())
}

fn trim_ascii(b: &[u8]) -> &[u8] {
    let start = b.iter().position(|c| !c.is_ascii_whitespace()).unwrap_or(b.len());
    let end = b.iter().rposition(|c| !c.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &b[start..end.max(start)]
}

/// Compact JSON with keys sorted recursively; the exact form of a log line.
pub fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize decision failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}
