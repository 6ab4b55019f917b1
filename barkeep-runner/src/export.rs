//! Problem log and run report export.
//!
//! - **CSV**: problem list as `ticker,error,timeframe`, one file per interval
//!   at `{dir}/problematic_tickers_tw_{interval}.csv`
//! - **JSON**: the full [`RunReport`], pretty-printed

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use barkeep_core::domain::Interval;

use crate::orchestrator::RunReport;
use crate::summary::Problem;

/// `{dir}/problematic_tickers_tw_{interval}.csv`
pub fn problem_log_path(dir: &Path, interval: Interval) -> PathBuf {
    dir.join(format!("problematic_tickers_tw_{interval}.csv"))
}

/// Render a problem list as CSV with header `ticker,error,timeframe`.
pub fn problems_csv(problems: &[Problem]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["ticker", "error", "timeframe"])?;
    for p in problems {
        wtr.write_record([p.symbol.as_str(), p.error.as_str(), p.interval.as_str()])?;
    }
    let bytes = wtr.into_inner().context("failed to flush problem CSV")?;
    String::from_utf8(bytes).context("problem CSV is not UTF-8")
}

/// Write one interval's problems. Returns `None` (and writes nothing) when
/// there are no problems for that interval.
pub fn write_problem_log(
    dir: &Path,
    interval: Interval,
    problems: &[Problem],
) -> Result<Option<PathBuf>> {
    let mine: Vec<Problem> = problems
        .iter()
        .filter(|p| p.interval == interval)
        .cloned()
        .collect();
    if mine.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = problem_log_path(dir, interval);
    fs::write(&path, problems_csv(&mine)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), count = mine.len(), "wrote problem log");
    Ok(Some(path))
}

/// Serialize a run report to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}
