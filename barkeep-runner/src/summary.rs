//! Run summary and problem list.
//!
//! Each interval pass returns its own [`RunSummary`]; callers add them up.
//! Nothing accumulates on the orchestrator itself.

use std::ops::AddAssign;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use barkeep_core::data::DataError;
use barkeep_core::domain::Interval;
use barkeep_core::reconcile::MergeOutcome;

/// A symbol whose merge failed, with the error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub symbol: String,
    pub error: String,
    pub interval: Interval,
}

/// Outcome counts for one interval pass, or several added together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Series files created or rewritten.
    pub updated: usize,
    /// Series that already had a row for the snapshot date.
    pub already_current: usize,
    pub problems: Vec<Problem>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problematic(&self) -> usize {
        self.problems.len()
    }

    pub fn total(&self) -> usize {
        self.updated + self.already_current + self.problematic()
    }

    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    /// Fold one symbol's merge result into the counts.
    pub fn record(
        &mut self,
        symbol: &str,
        interval: Interval,
        result: Result<MergeOutcome, DataError>,
    ) {
        match result {
            Ok(outcome) if outcome.is_update() => self.updated += 1,
            Ok(_) => self.already_current += 1,
            Err(e) => {
                tracing::warn!(%symbol, %interval, error = %e, "merge failed");
                self.problems.push(Problem {
                    symbol: symbol.to_string(),
                    error: e.to_string(),
                    interval,
                });
            }
        }
    }

    /// `updated=N already_current=N problematic=N`
    pub fn summary_line(&self) -> String {
        format!(
            "updated={} already_current={} problematic={}",
            self.updated,
            self.already_current,
            self.problematic()
        )
    }

    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation,
            updated = self.updated,
            already_current = self.already_current,
            problematic = self.problematic(),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "update summary"
        );
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.updated += other.updated;
        self.already_current += other.already_current;
        self.problems.extend(other.problems);
        self.elapsed += other.elapsed;
    }
}
