//! Update orchestrator: one pass per interval.
//!
//! Per interval the pass moves through
//! `Locating → Sampling → (Skipped | Parsing → Merging → Reporting)`.
//! Symbols are merged strictly one after another; a failing symbol is
//! recorded in the summary and the loop moves on. Only an unavailable
//! universe or a bad config stops a run.

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use barkeep_core::data::{
    DataError, SeriesStore, SnapshotMap, SnapshotParser, SnapshotSet, SnapshotSetLocator,
    Universe,
};
use barkeep_core::domain::{Interval, UtcOffset};
use barkeep_core::reconcile::{SamplingDecision, SeriesMerger, StalenessSampler};

use crate::config::{ConfigError, UpdaterConfig};
use crate::summary::RunSummary;

/// Current schema version for JSON run reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Symbols between progress log lines during the merge loop.
pub const PROGRESS_EVERY: usize = 1000;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Locating,
    Sampling,
    Skipped,
    Parsing,
    Merging,
    Reporting,
}

/// How an interval pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalOutcome {
    /// No dated snapshot file for this interval.
    NoSnapshot,
    /// The sampler found the series already current.
    Skipped,
    /// Every file in the set was rejected or empty.
    NoData,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntervalReport {
    pub interval: Interval,
    pub snapshot_date: Option<NaiveDate>,
    pub files: Vec<String>,
    pub sampling: Option<SamplingDecision>,
    pub outcome: IntervalOutcome,
    pub final_state: RunState,
    pub summary: RunSummary,
}

impl IntervalReport {
    pub(crate) fn new(interval: Interval) -> Self {
        Self {
            interval,
            snapshot_date: None,
            files: Vec::new(),
            sampling: None,
            outcome: IntervalOutcome::NoSnapshot,
            final_state: RunState::Locating,
            summary: RunSummary::new(),
        }
    }

    pub(crate) fn enter(&mut self, state: RunState) {
        tracing::debug!(interval = %self.interval, from = ?self.final_state, to = ?state, "state");
        self.final_state = state;
    }
}

/// Reports for every interval of a run plus their combined summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub intervals: Vec<IntervalReport>,
    pub total: RunSummary,
}

impl RunReport {
    pub fn from_intervals(intervals: Vec<IntervalReport>) -> Self {
        let mut total = RunSummary::new();
        for report in &intervals {
            total += report.summary.clone();
        }
        Self {
            schema_version: SCHEMA_VERSION,
            intervals,
            total,
        }
    }
}

/// Sequences locator, sampler, parser and merger for each interval.
#[derive(Debug, Clone)]
pub struct UpdateOrchestrator {
    snapshot_root: PathBuf,
    store: SeriesStore,
    universe: Universe,
    sampler: StalenessSampler,
    default_offset: UtcOffset,
}

impl UpdateOrchestrator {
    pub fn new(config: &UpdaterConfig, universe: Universe) -> Self {
        Self {
            snapshot_root: config.snapshot_dir.clone(),
            store: SeriesStore::new(&config.series_dir),
            universe,
            sampler: StalenessSampler::new(config.sample_size),
            default_offset: config.default_offset,
        }
    }

    /// Validate the config and load the universe it names.
    pub fn from_config(config: &UpdaterConfig) -> Result<Self, RunError> {
        config.validate()?;
        let universe = Universe::from_file(&config.universe_file)?;
        tracing::info!(
            universe = %config.universe_file.display(),
            symbols = universe.len(),
            "loaded universe"
        );
        Ok(Self::new(config, universe))
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// `{snapshot_root}/{interval}`
    pub fn snapshot_dir(&self, interval: Interval) -> PathBuf {
        self.snapshot_root.join(interval.as_str())
    }

    /// One full pass for one interval.
    pub fn run_interval<R: Rng + ?Sized>(&self, interval: Interval, rng: &mut R) -> IntervalReport {
        let started = Instant::now();
        let mut report = IntervalReport::new(interval);

        let dir = self.snapshot_dir(interval);
        let set = match SnapshotSetLocator::latest(&dir) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(%interval, error = %e, "skipping interval");
                report.enter(RunState::Reporting);
                return report;
            }
        };
        report.snapshot_date = Some(set.date);
        report.files = set.file_names();
        tracing::info!(%interval, date = %set.date, files = ?report.files, "located snapshot set");

        report.enter(RunState::Sampling);
        let decision =
            self.sampler
                .sample(&self.store, self.universe.symbols(), set.date, interval, rng);
        let update_needed = decision.update_needed();
        report.sampling = Some(decision);
        if !update_needed {
            tracing::info!(%interval, date = %set.date, "series already current, skipping");
            report.outcome = IntervalOutcome::Skipped;
            report.enter(RunState::Skipped);
            return report;
        }

        self.process_set(&set, interval, &mut report);
        report.summary.elapsed = started.elapsed();
        report.summary.log_summary(interval.as_str());
        report
    }

    /// Run every interval in order and combine the results.
    pub fn run_all<R: Rng + ?Sized>(&self, intervals: &[Interval], rng: &mut R) -> RunReport {
        let reports = intervals
            .iter()
            .map(|&interval| self.run_interval(interval, rng))
            .collect();
        RunReport::from_intervals(reports)
    }

    /// Parse and merge one snapshot set without consulting the sampler.
    pub(crate) fn process_set(
        &self,
        set: &SnapshotSet,
        interval: Interval,
        report: &mut IntervalReport,
    ) {
        report.enter(RunState::Parsing);
        let parsed = parse_set(set);
        if parsed.is_empty() {
            tracing::warn!(%interval, date = %set.date, "snapshot set produced no rows");
            report.outcome = IntervalOutcome::NoData;
            report.enter(RunState::Reporting);
            return;
        }

        report.enter(RunState::Merging);
        report.summary = self.merge_parsed(interval, &parsed);
        report.outcome = IntervalOutcome::Completed;
        report.enter(RunState::Reporting);
    }

    /// Merge every parsed symbol that is also in the universe.
    pub(crate) fn merge_parsed(&self, interval: Interval, parsed: &SnapshotMap) -> RunSummary {
        let merger = SeriesMerger::new(&self.store, self.default_offset);
        let targets: Vec<_> = parsed
            .iter()
            .filter(|(symbol, _)| self.universe.contains(symbol))
            .collect();
        tracing::info!(
            %interval,
            parsed = parsed.len(),
            tracked = targets.len(),
            "merging snapshot into series"
        );

        let total = targets.len();
        let mut summary = RunSummary::new();
        for (i, (symbol, obs)) in targets.into_iter().enumerate() {
            summary.record(symbol, interval, merger.merge(symbol, interval, obs));
            if (i + 1) % PROGRESS_EVERY == 0 {
                tracing::info!(%interval, processed = i + 1, total, "progress");
            }
        }
        summary
    }
}

/// Parse every file of a set in file-name order. A symbol found in several
/// files takes the row from the last file.
pub fn parse_set(set: &SnapshotSet) -> SnapshotMap {
    let mut merged = SnapshotMap::new();
    for file in &set.files {
        let rows = SnapshotParser::parse(&file.path, set.date);
        tracing::debug!(file = %file.file_name, rows = rows.len(), "parsed");
        merged.extend(rows);
    }
    merged
}
