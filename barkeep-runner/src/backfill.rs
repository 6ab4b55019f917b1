//! Backfill: replay every snapshot set of an interval, oldest first.
//!
//! Used after a gap (missed days, a fresh series tree). The sampler is not
//! consulted; each set is parsed and merged in date order so offset
//! inheritance follows the files as they grow.

use std::time::Instant;

use barkeep_core::data::SnapshotSetLocator;
use barkeep_core::domain::Interval;

use crate::orchestrator::{IntervalReport, RunReport, RunState, UpdateOrchestrator};

/// One report per snapshot date found for `interval`.
pub fn backfill_interval(orch: &UpdateOrchestrator, interval: Interval) -> RunReport {
    let dir = orch.snapshot_dir(interval);
    let sets = match SnapshotSetLocator::all(&dir) {
        Ok(sets) => sets,
        Err(e) => {
            tracing::warn!(%interval, error = %e, "nothing to backfill");
            let mut report = IntervalReport::new(interval);
            report.enter(RunState::Reporting);
            return RunReport::from_intervals(vec![report]);
        }
    };

    tracing::info!(%interval, dates = sets.len(), "backfilling");
    let reports = sets
        .iter()
        .map(|set| {
            let started = Instant::now();
            let mut report = IntervalReport::new(interval);
            report.snapshot_date = Some(set.date);
            report.files = set.file_names();
            orch.process_set(set, interval, &mut report);
            report.summary.elapsed = started.elapsed();
            report
                .summary
                .log_summary(&format!("backfill {interval} {}", set.date));
            report
        })
        .collect();

    RunReport::from_intervals(reports)
}
