//! Staleness sampler: a cheap gate in front of a full update pass.
//!
//! Rather than opening every series file, a handful of random symbols are
//! checked against the snapshot date. A single sample that is behind, missing
//! or unreadable triggers the full pass.
//!
//! This is an approximation. It can miss a stale symbol that was not drawn,
//! and it can trigger a pass that turns out to change nothing.

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::data::SeriesStore;
use crate::domain::{DateTimeTag, Interval};

pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// What the sampler found for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SampleVerdict {
    /// Latest stored date is at or past the snapshot date.
    Current { last: String },
    /// Latest stored date is before the snapshot date.
    Behind { last: String },
    Missing,
    Empty,
    Unreadable { error: String },
}

impl SampleVerdict {
    pub fn is_behind(&self) -> bool {
        !matches!(self, SampleVerdict::Current { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    UpdateNeeded,
    Skip,
}

/// Per-sample verdicts for one snapshot date.
#[derive(Debug, Clone, Serialize)]
pub struct SamplingDecision {
    pub snapshot_date: NaiveDate,
    pub samples: Vec<(String, SampleVerdict)>,
}

impl SamplingDecision {
    /// Any behind sample means update. No samples (empty universe) means skip.
    pub fn decision(&self) -> Decision {
        if self.behind_count() > 0 {
            Decision::UpdateNeeded
        } else {
            Decision::Skip
        }
    }

    pub fn update_needed(&self) -> bool {
        self.decision() == Decision::UpdateNeeded
    }

    pub fn behind_count(&self) -> usize {
        self.samples.iter().filter(|(_, v)| v.is_behind()).count()
    }

    pub fn current_count(&self) -> usize {
        self.samples.len() - self.behind_count()
    }
}

#[derive(Debug, Clone)]
pub struct StalenessSampler {
    sample_size: usize,
}

impl Default for StalenessSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

impl StalenessSampler {
    pub fn new(sample_size: usize) -> Self {
        Self { sample_size }
    }

    /// Draw up to `sample_size` symbols without replacement and check each
    /// one's latest stored date against `snapshot_date`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        store: &SeriesStore,
        universe: &[String],
        snapshot_date: NaiveDate,
        interval: Interval,
        rng: &mut R,
    ) -> SamplingDecision {
        let n = self.sample_size.min(universe.len());
        let target = DateTimeTag::date_only(snapshot_date);

        let samples: Vec<(String, SampleVerdict)> = universe
            .choose_multiple(rng, n)
            .map(|symbol| {
                let verdict = Self::check(store, symbol, interval, &target);
                tracing::debug!(%symbol, ?verdict, "sampled");
                (symbol.clone(), verdict)
            })
            .collect();

        let decision = SamplingDecision {
            snapshot_date,
            samples,
        };

        if universe.is_empty() {
            tracing::warn!(%interval, "empty universe, nothing to sample");
        }
        tracing::info!(
            %interval,
            %snapshot_date,
            sampled = decision.samples.len(),
            behind = decision.behind_count(),
            current = decision.current_count(),
            decision = ?decision.decision(),
            "staleness sampling"
        );
        decision
    }

    fn check(
        store: &SeriesStore,
        symbol: &str,
        interval: Interval,
        target: &DateTimeTag,
    ) -> SampleVerdict {
        if !store.exists(symbol, interval) {
            return SampleVerdict::Missing;
        }
        match store.last_date(symbol, interval) {
            Ok(None) => SampleVerdict::Empty,
            Ok(Some(last)) if last < *target => SampleVerdict::Behind {
                last: last.canonical().to_string(),
            },
            Ok(Some(last)) => SampleVerdict::Current {
                last: last.canonical().to_string(),
            },
            Err(e) => SampleVerdict::Unreadable {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "Date,Open,High,Low,Close,Volume\n";

    fn write_series(store: &SeriesStore, symbol: &str, last_date: &str) {
        fs::create_dir_all(store.interval_dir(Interval::Daily)).unwrap();
        fs::write(
            store.series_path(symbol, Interval::Daily),
            format!("{HEADER}2025-09-01 00:00:00-04:00,1,1,1,1,1\n{last_date},1,1,1,1,1\n"),
        )
        .unwrap();
    }

    fn snapshot_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn one_behind_of_five_triggers_update() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        for s in ["A", "B", "C", "D"] {
            write_series(&store, s, "2025-09-30 00:00:00-04:00");
        }
        write_series(&store, "E", "2025-09-29 00:00:00-04:00");

        let universe = symbols(&["A", "B", "C", "D", "E"]);
        let mut rng = StdRng::seed_from_u64(7);
        let decision = StalenessSampler::default().sample(
            &store,
            &universe,
            snapshot_date(),
            Interval::Daily,
            &mut rng,
        );

        assert_eq!(decision.samples.len(), 5);
        assert_eq!(decision.behind_count(), 1);
        assert_eq!(decision.current_count(), 4);
        assert_eq!(decision.decision(), Decision::UpdateNeeded);
    }

    #[test]
    fn all_current_skips() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        write_series(&store, "A", "2025-09-30 00:00:00-04:00");
        write_series(&store, "B", "2025-10-01");

        let universe = symbols(&["A", "B"]);
        let mut rng = StdRng::seed_from_u64(1);
        let decision = StalenessSampler::default().sample(
            &store,
            &universe,
            snapshot_date(),
            Interval::Daily,
            &mut rng,
        );

        assert_eq!(decision.samples.len(), 2);
        assert!(!decision.update_needed());
    }

    #[test]
    fn missing_file_triggers_update() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        write_series(&store, "A", "2025-09-30");

        let universe = symbols(&["A", "NEW"]);
        let mut rng = StdRng::seed_from_u64(3);
        let decision = StalenessSampler::default().sample(
            &store,
            &universe,
            snapshot_date(),
            Interval::Daily,
            &mut rng,
        );

        assert!(decision
            .samples
            .contains(&("NEW".to_string(), SampleVerdict::Missing)));
        assert!(decision.update_needed());
    }

    #[test]
    fn unreadable_and_empty_files_count_as_behind() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        fs::create_dir_all(store.interval_dir(Interval::Daily)).unwrap();
        fs::write(store.series_path("EMPTY", Interval::Daily), HEADER).unwrap();
        fs::write(
            store.series_path("GARBLED", Interval::Daily),
            format!("{HEADER}not-a-date,1,1,1,1,1\n"),
        )
        .unwrap();

        for symbol in ["EMPTY", "GARBLED"] {
            let mut rng = StdRng::seed_from_u64(0);
            let decision = StalenessSampler::new(1).sample(
                &store,
                &symbols(&[symbol]),
                snapshot_date(),
                Interval::Daily,
                &mut rng,
            );
            assert!(decision.update_needed(), "{symbol} should trigger update");
        }
    }

    #[test]
    fn samples_without_replacement_up_to_size() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        let universe: Vec<String> = (0..50).map(|i| format!("S{i}")).collect();

        let mut rng = StdRng::seed_from_u64(11);
        let decision = StalenessSampler::default().sample(
            &store,
            &universe,
            snapshot_date(),
            Interval::Daily,
            &mut rng,
        );

        let mut drawn: Vec<&String> = decision.samples.iter().map(|(s, _)| s).collect();
        assert_eq!(drawn.len(), DEFAULT_SAMPLE_SIZE);
        drawn.sort();
        drawn.dedup();
        assert_eq!(drawn.len(), DEFAULT_SAMPLE_SIZE);
    }

    #[test]
    fn empty_universe_skips() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        let mut rng = StdRng::seed_from_u64(0);
        let decision =
            StalenessSampler::default().sample(&store, &[], snapshot_date(), Interval::Daily, &mut rng);
        assert!(decision.samples.is_empty());
        assert_eq!(decision.decision(), Decision::Skip);
    }
}
