//! Series merger.
//!
//! Folds one snapshot observation into a symbol's stored series. The new
//! row's date text borrows the UTC offset of the series' most recent row so
//! it reads like its neighbours; a brand-new series gets the configured
//! default offset instead. The borrowed offset can be wrong for the new
//! calendar day (DST changes); downstream readers depend on this format.

use serde::Serialize;

use crate::data::{DataError, SeriesStore};
use crate::domain::{DateTimeTag, Interval, Observation, Series, UtcOffset};

/// What a merge did to a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// No file existed; a one-row series was written.
    Created,
    /// The observation was added and the file rewritten.
    Appended,
    /// A row with the same canonical date-text was already stored.
    AlreadyCurrent,
}

impl MergeOutcome {
    /// True when the file on disk changed.
    pub fn is_update(&self) -> bool {
        !matches!(self, MergeOutcome::AlreadyCurrent)
    }
}

/// Merge `obs` into `existing` without touching the filesystem.
///
/// Returns the outcome and, unless the series already covers the date, the
/// series to persist.
pub fn reconcile_series(
    existing: Option<Series>,
    obs: &Observation,
    default_offset: UtcOffset,
) -> (MergeOutcome, Option<Series>) {
    let (outcome, mut series) = match existing {
        None => (MergeOutcome::Created, Series::default()),
        Some(series) => (MergeOutcome::Appended, series),
    };

    let offset = series.last_offset().unwrap_or(default_offset);
    let tag = DateTimeTag::at_midnight(obs.date.date(), offset);

    if series.contains_date(&tag) {
        return (MergeOutcome::AlreadyCurrent, None);
    }

    series.append(obs.with_date(tag));
    (outcome, Some(series))
}

/// Applies observations to the files of one [`SeriesStore`].
#[derive(Debug, Clone)]
pub struct SeriesMerger<'a> {
    store: &'a SeriesStore,
    default_offset: UtcOffset,
}

impl<'a> SeriesMerger<'a> {
    pub fn new(store: &'a SeriesStore, default_offset: UtcOffset) -> Self {
        Self {
            store,
            default_offset,
        }
    }

    /// Read, reconcile and (when changed) rewrite one symbol's series.
    ///
    /// Errors are per-symbol; the caller records them and moves on.
    pub fn merge(
        &self,
        symbol: &str,
        interval: Interval,
        obs: &Observation,
    ) -> Result<MergeOutcome, DataError> {
        let existing = self.store.load(symbol, interval)?;
        let (outcome, updated) = reconcile_series(existing, obs, self.default_offset);

        if let Some(series) = updated {
            self.store.save(symbol, interval, &series)?;
            tracing::debug!(%symbol, %interval, rows = series.len(), ?outcome, "series written");
        } else {
            tracing::trace!(%symbol, %interval, date = obs.date.canonical(), "already current");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::fs;
    use tempfile::TempDir;

    fn obs(y: i32, m: u32, d: u32, close: i64) -> Observation {
        let price = Decimal::new(close, 2);
        Observation {
            date: DateTimeTag::date_only(NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 1_000,
        }
    }

    fn stored(text: &str) -> Series {
        let p = Decimal::ONE;
        Series::new(
            text.lines()
                .map(|d| Observation {
                    date: DateTimeTag::parse(d).unwrap(),
                    open: p,
                    high: p,
                    low: p,
                    close: p,
                    volume: 1,
                })
                .collect(),
        )
    }

    #[test]
    fn new_series_uses_default_offset() {
        let (outcome, series) = reconcile_series(None, &obs(2025, 10, 1, 100), UtcOffset::DEFAULT);
        let series = series.unwrap();
        assert_eq!(outcome, MergeOutcome::Created);
        assert_eq!(series.len(), 1);
        assert_eq!(series.rows()[0].date.as_str(), "2025-10-01 00:00:00-05:00");
    }

    #[test]
    fn appended_row_borrows_last_offset() {
        let existing = stored("2025-03-07 00:00:00-05:00\n2025-09-05 00:00:00-04:00");
        let (outcome, series) =
            reconcile_series(Some(existing), &obs(2025, 10, 1, 100), UtcOffset::DEFAULT);
        let series = series.unwrap();
        assert_eq!(outcome, MergeOutcome::Appended);
        assert_eq!(series.last().unwrap().date.as_str(), "2025-10-01 00:00:00-04:00");
        // Earlier rows keep their own text.
        assert_eq!(series.rows()[0].date.as_str(), "2025-03-07 00:00:00-05:00");
    }

    #[test]
    fn last_row_without_offset_falls_back_to_default() {
        let existing = stored("2025-09-05");
        let (_, series) =
            reconcile_series(Some(existing), &obs(2025, 10, 1, 100), UtcOffset::DEFAULT);
        assert_eq!(
            series.unwrap().last().unwrap().date.as_str(),
            "2025-10-01 00:00:00-05:00"
        );
    }

    #[test]
    fn same_canonical_date_is_noop() {
        let existing = stored("2025-09-30 00:00:00-04:00");
        let (outcome, series) =
            reconcile_series(Some(existing), &obs(2025, 9, 30, 999), UtcOffset::DEFAULT);
        assert_eq!(outcome, MergeOutcome::AlreadyCurrent);
        assert!(series.is_none());
    }

    #[test]
    fn backdated_observation_lands_in_order() {
        let existing = stored("2025-09-01 00:00:00-04:00\n2025-09-30 00:00:00-04:00");
        let (_, series) =
            reconcile_series(Some(existing), &obs(2025, 9, 15, 100), UtcOffset::DEFAULT);
        let series = series.unwrap();
        let dates: Vec<&str> = series.rows().iter().map(|r| r.date.canonical()).collect();
        assert_eq!(dates, ["2025-09-01", "2025-09-15", "2025-09-30"]);
    }

    #[test]
    fn merge_twice_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        let merger = SeriesMerger::new(&store, UtcOffset::DEFAULT);

        assert_eq!(
            merger.merge("AAPL", Interval::Daily, &obs(2025, 9, 30, 18408)).unwrap(),
            MergeOutcome::Created
        );
        let first = fs::read(store.series_path("AAPL", Interval::Daily)).unwrap();

        assert_eq!(
            merger.merge("AAPL", Interval::Daily, &obs(2025, 9, 30, 18408)).unwrap(),
            MergeOutcome::AlreadyCurrent
        );
        let second = fs::read(store.series_path("AAPL", Interval::Daily)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_existing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        fs::create_dir_all(store.interval_dir(Interval::Daily)).unwrap();
        fs::write(
            store.series_path("BAD", Interval::Daily),
            "Date,Open,High,Low,Close,Volume\n2025-09-05,x,1,1,1,1\n",
        )
        .unwrap();

        let merger = SeriesMerger::new(&store, UtcOffset::DEFAULT);
        assert!(merger
            .merge("BAD", Interval::Daily, &obs(2025, 9, 30, 1))
            .is_err());
    }
}
