//! Per-symbol series files.
//!
//! Layout: `{series_dir}/{interval}/{SYMBOL}.csv`, header
//! `Date,Open,High,Low,Close,Volume`.
//!
//! Files are read in full and rewritten in full. Writes are atomic: the new
//! content goes to `{SYMBOL}.csv.tmp` and is renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use super::error::DataError;
use crate::domain::observation::{parse_price, parse_volume};
use crate::domain::{DateTimeTag, Interval, Observation, Series};

/// Column order of every file this store writes.
pub const SERIES_HEADER: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// Directory tree of series files.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    root: PathBuf,
}

impl SeriesStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{root}/{interval}/`
    pub fn interval_dir(&self, interval: Interval) -> PathBuf {
        self.root.join(interval.as_str())
    }

    /// `{root}/{interval}/{SYMBOL}.csv`
    pub fn series_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.interval_dir(interval).join(format!("{symbol}.csv"))
    }

    pub fn exists(&self, symbol: &str, interval: Interval) -> bool {
        self.series_path(symbol, interval).is_file()
    }

    /// Load a series. `Ok(None)` when the symbol has no file yet.
    pub fn load(&self, symbol: &str, interval: Interval) -> Result<Option<Series>, DataError> {
        let path = self.series_path(symbol, interval);
        if !path.is_file() {
            return Ok(None);
        }
        read_series(&path).map(Some)
    }

    /// Date text of the most recent row, without parsing any prices.
    ///
    /// `Ok(None)` when the file has a header but no rows.
    pub fn last_date(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<DateTimeTag>, DataError> {
        let path = self.series_path(symbol, interval);
        let mut reader = open_reader(&path)?;
        let headers = reader.headers().map_err(|e| DataError::csv(&path, e))?.clone();
        let date_col = column_index(&headers, "Date", &path)?;

        let mut last: Option<(u64, String)> = None;
        for record in reader.records() {
            let record = record.map_err(|e| DataError::csv(&path, e))?;
            let line = record.position().map_or(0, |p| p.line());
            last = Some((line, record.get(date_col).unwrap_or("").to_string()));
        }

        last.map(|(line, text)| {
            DateTimeTag::parse(&text).map_err(|e| DataError::MalformedRow {
                path: path.clone(),
                line,
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    /// Rewrite a series file in full.
    pub fn save(&self, symbol: &str, interval: Interval, series: &Series) -> Result<(), DataError> {
        let dir = self.interval_dir(interval);
        fs::create_dir_all(&dir).map_err(|e| DataError::io(&dir, e))?;

        replace_atomically(&self.series_path(symbol, interval), |tmp| {
            write_series(tmp, series)
        })
    }
}

/// Write `{path}.tmp` with `write`, then rename it over `path`.
///
/// The tmp file is removed if either step fails; `path` is untouched.
fn replace_atomically(
    path: &Path,
    write: impl FnOnce(&Path) -> Result<(), DataError>,
) -> Result<(), DataError> {
    let tmp_path = path.with_extension("csv.tmp");

    if let Err(e) = write(&tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::io(path, e)
    })
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>, DataError> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::csv(path, e))
}

fn column_index(
    headers: &StringRecord,
    name: &'static str,
    path: &Path,
) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        .ok_or_else(|| DataError::MissingColumn {
            path: path.to_path_buf(),
            column: name,
        })
}

/// Read every row of a series file, keeping each date's text verbatim.
fn read_series(path: &Path) -> Result<Series, DataError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers().map_err(|e| DataError::csv(path, e))?.clone();

    let mut cols = [0usize; 6];
    for (slot, name) in cols.iter_mut().zip(SERIES_HEADER) {
        *slot = column_index(&headers, name, path)?;
    }
    let [date_col, open_col, high_col, low_col, close_col, volume_col] = cols;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataError::csv(path, e))?;
        let line = record.position().map_or(0, |p| p.line());
        let malformed = |reason: String| DataError::MalformedRow {
            path: path.to_path_buf(),
            line,
            reason,
        };
        let cell = |i: usize| record.get(i).unwrap_or("");
        let price = |i: usize| {
            parse_price(cell(i)).ok_or_else(|| {
                let column = headers.get(i).unwrap_or("?");
                malformed(format!("'{}' is not a number in column {column}", cell(i)))
            })
        };

        let date = DateTimeTag::parse(cell(date_col)).map_err(|e| malformed(e.to_string()))?;
        rows.push(Observation {
            date,
            open: price(open_col)?,
            high: price(high_col)?,
            low: price(low_col)?,
            close: price(close_col)?,
            volume: parse_volume(cell(volume_col))
                .ok_or_else(|| malformed(format!("'{}' is not a volume", cell(volume_col))))?,
        });
    }

    Ok(Series::new(rows))
}

fn write_series(path: &Path, series: &Series) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| DataError::csv(path, e))?;
    wtr.write_record(SERIES_HEADER)
        .map_err(|e| DataError::csv(path, e))?;
    for row in series.rows() {
        let fields = [
            row.date.as_str().to_string(),
            row.open.to_string(),
            row.high.to_string(),
            row.low.to_string(),
            row.close.to_string(),
            row.volume.to_string(),
        ];
        wtr.write_record(&fields)
            .map_err(|e| DataError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| DataError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(symbol: &str, body: &str) -> (TempDir, SeriesStore) {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        fs::create_dir_all(store.interval_dir(Interval::Daily)).unwrap();
        fs::write(store.series_path(symbol, Interval::Daily), body).unwrap();
        (tmp, store)
    }

    #[test]
    fn load_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path());
        assert!(store.load("AAPL", Interval::Daily).unwrap().is_none());
        assert!(!store.exists("AAPL", Interval::Daily));
    }

    #[test]
    fn load_preserves_mixed_offsets() {
        let (_tmp, store) = store_with(
            "AAPL",
            "Date,Open,High,Low,Close,Volume\n\
             2025-03-07 00:00:00-05:00,1.5,2,1,1.75,100\n\
             2025-03-10 00:00:00-04:00,1.750,2,1,1.8,200\n",
        );
        let series = store.load("AAPL", Interval::Daily).unwrap().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.rows()[0].date.as_str(), "2025-03-07 00:00:00-05:00");
        assert_eq!(series.rows()[1].date.as_str(), "2025-03-10 00:00:00-04:00");
        assert_eq!(series.rows()[1].open.to_string(), "1.750");
    }

    #[test]
    fn load_reorders_columns_by_header_and_ignores_extras() {
        let (_tmp, store) = store_with(
            "SPY",
            "Date,Close,Open,High,Low,Volume,Dividends\n2025-09-05,5,4,6,3,10,0.0\n",
        );
        let series = store.load("SPY", Interval::Daily).unwrap().unwrap();
        let row = &series.rows()[0];
        assert_eq!(row.close.to_string(), "5");
        assert_eq!(row.open.to_string(), "4");
        assert_eq!(row.volume, 10);
    }

    #[test]
    fn malformed_numeric_is_an_error() {
        let (_tmp, store) = store_with(
            "BAD",
            "Date,Open,High,Low,Close,Volume\n2025-09-05,abc,2,1,1,100\n",
        );
        let err = store.load("BAD", Interval::Daily).unwrap_err();
        assert!(matches!(err, DataError::MalformedRow { line: 2, .. }), "{err}");
    }

    #[test]
    fn missing_column_is_an_error() {
        let (_tmp, store) = store_with("BAD", "Date,Open,High,Low,Close\n2025-09-05,1,2,1,1\n");
        assert!(matches!(
            store.load("BAD", Interval::Daily),
            Err(DataError::MissingColumn { column: "Volume", .. })
        ));
    }

    #[test]
    fn last_date_reads_final_row() {
        let (_tmp, store) = store_with(
            "AAPL",
            "Date,Open,High,Low,Close,Volume\n2025-09-04,1,1,1,1,1\n2025-09-05 00:00:00-04:00,x,x,x,x,x\n",
        );
        let last = store.last_date("AAPL", Interval::Daily).unwrap().unwrap();
        assert_eq!(last.canonical(), "2025-09-05");
    }

    #[test]
    fn last_date_of_header_only_file_is_none() {
        let (_tmp, store) = store_with("EMPTY", "Date,Open,High,Low,Close,Volume\n");
        assert!(store.last_date("EMPTY", Interval::Daily).unwrap().is_none());
    }

    #[test]
    fn save_then_load_keeps_text() {
        let (_tmp, store) = store_with(
            "AAPL",
            "Date,Open,High,Low,Close,Volume\n2025-09-05 00:00:00-04:00,185.580000,186.86,182.35,184.08,82488700\n",
        );
        let series = store.load("AAPL", Interval::Daily).unwrap().unwrap();
        store.save("AAPL", Interval::Daily, &series).unwrap();

        let text = fs::read_to_string(store.series_path("AAPL", Interval::Daily)).unwrap();
        assert_eq!(
            text,
            "Date,Open,High,Low,Close,Volume\n2025-09-05 00:00:00-04:00,185.580000,186.86,182.35,184.08,82488700\n"
        );
        assert!(!store
            .series_path("AAPL", Interval::Daily)
            .with_extension("csv.tmp")
            .exists());
    }

    #[test]
    fn save_creates_interval_dir() {
        let tmp = TempDir::new().unwrap();
        let store = SeriesStore::new(tmp.path().join("market_data"));
        store
            .save("NEW", Interval::Weekly, &Series::default())
            .unwrap();
        assert!(store.exists("NEW", Interval::Weekly));
    }

    #[test]
    fn failed_write_removes_tmp_and_keeps_original() {
        let body = "Date,Open,High,Low,Close,Volume\n2025-09-04,1,1,1,1,1\n";
        let (_tmp, store) = store_with("AAPL", body);
        let path = store.series_path("AAPL", Interval::Daily);

        let err = replace_atomically(&path, |tmp| {
            fs::write(tmp, "Date,Open").unwrap();
            Err(DataError::io(tmp, std::io::Error::other("disk full")))
        })
        .unwrap_err();

        assert!(matches!(err, DataError::Io { .. }), "{err}");
        assert!(!path.with_extension("csv.tmp").exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
    }
}
