//! Snapshot set locator.
//!
//! Bulk exports land in `{snapshot_dir}/{interval}/` with a `YYYY-MM-DD` date
//! somewhere in the file name. Several files can share a date (an equities
//! export and a fund export); together they form one logical snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::error::DataError;
use crate::domain::find_embedded_date;

/// One bulk export file and the date embedded in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub file_name: String,
}

/// All files sharing one embedded date, ordered by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSet {
    pub date: NaiveDate,
    pub files: Vec<SnapshotFile>,
}

impl SnapshotSet {
    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.file_name.clone()).collect()
    }
}

pub struct SnapshotSetLocator;

impl SnapshotSetLocator {
    /// Every file carrying the most recent embedded date in `dir`.
    ///
    /// Older files are never included, even when the latest date has a
    /// single file.
    pub fn latest(dir: &Path) -> Result<SnapshotSet, DataError> {
        let mut sets = Self::all(dir)?;
        sets.pop().ok_or_else(|| DataError::NoSnapshotFound {
            dir: dir.to_path_buf(),
        })
    }

    /// Every dated file in `dir`, grouped by date, oldest date first.
    pub fn all(dir: &Path) -> Result<Vec<SnapshotSet>, DataError> {
        let mut by_date: BTreeMap<NaiveDate, Vec<SnapshotFile>> = BTreeMap::new();
        for file in Self::scan(dir)? {
            by_date.entry(file.date).or_default().push(file);
        }

        if by_date.is_empty() {
            return Err(DataError::NoSnapshotFound {
                dir: dir.to_path_buf(),
            });
        }

        Ok(by_date
            .into_iter()
            .map(|(date, mut files)| {
                files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
                SnapshotSet { date, files }
            })
            .collect())
    }

    fn scan(dir: &Path) -> Result<Vec<SnapshotFile>, DataError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DataError::NoSnapshotFound {
                    dir: dir.to_path_buf(),
                })
            }
            Err(e) => return Err(DataError::io(dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::io(dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };
            if let Some(date) = find_embedded_date(&file_name) {
                files.push(SnapshotFile {
                    date,
                    path,
                    file_name,
                });
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "Symbol\n").unwrap();
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn latest_returns_every_file_for_max_date() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "all_stocks_2025-09-29.csv");
        touch(tmp.path(), "all_stocks_2025-09-30.csv");
        touch(tmp.path(), "all_etfs_2025-09-30.csv");

        let set = SnapshotSetLocator::latest(tmp.path()).unwrap();
        assert_eq!(set.date, ymd(2025, 9, 30));
        assert_eq!(
            set.file_names(),
            ["all_etfs_2025-09-30.csv", "all_stocks_2025-09-30.csv"]
        );
    }

    #[test]
    fn single_file_day_is_not_blocked() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "all_stocks_2025-09-29.csv");
        touch(tmp.path(), "all_etfs_2025-09-29.csv");
        touch(tmp.path(), "all_stocks_2025-09-30.csv");

        let set = SnapshotSetLocator::latest(tmp.path()).unwrap();
        assert_eq!(set.date, ymd(2025, 9, 30));
        assert_eq!(set.files.len(), 1);
    }

    #[test]
    fn ignores_undated_and_non_csv_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "readme.csv");
        touch(tmp.path(), "notes_2026-01-01.txt");
        touch(tmp.path(), "funds_2025-09-30.CSV");
        fs::create_dir(tmp.path().join("old_2027-01-01.csv")).unwrap();

        let set = SnapshotSetLocator::latest(tmp.path()).unwrap();
        assert_eq!(set.date, ymd(2025, 9, 30));
        assert_eq!(set.file_names(), ["funds_2025-09-30.CSV"]);
    }

    #[test]
    fn missing_or_empty_dir_is_no_snapshot() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            SnapshotSetLocator::latest(tmp.path()),
            Err(DataError::NoSnapshotFound { .. })
        ));
        assert!(matches!(
            SnapshotSetLocator::latest(&tmp.path().join("daily")),
            Err(DataError::NoSnapshotFound { .. })
        ));

        touch(tmp.path(), "export.csv");
        assert!(matches!(
            SnapshotSetLocator::latest(tmp.path()),
            Err(DataError::NoSnapshotFound { .. })
        ));
    }

    #[test]
    fn all_groups_by_date_ascending() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b_2025-09-30.csv");
        touch(tmp.path(), "a_2025-09-30.csv");
        touch(tmp.path(), "a_2025-09-26.csv");
        touch(tmp.path(), "a_2025-09-29.csv");

        let sets = SnapshotSetLocator::all(tmp.path()).unwrap();
        let dates: Vec<NaiveDate> = sets.iter().map(|s| s.date).collect();
        assert_eq!(dates, [ymd(2025, 9, 26), ymd(2025, 9, 29), ymd(2025, 9, 30)]);
        assert_eq!(sets[2].file_names(), ["a_2025-09-30.csv", "b_2025-09-30.csv"]);
    }
}
