//! Bulk snapshot parser.
//!
//! A snapshot is one CSV export covering many symbols for a single date. The
//! header differs between exports (the equities screen and the fund screen
//! name their columns differently, and some carry descriptive suffixes), so
//! the six needed fields are resolved through [`COLUMN_ALIASES`] once per file
//! before any row is read. A file that cannot resolve every field is rejected
//! whole rather than half-parsed.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use super::error::DataError;
use crate::domain::observation::{parse_price, parse_volume};
use crate::domain::{DateTimeTag, Observation};

/// Normalized symbol → observation for one snapshot (or one merged set).
pub type SnapshotMap = BTreeMap<String, Observation>;

/// A field the parser needs from every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotField {
    Symbol,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl SnapshotField {
    pub fn name(&self) -> &'static str {
        match self {
            SnapshotField::Symbol => "symbol",
            SnapshotField::Open => "open",
            SnapshotField::High => "high",
            SnapshotField::Low => "low",
            SnapshotField::Close => "close",
            SnapshotField::Volume => "volume",
        }
    }
}

/// Known header names per field, in priority order. Compared after
/// [`normalize_header`].
pub const COLUMN_ALIASES: &[(SnapshotField, &[&str])] = &[
    (SnapshotField::Symbol, &["symbol", "ticker"]),
    (SnapshotField::Open, &["open 1 day", "open", "open price"]),
    (SnapshotField::High, &["high 1 day", "high", "high price"]),
    (SnapshotField::Low, &["low 1 day", "low", "low price"]),
    (
        SnapshotField::Close,
        &[
            "price",
            "close",
            "close 1 day",
            "last",
            "last price",
            "last traded price",
        ],
    ),
    (SnapshotField::Volume, &["volume 1 day", "volume"]),
];

/// Lowercase, strip a BOM, and collapse runs of whitespace to one space.
pub fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Column indices for the six fields of one snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub symbol: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: usize,
}

impl ResolvedColumns {
    /// Resolve every field against a header row. On failure, returns the
    /// names of the fields that no alias matched.
    pub fn resolve(headers: &StringRecord) -> Result<Self, Vec<&'static str>> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |field: SnapshotField| -> Option<usize> {
            let (_, aliases) = COLUMN_ALIASES.iter().find(|(f, _)| *f == field)?;
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
        };

        let symbol = find(SnapshotField::Symbol);
        let open = find(SnapshotField::Open);
        let high = find(SnapshotField::High);
        let low = find(SnapshotField::Low);
        let close = find(SnapshotField::Close);
        let volume = find(SnapshotField::Volume);

        match (symbol, open, high, low, close, volume) {
            (Some(symbol), Some(open), Some(high), Some(low), Some(close), Some(volume)) => {
                Ok(Self {
                    symbol,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            }
            _ => {
                let missing = [
                    (SnapshotField::Symbol, symbol),
                    (SnapshotField::Open, open),
                    (SnapshotField::High, high),
                    (SnapshotField::Low, low),
                    (SnapshotField::Close, close),
                    (SnapshotField::Volume, volume),
                ]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(f, _)| f.name())
                .collect();
                Err(missing)
            }
        }
    }

    fn observation(&self, record: &StringRecord, date: &DateTimeTag) -> Option<Observation> {
        let cell = |i: usize| record.get(i).unwrap_or("");
        Some(Observation {
            date: date.clone(),
            open: parse_price(cell(self.open))?,
            high: parse_price(cell(self.high))?,
            low: parse_price(cell(self.low))?,
            close: parse_price(cell(self.close))?,
            volume: parse_volume(cell(self.volume))?,
        })
    }
}

/// Rewrite share-class dots as dashes (`BRK.A` → `BRK-A`). Symbols with a
/// slash (preferred shares, units) are unsupported and yield `None`.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim();
    if symbol.is_empty() || symbol.contains('/') {
        return None;
    }
    Some(symbol.replace('.', "-"))
}

pub struct SnapshotParser;

impl SnapshotParser {
    /// Parse one snapshot, dating every row with `date`.
    ///
    /// A file that cannot be read or lacks a required column contributes no
    /// symbols; the reason is logged as a warning.
    pub fn parse(path: &Path, date: NaiveDate) -> SnapshotMap {
        match Self::try_parse(path, date) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "snapshot rejected");
                SnapshotMap::new()
            }
        }
    }

    /// Parse one snapshot, surfacing why a file was rejected.
    ///
    /// Rows with a missing or non-numeric price or volume are skipped. A
    /// symbol repeated within the file keeps its last row. Bars whose high
    /// and low do not bound the open and close are kept as exported and
    /// counted under `inconsistent`.
    pub fn try_parse(path: &Path, date: NaiveDate) -> Result<SnapshotMap, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::csv(path, e))?;

        let headers = reader.headers().map_err(|e| DataError::csv(path, e))?.clone();
        let columns =
            ResolvedColumns::resolve(&headers).map_err(|missing| DataError::UnparsableSnapshot {
                path: path.to_path_buf(),
                missing,
            })?;

        let tag = DateTimeTag::date_only(date);
        let mut map = SnapshotMap::new();
        let mut skipped = 0usize;
        let mut inconsistent = 0usize;

        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "unreadable snapshot row");
                    skipped += 1;
                    continue;
                }
            };
            let Some(symbol) = record.get(columns.symbol).and_then(normalize_symbol) else {
                skipped += 1;
                continue;
            };
            match columns.observation(&record, &tag) {
                Some(obs) => {
                    if !obs.is_sane() {
                        tracing::debug!(%symbol, "high/low do not bound open/close");
                        inconsistent += 1;
                    }
                    map.insert(symbol, obs);
                }
                None => skipped += 1,
            }
        }

        tracing::info!(
            path = %path.display(),
            symbols = map.len(),
            skipped,
            inconsistent,
            "parsed snapshot"
        );
        Ok(map)
    }
}
