//! Tracked-symbol universe.
//!
//! The universe is built elsewhere (index membership lists, user portfolios)
//! and handed over as a file. Two formats are accepted: the combined tickers
//! CSV with a `ticker` column, and a TOML file with a `symbols` array. The
//! list is read-only for the duration of a run.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::error::DataError;

#[derive(Debug, Deserialize)]
struct UniverseFile {
    symbols: Vec<String>,
}

/// The symbols this tool is allowed to update.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    symbols: Vec<String>,
    index: HashSet<String>,
}

impl Universe {
    /// Build from a symbol list. Blank entries are dropped and repeats keep
    /// their first position.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut universe = Self::default();
        for s in symbols {
            let s = s.as_ref().trim();
            if !s.is_empty() && universe.index.insert(s.to_string()) {
                universe.symbols.push(s.to_string());
            }
        }
        universe
    }

    /// Load from `.toml` or CSV, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let unavailable = |e: &dyn std::fmt::Display| {
            DataError::UniverseUnavailable(format!("{}: {e}", path.display()))
        };

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        if is_toml {
            let content = std::fs::read_to_string(path).map_err(|e| unavailable(&e))?;
            Self::from_toml(&content)
        } else {
            let file = std::fs::File::open(path).map_err(|e| unavailable(&e))?;
            Self::from_csv_reader(file)
        }
    }

    /// Parse the combined tickers CSV: a header row with a `ticker` (or
    /// `symbol`) column.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| DataError::UniverseUnavailable(format!("read header: {e}")))?;
        let col = ["ticker", "symbol"]
            .iter()
            .find_map(|name| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
            .ok_or_else(|| {
                DataError::UniverseUnavailable("no 'ticker' column in universe file".into())
            })?;

        let mut symbols = Vec::new();
        for record in rdr.records() {
            let record =
                record.map_err(|e| DataError::UniverseUnavailable(format!("read row: {e}")))?;
            if let Some(s) = record.get(col) {
                symbols.push(s.to_string());
            }
        }
        Ok(Self::new(symbols))
    }

    /// Parse `symbols = ["AAPL", ...]`.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let file: UniverseFile = toml::from_str(content)
            .map_err(|e| DataError::UniverseUnavailable(format!("parse universe TOML: {e}")))?;
        Ok(Self::new(file.symbols))
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
