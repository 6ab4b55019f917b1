//! Series: the full row sequence for one symbol and one interval.

use std::collections::HashMap;

use super::date_tag::{DateTimeTag, UtcOffset};
use super::observation::Observation;

/// Ordered rows of one series file.
///
/// After [`Series::append`] the rows are strictly ascending by canonical
/// date-text with no repeated date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    rows: Vec<Observation>,
}

impl Series {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent row, going by file order.
    pub fn last(&self) -> Option<&Observation> {
        self.rows.last()
    }

    /// Offset carried by the most recent row, if that row has one.
    pub fn last_offset(&self) -> Option<UtcOffset> {
        self.last().and_then(|r| r.date.offset())
    }

    /// True if some row already covers this canonical date-text.
    pub fn contains_date(&self, date: &DateTimeTag) -> bool {
        self.rows.iter().any(|r| r.date == *date)
    }

    /// Append a row, drop duplicate dates keeping the last occurrence, and
    /// re-sort ascending by canonical date-text.
    pub fn append(&mut self, row: Observation) {
        self.rows.push(row);

        let mut last_index: HashMap<String, usize> = HashMap::with_capacity(self.rows.len());
        for (i, r) in self.rows.iter().enumerate() {
            last_index.insert(r.date.canonical().to_string(), i);
        }
        let mut i = 0;
        self.rows.retain(|r| {
            let keep = last_index.get(r.date.canonical()) == Some(&i);
            i += 1;
            keep
        });

        self.rows.sort_by(|a, b| a.date.cmp(&b.date));
    }

    /// Strictly ascending canonical date-text, no repeats.
    pub fn is_strictly_ascending(&self) -> bool {
        self.rows.windows(2).all(|w| w[0].date < w[1].date)
    }
}
