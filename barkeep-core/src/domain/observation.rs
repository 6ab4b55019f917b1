//! Observation: one OHLCV bar for one symbol.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::date_tag::DateTimeTag;

/// OHLCV bar dated by a [`DateTimeTag`].
///
/// Prices stay decimal so values read from a series file are written back
/// with the same digits.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: DateTimeTag,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl Observation {
    /// Same bar, re-dated.
    pub fn with_date(&self, date: DateTimeTag) -> Self {
        Self {
            date,
            ..self.clone()
        }
    }

    /// Basic sanity check: high is the top of the bar, low the bottom.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Parse a price cell. Accepts plain and scientific notation; empty cells and
/// `NaN` are `None`.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let t = text.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("nan") {
        return None;
    }
    Decimal::from_str(t)
        .or_else(|_| Decimal::from_scientific(&t.to_ascii_lowercase()))
        .ok()
}

/// Parse a volume cell, truncating any fractional part (`82488700.0`).
pub fn parse_volume(text: &str) -> Option<u64> {
    let value = parse_price(text)?;
    if value.is_sign_negative() {
        return None;
    }
    value.trunc().to_u64()
}
