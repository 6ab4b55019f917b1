//! DateTimeTag: a calendar date plus an optional UTC-offset suffix.
//!
//! Stored series files carry free-form date text such as `2025-09-05`,
//! `2025-09-05 00:00:00-04:00` or `2025-03-10 00:00:00-05:00`, and the offset
//! changes from row to row across daylight-saving transitions. Tags therefore
//! never become timezone-aware instants: they keep the text they were read
//! with and order by their canonical date-text (the leading `YYYY-MM-DD`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the canonical `YYYY-MM-DD` prefix.
pub const CANONICAL_LEN: usize = 10;

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static date pattern"))
}

fn offset_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([+-])(\d{2}):(\d{2})$").expect("static offset pattern"))
}

/// Find the first `YYYY-MM-DD` group anywhere in `text` and parse it.
///
/// Returns `None` when there is no such group or it is not a real date.
pub fn find_embedded_date(text: &str) -> Option<NaiveDate> {
    let m = date_pattern().find(text)?;
    NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateTagError {
    #[error("'{0}' does not start with a YYYY-MM-DD date")]
    Malformed(String),

    #[error("'{0}' is not a UTC offset of the form +HH:MM or -HH:MM")]
    BadOffset(String),
}

/// Signed hours:minutes offset from UTC, e.g. `-05:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcOffset {
    minutes: i16,
}

impl UtcOffset {
    /// Offset used when a series has no history to borrow one from (EST).
    pub const DEFAULT: UtcOffset = UtcOffset { minutes: -5 * 60 };

    pub fn from_hours_minutes(negative: bool, hours: u8, minutes: u8) -> Option<Self> {
        if hours > 23 || minutes > 59 {
            return None;
        }
        let total = hours as i16 * 60 + minutes as i16;
        Some(Self {
            minutes: if negative { -total } else { total },
        })
    }

    /// Extract a trailing `[+-]HH:MM` suffix from date text.
    pub fn extract(text: &str) -> Option<Self> {
        let caps = offset_pattern().captures(text.trim())?;
        let negative = &caps[1] == "-";
        let hours = caps[2].parse().ok()?;
        let minutes = caps[3].parse().ok()?;
        Self::from_hours_minutes(negative, hours, minutes)
    }
}

impl Default for UtcOffset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minutes < 0 { '-' } else { '+' };
        let abs = self.minutes.unsigned_abs();
        write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)
    }
}

impl FromStr for UtcOffset {
    type Err = DateTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // The whole string must be the offset, not just end with one.
        if trimmed.len() != 6 {
            return Err(DateTagError::BadOffset(s.to_string()));
        }
        Self::extract(trimmed).ok_or_else(|| DateTagError::BadOffset(s.to_string()))
    }
}

impl TryFrom<String> for UtcOffset {
    type Error = DateTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UtcOffset> for String {
    fn from(offset: UtcOffset) -> Self {
        offset.to_string()
    }
}

/// A date as it appears in a series file.
///
/// Equality and ordering look only at [`DateTimeTag::canonical`]; two tags for
/// the same calendar day with different offsets compare equal.
#[derive(Debug, Clone)]
pub struct DateTimeTag {
    date: NaiveDate,
    offset: Option<UtcOffset>,
    source: String,
}

impl DateTimeTag {
    /// Parse stored date text, keeping it verbatim (minus surrounding whitespace).
    pub fn parse(text: &str) -> Result<Self, DateTagError> {
        let source = text.trim();
        let prefix = source
            .get(..CANONICAL_LEN)
            .filter(|p| is_iso_date_shape(p))
            .ok_or_else(|| DateTagError::Malformed(text.to_string()))?;
        let date = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
            .map_err(|_| DateTagError::Malformed(text.to_string()))?;

        Ok(Self {
            date,
            offset: UtcOffset::extract(source),
            source: source.to_string(),
        })
    }

    /// A bare `YYYY-MM-DD` tag, as assigned to snapshot rows.
    pub fn date_only(date: NaiveDate) -> Self {
        Self {
            date,
            offset: None,
            source: date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Midnight on `date` tagged with `offset`: `2025-10-01 00:00:00-04:00`.
    pub fn at_midnight(date: NaiveDate, offset: UtcOffset) -> Self {
        Self {
            date,
            offset: Some(offset),
            source: format!("{} 00:00:00{offset}", date.format("%Y-%m-%d")),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn offset(&self) -> Option<UtcOffset> {
        self.offset
    }

    /// The text this tag was read or rendered with.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Canonical date-text: the leading `YYYY-MM-DD`.
    pub fn canonical(&self) -> &str {
        // `parse` and the constructors guarantee an ASCII date prefix.
        &self.source[..CANONICAL_LEN]
    }
}

fn is_iso_date_shape(s: &str) -> bool {
    s.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 => b == b'-',
        _ => b.is_ascii_digit(),
    })
}

impl PartialEq for DateTimeTag {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for DateTimeTag {}

impl PartialOrd for DateTimeTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateTimeTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(other.canonical())
    }
}

impl fmt::Display for DateTimeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
