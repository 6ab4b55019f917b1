//! Domain types: date tags, observations, series, intervals.

pub mod date_tag;
pub mod interval;
pub mod observation;
pub mod series;

pub use date_tag::{find_embedded_date, DateTagError, DateTimeTag, UtcOffset};
pub use interval::Interval;
pub use observation::Observation;
pub use series::Series;
