//! Data files: snapshot discovery and parsing, series storage, universe.

pub mod error;
pub mod locator;
pub mod snapshot;
pub mod store;
pub mod universe;

pub use error::DataError;
pub use locator::{SnapshotFile, SnapshotSet, SnapshotSetLocator};
pub use snapshot::{ResolvedColumns, SnapshotField, SnapshotMap, SnapshotParser, COLUMN_ALIASES};
pub use store::{SeriesStore, SERIES_HEADER};
pub use universe::Universe;
