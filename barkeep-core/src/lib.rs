//! Barkeep core: keeps per-symbol OHLCV series current from bulk snapshots.
//!
//! - Domain types (date tags, observations, series, intervals)
//! - Snapshot discovery and alias-driven snapshot parsing
//! - Series file storage with atomic rewrites
//! - Staleness sampling and the series merge itself
//!
//! Everything here is synchronous and single-writer per series file.

pub mod data;
pub mod domain;
pub mod reconcile;
