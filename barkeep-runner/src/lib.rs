//! Barkeep Runner: update orchestration on top of `barkeep-core`.
//!
//! This crate provides:
//! - TOML updater configuration
//! - The per-interval update pass (locate, sample, parse, merge)
//! - Backfill over every stored snapshot date
//! - Run summaries, problem-list CSVs and JSON run reports

pub mod backfill;
pub mod config;
pub mod export;
pub mod orchestrator;
pub mod summary;

pub use backfill::backfill_interval;
pub use config::{ConfigError, UpdaterConfig};
pub use export::{export_json, problem_log_path, problems_csv, write_problem_log};
pub use orchestrator::{
    parse_set, IntervalOutcome, IntervalReport, RunError, RunReport, RunState,
    UpdateOrchestrator, PROGRESS_EVERY, SCHEMA_VERSION,
};
pub use summary::{Problem, RunSummary};
