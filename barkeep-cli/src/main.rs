//! Barkeep CLI: bring per-symbol series up to date from bulk snapshots.
//!
//! Commands:
//! - `update` run the sampled update pass for one or all intervals
//! - `backfill` replay every stored snapshot date for one interval
//! - `locate` show the latest snapshot set per interval
//! - `init-config` write a default TOML config

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use barkeep_core::data::SnapshotSetLocator;
use barkeep_core::domain::Interval;
use barkeep_runner::{
    backfill_interval, export_json, write_problem_log, IntervalOutcome, RunReport,
    UpdateOrchestrator, UpdaterConfig,
};

#[derive(Parser)]
#[command(
    name = "barkeep",
    about = "Barkeep: incremental OHLCV series updates from bulk snapshots"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum IntervalArg {
    Daily,
    Weekly,
    Monthly,
    /// Every interval listed in the config.
    All,
}

impl IntervalArg {
    fn resolve(self, config: &UpdaterConfig) -> Vec<Interval> {
        match self {
            IntervalArg::Daily => vec![Interval::Daily],
            IntervalArg::Weekly => vec![Interval::Weekly],
            IntervalArg::Monthly => vec![Interval::Monthly],
            IntervalArg::All => config.intervals.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sample, then merge the latest snapshot set into every tracked series.
    Update {
        #[arg(long, value_enum, default_value = "all")]
        interval: IntervalArg,

        /// Sampler seed (overrides the config).
        #[arg(long)]
        seed: Option<u64>,

        /// Print the run report as JSON on stdout.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Merge every snapshot date on disk, oldest first, without sampling.
    Backfill {
        #[arg(long, value_enum)]
        interval: IntervalArg,

        /// Print the run report as JSON on stdout.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the latest snapshot set for each interval.
    Locate {
        #[arg(long, value_enum, default_value = "all")]
        interval: IntervalArg,
    },
    /// Write the default configuration as TOML.
    InitConfig {
        #[arg(long, default_value = "barkeep.toml")]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Update {
            interval,
            seed,
            json,
        } => run_update(&load_config(config_path)?, interval, seed, json),
        Commands::Backfill { interval, json } => {
            run_backfill(&load_config(config_path)?, interval, json)
        }
        Commands::Locate { interval } => run_locate(&load_config(config_path)?, interval),
        Commands::InitConfig { output, force } => run_init_config(&output, force),
    }
}

/// Logs go to stderr so `--json` output on stdout stays machine-readable.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("barkeep={level},barkeep_core={level},barkeep_runner={level}").into()
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<UpdaterConfig> {
    match path {
        Some(path) => UpdaterConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let config = UpdaterConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn run_update(
    config: &UpdaterConfig,
    interval: IntervalArg,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let orch = UpdateOrchestrator::from_config(config)?;
    let mut rng = match seed.or(config.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = orch.run_all(&interval.resolve(config), &mut rng);
    finish(config, &report, json)
}

fn run_backfill(config: &UpdaterConfig, interval: IntervalArg, json: bool) -> Result<()> {
    let orch = UpdateOrchestrator::from_config(config)?;

    let mut reports = Vec::new();
    for interval in interval.resolve(config) {
        reports.extend(backfill_interval(&orch, interval).intervals);
    }
    finish(config, &RunReport::from_intervals(reports), json)
}

/// Persist problem lists, then print the report and the summary line.
fn finish(config: &UpdaterConfig, report: &RunReport, json: bool) -> Result<()> {
    if let Some(dir) = config.problem_log_dir() {
        let mut intervals: Vec<Interval> = report.intervals.iter().map(|r| r.interval).collect();
        intervals.dedup();
        for interval in intervals {
            if let Some(path) = write_problem_log(dir, interval, &report.total.problems)? {
                eprintln!("Problem list saved to: {}", path.display());
            }
        }
    }

    if json {
        println!("{}", export_json(report)?);
        return Ok(());
    }

    for r in &report.intervals {
        let date = r
            .snapshot_date
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        let status = match r.outcome {
            IntervalOutcome::NoSnapshot => "no snapshot",
            IntervalOutcome::Skipped => "already current (sampled)",
            IntervalOutcome::NoData => "no usable rows",
            IntervalOutcome::Completed => "merged",
        };
        println!(
            "{:<8} {:<10} {:<26} {}",
            r.interval.as_str(),
            date,
            status,
            r.summary.summary_line()
        );
    }
    report.total.log_summary("run");
    println!("{}", report.total.summary_line());
    Ok(())
}

fn run_locate(config: &UpdaterConfig, interval: IntervalArg) -> Result<()> {
    for interval in interval.resolve(config) {
        let dir = config.snapshot_dir_for(interval);
        match SnapshotSetLocator::latest(&dir) {
            Ok(set) => {
                println!("{interval}: {}", set.date);
                for file in &set.files {
                    println!("  {}", file.path.display());
                }
            }
            Err(e) => println!("{interval}: {e}"),
        }
    }
    Ok(())
}

fn run_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }
    let toml = UpdaterConfig::default().to_toml()?;
    std::fs::write(output, toml)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote default config to: {}", output.display());
    Ok(())
}
