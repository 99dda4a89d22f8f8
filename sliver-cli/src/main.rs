//! Sliver CLI: run backtests over exported indicator series.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config over one or more series files
//! - `inspect`: summarize an indicator series file

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sliver_core::IndicatorSeries;
use sliver_runner::{backtest, export_json, save_artifacts, BacktestConfig, BacktestReport};

#[derive(Parser)]
#[command(name = "sliver", about = "Sliver: signal backtesting and performance analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest over each series file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Indicator series JSON files.
        #[arg(long, required = true, num_args = 1..)]
        series: Vec<PathBuf>,

        /// Window start (RFC 3339 or YYYY-MM-DD). Overrides the config.
        #[arg(long)]
        from: Option<String>,

        /// Window end (RFC 3339 or YYYY-MM-DD, inclusive). Overrides the config.
        #[arg(long)]
        to: Option<String>,

        /// Print the JSON report instead of the metric table.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write report.json / positions.csv per series under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print bar count, time range and auxiliary columns of a series file.
    Inspect {
        #[arg(long)]
        series: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            series,
            from,
            to,
            json,
            output_dir,
        } => run_backtest_cmd(&config, &series, from, to, json, output_dir.as_deref()),
        Commands::Inspect { series } => run_inspect(&series),
    }
}

fn run_backtest_cmd(
    config_path: &Path,
    series_paths: &[PathBuf],
    from: Option<String>,
    to: Option<String>,
    json: bool,
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let mut request = config.request();
    if let Some(from) = from.as_deref() {
        request.from = Some(parse_time(from, false)?);
    }
    if let Some(to) = to.as_deref() {
        request.to = Some(parse_time(to, true)?);
    }
    if let (Some(from), Some(to)) = (request.from, request.to) {
        if from > to {
            bail!("--from {from} is after --to {to}");
        }
    }
    let names = match output_dir {
        Some(_) => artifact_names(series_paths)?,
        None => Vec::new(),
    };

    info!(
        "running {} ({}) over {} series",
        request.strategy.kind,
        request.strategy.side,
        series_paths.len()
    );

    let results: Vec<Result<BacktestReport>> = series_paths
        .par_iter()
        .map(|path| {
            let series = load_series(path)?;
            backtest(&request, &series).with_context(|| format!("backtest {}", path.display()))
        })
        .collect();

    let mut failed = 0;
    for (i, (path, result)) in series_paths.iter().zip(results).enumerate() {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                eprintln!("Error for {}: {e:#}", path.display());
                failed += 1;
                continue;
            }
        };

        if json {
            println!("{}", export_json(&report)?);
        } else {
            println!("== {} ==", path.display());
            print!("{}", report.table());
            println!();
        }

        if let (Some(dir), Some(name)) = (output_dir, names.get(i)) {
            let run_dir = save_artifacts(&report, dir, name)?;
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }

    if failed > 0 {
        bail!("{failed} of {} backtests failed", series_paths.len());
    }
    Ok(())
}

fn run_inspect(path: &Path) -> Result<()> {
    let series = load_series(path)?;

    println!("Series: {}", path.display());
    println!("Bars: {}", series.len());
    match (series.first_time(), series.last_time()) {
        (Some(first), Some(last)) => println!("Range: {first} to {last}"),
        _ => println!("Range: (empty)"),
    }
    let buys = series.bars().filter(|b| b.has_buy()).count();
    let sells = series.bars().filter(|b| b.has_sell()).count();
    println!("Signals: {buys} buys, {sells} sells");

    if series.aux.is_empty() {
        println!("Auxiliary: (none)");
    } else {
        println!("Auxiliary:");
        for (name, values) in &series.aux {
            let filled = values.iter().filter(|v| v.is_some()).count();
            println!("  {name:<16} {filled}/{} values", values.len());
        }
    }

    if let Err(e) = series.validate() {
        println!("Warning: {e}");
    }
    Ok(())
}

/// One artifact directory name per series file, its file stem.
fn artifact_names(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "series".to_string());
        if !seen.insert(name.clone()) {
            bail!(
                "series {} would overwrite artifacts named '{name}'; rename the file",
                path.display()
            );
        }
        names.push(name);
    }
    Ok(names)
}

fn load_series(path: &Path) -> Result<IndicatorSeries> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// RFC 3339, or a bare date taken as the start (or end) of that day.
fn parse_time(s: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid time '{s}': expected RFC 3339 or YYYY-MM-DD"))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .context("invalid time of day")?;
    Ok(date.and_time(time).and_utc())
}
