//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: the full `BacktestReport`, schema-versioned
//! - **CSV**: the position list and the metric rows
//! - **Markdown**: a human-readable single-run report
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sliver_core::Position;

use crate::report::Metric;
use crate::runner::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport`, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export closed positions as CSV, one row per trade.
///
/// Columns: side, entry_time, entry_price, entry_amount, entry_cost,
/// exit_time, exit_price, exit_amount, exit_cost, fee, pnl, roi, stopped,
/// max_equity, min_equity, drawdown
pub fn export_positions_csv(positions: &[Position]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "entry_time",
        "entry_price",
        "entry_amount",
        "entry_cost",
        "exit_time",
        "exit_price",
        "exit_amount",
        "exit_cost",
        "fee",
        "pnl",
        "roi",
        "stopped",
        "max_equity",
        "min_equity",
        "drawdown",
    ])?;

    for p in positions {
        wtr.write_record([
            p.side.as_str(),
            &p.entry_time.to_rfc3339(),
            &format!("{:.6}", p.entry_price),
            &format!("{:.8}", p.entry_amount),
            &format!("{:.2}", p.entry_cost),
            &p.exit_time.to_rfc3339(),
            &format!("{:.6}", p.exit_price),
            &format!("{:.8}", p.exit_amount),
            &format!("{:.2}", p.exit_cost),
            &format!("{:.2}", p.fee),
            &format!("{:.2}", p.pnl),
            &format!("{:.4}", p.roi),
            &p.stopped.to_string(),
            &format!("{:.2}", p.max_equity),
            &format!("{:.2}", p.min_equity),
            &format!("{:.4}", p.drawdown),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export metric rows as `key,value` CSV, separators omitted.
pub fn export_metrics_csv(metrics: &[Metric]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["key", "value"])?;
    for m in metrics.iter().filter(|m| !m.is_separator()) {
        wtr.write_record([m.key.as_str(), &m.value.to_string()])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one backtest under `output_dir/name/`:
/// - `report.json`: the full `BacktestReport`
/// - `positions.csv`: the trade list
/// - `metrics.csv`: the metric rows
/// - `report.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path, name: &str) -> Result<PathBuf> {
    let run_dir = output_dir.join(name);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("report.json"), &export_json(report)?)?;
    write(&run_dir.join("positions.csv"), &export_positions_csv(&report.positions)?)?;
    write(&run_dir.join("metrics.csv"), &export_metrics_csv(&report.metrics)?)?;
    write(&run_dir.join("report.md"), &generate_report(report))?;

    Ok(run_dir)
}

/// Load a `BacktestReport` from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn generate_report(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Strategy | {} |\n", report.strategy.kind));
    md.push_str(&format!("| Side | {} |\n", report.strategy.side));
    md.push_str(&format!("| Positions | {} |\n", report.positions.len()));
    md.push('\n');

    md.push_str("## Metrics\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    for m in &report.metrics {
        if m.is_separator() {
            md.push_str("| | |\n");
        } else {
            md.push_str(&format!("| {} | {} |\n", m.key, m.value));
        }
    }
    md.push('\n');

    if !report.positions.is_empty() {
        md.push_str("## Positions\n\n");
        md.push_str("| # | Entry | Exit | ROI | Stopped |\n");
        md.push_str("| --- | --- | --- | --- | --- |\n");
        for (i, p) in report.positions.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} @ {:.4} | {} @ {:.4} | {:.2}% | {} |\n",
                i + 1,
                p.entry_time.format("%Y-%m-%d %H:%M"),
                p.entry_price,
                p.exit_time.format("%Y-%m-%d %H:%M"),
                p.exit_price,
                p.roi,
                if p.stopped { "yes" } else { "" },
            ));
        }
    }

    md
}
