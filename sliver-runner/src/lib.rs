//! Sliver Runner: backtest pipeline, performance metrics, reporting.
//!
//! This crate builds on `sliver-core` to provide:
//! - Running statistics (Welford mean/variance, median)
//! - Buy-and-hold drawdown over a raw price series
//! - The performance metric battery for strategy and buy & hold
//! - Strategy-specific extension rows
//! - TOML configuration and the end-to-end `backtest()` pipeline
//! - JSON / CSV / Markdown export

pub mod config;
pub mod drawdown;
pub mod export;
pub mod extensions;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod stats;

pub use config::{BacktestConfig, ConfigError, WindowConfig};
pub use drawdown::max_series_drawdown;
pub use export::{
    export_json, export_metrics_csv, export_positions_csv, generate_report, import_json,
    load_artifacts, save_artifacts,
};
pub use extensions::compute_extras;
pub use metrics::{compute_metrics, compute_metrics_with, PerformanceMetrics, TradeStats};
pub use report::{Metric, MetricValue};
pub use runner::{
    backtest, backtest_config, BacktestError, BacktestReport, BacktestRequest, SCHEMA_VERSION,
};
pub use stats::RunningStats;
