//! Backtest pipeline: wires together windowing, simulation, and metrics.
//!
//! `backtest()` is the single entry point: optional zoom window, series
//! validation, one simulator pass, then the metric battery followed by any
//! strategy-specific extension rows. Every call recomputes from scratch.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sliver_core::{
    IndicatorSeries, Position, SeriesError, SimulationParams, Simulator, StopEngine,
    StrategyDescriptor,
};

use crate::config::{BacktestConfig, ConfigError};
use crate::extensions::compute_extras;
use crate::metrics::compute_metrics_with;
use crate::report::{find, render_table, Metric, MetricValue};

/// Errors from the pipeline.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
    #[error("time window selects no bars")]
    EmptyWindow,
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// One pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub strategy: StrategyDescriptor,
    #[serde(default)]
    pub stop_engine: Option<StopEngine>,
    #[serde(default)]
    pub params: SimulationParams,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl BacktestRequest {
    pub fn new(strategy: StrategyDescriptor) -> Self {
        Self {
            strategy,
            stop_engine: None,
            params: SimulationParams::default(),
            from: None,
            to: None,
        }
    }

    pub fn with_stop_engine(mut self, stop: StopEngine) -> Self {
        self.stop_engine = Some(stop);
        self
    }

    pub fn with_params(mut self, params: SimulationParams) -> Self {
        self.params = params;
        self
    }

    /// Restrict the run to bars with `from <= time <= to`.
    pub fn with_window(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    fn is_windowed(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }
}

/// Complete result of a single backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub strategy: StrategyDescriptor,
    pub positions: Vec<Position>,
    pub metrics: Vec<Metric>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestReport {
    /// Value of the first metric row with `key`.
    pub fn metric(&self, key: &str) -> Option<&MetricValue> {
        find(&self.metrics, key)
    }

    /// Terminal rendering of the metric rows.
    pub fn table(&self) -> String {
        render_table(&self.metrics)
    }
}

/// Run the full pipeline for one strategy over one series.
pub fn backtest(
    request: &BacktestRequest,
    series: &IndicatorSeries,
) -> Result<BacktestReport, BacktestError> {
    let view: Cow<'_, IndicatorSeries> = if request.is_windowed() {
        let from = request.from.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let to = request.to.unwrap_or(DateTime::<Utc>::MAX_UTC);
        let windowed = series.window(from, to);
        if windowed.is_empty() {
            return Err(BacktestError::EmptyWindow);
        }
        debug!("window selected {} of {} bars", windowed.len(), series.len());
        Cow::Owned(windowed)
    } else {
        Cow::Borrowed(series)
    };
    view.validate()?;

    let positions = Simulator::new(request.strategy.side, request.stop_engine.as_ref())
        .with_params(request.params)
        .run(&view);

    let mut metrics = compute_metrics_with(&positions, &view, &request.params);
    metrics.extend(compute_extras(request.strategy.kind, &view));

    info!(
        "backtest {} ({}): {} bars, {} positions",
        request.strategy.kind,
        request.strategy.side,
        view.len(),
        positions.len()
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        strategy: request.strategy,
        positions,
        metrics,
    })
}

/// Validate `config` and run the pipeline it describes.
pub fn backtest_config(
    config: &BacktestConfig,
    series: &IndicatorSeries,
) -> Result<BacktestReport, BacktestError> {
    config.validate()?;
    backtest(&config.request(), series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use sliver_core::{PositionSide, StrategyType};
    use std::collections::BTreeMap;

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::hours(i)
    }

    /// Buy at 0, sell at 2, buy at 4, sell at 6.
    fn series() -> IndicatorSeries {
        let close = vec![100.0, 104.0, 108.0, 106.0, 102.0, 105.0, 110.0, 111.0];
        let n = close.len();
        let mut buys = vec![0.0; n];
        let mut sells = vec![0.0; n];
        buys[0] = 100.0;
        sells[2] = 108.0;
        buys[4] = 102.0;
        sells[6] = 110.0;
        let mut aux = BTreeMap::new();
        aux.insert("z_score".to_string(), vec![Some(0.5); n]);
        IndicatorSeries {
            time: (0..n as i64).map(t).collect(),
            open: close.clone(),
            high: close.iter().map(|c| c + 0.5).collect(),
            low: close.iter().map(|c| c - 0.5).collect(),
            close,
            buys,
            sells,
            aux,
        }
    }

    fn request(kind: StrategyType) -> BacktestRequest {
        BacktestRequest::new(StrategyDescriptor::new(kind, PositionSide::Long))
    }

    #[test]
    fn full_pipeline_produces_positions_and_blocks() {
        let report = backtest(&request(StrategyType::MaCross), &series()).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.positions.len(), 2);
        assert_eq!(report.metric("Trades"), Some(&MetricValue::Number(2.0)));
        assert_eq!(report.metric("B&H Trades"), Some(&MetricValue::Number(1.0)));
        assert!(report.metric("Mean").is_none());
    }

    #[test]
    fn extension_rows_follow_metrics() {
        let report = backtest(&request(StrategyType::Hypnox), &series()).unwrap();
        let last = report.metrics.last().unwrap();
        assert_eq!(last.key, "Mean");
        assert_eq!(report.metric("Mean"), Some(&MetricValue::Text("0.5000".into())));
    }

    #[test]
    fn window_reruns_on_sub_range() {
        let req = request(StrategyType::MaCross).with_window(Some(t(3)), None);
        let report = backtest(&req, &series()).unwrap();
        assert_eq!(report.positions.len(), 1);
        assert_eq!(report.positions[0].entry_time, t(4));
    }

    #[test]
    fn empty_window_is_an_error() {
        let req = request(StrategyType::MaCross).with_window(Some(t(100)), Some(t(200)));
        assert!(matches!(
            backtest(&req, &series()),
            Err(BacktestError::EmptyWindow)
        ));
    }

    #[test]
    fn malformed_series_is_rejected() {
        let mut s = series();
        s.sells.pop();
        assert!(matches!(
            backtest(&request(StrategyType::Manual), &s),
            Err(BacktestError::Series(SeriesError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let mut config = BacktestConfig::new(StrategyDescriptor::new(
            StrategyType::Manual,
            PositionSide::Long,
        ));
        config.simulation.fee_rate = 2.0;
        assert!(matches!(
            backtest_config(&config, &series()),
            Err(BacktestError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn no_signals_yields_sentinel() {
        let mut s = series();
        s.buys.iter_mut().for_each(|b| *b = 0.0);
        let report = backtest(&request(StrategyType::Manual), &s).unwrap();
        assert!(report.positions.is_empty());
        assert_eq!(report.metrics, vec![Metric::text("", "no positions found")]);
    }

    #[test]
    fn report_json_roundtrip() {
        let report = backtest(&request(StrategyType::Hypnox), &series()).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: BacktestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.strategy, report.strategy);
        assert_eq!(back.positions.len(), report.positions.len());
        assert_eq!(back.metrics.len(), report.metrics.len());
    }
}
