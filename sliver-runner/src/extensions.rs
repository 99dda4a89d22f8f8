//! Per-strategy metric extensions.
//!
//! Some strategy variants publish an auxiliary score next to their signals.
//! For those, the distribution of that score over the analyzed window is
//! appended to the metric rows.

use log::warn;
use sliver_core::{IndicatorSeries, StrategyType};

use crate::report::{fixed, Metric};
use crate::stats::{median, RunningStats};

/// Auxiliary series summarized for `kind`, if any.
pub fn extension_series(kind: StrategyType) -> Option<&'static str> {
    match kind {
        StrategyType::Hypnox => Some("z_score"),
        StrategyType::HypnoxV2 => Some("score"),
        _ => None,
    }
}

/// Extra rows for `kind` over `series`.
///
/// Missing or all-null auxiliary series produce no rows.
pub fn compute_extras(kind: StrategyType, series: &IndicatorSeries) -> Vec<Metric> {
    let Some(name) = extension_series(kind) else {
        return Vec::new();
    };
    let Some(raw) = series.aux(name) else {
        warn!("{kind} series carries no '{name}' column");
        return Vec::new();
    };

    let values: Vec<f64> = raw.iter().flatten().copied().collect();
    if values.is_empty() {
        warn!("'{name}' column has no values in the analyzed range");
        return Vec::new();
    }

    let stats: RunningStats = values.iter().copied().collect();
    vec![
        Metric::section(),
        Metric::text("Standard Deviation", fixed(stats.std_dev(), 4)),
        Metric::text("Median", fixed(median(&values), 4)),
        Metric::text("Mean", fixed(stats.mean(), 4)),
    ]
}
