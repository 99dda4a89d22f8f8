//! IndicatorSeries: the immutable per-bar input to the engine.
//!
//! Parallel columns indexed by bar: timestamps, OHLC prices, buy/sell
//! markers, plus any number of strategy-specific auxiliary columns. Slicing
//! always produces a new series; nothing downstream mutates one in place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Precondition violations found by [`IndicatorSeries::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("time is not strictly increasing at bar {index}")]
    NonMonotonicTime { index: usize },
}

/// One bar of the series, borrowed out of the columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub buy: f64,
    pub sell: f64,
}

impl Bar {
    /// A buy marker is present on this bar.
    pub fn has_buy(&self) -> bool {
        self.buy > 0.0
    }

    /// A sell marker is present on this bar.
    pub fn has_sell(&self) -> bool {
        self.sell > 0.0
    }
}

/// Column-oriented price/indicator series annotated with signal markers.
///
/// Deserializes from the indicator service's JSON shape. Every key other
/// than the seven fixed columns lands in `aux` (e.g. `z_score`, `rsi`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub time: Vec<DateTime<Utc>>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub buys: Vec<f64>,
    pub sells: Vec<f64>,
    /// Strategy-specific columns; entries are `None` during indicator warm-up.
    #[serde(flatten)]
    pub aux: BTreeMap<String, Vec<Option<f64>>>,
}

impl IndicatorSeries {
    /// Number of bars (taken from the time column).
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Bar view at index `i`, or `None` past the end of any fixed column.
    pub fn bar(&self, i: usize) -> Option<Bar> {
        Some(Bar {
            time: *self.time.get(i)?,
            open: *self.open.get(i)?,
            high: *self.high.get(i)?,
            low: *self.low.get(i)?,
            close: *self.close.get(i)?,
            buy: *self.buys.get(i)?,
            sell: *self.sells.get(i)?,
        })
    }

    /// Iterate over bars in time order. Stops at the shortest fixed column.
    pub fn bars(&self) -> impl Iterator<Item = Bar> + '_ {
        (0..self.len()).map_while(move |i| self.bar(i))
    }

    /// Auxiliary column by name.
    pub fn aux(&self, name: &str) -> Option<&[Option<f64>]> {
        self.aux.get(name).map(|v| v.as_slice())
    }

    pub fn first_time(&self) -> Option<DateTime<Utc>> {
        self.time.first().copied()
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.time.last().copied()
    }

    /// New series over bars `start..end` (half-open, clamped to the length).
    pub fn slice(&self, start: usize, end: usize) -> IndicatorSeries {
        let end = end.min(self.len());
        let start = start.min(end);

        fn cut<T: Clone>(col: &[T], start: usize, end: usize) -> Vec<T> {
            let end = end.min(col.len());
            let start = start.min(end);
            col[start..end].to_vec()
        }

        IndicatorSeries {
            time: cut(&self.time, start, end),
            open: cut(&self.open, start, end),
            high: cut(&self.high, start, end),
            low: cut(&self.low, start, end),
            close: cut(&self.close, start, end),
            buys: cut(&self.buys, start, end),
            sells: cut(&self.sells, start, end),
            aux: self
                .aux
                .iter()
                .map(|(name, col)| (name.clone(), cut(col, start, end)))
                .collect(),
        }
    }

    /// New series holding only the bars with `from <= time <= to`.
    ///
    /// This is the zoom view: the caller re-runs the whole pipeline on the
    /// result. Assumes sorted time, as the rest of the engine does.
    pub fn window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> IndicatorSeries {
        let start = self.time.partition_point(|t| *t < from);
        let end = self.time.partition_point(|t| *t <= to);
        self.slice(start, end.max(start))
    }

    /// Check column lengths and time ordering.
    ///
    /// The simulator itself does not call this; malformed input there is
    /// tolerated the way the dashboard tolerated it.
    pub fn validate(&self) -> Result<(), SeriesError> {
        let expected = self.len();
        let fixed = [
            ("open", self.open.len()),
            ("high", self.high.len()),
            ("low", self.low.len()),
            ("close", self.close.len()),
            ("buys", self.buys.len()),
            ("sells", self.sells.len()),
        ];
        let aux = self.aux.iter().map(|(name, col)| (name.as_str(), col.len()));

        for (column, actual) in fixed.into_iter().chain(aux) {
            if actual != expected {
                return Err(SeriesError::LengthMismatch {
                    column: column.to_string(),
                    expected,
                    actual,
                });
            }
        }

        if let Some(pos) = self.time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SeriesError::NonMonotonicTime { index: pos + 1 });
        }

        Ok(())
    }
}
