//! Labeled metric rows and the formatting rules applied to them.
//!
//! Row order is meaningful: rows are grouped by `sep` separators inside a
//! block and blocks are split by `SEP` rows. Values are either raw numbers
//! or pre-formatted strings; non-finite values print as `Infinity`,
//! `-Infinity` or `NaN` rather than being replaced.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Key of the separator between groups inside a block.
pub const SEP: &str = "sep";

/// Key of the separator between blocks.
pub const SECTION: &str = "SEP";

/// Value of a metric row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Number(n) if n.fract() == 0.0 && n.is_finite() => {
                write!(f, "{}", *n as i64)
            }
            MetricValue::Number(n) => write!(f, "{}", js_number(*n)),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

/// One labeled output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn number(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value: MetricValue::Number(value),
        }
    }

    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: MetricValue::Text(value.into()),
        }
    }

    /// Group separator.
    pub fn sep() -> Self {
        Self::text(SEP, "")
    }

    /// Block separator.
    pub fn section() -> Self {
        Self::text(SECTION, "")
    }

    pub fn is_separator(&self) -> bool {
        self.key == SEP || self.key == SECTION
    }
}

/// Look up the first row with `key`.
pub fn find<'a>(metrics: &'a [Metric], key: &str) -> Option<&'a MetricValue> {
    metrics.iter().find(|m| m.key == key).map(|m| &m.value)
}

/// Fixed-point formatting with `decimals` places.
pub fn fixed(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let s = if value > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else {
        format!("{value:.decimals$}")
    }
}

/// Fixed-point with a `%` suffix.
pub fn percent(value: f64, decimals: usize) -> String {
    format!("{}%", fixed(value, decimals))
}

/// `Xd Yh Zm`, truncating seconds.
pub fn duration(d: Duration) -> String {
    let minutes = d.num_minutes();
    let days = minutes / (24 * 60);
    let hours = (minutes % (24 * 60)) / 60;
    let mins = minutes % 60;
    format!("{days}d {hours}h {mins}m")
}

/// Render rows as an aligned two-column table for terminals.
pub fn render_table(metrics: &[Metric]) -> String {
    let width = metrics
        .iter()
        .filter(|m| !m.is_separator())
        .map(|m| m.key.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for m in metrics {
        if m.is_separator() {
            let rule = if m.key == SECTION { '=' } else { '-' };
            out.push_str(&rule.to_string().repeat(width + 16));
        } else {
            out.push_str(&format!("{:<width$}  {}", m.key, m.value));
        }
        out.push('\n');
    }
    out
}

fn js_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        fixed(n, 0)
    } else {
        n.to_string()
    }
}
