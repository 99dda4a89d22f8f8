//! Buy-and-hold drawdown over a raw price series.
//!
//! Independent of trade boundaries: the series is treated as one long
//! holding. Result is a percentage, always `<= 0`.

/// Worst peak-to-trough decline of `prices`, in percent.
///
/// Two candidates are compared:
/// 1. the global peak against the lowest price after it;
/// 2. when the global trough comes before the global peak, that trough
///    against the highest price preceding it.
///
/// The more negative of the two is returned. Empty input yields 0.
pub fn max_series_drawdown(prices: &[f64]) -> f64 {
    let Some(peak_idx) = argmax(prices) else {
        return 0.0;
    };
    let Some(trough_idx) = argmin(prices) else {
        return 0.0;
    };
    let abs_peak = prices[peak_idx];
    let abs_trough = prices[trough_idx];

    // lowest point from the global peak onward
    let trough_after_peak = prices[peak_idx..]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);

    let mut before_peak = 0.0;
    if trough_after_peak > abs_trough {
        let peak = if trough_idx == 0 {
            prices[0]
        } else {
            prices[..trough_idx]
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max)
        };
        before_peak = pct_change(peak, abs_trough);
    }
    let after_peak = pct_change(abs_peak, trough_after_peak);

    before_peak.min(after_peak)
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Index of the first minimum.
fn argmin(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
