//! Stop/cooldown evaluation: take-profit, stop-loss and post-stop cooldown.
//!
//! Thresholds are percentages of price; a threshold of 0 disables that side.
//!
//! | side  | kind          | fires when                                  | exit price            |
//! |-------|---------------|---------------------------------------------|-----------------------|
//! | long  | gain, fixed   | high above entry by > g                     | entry * (1 + g)       |
//! | long  | gain, trail   | low retraces > g from last_high (> entry)   | last_high * (1 - g)   |
//! | long  | loss, fixed   | low below entry by > l                      | entry * (1 - l)       |
//! | long  | loss, trail   | high rebounds > l from last_low (< entry)   | last_low * (1 + l)    |
//! | short | gain, fixed   | low below entry by > g                      | entry * (1 - g)       |
//! | short | gain, trail   | high rebounds > g from last_low (< entry)   | last_low * (1 + g)    |
//! | short | loss, fixed   | high above entry by > l                     | entry * (1 + l)       |
//! | short | loss, trail   | low retraces > l from last_high (> entry)   | last_high * (1 - l)   |
//!
//! When both sides trigger on the same bar the loss side wins: a bar's
//! range does not tell which extreme came first, so the worse outcome is
//! assumed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{OpenPosition, Position, PositionSide};

/// Stop engine configuration attached to a strategy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StopEngine {
    /// Take-profit threshold in percent. 0 disables.
    pub stop_gain: f64,
    /// Stop-loss threshold in percent. 0 disables.
    pub stop_loss: f64,
    /// Measure the gain side from the best price since entry.
    pub trailing_gain: bool,
    /// Measure the loss side from the worst price since entry.
    pub trailing_loss: bool,
    /// Minutes during which entries are suppressed after a stopped exit.
    pub stop_cooldown: i64,
}

impl StopEngine {
    /// At least one side is enabled.
    pub fn is_active(&self) -> bool {
        self.stop_gain > 0.0 || self.stop_loss > 0.0
    }

    /// Cooldown window, `None` when it exceeds what `Duration` can hold.
    pub fn cooldown(&self) -> Option<Duration> {
        Duration::try_minutes(self.stop_cooldown.max(0))
    }
}

/// Which threshold fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    Gain,
    Loss,
}

/// A fired stop and the synthetic exit price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopHit {
    pub kind: StopKind,
    pub price: f64,
}

/// Advance the position's high/low trackers with this bar and decide
/// whether a stop fires.
///
/// Returns `None` when no config is given, no side is enabled, or the
/// position has no entry price.
pub fn check_stop(
    position: &mut OpenPosition,
    config: Option<&StopEngine>,
    high: f64,
    low: f64,
) -> Option<StopHit> {
    let config = config?;
    if position.entry_price == 0.0 || !config.is_active() {
        return None;
    }

    position.last_high = position.last_high.max(high);
    position.last_low = position.last_low.min(low);

    let loss = if config.stop_loss > 0.0 {
        loss_stop(position, config, high, low)
    } else {
        None
    };

    loss.or_else(|| {
        if config.stop_gain > 0.0 {
            gain_stop(position, config, high, low)
        } else {
            None
        }
    })
}

/// True when a new entry at `time` must be suppressed because `last`
/// was stopped out less than `stop_cooldown` minutes earlier.
pub fn check_cooldown(
    last: Option<&Position>,
    config: Option<&StopEngine>,
    time: DateTime<Utc>,
) -> bool {
    let (Some(last), Some(config)) = (last, config) else {
        return false;
    };
    if config.stop_cooldown <= 0 || !last.stopped {
        return false;
    }
    match config.cooldown() {
        Some(window) => time - last.exit_time < window,
        // longer than any representable span
        None => true,
    }
}

fn gain_stop(p: &OpenPosition, config: &StopEngine, high: f64, low: f64) -> Option<StopHit> {
    let g = config.stop_gain;
    let price = match (p.side, config.trailing_gain) {
        (PositionSide::Long, true) => (p.last_high > p.entry_price
            && drop_pct(p.last_high, low) > g)
            .then(|| p.last_high * (1.0 - g / 100.0)),
        (PositionSide::Long, false) => {
            (rise_pct(p.entry_price, high) > g).then(|| p.entry_price * (1.0 + g / 100.0))
        }
        (PositionSide::Short, true) => (p.last_low < p.entry_price
            && rise_pct(p.last_low, high) > g)
            .then(|| p.last_low * (1.0 + g / 100.0)),
        (PositionSide::Short, false) => {
            (drop_pct(p.entry_price, low) > g).then(|| p.entry_price * (1.0 - g / 100.0))
        }
    }?;
    Some(StopHit {
        kind: StopKind::Gain,
        price,
    })
}

fn loss_stop(p: &OpenPosition, config: &StopEngine, high: f64, low: f64) -> Option<StopHit> {
    let l = config.stop_loss;
    let price = match (p.side, config.trailing_loss) {
        (PositionSide::Long, true) => (p.last_low < p.entry_price
            && rise_pct(p.last_low, high) > l)
            .then(|| p.last_low * (1.0 + l / 100.0)),
        (PositionSide::Long, false) => {
            (drop_pct(p.entry_price, low) > l).then(|| p.entry_price * (1.0 - l / 100.0))
        }
        (PositionSide::Short, true) => (p.last_high > p.entry_price
            && drop_pct(p.last_high, low) > l)
            .then(|| p.last_high * (1.0 - l / 100.0)),
        (PositionSide::Short, false) => {
            (rise_pct(p.entry_price, high) > l).then(|| p.entry_price * (1.0 + l / 100.0))
        }
    }?;
    Some(StopHit {
        kind: StopKind::Loss,
        price,
    })
}

/// Percent move up from `from` to `to`.
fn rise_pct(from: f64, to: f64) -> f64 {
    if from <= 0.0 {
        return 0.0;
    }
    (to / from - 1.0) * 100.0
}

/// Percent move down from `from` to `to` (positive when `to < from`).
fn drop_pct(from: f64, to: f64) -> f64 {
    if from <= 0.0 {
        return 0.0;
    }
    (1.0 - to / from) * 100.0
}
