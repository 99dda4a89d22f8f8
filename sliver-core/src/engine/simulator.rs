//! Position simulator: walks an indicator series once and emits the
//! closed positions a strategy would have taken.
//!
//! Per bar, in order:
//! 1. If a position is open: mark it to market with the bar's range, then
//!    close it on an opposing signal or a stop (stop price wins when both).
//! 2. If flat and nothing closed on this bar: open on an entry signal
//!    unless a post-stop cooldown is active. The entry bar's range is
//!    marked too; stops start being evaluated on the following bar.
//!
//! A position still open at the last bar is dropped, not force-closed.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, IndicatorSeries, OpenPosition, Position, PositionSide};

use super::stops::{check_cooldown, check_stop, StopEngine};

/// Starting balance used by the dashboard's backtests.
pub const DEFAULT_INITIAL_BALANCE: f64 = 10_000.0;

/// Exchange fee applied to both legs of a trade.
pub const DEFAULT_FEE_RATE: f64 = 0.001;

/// Account parameters for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub initial_balance: f64,
    pub fee_rate: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            initial_balance: DEFAULT_INITIAL_BALANCE,
            fee_rate: DEFAULT_FEE_RATE,
        }
    }
}

/// Simulate with default account parameters.
pub fn simulate(
    series: &IndicatorSeries,
    side: PositionSide,
    stop: Option<&StopEngine>,
) -> Vec<Position> {
    Simulator::new(side, stop).run(series)
}

/// A configured simulation. Holds no state between runs.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    side: PositionSide,
    stop: Option<&'a StopEngine>,
    params: SimulationParams,
}

impl<'a> Simulator<'a> {
    pub fn new(side: PositionSide, stop: Option<&'a StopEngine>) -> Self {
        Self {
            side,
            stop,
            params: SimulationParams::default(),
        }
    }

    pub fn with_params(mut self, params: SimulationParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Run one pass over `series`.
    pub fn run(&self, series: &IndicatorSeries) -> Vec<Position> {
        let mut balance = self.params.initial_balance;
        let mut open: Option<OpenPosition> = None;
        let mut positions: Vec<Position> = Vec::new();

        for bar in series.bars() {
            let mut closed_this_bar = false;

            if let Some(mut pos) = open.take() {
                pos.mark(bar.high, bar.low);
                let hit = check_stop(&mut pos, self.stop, bar.high, bar.low);

                if hit.is_some() || self.is_exit(&bar) {
                    let (price, stopped) = match hit {
                        Some(hit) => {
                            debug!(
                                "{:?} stop fired at {} (price {:.4})",
                                hit.kind, bar.time, hit.price
                            );
                            (hit.price, true)
                        }
                        None => (bar.close, false),
                    };
                    let closed = pos.close(bar.time, price, self.params.fee_rate, stopped);
                    debug!(
                        "closed {} position at {}: pnl {:.2}, roi {:.4}%",
                        closed.side, closed.exit_time, closed.pnl, closed.roi
                    );
                    balance += closed.pnl;
                    positions.push(closed);
                    closed_this_bar = true;
                } else {
                    open = Some(pos);
                }
            }

            if open.is_some() || closed_this_bar || !self.is_entry(&bar) {
                continue;
            }

            if check_cooldown(positions.last(), self.stop, bar.time) {
                debug!("entry at {} suppressed by stop cooldown", bar.time);
                continue;
            }

            if balance <= 0.0 {
                warn!("balance exhausted ({balance:.2}), ignoring entry at {}", bar.time);
                continue;
            }

            let mut pos = OpenPosition::open(self.side, bar.time, bar.close, balance);
            pos.mark(bar.high, bar.low);
            open = Some(pos);
        }

        if let Some(pos) = open {
            debug!(
                "dropping {} position still open since {}",
                pos.side, pos.entry_time
            );
        }

        positions
    }

    fn is_entry(&self, bar: &Bar) -> bool {
        match self.side {
            PositionSide::Long => bar.has_buy(),
            PositionSide::Short => bar.has_sell(),
        }
    }

    fn is_exit(&self, bar: &Bar) -> bool {
        match self.side {
            PositionSide::Long => bar.has_sell(),
            PositionSide::Short => bar.has_buy(),
        }
    }
}
