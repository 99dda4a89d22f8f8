//! Position: one completed round-trip trade, plus the working state of
//! the trade currently open inside the simulator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a strategy's trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    #[default]
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed trade. Immutable once produced by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,

    // ── Entry ──
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub entry_amount: f64,
    pub entry_cost: f64,

    // ── Exit ──
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_amount: f64,
    pub exit_cost: f64,

    // ── Result ──
    /// Round-trip trading cost.
    pub fee: f64,
    /// Net of fee.
    pub pnl: f64,
    /// `pnl / entry_cost * 100`.
    pub roi: f64,
    /// Closed by the stop evaluator rather than an opposing signal.
    pub stopped: bool,

    // ── Excursion ──
    pub max_equity: f64,
    pub min_equity: f64,
    /// Worst intra-trade equity decline in percent, always `<= 0`.
    pub drawdown: f64,
}

impl Position {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Time between entry and exit.
    pub fn duration(&self) -> Duration {
        self.exit_time - self.entry_time
    }

    /// Best mark-to-market gain over entry cost, in percent.
    pub fn runup(&self) -> f64 {
        if self.entry_cost == 0.0 {
            return 0.0;
        }
        (self.max_equity - self.entry_cost) / self.entry_cost * 100.0
    }
}

/// The trade currently open inside a simulation run.
///
/// Mutated bar by bar; [`OpenPosition::close`] consumes it and yields a
/// fresh [`Position`], so no working state can alias the output.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: PositionSide,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub entry_amount: f64,
    pub entry_cost: f64,
    pub max_equity: f64,
    pub min_equity: f64,
    pub drawdown: f64,
    /// Highest price seen since entry (stop tracking).
    pub last_high: f64,
    /// Lowest price seen since entry (stop tracking).
    pub last_low: f64,
}

impl OpenPosition {
    /// Open with the whole `balance` at `price`.
    pub fn open(side: PositionSide, time: DateTime<Utc>, price: f64, balance: f64) -> Self {
        let entry_amount = if price != 0.0 { balance / price } else { 0.0 };
        let entry_cost = entry_amount * price;
        Self {
            side,
            entry_time: time,
            entry_price: price,
            entry_amount,
            entry_cost,
            max_equity: entry_cost,
            min_equity: entry_cost,
            drawdown: 0.0,
            last_high: price,
            last_low: price,
        }
    }

    /// Mark-to-market value of the position at `price`.
    pub fn equity_at(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => self.entry_amount * price,
            PositionSide::Short => 2.0 * self.entry_cost - self.entry_amount * price,
        }
    }

    /// Fold a bar's range into the equity extrema and the running drawdown.
    pub fn mark(&mut self, high: f64, low: f64) {
        let (best, worst) = match self.side {
            PositionSide::Long => (self.equity_at(high), self.equity_at(low)),
            PositionSide::Short => (self.equity_at(low), self.equity_at(high)),
        };
        self.max_equity = self.max_equity.max(best);
        self.min_equity = self.min_equity.min(worst);
        if self.max_equity > 0.0 {
            let dd = (self.min_equity - self.max_equity) / self.max_equity * 100.0;
            self.drawdown = self.drawdown.min(dd);
        }
    }

    /// Close at `price` and produce the immutable record.
    pub fn close(self, time: DateTime<Utc>, price: f64, fee_rate: f64, stopped: bool) -> Position {
        let exit_amount = self.entry_amount;
        let exit_cost = exit_amount * price;
        let fee = (self.entry_cost + exit_cost) * fee_rate;
        let gross = match self.side {
            PositionSide::Long => exit_cost - self.entry_cost,
            PositionSide::Short => self.entry_cost - exit_cost,
        };
        let pnl = gross - fee;
        let roi = if self.entry_cost != 0.0 {
            pnl / self.entry_cost * 100.0
        } else {
            0.0
        };

        Position {
            side: self.side,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            entry_amount: self.entry_amount,
            entry_cost: self.entry_cost,
            exit_time: time,
            exit_price: price,
            exit_amount,
            exit_cost,
            fee,
            pnl,
            roi,
            stopped,
            max_equity: self.max_equity,
            min_equity: self.min_equity,
            drawdown: self.drawdown,
        }
    }
}
