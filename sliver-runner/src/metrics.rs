//! Performance metrics: reduce a position list to summary statistics.
//!
//! One pass over the positions feeds a [`TradeStats`] accumulator (running
//! Welford means, streaks, extrema, NAV compounding); ratios are derived
//! from it afterwards. The same battery is computed for the strategy and
//! for a synthetic buy-and-hold position over the same series.
//!
//! Degenerate ratios (no losing trades, zero-length period, ...) evaluate
//! to `Infinity`/`NaN` and are reported as such.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sliver_core::{IndicatorSeries, OpenPosition, Position, PositionSide, SimulationParams};

use crate::drawdown::max_series_drawdown;
use crate::report::{duration, fixed, percent, Metric};
use crate::stats::RunningStats;

/// NAV every compounding run starts from.
const NAV_BASE: f64 = 100.0;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Key prefix of the buy-and-hold block.
pub const BUY_AND_HOLD_PREFIX: &str = "B&H ";

/// Single-pass accumulator over closed positions.
#[derive(Debug, Clone, Default)]
pub struct TradeStats {
    pub trades: usize,
    pub winning: usize,
    pub losing: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub roi: RunningStats,
    pub negative_roi: RunningStats,
    pub winning_roi: RunningStats,
    pub losing_roi: RunningStats,
    pub winning_pnl: RunningStats,
    pub losing_pnl: RunningStats,
    /// Milliseconds.
    pub winning_time: RunningStats,
    /// Milliseconds.
    pub losing_time: RunningStats,
    pub largest_winning_roi: f64,
    pub largest_losing_roi: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub max_drawdown: f64,
    pub max_runup: f64,
    /// Milliseconds.
    pub time_in_market: i64,
    pub nav: f64,
    current_wins: usize,
    current_losses: usize,
}

impl TradeStats {
    pub fn new() -> Self {
        Self {
            nav: NAV_BASE,
            ..Self::default()
        }
    }

    pub fn collect(positions: &[Position]) -> Self {
        let mut stats = Self::new();
        for p in positions {
            stats.push(p);
        }
        stats
    }

    pub fn push(&mut self, p: &Position) {
        let held = p.duration().num_milliseconds();

        self.trades += 1;
        self.roi.push(p.roi);
        if p.roi < 0.0 {
            self.negative_roi.push(p.roi);
        }

        if p.is_winner() {
            self.winning += 1;
            self.gross_profit += p.pnl;
            self.winning_roi.push(p.roi);
            self.winning_pnl.push(p.pnl);
            self.winning_time.push(held as f64);
            self.largest_winning_roi = self.largest_winning_roi.max(p.roi);
            self.current_wins += 1;
            self.current_losses = 0;
        } else {
            self.losing += 1;
            self.gross_loss += p.pnl;
            self.losing_roi.push(p.roi);
            self.losing_pnl.push(p.pnl);
            self.losing_time.push(held as f64);
            self.largest_losing_roi = self.largest_losing_roi.min(p.roi);
            self.current_losses += 1;
            self.current_wins = 0;
        }
        self.max_consecutive_wins = self.max_consecutive_wins.max(self.current_wins);
        self.max_consecutive_losses = self.max_consecutive_losses.max(self.current_losses);

        self.max_drawdown = self.max_drawdown.min(p.drawdown);
        self.max_runup = self.max_runup.max(p.runup());
        self.time_in_market += held;
        self.nav *= 1.0 + p.roi / 100.0;
    }

    /// Compounded return over all trades, in percent.
    pub fn total_roi(&self) -> f64 {
        self.nav - NAV_BASE
    }
}

/// Aggregate performance metrics for one block of trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    pub roi: f64,
    pub annualized_roi: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub recovery_factor: f64,
    pub profit_factor: f64,
    pub payoff_ratio: f64,

    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_winning_trade: f64,
    pub largest_winning_trade: f64,
    pub avg_losing_trade: f64,
    pub largest_losing_trade: f64,
    pub avg_time_in_winning_ms: f64,
    pub avg_time_in_losing_ms: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub max_drawdown: f64,
    pub max_runup: f64,
    pub time_in_market: f64,
}

impl PerformanceMetrics {
    /// Metrics for realized trades over a period of `trading_period`.
    pub fn compute(positions: &[Position], trading_period: Duration) -> Self {
        let stats = TradeStats::collect(positions);
        Self::from_stats(&stats, trading_period, stats.max_drawdown)
    }

    /// Metrics for a synthetic long held from the first to the last close.
    ///
    /// The drawdown comes from the raw close series rather than from the
    /// single position's excursion. `None` for an empty series.
    pub fn buy_and_hold(series: &IndicatorSeries, params: &SimulationParams) -> Option<Self> {
        let position = buy_and_hold_position(series, params)?;
        let stats = TradeStats::collect(std::slice::from_ref(&position));
        Some(Self::from_stats(
            &stats,
            trading_period(series),
            max_series_drawdown(&series.close),
        ))
    }

    pub fn from_stats(stats: &TradeStats, trading_period: Duration, max_drawdown: f64) -> Self {
        let roi = stats.total_roi();
        let trading_days = trading_period.num_milliseconds() as f64 / MS_PER_DAY;
        let period_ms = trading_period.num_milliseconds() as f64;

        Self {
            trades: stats.trades,
            winning_trades: stats.winning,
            losing_trades: stats.losing,
            win_rate: ratio(stats.winning as f64, stats.trades as f64) * 100.0,

            roi,
            annualized_roi: annualized(roi, trading_days),
            sharpe: roi / stats.roi.std_dev(),
            sortino: roi / stats.negative_roi.std_dev(),
            calmar: roi / max_drawdown,
            recovery_factor: roi / max_drawdown.abs(),
            profit_factor: stats.gross_profit / stats.gross_loss.abs(),
            payoff_ratio: stats.winning_pnl.mean() / stats.losing_pnl.mean().abs(),

            gross_profit: stats.gross_profit,
            gross_loss: stats.gross_loss,
            avg_winning_trade: stats.winning_roi.mean(),
            largest_winning_trade: stats.largest_winning_roi,
            avg_losing_trade: stats.losing_roi.mean(),
            largest_losing_trade: stats.largest_losing_roi,
            avg_time_in_winning_ms: stats.winning_time.mean(),
            avg_time_in_losing_ms: stats.losing_time.mean(),
            max_consecutive_wins: stats.max_consecutive_wins,
            max_consecutive_losses: stats.max_consecutive_losses,
            max_drawdown,
            max_runup: stats.max_runup,
            time_in_market: stats.time_in_market as f64 / period_ms * 100.0,
        }
    }

    /// Labeled rows, keys prefixed with `prefix`.
    pub fn to_metrics(&self, prefix: &str) -> Vec<Metric> {
        let k = |name: &str| format!("{prefix}{name}");
        vec![
            Metric::number(k("Trades"), self.trades as f64),
            Metric::number(k("Winning Trades"), self.winning_trades as f64),
            Metric::number(k("Losing Trades"), self.losing_trades as f64),
            Metric::text(k("Win Rate"), percent(self.win_rate, 2)),
            Metric::sep(),
            Metric::text(k("ROI"), percent(self.roi, 4)),
            Metric::text(k("Annualized ROI"), percent(self.annualized_roi, 4)),
            Metric::text(k("Sharpe Ratio"), fixed(self.sharpe, 4)),
            Metric::text(k("Sortino Ratio"), fixed(self.sortino, 4)),
            Metric::text(k("Calmar Ratio"), fixed(self.calmar, 4)),
            Metric::text(k("Recovery Factor"), fixed(self.recovery_factor, 4)),
            Metric::text(k("Profit Factor"), fixed(self.profit_factor, 4)),
            Metric::text(k("Payoff Ratio"), fixed(self.payoff_ratio, 4)),
            Metric::sep(),
            Metric::text(k("Gross Profit"), fixed(self.gross_profit, 2)),
            Metric::text(k("Gross Loss"), fixed(self.gross_loss, 2)),
            Metric::text(k("Avg Winning Trade"), percent(self.avg_winning_trade, 4)),
            Metric::text(k("Largest Winning Trade"), percent(self.largest_winning_trade, 4)),
            Metric::text(k("Avg Losing Trade"), percent(self.avg_losing_trade, 4)),
            Metric::text(k("Largest Losing Trade"), percent(self.largest_losing_trade, 4)),
            Metric::text(
                k("Avg Time In Winning Trades"),
                duration(Duration::milliseconds(self.avg_time_in_winning_ms as i64)),
            ),
            Metric::text(
                k("Avg Time In Losing Trades"),
                duration(Duration::milliseconds(self.avg_time_in_losing_ms as i64)),
            ),
            Metric::number(k("Max Consecutive Wins"), self.max_consecutive_wins as f64),
            Metric::number(k("Max Consecutive Losses"), self.max_consecutive_losses as f64),
            Metric::text(k("Max Drawdown"), percent(self.max_drawdown, 2)),
            Metric::text(k("Max Run-up"), percent(self.max_runup, 2)),
            Metric::text(k("Time In Market"), percent(self.time_in_market, 2)),
        ]
    }
}

/// Rows for `positions` against the series they were simulated on, with
/// the dashboard's default balance and fee.
pub fn compute_metrics(positions: &[Position], series: &IndicatorSeries) -> Vec<Metric> {
    compute_metrics_with(positions, series, &SimulationParams::default())
}

/// Strategy block, then a `SEP` row and the buy-and-hold block.
///
/// An empty position list yields the single `no positions found` row.
pub fn compute_metrics_with(
    positions: &[Position],
    series: &IndicatorSeries,
    params: &SimulationParams,
) -> Vec<Metric> {
    if positions.is_empty() {
        return vec![Metric::text("", "no positions found")];
    }

    let strategy = PerformanceMetrics::compute(positions, trading_period(series));
    let mut rows = strategy.to_metrics("");

    if let Some(bh) = PerformanceMetrics::buy_and_hold(series, params) {
        rows.push(Metric::section());
        rows.extend(bh.to_metrics(BUY_AND_HOLD_PREFIX));
    }
    rows
}

/// Span between the first and the last bar.
pub fn trading_period(series: &IndicatorSeries) -> Duration {
    match (series.first_time(), series.last_time()) {
        (Some(first), Some(last)) => last - first,
        _ => Duration::zero(),
    }
}

/// Return scaled to a 365-day year.
pub fn annualized(roi: f64, trading_days: f64) -> f64 {
    roi / trading_days * 365.0
}

fn buy_and_hold_position(series: &IndicatorSeries, params: &SimulationParams) -> Option<Position> {
    let first = series.bar(0)?;
    let last = series.bar(series.len().checked_sub(1)?)?;
    let mut open = OpenPosition::open(
        PositionSide::Long,
        first.time,
        first.close,
        params.initial_balance,
    );
    for bar in series.bars() {
        open.mark(bar.high, bar.low);
    }
    Some(open.close(last.time, last.close, params.fee_rate, false))
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{find, MetricValue};
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn t(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn make_position(entry_hour: i64, exit_hour: i64, entry: f64, exit: f64) -> Position {
        OpenPosition::open(PositionSide::Long, t(entry_hour), entry, 10_000.0)
            .close(t(exit_hour), exit, 0.0, false)
    }

    fn flat_series(close: &[f64]) -> IndicatorSeries {
        IndicatorSeries {
            time: (0..close.len() as i64).map(|i| t(i * 24)).collect(),
            open: close.to_vec(),
            high: close.to_vec(),
            low: close.to_vec(),
            close: close.to_vec(),
            buys: vec![0.0; close.len()],
            sells: vec![0.0; close.len()],
            aux: BTreeMap::new(),
        }
    }

    fn text(rows: &[Metric], key: &str) -> String {
        match find(rows, key) {
            Some(MetricValue::Text(s)) => s.clone(),
            other => panic!("{key}: expected text, got {other:?}"),
        }
    }

    // ── Sentinel ──

    #[test]
    fn empty_positions_yield_sentinel() {
        let rows = compute_metrics(&[], &flat_series(&[1.0, 2.0]));
        assert_eq!(rows, vec![Metric::text("", "no positions found")]);
    }

    // ── Counts & streaks ──

    #[test]
    fn counts_and_streaks() {
        let positions = vec![
            make_position(0, 1, 100.0, 110.0), // W
            make_position(2, 3, 100.0, 105.0), // W
            make_position(4, 5, 100.0, 90.0),  // L
            make_position(6, 7, 100.0, 95.0),  // L
            make_position(8, 9, 100.0, 97.0),  // L
            make_position(10, 11, 100.0, 120.0), // W
        ];
        let m = PerformanceMetrics::compute(&positions, Duration::days(1));
        assert_eq!(m.trades, 6);
        assert_eq!(m.winning_trades, 3);
        assert_eq!(m.losing_trades, 3);
        assert!((m.win_rate - 50.0).abs() < 1e-9);
        assert_eq!(m.max_consecutive_wins, 2);
        assert_eq!(m.max_consecutive_losses, 3);
        assert!((m.largest_winning_trade - 20.0).abs() < 1e-9);
        assert!((m.largest_losing_trade - (-10.0)).abs() < 1e-9);
        assert!((m.gross_profit - 3_500.0).abs() < 1e-9);
        assert!((m.gross_loss - (-1_800.0)).abs() < 1e-9);
        assert!((m.profit_factor - 3_500.0 / 1_800.0).abs() < 1e-9);
    }

    // ── Returns ──

    #[test]
    fn roi_compounds_nav() {
        let positions = vec![
            make_position(0, 1, 100.0, 110.0),
            make_position(2, 3, 100.0, 110.0),
        ];
        let m = PerformanceMetrics::compute(&positions, Duration::days(365));
        assert!((m.roi - 21.0).abs() < 1e-9);
        assert!((m.annualized_roi - 21.0).abs() < 1e-9);
    }

    #[test]
    fn sharpe_divides_total_roi_by_population_stdev() {
        let positions = vec![
            make_position(0, 1, 100.0, 110.0), // +10
            make_position(2, 3, 100.0, 90.0),  // -10
            make_position(4, 5, 100.0, 130.0), // +30
        ];
        let m = PerformanceMetrics::compute(&positions, Duration::days(10));
        // 1.1 * 0.9 * 1.3
        assert!((m.roi - 28.7).abs() < 1e-9);
        let std = ((0.0 + 400.0 + 400.0) / 3.0_f64).sqrt();
        assert!((m.sharpe - m.roi / std).abs() < 1e-9);
        assert_eq!(fixed(m.sharpe, 4), "1.7575");
        // single negative trade: downside deviation is zero
        assert_eq!(m.sortino, f64::INFINITY);
    }

    #[test]
    fn sortino_divides_total_roi_by_downside_stdev() {
        let positions = vec![
            make_position(0, 1, 100.0, 120.0), // +20
            make_position(2, 3, 100.0, 90.0),  // -10
            make_position(4, 5, 100.0, 70.0),  // -30
        ];
        let m = PerformanceMetrics::compute(&positions, Duration::days(10));
        // 1.2 * 0.9 * 0.7
        assert!((m.roi - (-24.4)).abs() < 1e-9);
        // negatives -10 and -30 deviate 10 from their mean
        assert!((m.sortino - m.roi / 10.0).abs() < 1e-9);
    }

    #[test]
    fn payoff_ratio_from_average_pnl() {
        let positions = vec![
            make_position(0, 1, 100.0, 120.0), // +2000
            make_position(2, 3, 100.0, 90.0),  // -1000
            make_position(4, 5, 100.0, 95.0),  // -500
        ];
        let m = PerformanceMetrics::compute(&positions, Duration::days(10));
        assert!((m.payoff_ratio - 2_000.0 / 750.0).abs() < 1e-9);
    }

    #[test]
    fn all_winners_surface_infinity() {
        let positions = vec![make_position(0, 1, 100.0, 110.0)];
        let m = PerformanceMetrics::compute(&positions, Duration::days(1));
        assert!(m.profit_factor.is_infinite());
        assert!(m.payoff_ratio.is_infinite());
        let rows = m.to_metrics("");
        assert_eq!(text(&rows, "Profit Factor"), "Infinity");
    }

    // ── Time ──

    #[test]
    fn time_in_market_and_holding_times() {
        let positions = vec![
            make_position(0, 6, 100.0, 110.0),   // W, 6h
            make_position(12, 14, 100.0, 110.0), // W, 2h
            make_position(20, 24, 100.0, 90.0),  // L, 4h
        ];
        let m = PerformanceMetrics::compute(&positions, Duration::hours(48));
        assert!((m.time_in_market - 12.0 / 48.0 * 100.0).abs() < 1e-9);
        assert!((m.avg_time_in_winning_ms - 4.0 * 3_600_000.0).abs() < 1e-6);
        let rows = m.to_metrics("");
        assert_eq!(text(&rows, "Avg Time In Winning Trades"), "0d 4h 0m");
        assert_eq!(text(&rows, "Avg Time In Losing Trades"), "0d 4h 0m");
    }

    // ── Drawdown & run-up ──

    #[test]
    fn worst_trade_drawdown_and_best_runup() {
        let mut a = OpenPosition::open(PositionSide::Long, t(0), 100.0, 10_000.0);
        a.mark(110.0, 95.0);
        let a = a.close(t(1), 105.0, 0.0, false);
        let mut b = OpenPosition::open(PositionSide::Long, t(2), 100.0, 10_000.0);
        b.mark(130.0, 100.0);
        let b = b.close(t(3), 125.0, 0.0, false);

        let m = PerformanceMetrics::compute(&[a.clone(), b.clone()], Duration::days(1));
        assert!((m.max_drawdown - a.drawdown.min(b.drawdown)).abs() < 1e-12);
        assert!((m.max_runup - 30.0).abs() < 1e-9);
        assert!((m.calmar - m.roi / m.max_drawdown).abs() < 1e-12);
        assert!((m.recovery_factor - m.roi / m.max_drawdown.abs()).abs() < 1e-12);
    }

    // ── Buy & hold ──

    #[test]
    fn buy_and_hold_block_follows_section_row() {
        let series = flat_series(&[100.0, 120.0, 80.0, 150.0]);
        let positions = vec![make_position(0, 24, 100.0, 120.0)];
        let rows = compute_metrics(&positions, &series);

        let section = rows.iter().position(|m| m.key == "SEP").unwrap();
        assert_eq!(rows[section + 1].key, "B&H Trades");
        assert_eq!(rows.len(), section + 1 + rows[..section].len());

        // (80 - 120) / 120
        assert_eq!(text(&rows, "B&H Max Drawdown"), "-33.33%");
        // 10_000 -> 15_000 minus 25 in fees
        assert_eq!(text(&rows, "B&H ROI"), "49.7500%");
        assert_eq!(text(&rows, "B&H Time In Market"), "100.00%");
    }

    #[test]
    fn buy_and_hold_needs_bars() {
        let empty = IndicatorSeries::default();
        assert!(PerformanceMetrics::buy_and_hold(&empty, &SimulationParams::default()).is_none());
    }

    // ── Purity ──

    #[test]
    fn compute_is_idempotent() {
        let series = flat_series(&[100.0, 105.0, 95.0, 110.0]);
        let positions = vec![
            make_position(0, 24, 100.0, 105.0),
            make_position(48, 72, 95.0, 110.0),
        ];
        let a = compute_metrics(&positions, &series);
        let b = compute_metrics(&positions, &series);
        assert_eq!(a, b);
    }

    #[test]
    fn annualized_scales_to_a_year() {
        assert!((annualized(10.0, 73.0) - 50.0).abs() < 1e-12);
    }
}
