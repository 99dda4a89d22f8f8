//! Sliver Core: domain types and the position simulation engine.
//!
//! This crate contains the algorithmic heart of the backtester:
//! - Indicator series (parallel OHLC / signal / auxiliary columns)
//! - Positions (closed trades) and the open-position working state
//! - Strategy descriptors (type tag + side)
//! - Stop/cooldown evaluation (fixed and trailing take-profit / stop-loss)
//! - Single-pass position simulator
//!
//! Everything here is a pure, synchronous computation over caller-owned
//! inputs; no state survives between calls.

pub mod domain;
pub mod engine;

pub use domain::{
    Bar, IndicatorSeries, OpenPosition, Position, PositionSide, SeriesError, StrategyDescriptor,
    StrategyType, StrategyTypeError,
};
pub use engine::{
    check_cooldown, check_stop, simulate, SimulationParams, Simulator, StopEngine, StopHit,
    StopKind,
};
