//! Backtest engine: signal-driven position simulation with stop overlays.
//!
//! The engine consumes an [`IndicatorSeries`](crate::domain::IndicatorSeries)
//! whose buy/sell markers were computed upstream, walks it once, and returns
//! closed [`Position`](crate::domain::Position) records.

pub mod simulator;
pub mod stops;

pub use simulator::{
    simulate, SimulationParams, Simulator, DEFAULT_FEE_RATE, DEFAULT_INITIAL_BALANCE,
};
pub use stops::{check_cooldown, check_stop, StopEngine, StopHit, StopKind};
