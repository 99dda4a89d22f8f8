//! Domain types for the backtest engine

pub mod position;
pub mod series;
pub mod strategy;

pub use position::{OpenPosition, Position, PositionSide};
pub use series::{Bar, IndicatorSeries, SeriesError};
pub use strategy::{StrategyDescriptor, StrategyType, StrategyTypeError};
