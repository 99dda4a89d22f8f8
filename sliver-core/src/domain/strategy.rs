//! Strategy descriptor: the type tag and trade side the engine needs.
//!
//! The tag selects metric extensions; the dashboard transmits it as an
//! integer, so serde goes through `u8`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::position::PositionSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown strategy type tag: {0}")]
pub struct StrategyTypeError(pub u8);

/// Known strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StrategyType {
    Manual,
    Random,
    Hypnox,
    Dd3,
    Mixer,
    Bb,
    MaCross,
    SwapperBox,
    Windrunner,
    HypnoxV2,
    ElNino,
    LaNina,
}

impl StrategyType {
    pub const ALL: [StrategyType; 12] = [
        StrategyType::Manual,
        StrategyType::Random,
        StrategyType::Hypnox,
        StrategyType::Dd3,
        StrategyType::Mixer,
        StrategyType::Bb,
        StrategyType::MaCross,
        StrategyType::SwapperBox,
        StrategyType::Windrunner,
        StrategyType::HypnoxV2,
        StrategyType::ElNino,
        StrategyType::LaNina,
    ];

    /// Display name as shown in the dashboard.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyType::Manual => "MANUAL",
            StrategyType::Random => "RANDOM",
            StrategyType::Hypnox => "HYPNOX",
            StrategyType::Dd3 => "DD3",
            StrategyType::Mixer => "MIXER",
            StrategyType::Bb => "BB",
            StrategyType::MaCross => "MA_CROSS",
            StrategyType::SwapperBox => "SWAPPERBOX",
            StrategyType::Windrunner => "WINDRUNNER",
            StrategyType::HypnoxV2 => "HYPNOXV2",
            StrategyType::ElNino => "ELNINO",
            StrategyType::LaNina => "LANINA",
        }
    }
}

impl TryFrom<u8> for StrategyType {
    type Error = StrategyTypeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        StrategyType::ALL
            .get(tag as usize)
            .copied()
            .ok_or(StrategyTypeError(tag))
    }
}

impl From<StrategyType> for u8 {
    fn from(ty: StrategyType) -> u8 {
        ty as u8
    }
}

impl std::fmt::Display for StrategyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the engine needs to know about a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    #[serde(rename = "type")]
    pub kind: StrategyType,
    #[serde(default)]
    pub side: PositionSide,
}

impl StrategyDescriptor {
    pub fn new(kind: StrategyType, side: PositionSide) -> Self {
        Self { kind, side }
    }
}
