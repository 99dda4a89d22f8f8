//! Serializable backtest configuration.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sliver_core::{SimulationParams, StopEngine, StrategyDescriptor};

use crate::runner::BacktestRequest;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Optional zoom range. Either bound may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Inclusive lower bound, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

/// Everything needed to reproduce one backtest, minus the series itself.
///
/// ```toml
/// [strategy]
/// type = 2
/// side = "long"
///
/// [stop_engine]
/// stop_loss = 5.0
/// trailing_loss = true
/// stop_cooldown = 60
///
/// [simulation]
/// initial_balance = 10000.0
/// fee_rate = 0.001
///
/// [window]
/// from = "2024-01-01T00:00:00Z"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy: StrategyDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_engine: Option<StopEngine>,
    #[serde(default)]
    pub simulation: SimulationParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowConfig>,
}

impl BacktestConfig {
    pub fn new(strategy: StrategyDescriptor) -> Self {
        Self {
            strategy,
            stop_engine: None,
            simulation: SimulationParams::default(),
            window: None,
        }
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(stop) = &self.stop_engine {
            non_negative("stop_engine.stop_gain", stop.stop_gain)?;
            non_negative("stop_engine.stop_loss", stop.stop_loss)?;
            if stop.stop_cooldown < 0 {
                return Err(invalid(
                    "stop_engine.stop_cooldown",
                    format!("must be >= 0 minutes, got {}", stop.stop_cooldown),
                ));
            }
        }

        let sim = &self.simulation;
        if !(sim.initial_balance > 0.0) || !sim.initial_balance.is_finite() {
            return Err(invalid(
                "simulation.initial_balance",
                format!("must be a positive amount, got {}", sim.initial_balance),
            ));
        }
        if !(0.0..1.0).contains(&sim.fee_rate) {
            return Err(invalid(
                "simulation.fee_rate",
                format!("must be in [0, 1), got {}", sim.fee_rate),
            ));
        }

        if let Some(WindowConfig {
            from: Some(from),
            to: Some(to),
        }) = self.window
        {
            if from > to {
                return Err(invalid("window", format!("from {from} is after to {to}")));
            }
        }
        Ok(())
    }

    /// The pipeline request this configuration describes.
    pub fn request(&self) -> BacktestRequest {
        let window = self.window.unwrap_or_default();
        BacktestRequest {
            strategy: self.strategy,
            stop_engine: self.stop_engine.clone(),
            params: self.simulation,
            from: window.from,
            to: window.to,
        }
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a non-negative percentage, got {value}")))
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
