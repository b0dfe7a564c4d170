//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [backtest]
//! instrument_a = "EURUSD"
//! instrument_b = "GBPUSD"
//!
//! [strategy]
//! window = 50
//! z_entry = 2.0
//!
//! [strategy.exit_policy]
//! type = "partial_stop_loss"
//! stop_loss_pips = 30.0
//!
//! [sizing]
//! starting_equity = 1000.0
//! risk_fraction = 0.01
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pairlab_core::EngineConfig;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Strategy(#[from] pairlab_core::ConfigError),
    #[error("sizing: {0}")]
    Sizing(String),
}

/// Everything needed to reproduce one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: PairSpec,
    #[serde(default)]
    pub strategy: EngineConfig,
    /// Currency overlay. Omit to report pips only.
    #[serde(default)]
    pub sizing: Option<SizingConfig>,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Which two instruments form the pair. Labels only; prices arrive as bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairSpec {
    pub instrument_a: String,
    pub instrument_b: String,
}

impl Default for PairSpec {
    fn default() -> Self {
        Self {
            instrument_a: "EURUSD".to_string(),
            instrument_b: "GBPUSD".to_string(),
        }
    }
}

impl PairSpec {
    pub fn label(&self) -> String {
        format!("{}/{}", self.instrument_a, self.instrument_b)
    }
}

/// Fixed-fractional position sizing in account currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub starting_equity: f64,
    /// Fraction of current equity risked per trade.
    pub risk_fraction: f64,
    /// Notional stop distance used to size the lot, in pips.
    pub stop_distance_pips: f64,
    /// Currency value of one pip for one lot.
    pub pip_value: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            starting_equity: 1000.0,
            risk_fraction: 0.01,
            stop_distance_pips: 30.0,
            pip_value: 10.0,
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("starting_equity", self.starting_equity),
            ("risk_fraction", self.risk_fraction),
            ("stop_distance_pips", self.stop_distance_pips),
            ("pip_value", self.pip_value),
        ];
        for (name, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Sizing(format!(
                    "{name} must be positive (got {value})"
                )));
            }
        }
        if self.risk_fraction >= 1.0 {
            return Err(ConfigError::Sizing(format!(
                "risk_fraction must be below 1 (got {})",
                self.risk_fraction
            )));
        }
        Ok(())
    }
}

/// Reporting options that do not affect the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// |z| band marked as the exit zone in the signal table.
    pub exit_zone: f64,
    /// Include the per-bar signal table in the result.
    pub include_signals: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            exit_zone: 0.1,
            include_signals: false,
        }
    }
}

impl BacktestConfig {
    /// Parse a configuration from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        if let Some(sizing) = &self.sizing {
            sizing.validate()?;
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        let hash = blake3::hash(json.as_bytes());
        Ok(hash.to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlab_core::exit::{ExitPolicy, PartialStopLoss};

    #[test]
    fn empty_toml_gives_defaults() {
        let config = BacktestConfig::from_toml("").unwrap();
        assert_eq!(config, BacktestConfig::default());
        assert_eq!(config.strategy.window, 50);
        assert!(config.sizing.is_none());
    }

    #[test]
    fn parses_tagged_exit_policy() {
        let toml_str = r#"
[backtest]
instrument_a = "AUDUSD"
instrument_b = "NZDUSD"

[strategy]
window = 30
z_entry = 2.5
round_trip_cost_pips = 3.5

[strategy.exit_policy]
type = "partial_stop_loss"
partial_z = 0.8
stop_loss_pips = 25

[sizing]
starting_equity = 5000.0
"#;
        let config = BacktestConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.backtest.label(), "AUDUSD/NZDUSD");
        assert_eq!(config.strategy.window, 30);
        assert_eq!(config.strategy.corr_threshold, 0.8);
        match &config.strategy.exit_policy {
            ExitPolicy::PartialStopLoss(p) => {
                assert_eq!(p.staged.partial_z, 0.8);
                assert_eq!(p.staged.partial_fraction, 0.5);
                assert_eq!(p.stop_loss_pips, 25.0);
            }
            other => panic!("unexpected policy {other:?}"),
        }
        let sizing = config.sizing.unwrap();
        assert_eq!(sizing.starting_equity, 5000.0);
        assert_eq!(sizing.risk_fraction, 0.01);
    }

    #[test]
    fn invalid_strategy_rejected_on_load() {
        let err = BacktestConfig::from_toml("[strategy]\nwindow = 1\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Strategy(pairlab_core::ConfigError::WindowTooSmall(1))
        ));
    }

    #[test]
    fn unknown_policy_is_parse_error() {
        let err = BacktestConfig::from_toml("[strategy.exit_policy]\ntype = \"trailing\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_sizing_rejected() {
        let err = BacktestConfig::from_toml("[sizing]\nrisk_fraction = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("risk_fraction"));
    }

    #[test]
    fn run_id_is_deterministic() {
        let a = BacktestConfig::default();
        let b = BacktestConfig::default();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);

        let mut c = BacktestConfig::default();
        c.strategy.exit_policy = ExitPolicy::PartialStopLoss(PartialStopLoss::default());
        assert_ne!(a.run_id().unwrap(), c.run_id().unwrap());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BacktestConfig::from_file(Path::new("/nonexistent/pairlab.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pairlab.toml"));
    }
}
