//! Strategy parameters for one simulation run.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::exit::ExitPolicy;

/// One parameterization of the pairs strategy.
///
/// Validated once before the bar loop; the engine never re-checks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rolling window length in bars.
    pub window: usize,
    /// Enter when |z| exceeds this.
    pub z_entry: f64,
    /// Enter only when rolling correlation exceeds this.
    pub corr_threshold: f64,
    pub exit_policy: ExitPolicy,
    /// Spread plus commission for a full round trip, both legs, in pips.
    pub round_trip_cost_pips: f64,
    /// Price increment of one pip (0.0001 for most FX majors).
    pub pip_size: f64,
    /// Pips per unit of z-score on the z basis.
    pub pip_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: 50,
            z_entry: 2.0,
            corr_threshold: 0.8,
            exit_policy: ExitPolicy::default(),
            round_trip_cost_pips: 1.2,
            pip_size: 0.0001,
            pip_scale: 10.0,
        }
    }
}

impl EngineConfig {
    pub fn with_exit_policy(mut self, exit_policy: ExitPolicy) -> Self {
        self.exit_policy = exit_policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::WindowTooSmall(self.window));
        }
        positive("z_entry", self.z_entry)?;
        positive("corr_threshold", self.corr_threshold)?;
        if self.corr_threshold >= 1.0 {
            return Err(ConfigError::CorrelationOutOfRange(self.corr_threshold));
        }
        if !self.round_trip_cost_pips.is_finite() || self.round_trip_cost_pips < 0.0 {
            return Err(ConfigError::Negative {
                name: "round_trip_cost_pips",
                value: self.round_trip_cost_pips,
            });
        }
        positive("pip_size", self.pip_size)?;
        positive("pip_scale", self.pip_scale)?;
        self.exit_policy.validate(self.z_entry)
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::{MultiLegTarget, PartialStopLoss};

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.window, 50);
        assert_eq!(config.pip_scale, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_short_window() {
        let config = EngineConfig {
            window: 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::WindowTooSmall(1)));
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let config = EngineConfig {
            z_entry: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "z_entry", .. })
        ));
    }

    #[test]
    fn rejects_negative_cost() {
        let config = EngineConfig {
            round_trip_cost_pips: -0.1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Negative { .. })));
    }

    #[test]
    fn zero_cost_is_allowed() {
        let config = EngineConfig {
            round_trip_cost_pips: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_corr_threshold() {
        for corr_threshold in [0.0, -0.5, f64::NAN] {
            let config = EngineConfig {
                corr_threshold,
                ..Default::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::NonPositive { name: "corr_threshold", .. })
                ),
                "corr_threshold {corr_threshold} accepted"
            );
        }
    }

    #[test]
    fn rejects_correlation_of_one() {
        let config = EngineConfig {
            corr_threshold: 1.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::CorrelationOutOfRange(1.0))
        );
    }

    #[test]
    fn policy_checked_against_entry_threshold() {
        // stop_z 3.0 sits inside an entry threshold of 3.5
        let config = EngineConfig {
            z_entry: 3.5,
            ..Default::default()
        }
        .with_exit_policy(ExitPolicy::MultiLegTarget(MultiLegTarget::default()));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InconsistentTargets(_))
        ));

        let config = EngineConfig::default()
            .with_exit_policy(ExitPolicy::PartialStopLoss(PartialStopLoss::default()));
        assert!(config.validate().is_ok());
    }
}
