//! Signal generation — entry classification from z-score and correlation.
//!
//! Signals never see position state. The engine consults them only while flat.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::{Bar, Side};
use crate::error::ConfigError;
use crate::indicators::{IndicatorSnapshot, RollingPairStats};

/// Entry classification for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    #[default]
    None,
    EnterLong,
    EnterShort,
}

impl Signal {
    /// Side of the position this signal opens, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            Signal::None => None,
            Signal::EnterLong => Some(Side::Long),
            Signal::EnterShort => Some(Side::Short),
        }
    }

    pub fn is_entry(self) -> bool {
        self != Signal::None
    }
}

/// Classify one bar.
///
/// Short when the spread is stretched above its mean, long when below, both
/// only when the legs are correlated enough. Undefined inputs never signal.
/// Both comparisons are strict.
pub fn classify(
    zscore: Option<f64>,
    correlation: Option<f64>,
    z_entry: f64,
    corr_threshold: f64,
) -> Signal {
    let (Some(z), Some(corr)) = (zscore, correlation) else {
        return Signal::None;
    };
    if corr <= corr_threshold {
        return Signal::None;
    }
    if z > z_entry {
        Signal::EnterShort
    } else if z < -z_entry {
        Signal::EnterLong
    } else {
        Signal::None
    }
}

/// Thresholds bound once, classify many.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreSignal {
    pub z_entry: f64,
    pub corr_threshold: f64,
}

impl ZScoreSignal {
    pub fn new(z_entry: f64, corr_threshold: f64) -> Self {
        Self {
            z_entry,
            corr_threshold,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.z_entry, config.corr_threshold)
    }

    pub fn evaluate(&self, snapshot: Option<&IndicatorSnapshot>) -> Signal {
        match snapshot {
            Some(s) => classify(s.zscore, s.correlation, self.z_entry, self.corr_threshold),
            None => Signal::None,
        }
    }
}

// ─── Signal scan ───

/// One row of the per-bar signal table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMark {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub snapshot: Option<IndicatorSnapshot>,
    pub signal: Signal,
    /// |z| is inside the reversion band on this bar.
    pub in_exit_zone: bool,
}

/// Classify every bar without simulating positions.
///
/// Void bars appear in the table with no snapshot and are not fed into the
/// rolling window. The configuration is validated first.
pub fn scan_signals(
    bars: &[Bar],
    config: &EngineConfig,
    exit_zone: f64,
) -> Result<Vec<SignalMark>, ConfigError> {
    config.validate()?;
    let generator = ZScoreSignal::from_config(config);
    let mut stats = RollingPairStats::new(config.window);

    let marks = bars
        .iter()
        .enumerate()
        .map(|(bar_index, bar)| {
            let snapshot = if bar.is_void() {
                None
            } else {
                stats.push_bar(bar)
            };
            let in_exit_zone = snapshot
                .and_then(|s| s.zscore)
                .is_some_and(|z| z.abs() < exit_zone);
            SignalMark {
                bar_index,
                timestamp: bar.timestamp,
                signal: generator.evaluate(snapshot.as_ref()),
                snapshot,
                in_exit_zone,
            }
        })
        .collect();
    Ok(marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_pair_bars;

    #[test]
    fn stretched_above_is_short() {
        assert_eq!(classify(Some(2.5), Some(0.85), 2.0, 0.8), Signal::EnterShort);
        assert_eq!(Signal::EnterShort.side(), Some(Side::Short));
    }

    #[test]
    fn stretched_below_is_long() {
        assert_eq!(classify(Some(-2.1), Some(0.9), 2.0, 0.8), Signal::EnterLong);
        assert_eq!(Signal::EnterLong.side(), Some(Side::Long));
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(classify(Some(2.0), Some(0.9), 2.0, 0.8), Signal::None);
        assert_eq!(classify(Some(2.5), Some(0.8), 2.0, 0.8), Signal::None);
    }

    #[test]
    fn weak_correlation_blocks_entry() {
        assert_eq!(classify(Some(3.0), Some(0.5), 2.0, 0.8), Signal::None);
        assert_eq!(classify(Some(-3.0), Some(-0.9), 2.0, 0.8), Signal::None);
    }

    #[test]
    fn undefined_inputs_never_signal() {
        assert_eq!(classify(None, Some(0.9), 2.0, 0.8), Signal::None);
        assert_eq!(classify(Some(3.0), None, 2.0, 0.8), Signal::None);
        assert!(!Signal::None.is_entry());
        assert_eq!(ZScoreSignal::new(2.0, 0.8).evaluate(None), Signal::None);
    }

    #[test]
    fn scan_covers_every_bar() {
        let prices: Vec<(f64, f64)> = (0..10)
            .map(|i| {
                let x = i as f64 * 0.001;
                (1.10 + x + if i == 9 { 0.01 } else { 0.0 }, 1.27 + x * 0.9)
            })
            .collect();
        let bars = make_pair_bars(&prices);
        let config = EngineConfig {
            window: 8,
            corr_threshold: 0.5,
            ..Default::default()
        };
        let marks = scan_signals(&bars, &config, 0.1).unwrap();
        assert_eq!(marks.len(), 10);
        assert!(marks[..7].iter().all(|m| m.snapshot.is_none()));
        assert!(marks[7].snapshot.is_some());
        // Last bar jumps the spread up
        assert_eq!(marks[9].signal, Signal::EnterShort);
        assert!(!marks[9].in_exit_zone);
    }

    #[test]
    fn scan_rejects_invalid_window() {
        let bars = make_pair_bars(&[(1.10, 1.27), (1.11, 1.28)]);
        let config = EngineConfig {
            window: 1,
            ..Default::default()
        };
        assert_eq!(
            scan_signals(&bars, &config, 0.1),
            Err(ConfigError::WindowTooSmall(1))
        );
    }
}
