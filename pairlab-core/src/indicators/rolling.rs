//! Rolling pair statistics — spread z-score and Pearson correlation over a
//! trailing window.
//!
//! Lookback: window - 1 (first snapshot at index window-1).
//! Uses sample standard deviation (divide by n - 1). The buffer holds at most
//! `window` price pairs, so the engine never needs the full history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Standard deviations at or below this are treated as zero variance.
pub const DEGENERATE_STD: f64 = 1e-12;

/// Indicator values derived for one bar from the trailing window ending at it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// price(A) − price(B) on this bar.
    pub spread: f64,
    /// Rolling mean of the spread.
    pub mean: f64,
    /// Rolling sample standard deviation of the spread.
    pub std: f64,
    /// `None` when the spread had zero variance over the window.
    pub zscore: Option<f64>,
    /// `None` when either leg was constant over the window.
    pub correlation: Option<f64>,
}

impl IndicatorSnapshot {
    /// Both z-score and correlation are defined, so the bar can carry a signal.
    pub fn is_tradable(&self) -> bool {
        self.zscore.is_some() && self.correlation.is_some()
    }
}

/// Streaming rolling-window calculator. Feed one bar at a time.
#[derive(Debug, Clone)]
pub struct RollingPairStats {
    window: usize,
    buf: VecDeque<(f64, f64)>,
}

impl RollingPairStats {
    /// The buffer grows as bars arrive, so a window longer than the series
    /// costs nothing up front.
    ///
    /// # Panics
    /// If `window < 2`.
    pub fn new(window: usize) -> Self {
        assert!(window >= 2, "rolling window must be >= 2");
        Self {
            window,
            buf: VecDeque::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// True once a full window has been observed.
    pub fn is_warm(&self) -> bool {
        self.buf.len() == self.window
    }

    /// Push the next bar's prices and return its snapshot, or `None` while the
    /// window is still filling.
    pub fn push(&mut self, price_a: f64, price_b: f64) -> Option<IndicatorSnapshot> {
        if self.buf.len() == self.window {
            self.buf.pop_front();
        }
        self.buf.push_back((price_a, price_b));

        if self.is_warm() {
            Some(self.snapshot())
        } else {
            None
        }
    }

    pub fn push_bar(&mut self, bar: &Bar) -> Option<IndicatorSnapshot> {
        self.push(bar.price_a, bar.price_b)
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }

    fn snapshot(&self) -> IndicatorSnapshot {
        let n = self.buf.len() as f64;

        let (sum_a, sum_b) = self
            .buf
            .iter()
            .fold((0.0, 0.0), |(sa, sb), &(a, b)| (sa + a, sb + b));
        let mean_a = sum_a / n;
        let mean_b = sum_b / n;
        let mean_s = mean_a - mean_b;

        // Two-pass central moments
        let mut var_a = 0.0;
        let mut var_b = 0.0;
        let mut cov_ab = 0.0;
        let mut var_s = 0.0;
        for &(a, b) in &self.buf {
            let da = a - mean_a;
            let db = b - mean_b;
            let ds = da - db;
            var_a += da * da;
            var_b += db * db;
            cov_ab += da * db;
            var_s += ds * ds;
        }

        let std = (var_s / (n - 1.0)).sqrt();
        let (last_a, last_b) = self.buf.back().copied().unwrap_or((0.0, 0.0));
        let spread = last_a - last_b;

        let zscore = if std > DEGENERATE_STD {
            Some((spread - mean_s) / std)
        } else {
            None
        };

        let sd_a = (var_a / (n - 1.0)).sqrt();
        let sd_b = (var_b / (n - 1.0)).sqrt();
        let correlation = if sd_a > DEGENERATE_STD && sd_b > DEGENERATE_STD {
            Some((cov_ab / (var_a * var_b).sqrt()).clamp(-1.0, 1.0))
        } else {
            None
        };

        IndicatorSnapshot {
            spread,
            mean: mean_s,
            std,
            zscore,
            correlation,
        }
    }
}

/// Batch form over a whole bar series: one entry per bar.
///
/// Void bars yield `None` and are not pushed into the window, matching how
/// the engine skips them.
///
/// # Panics
/// If `window < 2`. Run `EngineConfig::validate` on a configured window first.
pub fn compute_snapshots(bars: &[Bar], window: usize) -> Vec<Option<IndicatorSnapshot>> {
    let mut stats = RollingPairStats::new(window);
    bars.iter()
        .map(|bar| {
            if bar.is_void() {
                None
            } else {
                stats.push_bar(bar)
            }
        })
        .collect()
}
