//! Indicator engine — rolling spread, z-score and correlation for the pair.
//!
//! Snapshots are produced lazily, one per bar, from a bounded trailing buffer
//! (`RollingPairStats`). `compute_snapshots` is the batch form used by signal
//! scanning and by the look-ahead tests.
//!
//! # Look-ahead contamination guard
//! No snapshot at bar t may depend on prices from bar t+1 or later.

pub mod rolling;

pub use rolling::{compute_snapshots, IndicatorSnapshot, RollingPairStats, DEGENERATE_STD};

/// Create synthetic pair bars one hour apart from (price_a, price_b) tuples.
#[cfg(test)]
pub fn make_pair_bars(prices: &[(f64, f64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &(a, b))| Bar::new(base + chrono::Duration::hours(i as i64), a, b))
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
