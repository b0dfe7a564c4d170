//! Bar — one aligned sampling interval for the two legs of the pair.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Close prices of instrument A and instrument B at one timestamp.
///
/// Bars arrive already aligned, deduplicated and sorted by the external series
/// aligner. The engine only checks that timestamps strictly increase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub price_a: f64,
    pub price_b: f64,
}

impl Bar {
    pub fn new(timestamp: NaiveDateTime, price_a: f64, price_b: f64) -> Self {
        Self {
            timestamp,
            price_a,
            price_b,
        }
    }

    /// The traded quantity: price(A) − price(B).
    pub fn spread(&self) -> f64 {
        self.price_a - self.price_b
    }

    /// Returns true if either leg has no usable price (void bar).
    pub fn is_void(&self) -> bool {
        !self.price_a.is_finite() || !self.price_b.is_finite()
    }
}

/// Index of the first bar whose timestamp does not strictly increase, if any.
pub fn first_unordered(bars: &[Bar]) -> Option<usize> {
    bars.windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn spread_is_a_minus_b() {
        let bar = Bar::new(ts(0), 1.0950, 1.2700);
        assert!((bar.spread() - (1.0950 - 1.2700)).abs() < 1e-12);
    }

    #[test]
    fn bar_detects_void() {
        assert!(!Bar::new(ts(0), 1.09, 1.27).is_void());
        assert!(Bar::new(ts(0), f64::NAN, 1.27).is_void());
        assert!(Bar::new(ts(0), 1.09, f64::INFINITY).is_void());
    }

    #[test]
    fn ordered_series_has_no_violation() {
        let bars = vec![
            Bar::new(ts(0), 1.0, 1.0),
            Bar::new(ts(1), 1.0, 1.0),
            Bar::new(ts(2), 1.0, 1.0),
        ];
        assert_eq!(first_unordered(&bars), None);
        assert_eq!(first_unordered(&[]), None);
    }

    #[test]
    fn duplicate_timestamp_is_reported() {
        let bars = vec![
            Bar::new(ts(0), 1.0, 1.0),
            Bar::new(ts(1), 1.0, 1.0),
            Bar::new(ts(1), 1.0, 1.0),
        ];
        assert_eq!(first_unordered(&bars), Some(2));
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = Bar::new(ts(7), 1.0950, 1.2700);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
