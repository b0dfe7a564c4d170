//! In-trade excursion profile by entry time.
//!
//! Groups each trade's worst floating PnL by the hour of day and the weekday
//! of its entry bar. Timestamps are used as delivered, no timezone shift.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike, Weekday};
use pairlab_core::domain::ClosedTrade;
use serde::{Deserialize, Serialize};

/// mean / min / max / count of worst excursion (pips) in one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcursionBucket {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ExcursionBucket {
    fn first(value: f64) -> Self {
        Self {
            count: 1,
            mean: value,
            min: value,
            max: value,
        }
    }

    fn add(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayBucket {
    pub weekday: Weekday,
    #[serde(flatten)]
    pub stats: ExcursionBucket,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcursionProfile {
    /// Keyed by entry hour, 0..=23. Hours without trades are absent.
    pub by_hour: BTreeMap<u32, ExcursionBucket>,
    /// Monday first. Days without trades are absent.
    pub by_weekday: Vec<WeekdayBucket>,
}

impl ExcursionProfile {
    pub fn compute(trades: &[ClosedTrade]) -> Self {
        let mut by_hour: BTreeMap<u32, ExcursionBucket> = BTreeMap::new();
        let mut by_day: BTreeMap<u32, ExcursionBucket> = BTreeMap::new();

        for trade in trades {
            let worst = trade.worst_floating_pnl_pips;
            let entry = trade.entry_timestamp;
            accumulate(&mut by_hour, entry.hour(), worst);
            accumulate(&mut by_day, entry.weekday().num_days_from_monday(), worst);
        }

        let by_weekday = by_day
            .into_iter()
            .filter_map(|(day, stats)| {
                weekday_from_monday(day).map(|weekday| WeekdayBucket { weekday, stats })
            })
            .collect();

        Self {
            by_hour,
            by_weekday,
        }
    }

    /// The bucket with the most negative mean excursion, if any.
    pub fn worst_hour(&self) -> Option<(u32, &ExcursionBucket)> {
        self.by_hour
            .iter()
            .min_by(|a, b| a.1.mean.total_cmp(&b.1.mean))
            .map(|(h, b)| (*h, b))
    }
}

fn accumulate(map: &mut BTreeMap<u32, ExcursionBucket>, key: u32, value: f64) {
    map.entry(key)
        .and_modify(|b| b.add(value))
        .or_insert_with(|| ExcursionBucket::first(value));
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_from_monday(day: u32) -> Option<Weekday> {
    WEEK.get(day as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use pairlab_core::domain::{ExitFill, ExitReason, Side};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        // 2024-01-01 is a Monday
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn trade_at(entry: NaiveDateTime, worst: f64) -> ClosedTrade {
        let exit = entry + chrono::Duration::hours(3);
        ClosedTrade {
            side: Side::Short,
            entry_bar: 0,
            entry_timestamp: entry,
            entry_price_a: 1.0950,
            entry_price_b: 1.2700,
            entry_zscore: 2.1,
            exit_bar: 3,
            exit_timestamp: exit,
            exit_price_a: 1.0945,
            exit_price_b: 1.2700,
            exit_zscore: 0.02,
            exit_reason: ExitReason::ZReversion,
            total_pnl_pips: 3.8,
            bars_held: 3,
            holding_secs: 3 * 3600,
            worst_floating_pnl_pips: worst,
            best_floating_pnl_pips: 3.8,
            fills: vec![ExitFill {
                bar_index: 3,
                timestamp: exit,
                zscore: 0.02,
                fraction: 1.0,
                pnl_pips: 3.8,
            }],
        }
    }

    #[test]
    fn groups_by_hour_and_weekday() {
        let trades = vec![
            trade_at(at(1, 9), -4.0),
            trade_at(at(1, 9), -10.0),
            trade_at(at(8, 9), -1.0),
            trade_at(at(3, 14), -20.0),
        ];
        let profile = ExcursionProfile::compute(&trades);

        let nine = profile.by_hour[&9];
        assert_eq!(nine.count, 3);
        assert!((nine.mean - (-5.0)).abs() < 1e-12);
        assert_eq!(nine.min, -10.0);
        assert_eq!(nine.max, -1.0);
        assert_eq!(profile.by_hour[&14].count, 1);
        assert_eq!(profile.by_hour.len(), 2);

        assert_eq!(profile.by_weekday.len(), 2);
        assert_eq!(profile.by_weekday[0].weekday, Weekday::Mon);
        assert_eq!(profile.by_weekday[0].stats.count, 3);
        assert_eq!(profile.by_weekday[1].weekday, Weekday::Wed);
        assert_eq!(profile.by_weekday[1].stats.min, -20.0);

        let (hour, bucket) = profile.worst_hour().unwrap();
        assert_eq!(hour, 14);
        assert_eq!(bucket.mean, -20.0);
    }

    #[test]
    fn empty_log_gives_empty_profile() {
        let profile = ExcursionProfile::compute(&[]);
        assert_eq!(profile, ExcursionProfile::default());
        assert!(profile.worst_hour().is_none());
    }
}
