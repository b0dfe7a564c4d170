//! Bar-by-bar simulation — the heart of the backtesting engine.
//!
//! Each usable bar is processed in a fixed order:
//! 1. Indicator update (rolling window)
//! 2. Flat: classify the signal and open at this bar's prices (same-bar fill)
//! 3. Open: mark to market, update excursions, evaluate the exit policy
//! 4. Record bar equity
//!
//! The entry bar never evaluates exits. A bar without a defined z-score
//! never enters or exits, but an open position is still marked.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::{first_unordered, Bar, ExitFill, Position, TradeLog};
use crate::error::EngineError;
use crate::exit::ExitContext;
use crate::indicators::{IndicatorSnapshot, RollingPairStats};
use crate::signal::ZScoreSignal;

use super::accounting::{Mark, PnlAccountant};
use super::state::{BarEquity, BarEvent, RunDiagnostics, RunResult};

/// Data quality threshold: warn if void bar rate exceeds this fraction.
const VOID_BAR_RATE_THRESHOLD: f64 = 0.10;

/// Streaming simulation over one bar series. Owns the single open position
/// and the trade log.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: EngineConfig,
    stats: RollingPairStats,
    signal: ZScoreSignal,
    accountant: PnlAccountant,
    position: Option<Position>,
    trades: TradeLog,
    booked_pips: f64,
    bar_equity: Vec<BarEquity>,
    diagnostics: RunDiagnostics,
    next_index: usize,
    last_timestamp: Option<NaiveDateTime>,
}

impl Simulation {
    /// Validate the configuration and start flat.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            stats: RollingPairStats::new(config.window),
            signal: ZScoreSignal::from_config(&config),
            accountant: PnlAccountant::from_config(&config),
            config,
            position: None,
            trades: TradeLog::new(),
            booked_pips: 0.0,
            bar_equity: Vec::new(),
            diagnostics: RunDiagnostics::default(),
            next_index: 0,
            last_timestamp: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn trades(&self) -> &TradeLog {
        &self.trades
    }

    pub fn diagnostics(&self) -> &RunDiagnostics {
        &self.diagnostics
    }

    /// Feed the next bar through the rolling window and the state machine.
    pub fn step(&mut self, bar: &Bar) -> Result<Vec<BarEvent>, EngineError> {
        self.check_order(bar)?;
        let snapshot = if bar.is_void() {
            None
        } else {
            self.stats.push_bar(bar)
        };
        Ok(self.process(bar, snapshot))
    }

    /// Feed the next bar with indicator values supplied by the caller instead
    /// of the internal rolling window.
    pub fn step_with_snapshot(
        &mut self,
        bar: &Bar,
        snapshot: Option<IndicatorSnapshot>,
    ) -> Result<Vec<BarEvent>, EngineError> {
        self.check_order(bar)?;
        Ok(self.process(bar, snapshot))
    }

    /// Stop the run. An open position is reported, not closed.
    pub fn finish(self) -> RunResult {
        if let Some(pos) = &self.position {
            debug!(
                side = %pos.side(),
                entry_bar = pos.entry_bar(),
                remaining = pos.remaining_size(),
                "position still open at end of data"
            );
        }
        RunResult {
            trades: self.trades,
            bar_equity: self.bar_equity,
            open_position: self.position,
            diagnostics: self.diagnostics,
        }
    }

    fn check_order(&mut self, bar: &Bar) -> Result<(), EngineError> {
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(EngineError::UnorderedBars {
                    index: self.next_index,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
        self.last_timestamp = Some(bar.timestamp);
        Ok(())
    }

    fn process(&mut self, bar: &Bar, snapshot: Option<IndicatorSnapshot>) -> Vec<BarEvent> {
        let index = self.next_index;
        self.next_index += 1;
        self.diagnostics.bars_total += 1;

        let mut events = Vec::new();

        if bar.is_void() {
            self.diagnostics.void_bars += 1;
            let carried = self.bar_equity.last().map_or(0.0, |p| p.floating_pips);
            self.record_equity(index, bar, carried);
            return events;
        }

        match &snapshot {
            None => self.diagnostics.warmup_bars += 1,
            Some(s) => {
                if s.zscore.is_none() {
                    self.diagnostics.undefined_zscore_bars += 1;
                }
                if s.correlation.is_none() {
                    self.diagnostics.undefined_correlation_bars += 1;
                }
            }
        }

        self.position = match self.position.take() {
            None => self.try_enter(index, bar, snapshot.as_ref(), &mut events),
            Some(mut pos) => {
                pos.tick_bar();
                let mark = self.accountant.mark(&pos, bar);
                pos.record_mark(mark.floating_pnl_pips);
                match snapshot.and_then(|s| s.zscore) {
                    Some(z) => self.evaluate_exit(pos, index, bar, z, &mark, &mut events),
                    None => Some(pos),
                }
            }
        };

        let floating = match &self.position {
            Some(pos) => self.accountant.mark(pos, bar).floating_pnl_pips,
            None => 0.0,
        };
        self.record_equity(index, bar, floating);
        events
    }

    fn try_enter(
        &mut self,
        index: usize,
        bar: &Bar,
        snapshot: Option<&IndicatorSnapshot>,
        events: &mut Vec<BarEvent>,
    ) -> Option<Position> {
        let side = self.signal.evaluate(snapshot).side()?;
        let snap = snapshot?;
        let zscore = snap.zscore?;

        debug!(
            bar = index,
            %side,
            zscore,
            correlation = snap.correlation,
            price_a = bar.price_a,
            price_b = bar.price_b,
            "entry"
        );
        self.diagnostics.entries += 1;
        events.push(BarEvent::Entered { side, zscore });
        Some(Position::open(
            side,
            index,
            bar,
            zscore,
            self.accountant.entry_mark(),
        ))
    }

    fn evaluate_exit(
        &mut self,
        mut pos: Position,
        index: usize,
        bar: &Bar,
        zscore: f64,
        mark: &Mark,
        events: &mut Vec<BarEvent>,
    ) -> Option<Position> {
        let ctx = ExitContext {
            zscore,
            directional_z: pos.directional_z(zscore),
            movement_pips: mark.movement_pips,
            floating_pnl_pips: mark.floating_pnl_pips,
            partial_taken: pos.partial_taken(),
        };
        let decision = self.config.exit_policy.evaluate(&ctx);

        if let Some(partial) = decision.partial {
            let pnl_pips = self
                .accountant
                .book(partial.basis, partial.fraction, &pos, mark, zscore);
            let fill = ExitFill {
                bar_index: index,
                timestamp: bar.timestamp,
                zscore,
                fraction: partial.fraction,
                pnl_pips,
            };
            debug!(bar = index, zscore, fraction = partial.fraction, pnl_pips, "partial exit");
            self.diagnostics.partial_exits += 1;
            events.push(BarEvent::PartialExit(fill.clone()));
            pos.book_partial(fill);
        }

        let Some(full) = decision.close else {
            return Some(pos);
        };

        let fraction = pos.remaining_size();
        let pnl_pips = self.accountant.book(full.basis, fraction, &pos, mark, zscore);
        let fill = ExitFill {
            bar_index: index,
            timestamp: bar.timestamp,
            zscore,
            fraction,
            pnl_pips,
        };
        let trade = pos.close(fill, bar, full.reason);
        debug!(
            bar = index,
            reason = %trade.exit_reason,
            total_pnl_pips = trade.total_pnl_pips,
            bars_held = trade.bars_held,
            worst_floating_pnl_pips = trade.worst_floating_pnl_pips,
            "exit"
        );
        self.booked_pips += trade.total_pnl_pips;
        events.push(BarEvent::Closed {
            reason: trade.exit_reason,
            total_pnl_pips: trade.total_pnl_pips,
        });
        self.trades.push(trade);
        None
    }

    fn record_equity(&mut self, index: usize, bar: &Bar, floating_pips: f64) {
        self.bar_equity.push(BarEquity {
            bar_index: index,
            timestamp: bar.timestamp,
            booked_pips: self.booked_pips,
            floating_pips,
        });
    }
}

/// Run a backtest over an aligned bar series.
///
/// Fails before any bar is processed if the configuration is invalid or the
/// timestamps do not strictly increase. Too little data is not an error: the
/// result is simply empty.
pub fn run_backtest(bars: &[Bar], config: &EngineConfig) -> Result<RunResult, EngineError> {
    config.validate()?;

    if let Some(index) = first_unordered(bars) {
        return Err(EngineError::UnorderedBars {
            index,
            previous: bars[index - 1].timestamp,
            current: bars[index].timestamp,
        });
    }

    if bars.len() < config.window {
        warn!(
            bars = bars.len(),
            window = config.window,
            "insufficient history for the rolling window; no trades possible"
        );
    }

    let mut sim = Simulation::new(config.clone())?;
    for bar in bars {
        sim.step(bar)?;
    }
    let result = sim.finish();

    let void_rate = result.diagnostics.void_bar_rate();
    if void_rate > VOID_BAR_RATE_THRESHOLD {
        warn!(
            void_bars = result.diagnostics.void_bars,
            rate = void_rate,
            "high void bar rate"
        );
    }

    info!(
        exit_policy = config.exit_policy.name(),
        bars = result.diagnostics.bars_total,
        trades = result.trades.len(),
        total_pnl_pips = result.total_pnl_pips(),
        open_position = result.open_position.is_some(),
        "backtest complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::indicators::make_pair_bars;

    fn snap(zscore: f64, correlation: f64) -> Option<IndicatorSnapshot> {
        Some(IndicatorSnapshot {
            spread: 0.0,
            mean: 0.0,
            std: 1.0,
            zscore: Some(zscore),
            correlation: Some(correlation),
        })
    }

    #[test]
    fn entry_bar_does_not_exit() {
        let bars = make_pair_bars(&[(1.10, 1.27), (1.10, 1.27)]);
        let mut sim = Simulation::new(EngineConfig::default()).unwrap();
        let events = sim.step_with_snapshot(&bars[0], snap(2.5, 0.9)).unwrap();
        assert_eq!(
            events,
            vec![BarEvent::Entered {
                side: Side::Short,
                zscore: 2.5
            }]
        );
        assert_eq!(sim.position().unwrap().bars_held(), 0);

        let events = sim.step_with_snapshot(&bars[1], snap(0.0, 0.9)).unwrap();
        assert!(matches!(events[0], BarEvent::Closed { .. }));
        assert!(sim.position().is_none());
    }

    #[test]
    fn undefined_zscore_holds_but_marks() {
        let bars = make_pair_bars(&[(1.1000, 1.2700), (1.1050, 1.2700), (1.1000, 1.2700)]);
        let mut sim = Simulation::new(EngineConfig::default()).unwrap();
        sim.step_with_snapshot(&bars[0], snap(2.5, 0.9)).unwrap();

        let degenerate = Some(IndicatorSnapshot {
            spread: 0.0,
            mean: 0.0,
            std: 0.0,
            zscore: None,
            correlation: Some(0.9),
        });
        // Short loses 50 pips on A; no exit possible without z
        let events = sim.step_with_snapshot(&bars[1], degenerate).unwrap();
        assert!(events.is_empty());
        let pos = sim.position().unwrap();
        assert!((pos.worst_floating_pnl_pips() - (-51.2)).abs() < 1e-6);
        assert_eq!(sim.diagnostics().undefined_zscore_bars, 1);
    }

    #[test]
    fn rejects_out_of_order_bar() {
        let bars = make_pair_bars(&[(1.0, 1.0), (1.0, 1.0)]);
        let mut sim = Simulation::new(EngineConfig::default()).unwrap();
        sim.step(&bars[1]).unwrap();
        assert!(matches!(
            sim.step(&bars[0]),
            Err(EngineError::UnorderedBars { index: 1, .. })
        ));
    }

    #[test]
    fn void_bar_carries_equity() {
        let mut bars = make_pair_bars(&[(1.1000, 1.2700), (1.0990, 1.2700), (1.0, 1.0)]);
        bars[2].price_b = f64::NAN;
        let mut sim = Simulation::new(EngineConfig::default()).unwrap();
        sim.step_with_snapshot(&bars[0], snap(2.5, 0.9)).unwrap();
        sim.step_with_snapshot(&bars[1], snap(2.2, 0.9)).unwrap();
        let events = sim.step_with_snapshot(&bars[2], snap(0.0, 0.9)).unwrap();
        assert!(events.is_empty());
        assert_eq!(sim.position().unwrap().bars_held(), 1);

        let result = sim.finish();
        assert_eq!(result.diagnostics.void_bars, 1);
        assert_eq!(result.bar_equity.len(), 3);
        assert_eq!(result.bar_equity[2].floating_pips, result.bar_equity[1].floating_pips);
        assert!(result.open_position.is_some());
    }

    #[test]
    fn invalid_config_fails_before_bars() {
        let config = EngineConfig {
            window: 0,
            ..Default::default()
        };
        let bars = make_pair_bars(&[(1.0, 1.0)]);
        assert!(matches!(
            run_backtest(&bars, &config),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }
}
