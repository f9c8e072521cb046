use chrono::{Local, NaiveDate, NaiveDateTime};
use crossbeam_channel::{select, tick, Receiver};
use log::info;
use std::time::Duration;

use crate::analyzer::Analyzer;
use crate::config::TradingConfig;
use crate::engine::BacktestEngine;
use crate::market_data::MarketData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    AwaitingOpen,
    Trading,
}

/// Paper-trading loop: the same session state machine the backtest drives
/// by date, driven here by wall-clock ticks. Single-owner state; nothing
/// outside the loop thread mutates positions or risk counters. Cancellation
/// arrives on an explicit channel.
pub struct PaperTrader<'a> {
    engine: BacktestEngine<'a>,
    config: &'a TradingConfig,
    phase: SessionPhase,
    current_date: Option<NaiveDate>,
}

impl<'a> PaperTrader<'a> {
    pub fn new(config: &'a TradingConfig, data: &'a MarketData, analyzer: &'a dyn Analyzer) -> Self {
        Self {
            engine: BacktestEngine::new(config, data, analyzer),
            config,
            phase: SessionPhase::AwaitingOpen,
            current_date: None,
        }
    }

    /// Blocks until cancelled. Each tick advances the session state machine
    /// against the current wall-clock time.
    pub fn run(&mut self, cancel: Receiver<()>) {
        let interval = Duration::from_secs(self.config.session.tick_interval_secs.max(1));
        let ticker = tick(interval);
        info!(
            "Paper trading loop started (session {} - {}, tick {}s)",
            self.config.session.open,
            self.config.session.close,
            interval.as_secs()
        );

        loop {
            select! {
                recv(cancel) -> _ => {
                    self.shutdown();
                    return;
                }
                recv(ticker) -> _ => {
                    self.on_tick(Local::now().naive_local());
                }
            }
        }
    }

    /// One state-machine step. Split out from `run` so the transition logic
    /// is testable with synthetic clocks.
    pub fn on_tick(&mut self, now: NaiveDateTime) {
        let date = now.date();
        let time = now.time();
        let in_session = time >= self.config.session.open && time <= self.config.session.close;

        match self.phase {
            SessionPhase::AwaitingOpen if in_session => {
                info!("Market session open for {}", date);
                self.engine.begin_session();
                self.phase = SessionPhase::Trading;
                self.current_date = Some(date);
                self.engine.trade_cycle(date);
            }
            SessionPhase::Trading if !in_session => {
                info!("Market session closed for {}", date);
                self.engine.end_session(self.current_date.unwrap_or(date));
                let metrics = self.engine.portfolio_metrics();
                info!(
                    "Session summary: daily P&L {:.2}, {} trades, drawdown {:.2}",
                    metrics.daily_pnl, metrics.daily_trade_count, metrics.max_drawdown
                );
                self.phase = SessionPhase::AwaitingOpen;
                self.current_date = None;
            }
            SessionPhase::Trading => {
                self.current_date = Some(date);
                self.engine.trade_cycle(date);
            }
            SessionPhase::AwaitingOpen => {}
        }
    }

    fn shutdown(&mut self) {
        if self.phase == SessionPhase::Trading {
            if let Some(date) = self.current_date {
                info!("Cancellation received mid-session; liquidating");
                self.engine.end_session(date);
            }
            self.phase = SessionPhase::AwaitingOpen;
        }
        info!("Paper trading loop stopped");
    }

    pub fn engine(&self) -> &BacktestEngine<'a> {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Evaluation;
    use crate::models::{
        Candle, RiskMetrics, SignalReport, TradeAction, TrendAnalysis, TrendDirection,
    };
    use chrono::NaiveTime;
    use crossbeam_channel::unbounded;

    struct AlwaysBullish;

    impl Analyzer for AlwaysBullish {
        fn evaluate(&self, _symbol: &str, _history: &[Candle]) -> Option<Evaluation> {
            Some(Evaluation {
                signals: SignalReport {
                    strength: 0.5,
                    confidence: 0.8,
                    buy_tags: Vec::new(),
                    sell_tags: Vec::new(),
                },
                risk: RiskMetrics {
                    volatility: 0.2,
                    atr: 10.0,
                    max_loss: 0.0,
                },
                trend: TrendAnalysis {
                    direction: TrendDirection::Bullish,
                    strength: 0.4,
                    support: 0.0,
                    resistance: 0.0,
                },
            })
        }
    }

    fn fixture() -> (TradingConfig, MarketData) {
        let mut config = TradingConfig::default();
        config.universe = vec!["AAA".to_string()];
        config.entry.min_history_bars = 3;

        let candles: Vec<Candle> = (1..=5)
            .map(|day| Candle {
                symbol: "AAA".to_string(),
                date: NaiveDate::from_ymd_opt(2023, 6, day).unwrap(),
                open: 500.0,
                high: 502.0,
                low: 498.0,
                close: 500.0,
                volume: 2_000_000,
            })
            .collect();
        (config, MarketData::from_candles(candles).unwrap())
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, day)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
    }

    #[test]
    fn session_opens_trades_and_liquidates_at_close() {
        let (config, data) = fixture();
        let analyzer = AlwaysBullish;
        let mut trader = PaperTrader::new(&config, &data, &analyzer);

        // Pre-open tick does nothing.
        trader.on_tick(at(5, 8, 0));
        assert!(trader.engine().trades().is_empty());

        // First in-session tick opens the session and a position.
        trader.on_tick(at(5, 10, 0));
        assert_eq!(trader.engine().open_positions().len(), 1);

        // Further ticks keep monitoring without re-entering.
        trader.on_tick(at(5, 11, 0));
        assert_eq!(trader.engine().open_positions().len(), 1);

        // Past close: everything is force-closed.
        trader.on_tick(at(5, 16, 0));
        assert!(trader.engine().open_positions().is_empty());
        assert!(trader
            .engine()
            .trades()
            .iter()
            .any(|t| t.action == TradeAction::Sell));
    }

    #[test]
    fn cancellation_stops_the_loop_and_liquidates() {
        let (config, data) = fixture();
        let analyzer = AlwaysBullish;
        let mut trader = PaperTrader::new(&config, &data, &analyzer);

        trader.on_tick(at(5, 10, 0));
        assert_eq!(trader.engine().open_positions().len(), 1);

        let (cancel_tx, cancel_rx) = unbounded();
        cancel_tx.send(()).unwrap();
        // The cancel message is already queued, so run returns promptly.
        trader.run(cancel_rx);
        assert!(trader.engine().open_positions().is_empty());
    }
}
