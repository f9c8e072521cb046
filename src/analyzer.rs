use statrs::statistics::Statistics;

use crate::config::TradingConfig;
use crate::indicators::IndicatorSet;
use crate::models::{Candle, RiskMetrics, SignalReport, TrendAnalysis, TrendDirection};

/// Everything the engine needs to know about one symbol on one day.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub signals: SignalReport,
    pub risk: RiskMetrics,
    pub trend: TrendAnalysis,
}

/// Seam between the engine and signal generation. The backtest and the paper
/// loop consume this trait; tests substitute scripted implementations.
pub trait Analyzer: Sync {
    /// Evaluates a symbol against its history up to and including the
    /// current bar. `None` means the history is too short to judge.
    fn evaluate(&self, symbol: &str, history: &[Candle]) -> Option<Evaluation>;
}

pub struct TechnicalAnalyzer {
    params: crate::config::IndicatorParams,
    min_history_bars: usize,
    annualization: f64,
}

impl TechnicalAnalyzer {
    pub fn new(config: &TradingConfig) -> Self {
        Self {
            params: config.indicators.clone(),
            min_history_bars: config.entry.min_history_bars,
            annualization: 252.0_f64.sqrt(),
        }
    }

    /// Signal vote over the indicator snapshot. Each indicator that has an
    /// opinion contributes +-1 (volume surge +-0.5); strength is the vote sum
    /// over the voter count.
    pub fn signals_from(&self, set: &IndicatorSet, last: &Candle) -> SignalReport {
        let mut report = SignalReport::default();
        let mut votes = 0.0_f64;
        let mut voters = 0usize;

        if set.rsi.is_finite() {
            if set.rsi < self.params.rsi_oversold {
                report.buy_tags.push(format!("RSI oversold: {:.2}", set.rsi));
                votes += 1.0;
            } else if set.rsi > self.params.rsi_overbought {
                report
                    .sell_tags
                    .push(format!("RSI overbought: {:.2}", set.rsi));
                votes -= 1.0;
            }
            voters += 1;
        }

        if set.macd.is_finite() && set.macd_signal.is_finite() {
            if set.macd > set.macd_signal {
                report.buy_tags.push("MACD bullish crossover".to_string());
                votes += 1.0;
            } else if set.macd < set.macd_signal {
                report.sell_tags.push("MACD bearish crossover".to_string());
                votes -= 1.0;
            }
            voters += 1;
        }

        if set.bb_upper.is_finite() && set.bb_lower.is_finite() {
            if last.close <= set.bb_lower {
                report
                    .buy_tags
                    .push("Price at Bollinger lower band".to_string());
                votes += 1.0;
            } else if last.close >= set.bb_upper {
                report
                    .sell_tags
                    .push("Price at Bollinger upper band".to_string());
                votes -= 1.0;
            }
            voters += 1;
        }

        if set.ema_9.is_finite() && set.ema_21.is_finite() {
            if set.ema_9 > set.ema_21 {
                report.buy_tags.push("EMA 9 > EMA 21 (bullish)".to_string());
                votes += 1.0;
            } else {
                report.sell_tags.push("EMA 9 < EMA 21 (bearish)".to_string());
                votes -= 1.0;
            }
            voters += 1;
        }

        if set.stoch_k.is_finite() && set.stoch_d.is_finite() {
            if set.stoch_k < 20.0 && set.stoch_d < 20.0 {
                report.buy_tags.push("Stochastic oversold".to_string());
                votes += 1.0;
            } else if set.stoch_k > 80.0 && set.stoch_d > 80.0 {
                report.sell_tags.push("Stochastic overbought".to_string());
                votes -= 1.0;
            }
            voters += 1;
        }

        // Volume only amplifies an existing directional vote.
        if set.volume_sma.is_finite()
            && last.volume as f64 > set.volume_sma * self.params.volume_surge_ratio
        {
            if votes > 0.0 {
                report.buy_tags.push("High volume confirmation".to_string());
                votes += 0.5;
            } else if votes < 0.0 {
                report
                    .sell_tags
                    .push("High volume confirmation".to_string());
                votes -= 0.5;
            }
            voters += 1;
        }

        if voters > 0 {
            report.strength = votes / voters as f64;
            report.confidence = (votes.abs() / voters as f64).min(1.0);
        }
        report
    }

    pub fn risk_metrics_from(&self, set: &IndicatorSet, history: &[Candle]) -> RiskMetrics {
        let mut metrics = RiskMetrics::default();

        let returns: Vec<f64> = history
            .windows(2)
            .filter(|pair| pair[0].close > 0.0)
            .map(|pair| (pair[1].close - pair[0].close) / pair[0].close)
            .collect();
        if returns.len() > 1 {
            let std_dev = returns.std_dev();
            if std_dev.is_finite() {
                metrics.volatility = std_dev * self.annualization;
            }
        }

        if set.atr.is_finite() && set.atr > 0.0 {
            metrics.atr = set.atr;
            if let Some(last) = history.last() {
                metrics.max_loss = last.close - 2.0 * set.atr;
            }
        }
        metrics
    }

    pub fn trend_from(&self, set: &IndicatorSet, last: &Candle) -> TrendAnalysis {
        let mut analysis = TrendAnalysis::default();
        let mut votes = 0.0_f64;
        let mut voters = 0usize;

        if set.ema_9.is_finite() && set.ema_21.is_finite() && set.ema_50.is_finite() {
            if set.ema_9 > set.ema_21 && set.ema_21 > set.ema_50 {
                votes += 1.0;
            } else if set.ema_9 < set.ema_21 && set.ema_21 < set.ema_50 {
                votes -= 1.0;
            }
            voters += 1;
        }

        if set.sma_20.is_finite() && set.sma_50.is_finite() {
            if last.close > set.sma_20 && set.sma_20 > set.sma_50 {
                votes += 1.0;
            } else if last.close < set.sma_20 && set.sma_20 < set.sma_50 {
                votes -= 1.0;
            }
            voters += 1;
        }

        if set.macd.is_finite() {
            if set.macd > 0.0 {
                votes += 1.0;
            } else {
                votes -= 1.0;
            }
            voters += 1;
        }

        if voters > 0 {
            let trend_strength = votes / voters as f64;
            if trend_strength > 0.3 {
                analysis.direction = TrendDirection::Bullish;
                analysis.strength = trend_strength;
            } else if trend_strength < -0.3 {
                analysis.direction = TrendDirection::Bearish;
                analysis.strength = trend_strength.abs();
            } else {
                analysis.direction = TrendDirection::Neutral;
                analysis.strength = trend_strength.abs();
            }
        }

        if set.bb_lower.is_finite() {
            analysis.support = set.bb_lower;
        }
        if set.bb_upper.is_finite() {
            analysis.resistance = set.bb_upper;
        }
        analysis
    }
}

impl Analyzer for TechnicalAnalyzer {
    fn evaluate(&self, _symbol: &str, history: &[Candle]) -> Option<Evaluation> {
        let set = IndicatorSet::compute(history, &self.params, self.min_history_bars)?;
        let last = history.last()?;
        Some(Evaluation {
            signals: self.signals_from(&set, last),
            risk: self.risk_metrics_from(&set, history),
            trend: self.trend_from(&set, last),
        })
    }
}
