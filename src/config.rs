use anyhow::{anyhow, Result};
use chrono::NaiveTime;

/// Risk limits enforced by the risk manager.
#[derive(Debug, Clone)]
pub struct RiskLimits {
    /// Absolute cap on the value of a single position.
    pub max_position_size: f64,
    /// Daily realized loss at which all further entries are rejected.
    pub max_daily_loss: f64,
    pub max_daily_trades: u32,
    /// Fraction of portfolio value risked per trade.
    pub max_portfolio_risk: f64,
    /// Projected total exposure cap as a fraction of portfolio value.
    pub max_exposure_ratio: f64,
    /// Single-position cap as a fraction of portfolio value.
    pub max_position_ratio: f64,
    /// Concurrent open positions allowed in one sector.
    pub max_sector_positions: usize,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: 100_000.0,
            max_daily_loss: 50_000.0,
            max_daily_trades: 10,
            max_portfolio_risk: 0.02,
            max_exposure_ratio: 0.8,
            max_position_ratio: 0.1,
            max_sector_positions: 3,
        }
    }
}

/// Entry eligibility and protective-level parameters.
#[derive(Debug, Clone)]
pub struct EntryRules {
    pub min_price: f64,
    pub min_volume: i64,
    pub min_signal_strength: f64,
    pub max_volatility: f64,
    /// New positions opened per day at most.
    pub max_entries_per_day: usize,
    /// Bars of history required before a symbol is scanned.
    pub min_history_bars: usize,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub stop_atr_multiplier: f64,
    pub take_atr_multiplier: f64,
}

impl Default for EntryRules {
    fn default() -> Self {
        Self {
            min_price: 100.0,
            min_volume: 1_000_000,
            min_signal_strength: 0.3,
            max_volatility: 0.5,
            max_entries_per_day: 5,
            min_history_bars: 20,
            stop_loss_pct: 2.0,
            take_profit_pct: 3.0,
            stop_atr_multiplier: 2.0,
            take_atr_multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub atr_period: usize,
    pub volume_sma_period: usize,
    /// Volume over its SMA by this ratio counts as a surge.
    pub volume_surge_ratio: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_std: 2.0,
            stochastic_k: 14,
            stochastic_d: 3,
            atr_period: 14,
            volume_sma_period: 20,
            volume_surge_ratio: 1.5,
        }
    }
}

/// Trading-session bounds for the live loop.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub tick_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).expect("valid session open"),
            close: NaiveTime::from_hms_opt(15, 30, 0).expect("valid session close"),
            tick_interval_secs: 60,
        }
    }
}

/// Immutable run configuration, passed by reference into each component.
#[derive(Debug, Clone)]
pub struct TradingConfig {
    pub initial_capital: f64,
    pub universe: Vec<String>,
    pub risk: RiskLimits,
    pub entry: EntryRules,
    pub indicators: IndicatorParams,
    pub session: SessionConfig,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000.0,
            universe: default_universe(),
            risk: RiskLimits::default(),
            entry: EntryRules::default(),
            indicators: IndicatorParams::default(),
            session: SessionConfig::default(),
        }
    }
}

impl TradingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(anyhow!(
                "initial_capital must be a positive number (value: {})",
                self.initial_capital
            ));
        }
        if self.universe.is_empty() {
            return Err(anyhow!("universe must contain at least one symbol"));
        }
        if !(self.risk.max_portfolio_risk > 0.0 && self.risk.max_portfolio_risk <= 1.0) {
            return Err(anyhow!(
                "max_portfolio_risk must be in (0, 1] (value: {})",
                self.risk.max_portfolio_risk
            ));
        }
        if !(self.risk.max_exposure_ratio > 0.0 && self.risk.max_exposure_ratio <= 1.0) {
            return Err(anyhow!(
                "max_exposure_ratio must be in (0, 1] (value: {})",
                self.risk.max_exposure_ratio
            ));
        }
        if self.entry.stop_loss_pct <= 0.0 || !self.entry.stop_loss_pct.is_finite() {
            return Err(anyhow!(
                "stop_loss_pct must be > 0 (value: {})",
                self.entry.stop_loss_pct
            ));
        }
        if self.risk.max_daily_trades == 0 {
            return Err(anyhow!("max_daily_trades must be >= 1"));
        }
        if self.entry.min_history_bars == 0 {
            return Err(anyhow!("min_history_bars must be >= 1"));
        }
        if self.session.close <= self.session.open {
            return Err(anyhow!(
                "session close {} must be after session open {}",
                self.session.close,
                self.session.open
            ));
        }
        Ok(())
    }
}

/// Nifty 50 plus a handful of high-volume names.
pub fn default_universe() -> Vec<String> {
    [
        "RELIANCE.NS",
        "TCS.NS",
        "HDFCBANK.NS",
        "INFY.NS",
        "ICICIBANK.NS",
        "HINDUNILVR.NS",
        "ITC.NS",
        "SBIN.NS",
        "BHARTIARTL.NS",
        "KOTAKBANK.NS",
        "AXISBANK.NS",
        "ASIANPAINT.NS",
        "MARUTI.NS",
        "HCLTECH.NS",
        "SUNPHARMA.NS",
        "TATAMOTORS.NS",
        "WIPRO.NS",
        "ULTRACEMCO.NS",
        "TITAN.NS",
        "BAJFINANCE.NS",
        "NESTLEIND.NS",
        "POWERGRID.NS",
        "BAJAJFINSV.NS",
        "NTPC.NS",
        "HINDALCO.NS",
        "JSWSTEEL.NS",
        "ONGC.NS",
        "TATACONSUM.NS",
        "BRITANNIA.NS",
        "COALINDIA.NS",
    ]
    .iter()
    .map(|symbol| symbol.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TradingConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_degenerate_limits() {
        let mut config = TradingConfig::default();
        config.risk.max_portfolio_risk = 0.0;
        assert!(config.validate().is_err());

        let mut config = TradingConfig::default();
        config.initial_capital = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = TradingConfig::default();
        config.entry.stop_loss_pct = -1.0;
        assert!(config.validate().is_err());
    }
}
