use chrono::NaiveDate;
use log::warn;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::RiskLimits;
use crate::models::{Direction, TradeAction};

/// Why a proposed trade was refused. This is an expected outcome, not an
/// error; the first failing check wins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("daily loss limit exceeded (daily P&L {daily_pnl:.2}, limit {limit:.2})")]
    DailyLossLimit { daily_pnl: f64, limit: f64 },
    #[error("daily trade limit exceeded ({count} of {limit})")]
    DailyTradeLimit { count: u32, limit: u32 },
    #[error("trade would exceed maximum portfolio exposure ({projected:.2} > {cap:.2})")]
    ExposureLimit { projected: f64, cap: f64 },
    #[error("too many concurrent positions in sector {sector} ({count})")]
    SectorConcentration { sector: String, count: usize },
    #[error("position value {value:.2} exceeds the absolute cap {cap:.2}")]
    PositionValueCap { value: f64, cap: f64 },
    #[error("position value {value:.2} is too large relative to the portfolio (cap {cap:.2})")]
    PositionShare { value: f64, cap: f64 },
    #[error("trade has degenerate quantity or price")]
    DegenerateInput,
}

/// Lot view the risk manager keeps per symbol: volume-weighted entry,
/// current value and protective thresholds.
#[derive(Debug, Clone)]
pub struct TrackedLot {
    pub direction: Direction,
    pub quantity: i64,
    pub avg_price: f64,
    pub value: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub entry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioMetrics {
    pub total_value: f64,
    pub total_pnl: f64,
    pub portfolio_volatility: f64,
    pub var_95: f64,
    pub max_drawdown: f64,
    pub daily_pnl: f64,
    pub daily_trade_count: u32,
    pub position_count: usize,
}

/// Portfolio-level risk state: the sole arbiter of trade admissibility.
/// Owns its own lot view and the daily counters; it never touches the
/// engine's equity curve.
pub struct RiskManager {
    limits: RiskLimits,
    portfolio_value: f64,
    lots: HashMap<String, TrackedLot>,
    daily_pnl: f64,
    daily_trade_count: u32,
    realized_pnl: f64,
    max_drawdown: f64,
}

impl RiskManager {
    pub fn new(limits: RiskLimits, portfolio_value: f64) -> Self {
        Self {
            limits,
            portfolio_value,
            lots: HashMap::new(),
            daily_pnl: 0.0,
            daily_trade_count: 0,
            realized_pnl: 0.0,
            max_drawdown: 0.0,
        }
    }

    /// Risk-based share count: risk budget over per-share stop distance,
    /// clamped by the absolute position cap. Zero on degenerate input,
    /// never panics.
    pub fn position_size(&self, price: f64, risk_fraction: f64, stop_loss_pct: f64) -> i64 {
        if !price.is_finite() || price <= 0.0 {
            warn!("position_size called with unusable price {}", price);
            return 0;
        }
        if !risk_fraction.is_finite() || risk_fraction <= 0.0 {
            return 0;
        }
        if !stop_loss_pct.is_finite() || stop_loss_pct <= 0.0 {
            warn!(
                "position_size called with unusable stop loss pct {}",
                stop_loss_pct
            );
            return 0;
        }

        let risk_amount = self.portfolio_value * risk_fraction;
        let per_share_risk = price * stop_loss_pct / 100.0;
        if per_share_risk <= 0.0 || !per_share_risk.is_finite() {
            return 0;
        }

        let raw_quantity = risk_amount / per_share_risk;
        let max_shares = self.limits.max_position_size / price;
        let clamped = raw_quantity.min(max_shares);
        if !clamped.is_finite() || clamped <= 0.0 {
            return 0;
        }
        clamped.floor() as i64
    }

    /// Both daily gates: loss limit intact and trade count under the cap.
    pub fn can_trade(&self) -> bool {
        if self.daily_pnl < -self.limits.max_daily_loss {
            warn!("daily loss limit exceeded: {:.2}", self.daily_pnl);
            return false;
        }
        if self.daily_trade_count >= self.limits.max_daily_trades {
            warn!("daily trade limit exceeded: {}", self.daily_trade_count);
            return false;
        }
        true
    }

    /// Ordered admissibility checks, short-circuiting on the first failure.
    pub fn validate_trade(
        &self,
        _symbol: &str,
        quantity: i64,
        price: f64,
    ) -> Result<(), RejectReason> {
        if self.daily_pnl < -self.limits.max_daily_loss {
            return Err(RejectReason::DailyLossLimit {
                daily_pnl: self.daily_pnl,
                limit: self.limits.max_daily_loss,
            });
        }
        if self.daily_trade_count >= self.limits.max_daily_trades {
            return Err(RejectReason::DailyTradeLimit {
                count: self.daily_trade_count,
                limit: self.limits.max_daily_trades,
            });
        }

        let value = quantity as f64 * price;
        if quantity <= 0 || !value.is_finite() {
            return Err(RejectReason::DegenerateInput);
        }

        let exposure: f64 = self.lots.values().map(|lot| lot.value).sum();
        let projected = exposure + value;
        let exposure_cap = self.portfolio_value * self.limits.max_exposure_ratio;
        if projected > exposure_cap {
            return Err(RejectReason::ExposureLimit {
                projected,
                cap: exposure_cap,
            });
        }

        // Sector concentration stands in for a real correlation check: count
        // the open lots per sector and refuse once any sector is over the
        // cap. The incoming symbol's own sector is deliberately not counted.
        if self.lots.len() >= 2 {
            let mut per_sector: HashMap<&'static str, usize> = HashMap::new();
            for open_symbol in self.lots.keys() {
                *per_sector.entry(sector_for(open_symbol)).or_insert(0) += 1;
            }
            for (sector, count) in per_sector {
                if count > self.limits.max_sector_positions {
                    return Err(RejectReason::SectorConcentration {
                        sector: sector.to_string(),
                        count,
                    });
                }
            }
        }

        if value > self.limits.max_position_size {
            return Err(RejectReason::PositionValueCap {
                value,
                cap: self.limits.max_position_size,
            });
        }
        let share_cap = self.portfolio_value * self.limits.max_position_ratio;
        if value > share_cap {
            return Err(RejectReason::PositionShare {
                value,
                cap: share_cap,
            });
        }
        Ok(())
    }

    /// Records a fill against the lot view. Buy opens or extends a lot at a
    /// volume-weighted average price; Sell realizes P&L against the average,
    /// decrements and deletes the lot once flat. Every fill counts against
    /// the daily trade cap.
    pub fn record_fill(
        &mut self,
        symbol: &str,
        action: TradeAction,
        direction: Direction,
        quantity: i64,
        price: f64,
        date: NaiveDate,
    ) {
        if quantity <= 0 || !price.is_finite() || price <= 0.0 {
            warn!(
                "ignoring degenerate fill for {}: qty {} at {}",
                symbol, quantity, price
            );
            self.daily_trade_count += 1;
            return;
        }

        match action {
            TradeAction::Buy => {
                let lot = self.lots.entry(symbol.to_string()).or_insert(TrackedLot {
                    direction,
                    quantity: 0,
                    avg_price: 0.0,
                    value: 0.0,
                    stop_loss: None,
                    take_profit: None,
                    entry_date: None,
                });
                let total_cost = lot.quantity as f64 * lot.avg_price + quantity as f64 * price;
                lot.quantity += quantity;
                lot.avg_price = total_cost / lot.quantity as f64;
                lot.value = lot.quantity as f64 * price;
                lot.entry_date = Some(date);
            }
            TradeAction::Sell => {
                if let Some(lot) = self.lots.get_mut(symbol) {
                    let closed = quantity.min(lot.quantity);
                    let pnl = match lot.direction {
                        Direction::Long => (price - lot.avg_price) * closed as f64,
                        Direction::Short => (lot.avg_price - price) * closed as f64,
                    };
                    self.daily_pnl += pnl;
                    self.realized_pnl += pnl;
                    lot.quantity -= closed;
                    lot.value = lot.quantity as f64 * price;
                    if lot.quantity == 0 {
                        self.lots.remove(symbol);
                    }
                }
            }
        }
        self.daily_trade_count += 1;
    }

    pub fn set_protective_levels(
        &mut self,
        symbol: &str,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) {
        if let Some(lot) = self.lots.get_mut(symbol) {
            lot.stop_loss = stop_loss;
            lot.take_profit = take_profit;
        }
    }

    /// Threshold trigger; false when there is no lot or no stop set.
    pub fn check_stop_loss(&self, symbol: &str, price: f64) -> bool {
        let Some(lot) = self.lots.get(symbol) else {
            return false;
        };
        let Some(stop) = lot.stop_loss else {
            return false;
        };
        if !price.is_finite() {
            return false;
        }
        match lot.direction {
            Direction::Long => price <= stop,
            Direction::Short => price >= stop,
        }
    }

    pub fn check_take_profit(&self, symbol: &str, price: f64) -> bool {
        let Some(lot) = self.lots.get(symbol) else {
            return false;
        };
        let Some(target) = lot.take_profit else {
            return false;
        };
        if !price.is_finite() {
            return false;
        }
        match lot.direction {
            Direction::Long => price >= target,
            Direction::Short => price <= target,
        }
    }

    /// Called once at the start of every simulated session.
    pub fn reset_daily_metrics(&mut self) {
        self.daily_pnl = 0.0;
        self.daily_trade_count = 0;
    }

    /// Portfolio risk snapshot. The running max drawdown only tightens: it
    /// moves when cumulative P&L is more negative than the stored value and
    /// never resets within a run.
    pub fn portfolio_metrics(&mut self) -> PortfolioMetrics {
        let total_value: f64 = self.lots.values().map(|lot| lot.value).sum();

        let portfolio_volatility = if !self.lots.is_empty() && total_value > 0.0 {
            let weights: Vec<f64> = self
                .lots
                .values()
                .map(|lot| lot.value / total_value)
                .collect();
            // Assumes 20% individual volatility, weighted by dispersion.
            let spread = weights.population_std_dev();
            if spread.is_finite() {
                spread * 0.2
            } else {
                0.0
            }
        } else {
            0.0
        };

        let var_95 = total_value * portfolio_volatility * 1.645;

        if self.realized_pnl < self.max_drawdown {
            self.max_drawdown = self.realized_pnl;
        }

        PortfolioMetrics {
            total_value,
            total_pnl: self.realized_pnl,
            portfolio_volatility,
            var_95,
            max_drawdown: self.max_drawdown,
            daily_pnl: self.daily_pnl,
            daily_trade_count: self.daily_trade_count,
            position_count: self.lots.len(),
        }
    }

    pub fn daily_pnl(&self) -> f64 {
        self.daily_pnl
    }

    pub fn daily_trade_count(&self) -> u32 {
        self.daily_trade_count
    }

    pub fn lot(&self, symbol: &str) -> Option<&TrackedLot> {
        self.lots.get(symbol)
    }
}

/// Static symbol-to-sector table for the shipped NSE universe. Unknown
/// symbols land in OTHERS.
pub fn sector_for(symbol: &str) -> &'static str {
    match symbol {
        "RELIANCE.NS" => "ENERGY",
        "TCS.NS" | "INFY.NS" | "HCLTECH.NS" | "WIPRO.NS" | "TECHM.NS" => "IT",
        "HDFCBANK.NS" | "ICICIBANK.NS" | "SBIN.NS" | "KOTAKBANK.NS" | "AXISBANK.NS"
        | "INDUSINDBK.NS" => "BANKING",
        "HINDUNILVR.NS" | "ITC.NS" | "NESTLEIND.NS" | "BRITANNIA.NS" | "TATACONSUM.NS" => "FMCG",
        "BHARTIARTL.NS" => "TELECOM",
        "ASIANPAINT.NS" | "TITAN.NS" => "CONSUMER",
        "MARUTI.NS" | "TATAMOTORS.NS" | "EICHERMOT.NS" | "HEROMOTOCO.NS" | "M&M.NS" => "AUTO",
        "SUNPHARMA.NS" | "CIPLA.NS" | "DIVISLAB.NS" | "DRREDDY.NS" => "PHARMA",
        "ULTRACEMCO.NS" | "SHREECEM.NS" | "GRASIM.NS" => "CEMENT",
        "BAJFINANCE.NS" | "BAJAJFINSV.NS" | "SBILIFE.NS" | "HDFCLIFE.NS" => "FINANCE",
        "POWERGRID.NS" | "NTPC.NS" | "ONGC.NS" | "COALINDIA.NS" | "BPCL.NS" => "ENERGY",
        "HINDALCO.NS" | "JSWSTEEL.NS" | "TATASTEEL.NS" => "METALS",
        _ => "OTHERS",
    }
}
