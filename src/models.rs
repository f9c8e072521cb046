use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "LONG")]
    Long,
    #[serde(rename = "SHORT")]
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "Stop Loss")]
    StopLoss,
    #[serde(rename = "Take Profit")]
    TakeProfit,
    #[serde(rename = "Bearish Signal")]
    BearishSignal,
    #[serde(rename = "Bullish Signal")]
    BullishSignal,
    #[serde(rename = "End of Day")]
    EndOfDay,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::TakeProfit => "Take Profit",
            ExitReason::BearishSignal => "Bearish Signal",
            ExitReason::BullishSignal => "Bullish Signal",
            ExitReason::EndOfDay => "End of Day",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("position quantity must be positive (got {0})")]
    NonPositiveQuantity(i64),
    #[error("position entry price must be positive (got {0})")]
    NonPositivePrice(String),
}

/// One open lot per symbol. Created on a successful open, mutated on each
/// monitoring pass, destroyed on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: i64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub unrealized_pnl: f64,
}

impl Position {
    pub fn open(
        symbol: &str,
        direction: Direction,
        quantity: i64,
        entry_price: f64,
        entry_date: NaiveDate,
    ) -> Result<Self, PositionError> {
        if quantity <= 0 {
            return Err(PositionError::NonPositiveQuantity(quantity));
        }
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(PositionError::NonPositivePrice(format!("{}", entry_price)));
        }
        Ok(Self {
            symbol: symbol.to_string(),
            direction,
            quantity,
            entry_price,
            entry_date,
            stop_loss: None,
            take_profit: None,
            unrealized_pnl: 0.0,
        })
    }

    /// Marks the lot to the given price and returns the new unrealized P&L.
    pub fn mark_to_market(&mut self, price: f64) -> f64 {
        self.unrealized_pnl = match self.direction {
            Direction::Long => (price - self.entry_price) * self.quantity as f64,
            Direction::Short => (self.entry_price - price) * self.quantity as f64,
        };
        self.unrealized_pnl
    }

    pub fn realized_pnl_at(&self, exit_price: f64) -> f64 {
        match self.direction {
            Direction::Long => (exit_price - self.entry_price) * self.quantity as f64,
            Direction::Short => (self.entry_price - exit_price) * self.quantity as f64,
        }
    }
}

/// Immutable ledger entry. A Buy row is appended when a position opens, a
/// Sell row when it closes; Sell rows carry the realized P&L and the exit
/// reason. Rows are never mutated after being appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub symbol: String,
    pub action: TradeAction,
    pub direction: Direction,
    pub quantity: i64,
    pub price: f64,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExitReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    #[serde(rename = "bullish")]
    Bullish,
    #[serde(rename = "bearish")]
    Bearish,
    #[serde(rename = "neutral")]
    Neutral,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Bullish => "bullish",
            TrendDirection::Bearish => "bearish",
            TrendDirection::Neutral => "neutral",
        }
    }
}

/// Signal summary for one symbol: a signed strength in [-1, 1], a confidence
/// in [0, 1] and the human-readable rationale tags behind the vote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalReport {
    pub strength: f64,
    pub confidence: f64,
    pub buy_tags: Vec<String>,
    pub sell_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Annualized standard deviation of daily returns.
    pub volatility: f64,
    pub atr: f64,
    pub max_loss: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub strength: f64,
    pub support: f64,
    pub resistance: f64,
}

impl Default for TrendAnalysis {
    fn default() -> Self {
        Self {
            direction: TrendDirection::Neutral,
            strength: 0.0,
            support: 0.0,
            resistance: 0.0,
        }
    }
}

/// A scored trade opportunity, scoped to a single scan cycle. Regenerated
/// every trading day and never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub symbol: String,
    pub current_price: f64,
    pub signals: SignalReport,
    pub risk_metrics: RiskMetrics,
    pub trend: TrendAnalysis,
    pub volume: i64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, day).unwrap()
    }

    #[test]
    fn position_open_rejects_bad_inputs() {
        assert_eq!(
            Position::open("TCS.NS", Direction::Long, 0, 100.0, date(1)),
            Err(PositionError::NonPositiveQuantity(0))
        );
        assert!(matches!(
            Position::open("TCS.NS", Direction::Long, 5, -1.0, date(1)),
            Err(PositionError::NonPositivePrice(_))
        ));
        assert!(Position::open("TCS.NS", Direction::Short, 5, 100.0, date(1)).is_ok());
    }

    #[test]
    fn mark_to_market_is_direction_aware() {
        let mut long = Position::open("A", Direction::Long, 10, 100.0, date(1)).unwrap();
        assert_eq!(long.mark_to_market(105.0), 50.0);

        let mut short = Position::open("A", Direction::Short, 10, 100.0, date(1)).unwrap();
        assert_eq!(short.mark_to_market(105.0), -50.0);
        assert_eq!(short.realized_pnl_at(90.0), 100.0);
    }

    #[test]
    fn exit_reasons_serialize_with_report_labels() {
        let json = serde_json::to_string(&ExitReason::EndOfDay).unwrap();
        assert_eq!(json, "\"End of Day\"");
        let json = serde_json::to_string(&Direction::Short).unwrap();
        assert_eq!(json, "\"SHORT\"");
    }
}
