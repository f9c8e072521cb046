use statrs::statistics::Statistics;

use crate::models::{EquityPoint, Trade, TradeAction};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics derived from the recorded equity curve and ledger.
#[derive(Debug, Clone)]
pub struct PerformanceSummary {
    pub final_value: f64,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_trade: f64,
    pub daily_returns: Vec<f64>,
}

pub fn summarize(
    equity_curve: &[EquityPoint],
    trades: &[Trade],
    initial_capital: f64,
) -> PerformanceSummary {
    let daily_returns = daily_returns(equity_curve);

    let final_value = equity_curve
        .last()
        .map(|point| point.equity)
        .unwrap_or(initial_capital);
    let total_return = if initial_capital > 0.0 {
        (final_value - initial_capital) / initial_capital
    } else {
        0.0
    };

    let sharpe_ratio = sharpe(&daily_returns);
    let max_drawdown = max_drawdown(equity_curve, initial_capital);

    let closed: Vec<&Trade> = trades
        .iter()
        .filter(|trade| trade.action == TradeAction::Sell && trade.pnl.is_some())
        .collect();
    let pnls: Vec<f64> = closed
        .iter()
        .filter_map(|trade| trade.pnl)
        .filter(|pnl| pnl.is_finite())
        .collect();

    let winners = pnls.iter().filter(|pnl| **pnl > 0.0).count();
    let win_rate = if closed.is_empty() {
        0.0
    } else {
        winners as f64 / closed.len() as f64
    };

    let total_profit: f64 = pnls.iter().filter(|pnl| **pnl > 0.0).sum();
    let total_loss: f64 = pnls.iter().filter(|pnl| **pnl < 0.0).sum::<f64>().abs();
    let profit_factor = if total_loss > 0.0 {
        total_profit / total_loss
    } else {
        0.0
    };

    let avg_trade = if pnls.is_empty() {
        0.0
    } else {
        pnls.iter().sum::<f64>() / pnls.len() as f64
    };

    PerformanceSummary {
        final_value,
        total_return,
        sharpe_ratio,
        max_drawdown,
        total_trades: closed.len(),
        win_rate,
        profit_factor,
        avg_trade,
        daily_returns,
    }
}

fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|pair| {
            let prev = pair[0].equity;
            let curr = pair[1].equity;
            if prev != 0.0 && prev.is_finite() {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualized mean-over-std of daily returns; 0 when the deviation is zero
/// or there is nothing to measure.
fn sharpe(daily_returns: &[f64]) -> f64 {
    if daily_returns.len() < 2 {
        return 0.0;
    }
    let mean = daily_returns.to_vec().mean();
    let std_dev = daily_returns.to_vec().std_dev();
    if !std_dev.is_finite() || std_dev == 0.0 {
        return 0.0;
    }
    mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Peak-to-trough maximum decline as a fraction of the peak, with the peak
/// seeded at initial capital.
fn max_drawdown(equity_curve: &[EquityPoint], initial_capital: f64) -> f64 {
    let mut peak = initial_capital;
    let mut worst = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - point.equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}
