use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::{EquityPoint, Trade};
use crate::performance::PerformanceSummary;

/// Headline numbers for one run. Field names are part of the artifact
/// schema consumed downstream; do not rename.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeStatistics {
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_trade: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    #[serde(skip_serializing)]
    pub run_id: String,
    pub summary: ReportSummary,
    pub trade_statistics: TradeStatistics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub daily_returns: Vec<f64>,
}

impl BacktestReport {
    pub fn build(
        initial_capital: f64,
        summary: PerformanceSummary,
        equity_curve: Vec<EquityPoint>,
        trades: Vec<Trade>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            summary: ReportSummary {
                initial_capital,
                final_value: summary.final_value,
                total_return: summary.total_return,
                total_return_pct: summary.total_return * 100.0,
                sharpe_ratio: summary.sharpe_ratio,
                max_drawdown: summary.max_drawdown,
                max_drawdown_pct: summary.max_drawdown * 100.0,
            },
            trade_statistics: TradeStatistics {
                total_trades: summary.total_trades,
                win_rate: summary.win_rate,
                profit_factor: summary.profit_factor,
                avg_trade: summary.avg_trade,
            },
            equity_curve,
            trades,
            daily_returns: summary.daily_returns,
        }
    }

    /// Serializes the report to a timestamped JSON artifact in `dir` and
    /// returns the path.
    pub fn write_artifact<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create report directory {}", dir.display()))?;

        let filename = format!(
            "backtest_report_{}.json",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(filename);
        let file = File::create(&path)
            .with_context(|| format!("unable to create report at {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .context("failed to serialize backtest report")?;

        info!("Backtest report saved: {} (run {})", path.display(), self.run_id);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_report() -> BacktestReport {
        BacktestReport::build(
            1_000_000.0,
            PerformanceSummary {
                final_value: 1_020_000.0,
                total_return: 0.02,
                sharpe_ratio: 1.5,
                max_drawdown: 0.04,
                total_trades: 3,
                win_rate: 2.0 / 3.0,
                profit_factor: 2.5,
                avg_trade: 500.0,
                daily_returns: vec![0.01, 0.01],
            },
            vec![EquityPoint {
                date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
                equity: 1_000_000.0,
            }],
            Vec::new(),
        )
    }

    #[test]
    fn schema_keys_are_stable() {
        let value = serde_json::to_value(sample_report()).unwrap();
        let summary = value.get("summary").unwrap();
        for key in [
            "initial_capital",
            "final_value",
            "total_return",
            "total_return_pct",
            "sharpe_ratio",
            "max_drawdown",
            "max_drawdown_pct",
        ] {
            assert!(summary.get(key).is_some(), "missing summary key {}", key);
        }
        let stats = value.get("trade_statistics").unwrap();
        for key in ["total_trades", "win_rate", "profit_factor", "avg_trade"] {
            assert!(stats.get(key).is_some(), "missing stats key {}", key);
        }
        assert!(value.get("equity_curve").is_some());
        assert!(value.get("trades").is_some());
        assert!(value.get("daily_returns").is_some());
        // Internal run id stays out of the artifact.
        assert!(value.get("run_id").is_none());
        assert_eq!(
            value["summary"]["total_return_pct"].as_f64().unwrap(),
            2.0
        );
    }

    #[test]
    fn artifact_lands_in_the_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_report().write_artifact(dir.path()).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("backtest_report_"));
        assert!(name.ends_with(".json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("summary").is_some());
    }
}
