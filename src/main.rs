use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;
use intraday::analyzer::TechnicalAnalyzer;
use intraday::config::TradingConfig;
use intraday::engine::BacktestEngine;
use intraday::market_data::MarketData;
use intraday::paper::PaperTrader;
use log::info;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Parser)]
#[command(name = "intraday")]
#[command(about = "Intraday trading simulator: scan, backtest, paper trade")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a historical backtest over a date range
    Backtest {
        /// Directory of <SYMBOL>.csv files, or a snapshot file
        #[arg(long = "data-dir", value_name = "PATH")]
        data_dir: PathBuf,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Where the JSON report artifact is written
        #[arg(long = "output-dir", value_name = "PATH", default_value = "reports")]
        output_dir: PathBuf,
        /// Starting capital override
        #[arg(long)]
        capital: Option<f64>,
    },
    /// Rank trade candidates for one trading date
    Scan {
        #[arg(long = "data-dir", value_name = "PATH")]
        data_dir: PathBuf,
        /// Defaults to the last available trading date
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Export the CSV data directory as a binary snapshot
    Snapshot {
        #[arg(long = "data-dir", value_name = "PATH")]
        data_dir: PathBuf,
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Run the paper trading loop until cancelled (q or EOF on stdin)
    Paper {
        #[arg(long = "data-dir", value_name = "PATH")]
        data_dir: PathBuf,
        /// Seconds between trading cycles
        #[arg(long = "interval-secs")]
        interval_secs: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!("Starting intraday engine. Simulation only; not financial advice.");

    match cli.command {
        Commands::Backtest {
            data_dir,
            start,
            end,
            output_dir,
            capital,
        } => {
            let data = load_market_data(&data_dir)?;
            let mut config = config_for(&data);
            if let Some(capital) = capital {
                config.initial_capital = capital;
            }
            let analyzer = TechnicalAnalyzer::new(&config);
            let mut engine = BacktestEngine::new(&config, &data, &analyzer);
            let report = engine.run(start, end)?;
            let path = report.write_artifact(&output_dir)?;

            println!("Initial capital : {:>14.2}", report.summary.initial_capital);
            println!("Final value     : {:>14.2}", report.summary.final_value);
            println!("Total return    : {:>13.2}%", report.summary.total_return_pct);
            println!("Sharpe ratio    : {:>14.4}", report.summary.sharpe_ratio);
            println!("Max drawdown    : {:>13.2}%", report.summary.max_drawdown_pct);
            println!(
                "Closed trades   : {:>14} (win rate {:.1}%)",
                report.trade_statistics.total_trades,
                report.trade_statistics.win_rate * 100.0
            );
            println!("Report          : {}", path.display());
        }
        Commands::Scan { data_dir, date } => {
            let data = load_market_data(&data_dir)?;
            let config = config_for(&data);
            let date = match date {
                Some(date) => date,
                None => *data
                    .trading_dates()
                    .last()
                    .ok_or_else(|| anyhow!("no trading dates in the data set"))?,
            };
            let analyzer = TechnicalAnalyzer::new(&config);
            let engine = BacktestEngine::new(&config, &data, &analyzer);
            let candidates = engine.scan(date);

            if candidates.is_empty() {
                println!("No eligible candidates for {}", date);
            } else {
                println!("Candidates for {}:", date);
                for candidate in &candidates {
                    println!(
                        "  {:<14} score {:>6.3}  price {:>10.2}  strength {:>6.2}  trend {}",
                        candidate.symbol,
                        candidate.score,
                        candidate.current_price,
                        candidate.signals.strength,
                        candidate.trend.direction.as_str()
                    );
                }
            }
        }
        Commands::Snapshot { data_dir, output } => {
            let data = MarketData::load_csv_dir(&data_dir)?;
            data.save_snapshot(&output)?;
            println!(
                "Snapshot written to {} ({} candles)",
                output.display(),
                data.candle_count()
            );
        }
        Commands::Paper {
            data_dir,
            interval_secs,
        } => {
            let data = load_market_data(&data_dir)?;
            let mut config = config_for(&data);
            if let Some(secs) = interval_secs {
                config.session.tick_interval_secs = secs;
            }
            let analyzer = TechnicalAnalyzer::new(&config);
            let mut trader = PaperTrader::new(&config, &data, &analyzer);

            let (cancel_tx, cancel_rx) = bounded(1);
            thread::spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(text) if text.trim() == "q" => break,
                        Ok(_) => continue,
                        Err(_) => break,
                    }
                }
                let _ = cancel_tx.send(());
            });

            trader.run(cancel_rx);
        }
    }

    Ok(())
}

/// A snapshot file or a directory of CSVs, decided by what the path is.
fn load_market_data(path: &Path) -> Result<MarketData> {
    if path.is_file() {
        MarketData::load_snapshot(path)
    } else {
        MarketData::load_csv_dir(path)
    }
}

/// Default configuration scoped to the symbols the data set actually has.
fn config_for(data: &MarketData) -> TradingConfig {
    let mut config = TradingConfig::default();
    config.universe = data.symbols().to_vec();
    config
}
