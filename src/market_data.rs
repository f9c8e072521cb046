use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::models::Candle;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct MarketDataSnapshot {
    version: u32,
    generated_at: DateTime<Utc>,
    candles: Vec<Candle>,
}

/// In-memory OHLCV store. Lookups never fail across this boundary: an
/// unknown symbol or an empty window yields an empty slice.
pub struct MarketData {
    by_symbol: HashMap<String, Vec<Candle>>,
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
}

impl MarketData {
    pub fn from_candles(candles: Vec<Candle>) -> Result<Self> {
        if candles.is_empty() {
            return Err(anyhow!("no candle data available"));
        }

        let mut by_symbol: HashMap<String, Vec<Candle>> = HashMap::new();
        let mut date_set = BTreeSet::new();
        for candle in candles {
            date_set.insert(candle.date);
            by_symbol
                .entry(candle.symbol.clone())
                .or_default()
                .push(candle);
        }
        for series in by_symbol.values_mut() {
            series.sort_by_key(|c| c.date);
        }

        let mut symbols: Vec<String> = by_symbol.keys().cloned().collect();
        symbols.sort();
        let dates: Vec<NaiveDate> = date_set.into_iter().collect();

        info!(
            "Loaded market data: {} symbols across {} trading dates",
            symbols.len(),
            dates.len()
        );

        Ok(Self {
            by_symbol,
            symbols,
            dates,
        })
    }

    /// Loads one `<SYMBOL>.csv` per instrument from a directory. Rows are
    /// `date,open,high,low,close,volume` with an ISO date.
    pub fn load_csv_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("failed to read data directory {}", dir.display()))?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let is_csv = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false);
                is_csv.then_some(path)
            })
            .collect();
        paths.sort();

        #[derive(Deserialize)]
        struct Row {
            date: NaiveDate,
            open: f64,
            high: f64,
            low: f64,
            close: f64,
            volume: i64,
        }

        let mut candles = Vec::new();
        for path in paths {
            let symbol = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| stem.trim().to_uppercase())
                .filter(|stem| !stem.is_empty())
                .ok_or_else(|| anyhow!("unusable file name {}", path.display()))?;

            let mut reader = csv::Reader::from_path(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            for row in reader.deserialize() {
                let row: Row =
                    row.with_context(|| format!("malformed row in {}", path.display()))?;
                candles.push(Candle {
                    symbol: symbol.clone(),
                    date: row.date,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume,
                });
            }
        }

        Self::from_candles(candles)
    }

    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open market data snapshot {}", path.display()))?;
        let snapshot: MarketDataSnapshot =
            bincode::deserialize_from(BufReader::new(file)).context("snapshot decode failed")?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(anyhow!(
                "market data snapshot version mismatch (found {}, expected {})",
                snapshot.version,
                SNAPSHOT_VERSION
            ));
        }
        Self::from_candles(snapshot.candles)
    }

    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create snapshot directory {}", parent.display())
                })?;
            }
        }

        let snapshot = MarketDataSnapshot {
            version: SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            candles: self
                .symbols
                .iter()
                .flat_map(|symbol| self.by_symbol[symbol].iter().cloned())
                .collect(),
        };
        let file = File::create(path)
            .with_context(|| format!("unable to create snapshot at {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &snapshot).context("snapshot encode failed")?;
        writer.flush().context("failed to flush snapshot")?;
        Ok(())
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn trading_dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Trading dates inside the inclusive window, in order.
    pub fn trading_dates_between(&self, start: NaiveDate, end: NaiveDate) -> &[NaiveDate] {
        let from = self.dates.partition_point(|d| *d < start);
        let to = self.dates.partition_point(|d| *d <= end);
        &self.dates[from..to]
    }

    /// Bars for a symbol up to and including the date. Empty when the symbol
    /// is unknown or has no data in range.
    pub fn history_up_to(&self, symbol: &str, date: NaiveDate) -> &[Candle] {
        match self.by_symbol.get(symbol) {
            Some(series) => {
                let end = series.partition_point(|c| c.date <= date);
                &series[..end]
            }
            None => &[],
        }
    }

    pub fn candle_on(&self, symbol: &str, date: NaiveDate) -> Option<&Candle> {
        let series = self.by_symbol.get(symbol)?;
        series
            .binary_search_by_key(&date, |c| c.date)
            .ok()
            .map(|idx| &series[idx])
    }

    pub fn candle_count(&self) -> usize {
        self.by_symbol.values().map(|series| series.len()).sum()
    }
}
