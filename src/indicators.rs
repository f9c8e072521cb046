use crate::config::IndicatorParams;
use crate::models::Candle;

/// Simple moving average aligned to the input length. The warmup region is
/// filled with the running mean of the bars seen so far.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return values.to_vec();
    }

    let mut out = Vec::with_capacity(values.len());
    let mut window_sum = 0.0;
    for (i, &value) in values.iter().enumerate() {
        window_sum += value;
        if i >= period {
            window_sum -= values[i - period];
            out.push(window_sum / period as f64);
        } else {
            out.push(window_sum / (i + 1) as f64);
        }
    }
    out
}

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    out.push(values[0]);
    for i in 1..values.len() {
        out.push(alpha * values[i] + (1.0 - alpha) * out[i - 1]);
    }
    out
}

/// MACD line, signal line and histogram.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| l - s)
        .collect();
    (line, signal_line, histogram)
}

/// Wilder-smoothed RSI. Values before the warmup window read as neutral 50.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    if period == 0 || values.len() <= period {
        return vec![50.0; values.len()];
    }

    let mut out = vec![50.0; values.len()];
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = values[i] - values[i - 1];
        if delta >= 0.0 {
            avg_gain += delta;
        } else {
            avg_loss -= delta;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..values.len() {
        let delta = values[i] - values[i - 1];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Bollinger bands (upper, middle, lower), aligned to the input length.
pub fn bollinger(values: &[f64], period: usize, std_mult: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let middle = sma(values, period);
    let mut upper = Vec::with_capacity(values.len());
    let mut lower = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        let window_start = (i + 1).saturating_sub(period);
        let window = &values[window_start..=i];
        let mean = middle[i];
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
        let deviation = variance.sqrt();
        upper.push(mean + std_mult * deviation);
        lower.push(mean - std_mult * deviation);
    }
    (upper, middle, lower)
}

/// Stochastic oscillator %K and %D.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> (Vec<f64>, Vec<f64>) {
    if closes.is_empty() || k_period == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut k_values = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        let window_start = (i + 1).saturating_sub(k_period);
        let high = highs[window_start..=i]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let low = lows[window_start..=i]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let range = high - low;
        if range > 0.0 {
            k_values.push((closes[i] - low) / range * 100.0);
        } else {
            k_values.push(50.0);
        }
    }
    let d_values = sma(&k_values, d_period);
    (k_values, d_values)
}

/// Average true range over a simple window mean of the true range.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    if closes.is_empty() || period == 0 {
        return vec![0.0; closes.len()];
    }

    let mut true_ranges = Vec::with_capacity(closes.len());
    true_ranges.push(highs[0] - lows[0]);
    for i in 1..closes.len() {
        let tr = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());
        true_ranges.push(tr);
    }
    sma(&true_ranges, period)
}

/// Latest-value snapshot of every indicator the signal generator consumes.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub atr: f64,
    pub ema_9: f64,
    pub ema_21: f64,
    pub ema_50: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    pub volume_sma: f64,
}

impl IndicatorSet {
    /// Returns `None` when the history is too short for a meaningful read.
    pub fn compute(history: &[Candle], params: &IndicatorParams, min_bars: usize) -> Option<Self> {
        if history.is_empty() || history.len() < min_bars {
            return None;
        }

        let closes: Vec<f64> = history.iter().map(|c| c.close).collect();
        let highs: Vec<f64> = history.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = history.iter().map(|c| c.low).collect();
        let volumes: Vec<f64> = history.iter().map(|c| c.volume as f64).collect();
        let last = closes.len() - 1;

        let rsi_series = rsi(&closes, params.rsi_period);
        let (macd_line, macd_signal, macd_histogram) = macd(
            &closes,
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        );
        let (bb_upper, bb_middle, bb_lower) =
            bollinger(&closes, params.bollinger_period, params.bollinger_std);
        let (stoch_k, stoch_d) = stochastic(
            &highs,
            &lows,
            &closes,
            params.stochastic_k,
            params.stochastic_d,
        );
        let atr_series = atr(&highs, &lows, &closes, params.atr_period);
        let volume_sma = sma(&volumes, params.volume_sma_period);

        Some(Self {
            rsi: rsi_series[last],
            macd: macd_line[last],
            macd_signal: macd_signal[last],
            macd_histogram: macd_histogram[last],
            bb_upper: bb_upper[last],
            bb_middle: bb_middle[last],
            bb_lower: bb_lower[last],
            stoch_k: stoch_k[last],
            stoch_d: stoch_d[last],
            atr: atr_series[last],
            ema_9: ema(&closes, 9)[last],
            ema_21: ema(&closes, 21)[last],
            ema_50: ema(&closes, 50)[last],
            sma_20: sma(&closes, 20)[last],
            sma_50: sma(&closes, 50)[last],
            volume_sma: volume_sma[last],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn flat_candles(count: usize, close: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle {
                symbol: "T".to_string(),
                date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000,
            })
            .collect()
    }

    #[test]
    fn sma_converges_on_window_mean() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = sma(&values, 3);
        assert_eq!(out.len(), values.len());
        assert_relative_eq!(out[5], 5.0);
        // Warmup region holds the partial-window mean.
        assert_relative_eq!(out[1], 1.5);
    }

    #[test]
    fn rsi_is_neutral_for_flat_prices_and_saturated_for_rallies() {
        let flat = vec![100.0; 30];
        assert_relative_eq!(rsi(&flat, 14)[29], 50.0);

        let rally: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_relative_eq!(rsi(&rally, 14)[29], 100.0);

        let slide: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert_relative_eq!(rsi(&slide, 14)[29], 0.0);
    }

    #[test]
    fn bollinger_bands_are_symmetric_around_middle() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + (i % 5) as f64).collect();
        let (upper, middle, lower) = bollinger(&values, 20, 2.0);
        let last = values.len() - 1;
        assert_relative_eq!(upper[last] - middle[last], middle[last] - lower[last]);
        assert!(upper[last] > lower[last]);
    }

    #[test]
    fn atr_tracks_bar_range_for_gapless_series() {
        let highs = vec![102.0; 20];
        let lows = vec![98.0; 20];
        let closes = vec![100.0; 20];
        let out = atr(&highs, &lows, &closes, 14);
        assert_relative_eq!(out[19], 4.0);
    }

    #[test]
    fn indicator_set_requires_minimum_history() {
        let params = IndicatorParams::default();
        assert!(IndicatorSet::compute(&flat_candles(10, 100.0), &params, 20).is_none());
        let set = IndicatorSet::compute(&flat_candles(40, 100.0), &params, 20).unwrap();
        assert_relative_eq!(set.sma_20, 100.0);
        assert_relative_eq!(set.atr, 2.0);
    }

    #[test]
    fn stochastic_is_bounded() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64).sin() * 5.0).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let (k, d) = stochastic(&highs, &lows, &closes, 14, 3);
        for value in k.iter().chain(d.iter()) {
            assert!((0.0..=100.0).contains(value));
        }
    }
}
