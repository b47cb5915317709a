//! Classic indicators used by the pressure-cooker technical gates

use crate::data::Candle;

/// MACD line, signal line and histogram at the latest bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    /// MACD crossed above its signal line on the latest bar
    pub bullish_cross: bool,
}

/// Bollinger band values at the latest bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Where a consolidation sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    /// Range still wide, no edge
    Early,
    /// Range contracting
    Forming,
    /// Tight range near support
    Ready,
    /// Price pushing through the top of the range
    Breaking,
}

fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &v in &values[1..] {
        prev = v * k + prev * (1.0 - k);
        out.push(prev);
    }
    out
}

/// Wilder's RSI over `period` bars; None when the series is too short
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period + 1 || period == 0 {
        return None;
    }
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss -= delta;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    for i in period + 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD(12, 26, 9) at the latest bar
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Option<Macd> {
    if closes.len() < slow + signal_period {
        return None;
    }
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal_period);

    let last = macd_line.len() - 1;
    let macd_now = macd_line[last];
    let signal_now = signal_line[last];
    let bullish_cross = last >= 1
        && macd_line[last - 1] <= signal_line[last - 1]
        && macd_now > signal_now;

    Some(Macd {
        macd: macd_now,
        signal: signal_now,
        histogram: macd_now - signal_now,
        bullish_cross,
    })
}

/// Bollinger bands over `period` bars with `k` standard deviations
pub fn bollinger_bands(closes: &[f64], period: usize, k: f64) -> Option<BollingerBands> {
    if closes.len() < period || period == 0 {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    let sd = var.sqrt();
    Some(BollingerBands {
        upper: mean + k * sd,
        middle: mean,
        lower: mean - k * sd,
    })
}

/// Average True Range over `period` bars
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period + 1 || period == 0 {
        return None;
    }
    let mut trs = Vec::with_capacity(candles.len() - 1);
    for w in candles.windows(2) {
        let prev_close = w[0].close;
        let c = &w[1];
        let tr = (c.high - c.low)
            .max((c.high - prev_close).abs())
            .max((c.low - prev_close).abs());
        trs.push(tr);
    }
    let window = &trs[trs.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Recent ATR over longer-term ATR; below 1 means the range is contracting
pub fn consolidation_ratio(candles: &[Candle], short: usize, long: usize) -> Option<f64> {
    let short_atr = atr(candles, short)?;
    let long_atr = atr(candles, long)?;
    if long_atr <= 0.0 {
        return None;
    }
    Some(short_atr / long_atr)
}

/// Classify the setup stage from range contraction and band position
pub fn setup_stage(candles: &[Candle]) -> SetupStage {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let Some(ratio) = consolidation_ratio(candles, 5, 20) else {
        return SetupStage::Early;
    };
    let Some(bands) = bollinger_bands(&closes, 20, 2.0) else {
        return SetupStage::Early;
    };
    let Some(&last) = closes.last() else {
        return SetupStage::Early;
    };

    if last > bands.upper {
        return SetupStage::Breaking;
    }
    if ratio < 0.6 && last <= bands.middle {
        return SetupStage::Ready;
    }
    if ratio < 0.85 {
        return SetupStage::Forming;
    }
    SetupStage::Early
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candle(i: i64, close: f64, range: f64) -> Candle {
        Candle {
            timestamp: Utc::now() - Duration::days(100 - i),
            open: close,
            high: close + range,
            low: close - range,
            close,
            volume: 1_000_000,
        }
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..30).map(|i| 5.0 + i as f64 * 0.1).collect();
        assert_eq!(rsi(&closes, 14), Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 - i as f64 * 0.1).collect();
        let value = rsi(&closes, 14).unwrap();
        assert!(value < 1.0);
    }

    #[test]
    fn test_rsi_flat_series_is_neutral_or_none_gain() {
        let closes = vec![5.0; 30];
        // No losses at all: by convention RSI saturates at 100
        assert_eq!(rsi(&closes, 14), Some(100.0));
    }

    #[test]
    fn test_rsi_too_short() {
        assert!(rsi(&[1.0, 2.0, 3.0], 14).is_none());
    }

    #[test]
    fn test_macd_turns_positive_in_uptrend() {
        let closes: Vec<f64> = (0..60).map(|i| 5.0 + (i as f64).powf(1.2) * 0.05).collect();
        let m = macd(&closes, 12, 26, 9).unwrap();
        assert!(m.macd > 0.0);
    }

    #[test]
    fn test_macd_bullish_cross_after_reversal() {
        // Decline then sharp recovery forces the MACD line up through its signal
        let mut closes: Vec<f64> = (0..40).map(|i| 10.0 - i as f64 * 0.1).collect();
        closes.extend((0..10).map(|i| 6.0 + i as f64 * 0.5));
        let crossed = (35..=closes.len())
            .filter_map(|n| macd(&closes[..n], 12, 26, 9))
            .any(|m| m.bullish_cross);
        assert!(crossed);
    }

    #[test]
    fn test_bollinger_bands_symmetry() {
        let closes: Vec<f64> = (0..25).map(|i| 5.0 + ((i % 5) as f64) * 0.2).collect();
        let bands = bollinger_bands(&closes, 20, 2.0).unwrap();
        assert!(bands.lower < bands.middle && bands.middle < bands.upper);
        let upper_gap = bands.upper - bands.middle;
        let lower_gap = bands.middle - bands.lower;
        assert!((upper_gap - lower_gap).abs() < 1e-9);
    }

    #[test]
    fn test_atr_reflects_range() {
        let wide: Vec<Candle> = (0..30).map(|i| candle(i, 5.0, 1.0)).collect();
        let tight: Vec<Candle> = (0..30).map(|i| candle(i, 5.0, 0.1)).collect();
        assert!(atr(&wide, 14).unwrap() > atr(&tight, 14).unwrap());
    }

    #[test]
    fn test_consolidation_ratio_detects_contraction() {
        // Wide early range, tight late range
        let candles: Vec<Candle> = (0..40)
            .map(|i| candle(i, 5.0, if i < 30 { 1.0 } else { 0.1 }))
            .collect();
        let ratio = consolidation_ratio(&candles, 5, 20).unwrap();
        assert!(ratio < 0.6);
    }

    #[test]
    fn test_setup_stage_breaking_above_upper_band() {
        let mut candles: Vec<Candle> = (0..40).map(|i| candle(i, 5.0, 0.2)).collect();
        candles.push(candle(40, 7.5, 0.3));
        assert_eq!(setup_stage(&candles), SetupStage::Breaking);
    }

    #[test]
    fn test_setup_stage_early_on_short_series() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 5.0, 0.2)).collect();
        assert_eq!(setup_stage(&candles), SetupStage::Early);
    }
}
