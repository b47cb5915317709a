//! OHLCV series validation
//!
//! Rejects series an analyzer cannot trust: too short, broken OHLC
//! relationships, non-positive prices, dead volume, or stale data.

use chrono::{Duration as ChronoDuration, Utc};

use crate::error::ScanError;

use super::Candle;

/// Validates a history series before analysis
#[derive(Debug, Clone)]
pub struct DataValidator {
    /// Minimum bar count required for analysis
    pub min_bars: usize,
    /// Maximum age of the newest bar in days
    pub max_staleness_days: i64,
    /// Maximum tolerated fraction of zero-volume bars
    pub max_zero_volume_frac: f64,
}

impl Default for DataValidator {
    fn default() -> Self {
        Self {
            min_bars: 20,
            max_staleness_days: 7,
            max_zero_volume_frac: 0.5,
        }
    }
}

impl DataValidator {
    /// Check a series; Ok means analyzers may consume it
    pub fn validate(&self, ticker: &str, candles: &[Candle]) -> Result<(), ScanError> {
        if candles.len() < self.min_bars {
            return Err(ScanError::DataQuality(format!(
                "{}: insufficient history ({} bars, need {})",
                ticker,
                candles.len(),
                self.min_bars
            )));
        }

        for (i, c) in candles.iter().enumerate() {
            if c.open <= 0.0 || c.high <= 0.0 || c.low <= 0.0 || c.close <= 0.0 {
                return Err(ScanError::DataQuality(format!(
                    "{}: non-positive price at bar {}",
                    ticker, i
                )));
            }
            if c.high < c.low || c.high < c.open || c.high < c.close || c.low > c.open || c.low > c.close {
                return Err(ScanError::DataQuality(format!(
                    "{}: invalid OHLC relationship at bar {}",
                    ticker, i
                )));
            }
        }

        let zero_volume = candles.iter().filter(|c| c.volume == 0).count();
        if zero_volume as f64 / candles.len() as f64 > self.max_zero_volume_frac {
            return Err(ScanError::DataQuality(format!(
                "{}: {}/{} bars have zero volume",
                ticker,
                zero_volume,
                candles.len()
            )));
        }

        // candles are oldest-first
        if let Some(last) = candles.last() {
            let cutoff = Utc::now() - ChronoDuration::days(self.max_staleness_days);
            if last.timestamp < cutoff {
                return Err(ScanError::DataQuality(format!(
                    "{}: stale data, last bar {}",
                    ticker,
                    last.timestamp.format("%Y-%m-%d")
                )));
            }
        }

        Ok(())
    }
}
