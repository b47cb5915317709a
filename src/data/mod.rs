//! Market data access
//!
//! Normalized quote and historical-bar types, the `MarketData` trait that
//! analyzers consume, an HTTP chart-API client, and series validation.

mod http;
mod validate;

pub use http::ChartClient;
pub use validate::DataValidator;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// A single OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Current snapshot for one ticker, cheap enough for pre-filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub change_pct: f64,
    pub volume: u64,
    /// Trailing average daily volume
    pub avg_volume: u64,
    /// Free float in shares, when the source reports it
    pub float_shares: Option<u64>,
    pub market_cap: Option<f64>,
    /// Short interest as percent of float
    pub short_percent: Option<f64>,
    /// Shares short over average daily volume
    pub days_to_cover: Option<f64>,
    pub exchange: Option<String>,
}

impl Quote {
    /// Relative volume vs the trailing average (0 when no average)
    pub fn relative_volume(&self) -> f64 {
        if self.avg_volume == 0 {
            return 0.0;
        }
        self.volume as f64 / self.avg_volume as f64
    }
}

/// Lookback period for a history request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days(u32),
    Months(u32),
}

impl Period {
    /// Wire value understood by the chart API
    pub fn as_range(&self) -> String {
        match self {
            Period::Days(n) => format!("{}d", n),
            Period::Months(n) => format!("{}mo", n),
        }
    }
}

/// Bar width for a history request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Minutes(u32),
    Daily,
}

impl Interval {
    pub fn as_wire(&self) -> String {
        match self {
            Interval::Minutes(n) => format!("{}m", n),
            Interval::Daily => "1d".to_string(),
        }
    }
}

/// Source of quotes and historical bars
///
/// Implementations may hit the network; callers own retry policy.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch OHLCV history, oldest bar first
    async fn history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Candle>, ScanError>;

    /// Fetch the current snapshot for one ticker
    async fn quote(&self, ticker: &str) -> Result<Quote, ScanError>;
}
