//! Chart-API HTTP client
//!
//! Fetches OHLCV history and derives quote snapshots from the same
//! endpoint, so one upstream covers both `MarketData` methods. Quotes
//! are enriched with float, market cap and short interest from the
//! key-statistics endpoint when it answers.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::config::DataConfig;
use crate::error::ScanError;
use crate::telemetry::{record_latency, LatencyMetric};

use super::{Candle, Interval, MarketData, Period, Quote};

/// HTTP client for a chart-style OHLCV API
#[derive(Debug, Clone)]
pub struct ChartClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    exchange_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize, Default)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    result: Option<Vec<SummaryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    default_key_statistics: Option<KeyStatistics>,
    price: Option<PriceStatistics>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    float_shares: Option<RawValue>,
    short_percent_of_float: Option<RawValue>,
    shares_short: Option<RawValue>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PriceStatistics {
    market_cap: Option<RawValue>,
}

/// Wrapped numeric value as the summary endpoint reports it
#[derive(Debug, Deserialize, Default)]
struct RawValue {
    raw: Option<f64>,
}

/// Flattened key-statistics fields merged into a quote
#[derive(Debug, Default, PartialEq)]
struct KeyStats {
    float_shares: Option<u64>,
    market_cap: Option<f64>,
    short_percent: Option<f64>,
    days_to_cover: Option<f64>,
}

fn key_stats_from(summary: SummaryResult, avg_volume: u64) -> KeyStats {
    let mut stats = KeyStats::default();
    if let Some(key) = summary.default_key_statistics {
        stats.float_shares = key.float_shares.and_then(|v| v.raw).map(|f| f as u64);
        // Reported as a fraction of the float
        stats.short_percent = key.short_percent_of_float.and_then(|v| v.raw).map(|f| f * 100.0);
        if avg_volume > 0 {
            stats.days_to_cover = key
                .shares_short
                .and_then(|v| v.raw)
                .map(|s| s / avg_volume as f64);
        }
    }
    stats.market_cap = summary.price.and_then(|p| p.market_cap).and_then(|v| v.raw);
    stats
}

impl ChartClient {
    pub fn new(config: &DataConfig) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("flowscan/0.1")
            .build()
            .map_err(|e| ScanError::ProviderUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn fetch_chart(
        &self,
        ticker: &str,
        range: &str,
        interval: &str,
    ) -> Result<ChartResult, ScanError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScanError::from_status(response.status()));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| ScanError::Http(format!("chart decode: {}", e)))?;

        if let Some(err) = body.chart.error {
            return Err(ScanError::DataQuality(err.description));
        }
        body.chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| ScanError::DataQuality(format!("no chart data for {}", ticker)))
    }

    async fn fetch_key_stats(&self, ticker: &str) -> Result<Option<SummaryResult>, ScanError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[("modules", "defaultKeyStatistics,price")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScanError::from_status(response.status()));
        }
        let body: SummaryResponse = response
            .json()
            .await
            .map_err(|e| ScanError::Http(format!("summary decode: {}", e)))?;
        Ok(body
            .quote_summary
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) }))
    }
}

fn candles_from(result: &ChartResult) -> Vec<Candle> {
    let Some(timestamps) = &result.timestamp else {
        return Vec::new();
    };
    let quote = match result.indicators.quote.first() {
        Some(q) => q,
        None => return Vec::new(),
    };
    let empty: Vec<Option<f64>> = Vec::new();
    let empty_vol: Vec<Option<u64>> = Vec::new();
    let opens = quote.open.as_ref().unwrap_or(&empty);
    let highs = quote.high.as_ref().unwrap_or(&empty);
    let lows = quote.low.as_ref().unwrap_or(&empty);
    let closes = quote.close.as_ref().unwrap_or(&empty);
    let volumes = quote.volume.as_ref().unwrap_or(&empty_vol);

    let mut candles = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        // Bars with any missing field are holes in the series; skip them
        let (Some(open), Some(high), Some(low), Some(close)) = (
            opens.get(i).copied().flatten(),
            highs.get(i).copied().flatten(),
            lows.get(i).copied().flatten(),
            closes.get(i).copied().flatten(),
        ) else {
            continue;
        };
        let volume = volumes.get(i).copied().flatten().unwrap_or(0);
        let Some(timestamp) = Utc.timestamp_opt(*ts, 0).single() else {
            continue;
        };
        candles.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }
    candles
}

#[async_trait]
impl MarketData for ChartClient {
    async fn history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Candle>, ScanError> {
        let started = Instant::now();
        let result = self
            .fetch_chart(ticker, &period.as_range(), &interval.as_wire())
            .await?;
        record_latency(LatencyMetric::HistoryFetch, started.elapsed());
        let candles = candles_from(&result);
        if candles.is_empty() {
            return Err(ScanError::DataQuality(format!("empty history for {}", ticker)));
        }
        Ok(candles)
    }

    async fn quote(&self, ticker: &str) -> Result<Quote, ScanError> {
        // Three months of daily bars yields both the snapshot and a
        // trailing volume average from one request
        let result = self.fetch_chart(ticker, "3mo", "1d").await?;
        let candles = candles_from(&result);
        let last = candles
            .last()
            .ok_or_else(|| ScanError::DataQuality(format!("empty history for {}", ticker)))?;

        let price = result.meta.regular_market_price.unwrap_or(last.close);
        let prev_close = result
            .meta
            .chart_previous_close
            .or_else(|| candles.iter().rev().nth(1).map(|c| c.close))
            .unwrap_or(price);
        let change_pct = if prev_close > 0.0 {
            (price - prev_close) / prev_close * 100.0
        } else {
            0.0
        };

        let trailing: Vec<u64> = candles
            .iter()
            .rev()
            .skip(1)
            .take(20)
            .map(|c| c.volume)
            .collect();
        let avg_volume = if trailing.is_empty() {
            last.volume
        } else {
            trailing.iter().sum::<u64>() / trailing.len() as u64
        };

        // The chart endpoint has no float or short-interest data; a
        // failed enrichment degrades to a bare quote
        let stats = match self.fetch_key_stats(ticker).await {
            Ok(Some(summary)) => key_stats_from(summary, avg_volume),
            Ok(None) => KeyStats::default(),
            Err(err) => {
                tracing::debug!(ticker, %err, "Key statistics unavailable");
                KeyStats::default()
            }
        };

        Ok(Quote {
            ticker: ticker.to_string(),
            price,
            change_pct,
            volume: last.volume,
            avg_volume,
            float_shares: stats.float_shares,
            market_cap: stats.market_cap,
            short_percent: stats.short_percent,
            days_to_cover: stats.days_to_cover,
            exchange: result.meta.exchange_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> ChartResponse {
        serde_json::from_str(
            r#"{
                "chart": {
                    "result": [{
                        "meta": {
                            "regularMarketPrice": 5.5,
                            "chartPreviousClose": 5.0,
                            "exchangeName": "NMS"
                        },
                        "timestamp": [1700000000, 1700086400, 1700172800],
                        "indicators": {
                            "quote": [{
                                "open": [4.8, 5.0, null],
                                "high": [5.1, 5.6, 5.9],
                                "low": [4.7, 4.9, 5.2],
                                "close": [5.0, 5.5, 5.8],
                                "volume": [1000000, 3000000, 2000000]
                            }]
                        }
                    }],
                    "error": null
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_candles_skip_bars_with_holes() {
        let response = sample_response();
        let result = &response.chart.result.unwrap()[0];
        let candles = candles_from(result);
        // Third bar has a null open and is dropped
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 5.0);
        assert_eq!(candles[1].volume, 3_000_000);
    }

    #[test]
    fn test_key_statistics_decode_and_merge() {
        let response: SummaryResponse = serde_json::from_str(
            r#"{
                "quoteSummary": {
                    "result": [{
                        "defaultKeyStatistics": {
                            "floatShares": {"raw": 8500000, "fmt": "8.5M"},
                            "shortPercentOfFloat": {"raw": 0.32, "fmt": "32.00%"},
                            "sharesShort": {"raw": 2720000, "fmt": "2.72M"}
                        },
                        "price": {
                            "marketCap": {"raw": 45000000, "fmt": "45M"}
                        }
                    }],
                    "error": null
                }
            }"#,
        )
        .unwrap();
        let summary = response.quote_summary.result.unwrap().remove(0);
        let stats = key_stats_from(summary, 680_000);
        assert_eq!(stats.float_shares, Some(8_500_000));
        assert_eq!(stats.market_cap, Some(45_000_000.0));
        assert_eq!(stats.short_percent, Some(32.0));
        assert_eq!(stats.days_to_cover, Some(4.0));
    }

    #[test]
    fn test_key_statistics_missing_modules_degrade_to_none() {
        let response: SummaryResponse = serde_json::from_str(
            r#"{"quoteSummary": {"result": [{}], "error": null}}"#,
        )
        .unwrap();
        let summary = response.quote_summary.result.unwrap().remove(0);
        // Zero average volume also blocks the days-to-cover ratio
        assert_eq!(key_stats_from(summary, 0), KeyStats::default());
    }

    #[test]
    fn test_error_body_decodes() {
        let response: ChartResponse = serde_json::from_str(
            r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}}"#,
        )
        .unwrap();
        assert!(response.chart.result.is_none());
        assert_eq!(response.chart.error.unwrap().description, "No data found");
    }
}
