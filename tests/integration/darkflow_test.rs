//! Dark-Flow scanner tests against a mock market data source

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use flowscan::config::{ParallelConfig, RateLimitConfig};
use flowscan::data::{Candle, Interval, MarketData, Period, Quote};
use flowscan::error::ScanError;
use flowscan::exec::ParallelExecutor;
use flowscan::scan::{CandidateRow, DarkFlowScanner, ResultScore};

struct MockMarket {
    histories: HashMap<String, Vec<Candle>>,
}

#[async_trait]
impl MarketData for MockMarket {
    async fn history(
        &self,
        ticker: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<Vec<Candle>, ScanError> {
        self.histories
            .get(ticker)
            .cloned()
            .ok_or_else(|| ScanError::ProviderUnavailable(format!("no data for {}", ticker)))
    }

    async fn quote(&self, ticker: &str) -> Result<Quote, ScanError> {
        Err(ScanError::ProviderUnavailable(format!(
            "no quote for {}",
            ticker
        )))
    }
}

fn bar(minutes_ago: i64, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Candle {
    Candle {
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Tight bullish coil with three volume spikes near the current price.
/// Scores cluster, unusual volume, tight range and squeeze points.
fn accumulating_series() -> Vec<Candle> {
    (0..30)
        .map(|i| {
            let volume = if i == 5 || i == 10 || i == 15 {
                30_000_000
            } else {
                1_000_000
            };
            bar((30 - i) * 15, 5.0, 5.06, 4.96, 5.02, volume)
        })
        .collect()
}

/// Steady intraday selloff on uniform volume. Bearish bias, wide range,
/// no volume anomalies; nothing for the score to reward.
fn fading_series() -> Vec<Candle> {
    (0..30)
        .map(|i| {
            let p = 10.0 - i as f64 * 0.17;
            bar((30 - i) * 15, p + 0.05, p + 0.1, p - 0.1, p - 0.05, 2_000_000)
        })
        .collect()
}

fn row(ticker: &str) -> CandidateRow {
    CandidateRow {
        ticker: ticker.to_string(),
        close: 5.02,
        open: 5.0,
        high: 5.06,
        low: 4.96,
        volume: 33_000_000,
        change_pct: 11.0,
        relative_volume: 6.0,
        float_shares: Some(9_000_000),
        market_cap: Some(50_000_000.0),
        exchange: Some("NASDAQ".to_string()),
        short_percent: None,
        days_to_cover: None,
        source: "screener".to_string(),
    }
}

fn executor() -> ParallelExecutor {
    ParallelExecutor::new(
        &ParallelConfig {
            workers: 4,
            task_timeout_secs: 5,
            batch_size: 50,
        },
        &RateLimitConfig {
            delay_every: 0,
            delay_ms: 0,
        },
    )
}

#[tokio::test]
async fn accumulation_pattern_scores_above_the_floor() {
    let market = Arc::new(MockMarket {
        histories: HashMap::from([("COIL".to_string(), accumulating_series())]),
    });
    let scanner = DarkFlowScanner::new(market);

    let analysis = scanner.analyze_ticker("COIL").await.unwrap();
    assert_eq!(analysis.unusual_volume_count, 3);
    assert!(analysis.cluster_at_price);
    assert!(analysis.gaps.is_empty());

    let score = flowscan::scan::dark_flow_score(&analysis);
    assert!(score >= 50.0, "expected a qualifying score, got {}", score);
}

#[tokio::test]
async fn scan_rows_keeps_qualifiers_and_drops_fading_tickers() {
    let market = Arc::new(MockMarket {
        histories: HashMap::from([
            ("COIL".to_string(), accumulating_series()),
            ("FADE".to_string(), fading_series()),
        ]),
    });
    let scanner = DarkFlowScanner::new(market);

    let results = scanner
        .scan_rows(vec![row("COIL"), row("FADE")], &executor())
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].ticker, "COIL");
    let ResultScore::DarkFlow { score } = results[0].score else {
        panic!("dark-flow scan must attach dark-flow scores");
    };
    assert!(score >= 50.0);
    assert!(results[0]
        .catalyst
        .as_deref()
        .is_some_and(|c| c.starts_with("Dark Flow")));
}

#[tokio::test]
async fn rows_below_the_relative_volume_floor_are_skipped() {
    let market = Arc::new(MockMarket {
        histories: HashMap::from([("COIL".to_string(), accumulating_series())]),
    });
    let scanner = DarkFlowScanner::new(market);

    // Same accumulation pattern, but nothing moving on the tape today
    let mut sleepy = row("COIL");
    sleepy.relative_volume = 1.0;
    let results = scanner.scan_rows(vec![sleepy], &executor()).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn unavailable_history_drops_the_row_without_failing_the_scan() {
    let market = Arc::new(MockMarket {
        histories: HashMap::from([("COIL".to_string(), accumulating_series())]),
    });
    let scanner = DarkFlowScanner::new(market);

    let results = scanner
        .scan_rows(vec![row("COIL"), row("GONE")], &executor())
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].ticker, "COIL");
}

#[tokio::test]
async fn short_history_fails_validation() {
    let market = Arc::new(MockMarket {
        histories: HashMap::from([(
            "THIN".to_string(),
            accumulating_series().into_iter().take(5).collect(),
        )]),
    });
    let scanner = DarkFlowScanner::new(market);

    let err = scanner.analyze_ticker("THIN").await.unwrap_err();
    assert!(matches!(err, ScanError::DataQuality(_)));
}
