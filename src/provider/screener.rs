//! Screener-backed provider
//!
//! Issues three progressively looser queries against a screener API,
//! deduplicates across them, then re-verifies the top rows against the
//! higher-fidelity market data source. Screener metrics lag; anything
//! failing the re-check under accurate data is dropped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backoff::BackoffPolicy;
use crate::config::ScreenerConfig;
use crate::data::MarketData;
use crate::error::ScanError;
use crate::scan::types::{CandidateRow, ScanParameters};
use crate::telemetry::{record_latency, LatencyMetric};

use super::Provider;

/// One query tier: thresholds loosen down the list
#[derive(Debug, Clone)]
struct QueryTier {
    name: &'static str,
    min_change_pct: f64,
    min_rel_vol: f64,
    max_market_cap: Option<f64>,
}

const TIERS: &[QueryTier] = &[
    QueryTier {
        name: "standard",
        min_change_pct: 10.0,
        min_rel_vol: 5.0,
        max_market_cap: None,
    },
    QueryTier {
        name: "microcap",
        min_change_pct: 5.0,
        min_rel_vol: 3.0,
        max_market_cap: Some(300_000_000.0),
    },
    QueryTier {
        name: "low_float",
        min_change_pct: 3.0,
        min_rel_vol: 2.0,
        max_market_cap: Some(100_000_000.0),
    },
];

/// Multi-query screener provider
pub struct ScreenerProvider {
    client: reqwest::Client,
    config: ScreenerConfig,
    market: Arc<dyn MarketData>,
    backoff: BackoffPolicy,
}

#[derive(Debug, Deserialize)]
struct ScreenerResponse {
    #[serde(default)]
    data: Vec<ScreenerHit>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ScreenerHit {
    /// Exchange-qualified symbol, e.g. "NASDAQ:ABCD"
    s: String,
    /// Column values in request order
    d: Vec<serde_json::Value>,
}

impl ScreenerProvider {
    pub fn new(config: &ScreenerConfig, market: Arc<dyn MarketData>) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("flowscan/0.1")
            .build()
            .map_err(|e| ScanError::ProviderUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
            market,
            backoff: BackoffPolicy::default(),
        })
    }

    async fn run_query(
        &self,
        market: &str,
        min_price: f64,
        max_price: f64,
        tier: &QueryTier,
    ) -> Result<Vec<CandidateRow>, ScanError> {
        let mut filter = vec![
            json!({"left": "change", "operation": "greater", "right": tier.min_change_pct}),
            json!({"left": "relative_volume_10d_calc", "operation": "greater", "right": tier.min_rel_vol}),
            json!({"left": "close", "operation": "in_range", "right": [min_price, max_price]}),
        ];
        if let Some(cap) = tier.max_market_cap {
            filter.push(json!({"left": "market_cap_basic", "operation": "less", "right": cap}));
        }

        let payload = json!({
            "filter": filter,
            "markets": [market],
            "columns": [
                "name", "close", "open", "high", "low", "volume", "change",
                "relative_volume_10d_calc", "float_shares_outstanding",
                "market_cap_basic", "exchange"
            ],
            "sort": {"sortBy": "change", "sortOrder": "desc"},
            "range": [0, self.config.query_limit],
        });

        let url = format!("{}/{}/scan", self.config.base_url, market);
        let started = Instant::now();
        let response = self
            .backoff
            .retry(|| async {
                let response = self.client.post(&url).json(&payload).send().await?;
                if !response.status().is_success() {
                    return Err(ScanError::from_status(response.status()));
                }
                response
                    .json::<ScreenerResponse>()
                    .await
                    .map_err(|e| ScanError::Http(format!("screener decode: {}", e)))
            })
            .await?;
        record_latency(LatencyMetric::ScreenerQuery, started.elapsed());

        let rows: Vec<CandidateRow> = response
            .data
            .iter()
            .filter_map(|hit| self.row_from_hit(hit))
            .collect();
        tracing::debug!(tier = tier.name, rows = rows.len(), "Screener query done");
        Ok(rows)
    }

    fn row_from_hit(&self, hit: &ScreenerHit) -> Option<CandidateRow> {
        fn num(v: Option<&serde_json::Value>) -> Option<f64> {
            v.and_then(|v| v.as_f64())
        }
        let d = &hit.d;
        let ticker = d
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| hit.s.split(':').next_back().unwrap_or(""))
            .to_string();
        if ticker.is_empty() {
            return None;
        }
        Some(CandidateRow {
            ticker,
            close: num(d.get(1))?,
            open: num(d.get(2))?,
            high: num(d.get(3))?,
            low: num(d.get(4))?,
            volume: num(d.get(5))? as u64,
            change_pct: num(d.get(6))?,
            relative_volume: num(d.get(7)).unwrap_or(0.0),
            float_shares: num(d.get(8)).map(|f| f as u64),
            market_cap: num(d.get(9)),
            exchange: d.get(10).and_then(|v| v.as_str()).map(str::to_string),
            // The screener carries no short-interest columns
            short_percent: None,
            days_to_cover: None,
            source: "screener".to_string(),
        })
    }

    /// Re-check the top rows against accurate quotes
    ///
    /// Rows past the re-verification budget pass through unchanged; the
    /// budget protects API quota while still cleaning the head of the
    /// ranked list.
    async fn reverify(&self, mut rows: Vec<CandidateRow>, params: &ScanParameters) -> Vec<CandidateRow> {
        rows.sort_by(|a, b| {
            b.change_pct
                .partial_cmp(&a.change_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let check_count = self.config.reverify_top.min(rows.len());
        let mut verified = Vec::with_capacity(rows.len());

        for (i, mut row) in rows.into_iter().enumerate() {
            if i >= check_count {
                verified.push(row);
                continue;
            }
            match self.market.quote(&row.ticker).await {
                Ok(quote) => {
                    // Accurate figures replace the screener's
                    row.close = quote.price;
                    row.change_pct = quote.change_pct;
                    row.volume = quote.volume;
                    row.relative_volume = quote.relative_volume();
                    if quote.float_shares.is_some() {
                        row.float_shares = quote.float_shares;
                    }
                    row.short_percent = quote.short_percent.or(row.short_percent);
                    row.days_to_cover = quote.days_to_cover.or(row.days_to_cover);
                    let in_range =
                        quote.price >= params.min_price && quote.price <= params.max_price;
                    if in_range && quote.change_pct >= params.min_change_pct {
                        verified.push(row);
                    } else {
                        tracing::debug!(ticker = %row.ticker, "Dropped on re-verification");
                    }
                }
                Err(err) => {
                    tracing::debug!(ticker = %row.ticker, %err, "Re-verification fetch failed");
                }
            }
        }
        verified
    }
}

#[async_trait]
impl Provider for ScreenerProvider {
    fn name(&self) -> &str {
        "screener"
    }

    async fn scan(&self, params: &ScanParameters) -> Result<Vec<CandidateRow>, ScanError> {
        // Screener closes lag; widen the lower bound slightly so borderline
        // rows survive until re-verification
        let adjusted_min = params.min_price * 0.90;

        let mut rows = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for tier in TIERS {
            let tier_rows = self
                .run_query(&params.market, adjusted_min, params.max_price, tier)
                .await?;
            for row in tier_rows {
                if seen.insert(row.ticker.clone()) {
                    rows.push(row);
                }
            }
        }

        Ok(self.reverify(rows, params).await)
    }
}
