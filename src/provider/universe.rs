//! Full-universe provider
//!
//! Builds the complete symbol list for a market from pipe-delimited
//! listing directories, caches it for hours, shrinks it with the
//! heuristic filter, and deep-checks whatever the scan mode allows
//! through the pre-filter and executor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::Cache;
use crate::config::UniverseConfig;
use crate::data::MarketData;
use crate::error::ScanError;
use crate::exec::ParallelExecutor;
use crate::prefilter::{FilterCriteria, PreFilter, Verdict};
use crate::scan::types::{CandidateRow, ScanMode, ScanParameters};
use crate::telemetry::{set_gauge, GaugeMetric};

use super::filters::{is_likely_delisted, prioritize_tickers, ListedSymbol, TickerFilter};
use super::Provider;

const UNIVERSE_CACHE_KEY: &str = "candidates";

/// Whole-market provider with an hours-scale cached candidate list
pub struct UniverseProvider {
    client: reqwest::Client,
    config: UniverseConfig,
    market: Arc<dyn MarketData>,
    cache: Cache,
    executor: ParallelExecutor,
}

impl UniverseProvider {
    pub fn new(
        config: &UniverseConfig,
        market: Arc<dyn MarketData>,
        cache: Cache,
        executor: ParallelExecutor,
    ) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("flowscan/0.1")
            .build()
            .map_err(|e| ScanError::ProviderUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
            market,
            cache,
            executor,
        })
    }

    /// Candidate tickers, from cache when fresh
    async fn candidates(&self) -> Result<Vec<String>, ScanError> {
        if let Some(cached) = self.cache.get::<Vec<String>>(UNIVERSE_CACHE_KEY) {
            let age_h = self
                .cache
                .get_age(UNIVERSE_CACHE_KEY)
                .map(|a| a.as_secs_f64() / 3600.0)
                .unwrap_or(0.0);
            tracing::info!(tickers = cached.len(), age_h, "Using cached universe");
            return Ok(cached);
        }

        let symbols = self.fetch_listings().await?;
        let mut filter = TickerFilter::new();
        let candidates = filter.filter(&symbols);
        tracing::info!(
            listed = symbols.len(),
            candidates = candidates.len(),
            "Rebuilt candidate universe"
        );
        self.cache.set(UNIVERSE_CACHE_KEY, &candidates);
        set_gauge(GaugeMetric::UniverseSize, candidates.len() as f64);
        Ok(candidates)
    }

    async fn fetch_listings(&self) -> Result<Vec<ListedSymbol>, ScanError> {
        let mut symbols = self
            .fetch_directory(&self.config.listed_url, "NASDAQ", None)
            .await?;
        // The secondary directory is optional; the primary list is the bulk
        match self
            .fetch_directory(&self.config.other_listed_url, "A", Some(2))
            .await
        {
            Ok(other) => symbols.extend(other),
            Err(err) => {
                tracing::warn!(%err, "Secondary listing directory unavailable");
            }
        }
        Ok(symbols)
    }

    /// Fetch and parse one pipe-delimited listing file
    async fn fetch_directory(
        &self,
        url: &str,
        default_exchange: &str,
        exchange_col: Option<usize>,
    ) -> Result<Vec<ListedSymbol>, ScanError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ScanError::from_status(response.status()));
        }
        let body = response.text().await.map_err(ScanError::from)?;
        Ok(parse_directory(&body, default_exchange, exchange_col))
    }

    /// Deep-check a ticker list, turning survivors into candidate rows
    async fn deep_check(&self, tickers: Vec<String>, params: &ScanParameters) -> Vec<CandidateRow> {
        let criteria = FilterCriteria {
            min_price: params.min_price,
            max_price: params.max_price,
            min_volume: 500_000,
            min_change_pct: Some(params.min_change_pct),
            max_float_shares: Some((params.max_float_m * 1_000_000.0) as u64),
            max_market_cap: None,
        };
        let prefilter = Arc::new(PreFilter::new(criteria, self.market.clone()));
        let market = self.market.clone();

        let rows = self
            .executor
            .process_batches(tickers, {
                let prefilter = prefilter.clone();
                move |ticker: String| {
                    let prefilter = prefilter.clone();
                    let market = market.clone();
                    async move {
                        match prefilter.quick_check(&ticker).await {
                            Verdict::Pass => {}
                            Verdict::Reject { reason } => {
                                return Err(ScanError::DataQuality(reason));
                            }
                        }
                        // The quote is already cached client-side from the
                        // quick check in most MarketData implementations
                        let quote = market.quote(&ticker).await?;
                        if is_likely_delisted(
                            &quote.ticker,
                            quote.price,
                            quote.volume,
                            quote.market_cap,
                        ) {
                            return Err(ScanError::DataQuality(format!(
                                "{}: likely delisted",
                                ticker
                            )));
                        }
                        Ok(CandidateRow {
                            ticker: quote.ticker.clone(),
                            close: quote.price,
                            open: quote.price,
                            high: quote.price,
                            low: quote.price,
                            volume: quote.volume,
                            change_pct: quote.change_pct,
                            relative_volume: quote.relative_volume(),
                            float_shares: quote.float_shares,
                            market_cap: quote.market_cap,
                            exchange: quote.exchange.clone(),
                            short_percent: quote.short_percent,
                            days_to_cover: quote.days_to_cover,
                            source: "universe".to_string(),
                        })
                    }
                }
            })
            .await;

        let stats = prefilter.stats();
        if stats.checked > 0 {
            set_gauge(
                GaugeMetric::PrefilterPassRate,
                stats.passed as f64 / stats.checked as f64,
            );
        }
        tracing::info!(
            checked = stats.checked,
            passed = stats.passed,
            rejected = stats.rejected,
            "Universe deep check done"
        );
        rows
    }
}

/// Parse a pipe-delimited listing file (header and footer rows skipped)
fn parse_directory(
    body: &str,
    default_exchange: &str,
    exchange_col: Option<usize>,
) -> Vec<ListedSymbol> {
    let mut out = Vec::new();
    for (i, line) in body.lines().enumerate() {
        if i == 0 || line.starts_with("File Creation Time") {
            continue;
        }
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 2 {
            continue;
        }
        let ticker = fields[0].trim();
        let name = fields[1].trim();
        if ticker.is_empty() || name.is_empty() {
            continue;
        }
        let exchange = exchange_col
            .and_then(|col| fields.get(col))
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .unwrap_or(default_exchange);
        out.push(ListedSymbol {
            ticker: ticker.to_string(),
            name: name.to_string(),
            exchange: exchange.to_string(),
        });
    }
    out
}

#[async_trait]
impl Provider for UniverseProvider {
    fn name(&self) -> &str {
        "universe"
    }

    async fn scan(&self, params: &ScanParameters) -> Result<Vec<CandidateRow>, ScanError> {
        let tickers = match params.mode {
            // Quick scans rely on the screener alone
            ScanMode::Quick => return Ok(Vec::new()),
            ScanMode::Smart => {
                prioritize_tickers(self.candidates().await?, self.config.smart_limit)
            }
            ScanMode::Deep => self.candidates().await?,
        };
        tracing::info!(mode = %params.mode, tickers = tickers.len(), "Universe scan");
        Ok(self.deep_check(tickers, params).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_NASDAQ: &str = "\
Symbol|Security Name|Market Category|Test Issue|Financial Status|Round Lot Size|ETF|NextShares
AACG|ATA Creativity Global - American Depositary Shares|G|N|N|100|N|N
AAPL|Apple Inc. - Common Stock|Q|N|N|100|N|N
File Creation Time: 0310202521:30|||||||";

    const SAMPLE_OTHER: &str = "\
ACT Symbol|Security Name|Exchange|CQS Symbol|ETF|Round Lot Size|Test Issue|NASDAQ Symbol
A|Agilent Technologies, Inc. Common Stock|N|A|N|100|N|A
BATS|Bats Global Markets, Inc.|Z|BATS|N|100|N|BATS
File Creation Time: 0310202521:30|||||||";

    #[test]
    fn test_parse_primary_directory() {
        let symbols = parse_directory(SAMPLE_NASDAQ, "NASDAQ", None);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].ticker, "AACG");
        assert_eq!(symbols[0].exchange, "NASDAQ");
        assert!(symbols[1].name.contains("Apple"));
    }

    #[test]
    fn test_parse_other_directory_keeps_exchange_column() {
        let symbols = parse_directory(SAMPLE_OTHER, "A", Some(2));
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].exchange, "N");
        assert_eq!(symbols[1].exchange, "Z");
    }

    #[test]
    fn test_parse_skips_header_footer_and_blank_lines() {
        let body = "Symbol|Security Name\n\nX|Some Corp\nFile Creation Time: now|";
        let symbols = parse_directory(body, "NASDAQ", None);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].ticker, "X");
    }
}
