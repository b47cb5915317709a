//! Composite scanner
//!
//! Orchestrates the registered providers, deduplicates across them
//! (first seen wins, in registration order), scores survivors, sorts
//! deterministically and writes the final list to the results cache.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::cache::Cache;
use crate::error::ScanError;
use crate::provider::Provider;
use crate::telemetry::{record_latency, set_gauge, GaugeMetric, LatencyMetric};

use super::scoring::{pillars_score, quality_score};
use super::types::{
    sort_results, CandidateRow, ResultScore, ScanParameters, ScanResult,
};

/// Minimum pillars for a momentum candidate to make the list
const MIN_PILLARS: u8 = 3;

/// One finished scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub results: Vec<ScanResult>,
    pub from_cache: bool,
}

/// Orchestrates providers into one ranked, deduplicated result list
pub struct CompositeScanner {
    providers: Vec<Arc<dyn Provider>>,
    cache: Option<Cache>,
    min_pillars: u8,
}

impl CompositeScanner {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            cache: None,
            min_pillars: MIN_PILLARS,
        }
    }

    /// Registration order decides dedup priority
    pub fn register(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_min_pillars(mut self, min_pillars: u8) -> Self {
        self.min_pillars = min_pillars;
        self
    }

    /// Run all providers and produce the ranked result list
    pub async fn scan(&self, params: &ScanParameters) -> Result<ScanReport, ScanError> {
        params.validate()?;
        let scan_id = Uuid::new_v4();
        let key = params.cache_key();

        if let Some(cache) = &self.cache {
            if let Some(results) = cache.get::<Vec<ScanResult>>(&key) {
                tracing::info!(%scan_id, results = results.len(), "Scan served from cache");
                metrics::counter!("flowscan_scan_cache_hits_total").increment(1);
                return Ok(ScanReport {
                    scan_id,
                    results,
                    from_cache: true,
                });
            }
        }

        let started = Instant::now();
        let rows = self.collect_rows(params).await;
        let results = self.score_and_rank(rows, params);

        if let Some(cache) = &self.cache {
            cache.set(&key, &results);
        }

        tracing::info!(
            %scan_id,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scan complete"
        );
        metrics::counter!("flowscan_scans_total").increment(1);
        record_latency(LatencyMetric::CompositeScan, started.elapsed());
        set_gauge(GaugeMetric::LastScanResults, results.len() as f64);

        Ok(ScanReport {
            scan_id,
            results,
            from_cache: false,
        })
    }

    /// Run each provider, dropping failures, dedup first-seen-wins
    async fn collect_rows(&self, params: &ScanParameters) -> Vec<CandidateRow> {
        let mut rows = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for provider in &self.providers {
            let provider_started = Instant::now();
            let provider_rows = match provider.scan(params).await {
                Ok(rows) => rows,
                Err(err) => {
                    // A dead provider never aborts the scan
                    tracing::warn!(provider = provider.name(), %err, "Provider failed, skipping");
                    metrics::counter!(
                        "flowscan_provider_failures_total",
                        "provider" => provider.name().to_string()
                    )
                    .increment(1);
                    Vec::new()
                }
            };
            record_latency(LatencyMetric::ProviderScan, provider_started.elapsed());
            let mut added = 0usize;
            for row in provider_rows {
                if seen.insert(row.ticker.clone()) {
                    rows.push(row);
                    added += 1;
                }
            }
            tracing::debug!(provider = provider.name(), added, "Provider merged");
        }
        rows
    }

    /// Score every row, keep candidates over the pillar floor, sort
    fn score_and_rank(&self, rows: Vec<CandidateRow>, params: &ScanParameters) -> Vec<ScanResult> {
        let mut results: Vec<ScanResult> = rows
            .iter()
            .filter_map(|row| {
                let pillars = pillars_score(row, params);
                if pillars < self.min_pillars {
                    return None;
                }
                let quality = quality_score(row);
                let catalyst = if pillars == 5 {
                    Some("Momentum + volume catalyst".to_string())
                } else {
                    None
                };
                Some(ScanResult::from_row(
                    row,
                    ResultScore::Momentum { pillars, quality },
                    catalyst,
                ))
            })
            .collect();
        sort_results(&mut results);
        results
    }
}

impl Default for CompositeScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::types::ScanMode;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StaticProvider {
        name: &'static str,
        rows: Vec<CandidateRow>,
    }

    #[async_trait]
    impl Provider for StaticProvider {
        fn name(&self) -> &str {
            self.name
        }
        async fn scan(&self, _params: &ScanParameters) -> Result<Vec<CandidateRow>, ScanError> {
            Ok(self.rows.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "broken"
        }
        async fn scan(&self, _params: &ScanParameters) -> Result<Vec<CandidateRow>, ScanError> {
            Err(ScanError::ProviderUnavailable("connection refused".into()))
        }
    }

    fn row(ticker: &str, source: &str, change_pct: f64, rel_vol: f64) -> CandidateRow {
        CandidateRow {
            ticker: ticker.to_string(),
            close: 5.0,
            open: 4.5,
            high: 5.5,
            low: 4.4,
            volume: 5_000_000,
            change_pct,
            relative_volume: rel_vol,
            float_shares: Some(10_000_000),
            market_cap: Some(50_000_000.0),
            exchange: Some("NASDAQ".to_string()),
            short_percent: None,
            days_to_cover: None,
            source: source.to_string(),
        }
    }

    fn params(mode: ScanMode) -> ScanParameters {
        ScanParameters::new("US", 2.0, 20.0, mode, 10.0, 5.0, 20.0).unwrap()
    }

    #[tokio::test]
    async fn test_dedup_across_providers_first_seen_wins() {
        // Screener returns A, B, C; universe returns C, D. C overlaps.
        let scanner = CompositeScanner::new()
            .register(Arc::new(StaticProvider {
                name: "screener",
                rows: vec![
                    row("A", "screener", 12.0, 6.0),
                    row("B", "screener", 18.0, 8.0),
                    row("C", "screener", 15.0, 7.0),
                ],
            }))
            .register(Arc::new(StaticProvider {
                name: "universe",
                rows: vec![row("C", "universe", 50.0, 25.0), row("D", "universe", 11.0, 6.0)],
            }));

        let report = scanner.scan(&params(ScanMode::Smart)).await.unwrap();
        assert_eq!(report.results.len(), 4);

        let mut tickers: Vec<&str> = report.results.iter().map(|r| r.ticker.as_str()).collect();
        tickers.sort_unstable();
        assert_eq!(tickers, vec!["A", "B", "C", "D"]);

        // C kept the first provider's row, not the universe's inflated one
        let c = report.results.iter().find(|r| r.ticker == "C").unwrap();
        assert_eq!(c.source, "screener");
        assert_eq!(c.change_pct, 15.0);

        // Every result carries a recomputed pillars score
        for result in &report.results {
            match result.score {
                ResultScore::Momentum { pillars, .. } => assert!(pillars >= MIN_PILLARS),
                _ => panic!("composite scan attaches momentum scores"),
            }
        }

        // Sorted by (score desc, change desc)
        let keys: Vec<(f64, f64)> = report.results.iter().map(|r| r.sort_key()).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[tokio::test]
    async fn test_provider_failure_is_skipped() {
        let scanner = CompositeScanner::new()
            .register(Arc::new(FailingProvider))
            .register(Arc::new(StaticProvider {
                name: "screener",
                rows: vec![row("A", "screener", 12.0, 6.0)],
            }));
        let report = scanner.scan(&params(ScanMode::Quick)).await.unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].ticker, "A");
    }

    #[tokio::test]
    async fn test_invalid_params_fail_fast() {
        let scanner = CompositeScanner::new();
        let mut bad = params(ScanMode::Quick);
        bad.max_price = 1.0;
        let result = scanner.scan(&bad).await;
        assert!(matches!(result, Err(ScanError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_pillar_floor_filters_weak_rows() {
        let scanner = CompositeScanner::new().register(Arc::new(StaticProvider {
            name: "screener",
            rows: vec![
                row("GOOD", "screener", 12.0, 6.0),
                // Fails change, volume and catalyst pillars
                row("WEAK", "screener", 1.0, 1.0),
            ],
        }));
        let report = scanner.scan(&params(ScanMode::Quick)).await.unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].ticker, "GOOD");
    }

    #[tokio::test]
    async fn test_results_cached_and_replayed() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new("scan_results", Duration::from_secs(900), dir.path());

        let scanner = CompositeScanner::new()
            .register(Arc::new(StaticProvider {
                name: "screener",
                rows: vec![row("A", "screener", 12.0, 6.0)],
            }))
            .with_cache(cache);

        let first = scanner.scan(&params(ScanMode::Quick)).await.unwrap();
        assert!(!first.from_cache);

        let second = scanner.scan(&params(ScanMode::Quick)).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.results, first.results);

        // Different parameters miss the cache
        let other = scanner.scan(&params(ScanMode::Deep)).await.unwrap();
        assert!(!other.from_cache);
    }

    #[tokio::test]
    async fn test_no_duplicate_tickers_ever() {
        let scanner = CompositeScanner::new()
            .register(Arc::new(StaticProvider {
                name: "one",
                rows: vec![row("X", "one", 12.0, 6.0), row("X", "one", 13.0, 6.0)],
            }))
            .register(Arc::new(StaticProvider {
                name: "two",
                rows: vec![row("X", "two", 14.0, 6.0)],
            }));
        let report = scanner.scan(&params(ScanMode::Quick)).await.unwrap();
        assert_eq!(report.results.len(), 1);
    }
}
