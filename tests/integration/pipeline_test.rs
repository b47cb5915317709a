//! End-to-end pipeline tests with mock providers

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use flowscan::cache::Cache;
use flowscan::error::ScanError;
use flowscan::provider::Provider;
use flowscan::scan::{
    CandidateRow, CompositeScanner, ResultScore, ScanMode, ScanParameters, ScanResult,
};

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

struct DeadProvider;

#[async_trait]
impl Provider for DeadProvider {
    fn name(&self) -> &str {
        "dead"
    }
    async fn scan(&self, _params: &ScanParameters) -> Result<Vec<CandidateRow>, ScanError> {
        Err(ScanError::ProviderUnavailable("no route to host".into()))
    }
}

fn row(ticker: &str, source: &str, close: f64, change_pct: f64, rel_vol: f64) -> CandidateRow {
    CandidateRow {
        ticker: ticker.to_string(),
        close,
        open: close * 0.92,
        high: close * 1.06,
        low: close * 0.9,
        volume: 4_000_000,
        change_pct,
        relative_volume: rel_vol,
        float_shares: Some(8_000_000),
        market_cap: Some(45_000_000.0),
        exchange: Some("NASDAQ".to_string()),
        short_percent: None,
        days_to_cover: None,
        source: source.to_string(),
    }
}

fn smart_params() -> ScanParameters {
    ScanParameters::new("US", 2.0, 20.0, ScanMode::Smart, 10.0, 5.0, 20.0).unwrap()
}

/// Mock screener returns {A, B, C}, mock universe returns {C, D}.
/// The merged scan yields exactly 4 deduplicated results with recomputed
/// pillar scores, sorted by (score desc, change desc).
#[tokio::test]
async fn smart_scan_dedups_scores_and_sorts() {
    let scanner = CompositeScanner::new()
        .register(Arc::new(StaticProvider {
            name: "screener",
            rows: vec![
                row("A", "screener", 5.0, 12.0, 6.0),
                row("B", "screener", 8.0, 28.0, 11.0),
                row("C", "screener", 4.0, 16.0, 7.5),
            ],
        }))
        .register(Arc::new(StaticProvider {
            name: "universe",
            rows: vec![
                row("C", "universe", 9.0, 55.0, 30.0),
                row("D", "universe", 6.0, 11.0, 5.5),
            ],
        }));

    let report = scanner.scan(&smart_params()).await.unwrap();

    assert_eq!(report.results.len(), 4);
    let mut tickers: Vec<&str> = report.results.iter().map(|r| r.ticker.as_str()).collect();
    tickers.sort_unstable();
    assert_eq!(tickers, vec!["A", "B", "C", "D"]);

    // C kept the screener row (first seen wins)
    let c = report.results.iter().find(|r| r.ticker == "C").unwrap();
    assert_eq!(c.source, "screener");
    assert_eq!(c.change_pct, 16.0);

    // Each result carries a momentum score recomputed from its own row
    for result in &report.results {
        let ResultScore::Momentum { pillars, quality } = result.score else {
            panic!("momentum scan must attach momentum scores");
        };
        assert!((3..=5).contains(&pillars));
        assert!((0.0..=100.0).contains(&quality));
    }

    // Strict descending (score, change) order
    let keys: Vec<(f64, f64)> = report.results.iter().map(ScanResult::sort_key).collect();
    for pair in keys.windows(2) {
        assert!(pair[0] >= pair[1], "results out of order: {:?}", keys);
    }
    // B dominates on both quality tiers and momentum bonus
    assert_eq!(report.results[0].ticker, "B");
}

#[tokio::test]
async fn dead_provider_never_aborts_the_scan() {
    let scanner = CompositeScanner::new()
        .register(Arc::new(DeadProvider))
        .register(Arc::new(StaticProvider {
            name: "screener",
            rows: vec![row("A", "screener", 5.0, 12.0, 6.0)],
        }));

    let report = scanner.scan(&smart_params()).await.unwrap();
    assert_eq!(report.results.len(), 1);
}

#[tokio::test]
async fn invalid_parameters_fail_before_any_provider_runs() {
    struct PanicProvider;
    #[async_trait]
    impl Provider for PanicProvider {
        fn name(&self) -> &str {
            "panic"
        }
        async fn scan(&self, _params: &ScanParameters) -> Result<Vec<CandidateRow>, ScanError> {
            panic!("providers must not run for invalid params");
        }
    }

    let scanner = CompositeScanner::new().register(Arc::new(PanicProvider));
    let mut params = smart_params();
    params.min_price = 30.0;
    let result = scanner.scan(&params).await;
    assert!(matches!(result, Err(ScanError::InvalidParams(_))));
}

#[tokio::test]
async fn cached_scan_expires_at_ttl_boundary() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(StaticProvider {
        name: "screener",
        rows: vec![row("A", "screener", 5.0, 12.0, 6.0)],
    });

    // Zero TTL: a freshly written entry is already expired (age >= ttl)
    let scanner = CompositeScanner::new()
        .register(provider.clone())
        .with_cache(Cache::new("scan_results", Duration::from_secs(0), dir.path()));
    let first = scanner.scan(&smart_params()).await.unwrap();
    assert!(!first.from_cache);
    let second = scanner.scan(&smart_params()).await.unwrap();
    assert!(!second.from_cache);

    // Generous TTL: the second scan replays the cached list exactly
    let scanner = CompositeScanner::new()
        .register(provider)
        .with_cache(Cache::new("scan_results", Duration::from_secs(900), dir.path()));
    let first = scanner.scan(&smart_params()).await.unwrap();
    let second = scanner.scan(&smart_params()).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.results, first.results);
}

#[tokio::test]
async fn quick_and_deep_parameters_use_distinct_cache_entries() {
    let dir = TempDir::new().unwrap();
    let scanner = CompositeScanner::new()
        .register(Arc::new(StaticProvider {
            name: "screener",
            rows: vec![row("A", "screener", 5.0, 12.0, 6.0)],
        }))
        .with_cache(Cache::new("scan_results", Duration::from_secs(900), dir.path()));

    let quick = ScanParameters::new("US", 2.0, 20.0, ScanMode::Quick, 10.0, 5.0, 20.0).unwrap();
    let deep = ScanParameters::new("US", 2.0, 20.0, ScanMode::Deep, 10.0, 5.0, 20.0).unwrap();

    scanner.scan(&quick).await.unwrap();
    let deep_report = scanner.scan(&deep).await.unwrap();
    assert!(!deep_report.from_cache);
}
