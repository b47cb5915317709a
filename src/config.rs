//! Configuration types for flowscan

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub screener: ScreenerConfig,
    #[serde(default)]
    pub universe: UniverseConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Default scan thresholds (the five pillars)
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Minimum day change percentage
    #[serde(default = "default_min_change_pct")]
    pub min_change_pct: f64,

    /// Minimum relative volume
    #[serde(default = "default_min_rel_vol")]
    pub min_rel_vol: f64,

    /// Maximum float in millions of shares
    #[serde(default = "default_max_float_m")]
    pub max_float_m: f64,

    /// Default price range lower bound
    #[serde(default = "default_min_price")]
    pub min_price: f64,

    /// Default price range upper bound
    #[serde(default = "default_max_price")]
    pub max_price: f64,
}

fn default_min_change_pct() -> f64 {
    10.0
}
fn default_min_rel_vol() -> f64 {
    5.0
}
fn default_max_float_m() -> f64 {
    20.0
}
fn default_min_price() -> f64 {
    2.0
}
fn default_max_price() -> f64 {
    20.0
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_change_pct: 10.0,
            min_rel_vol: 5.0,
            max_float_m: 20.0,
            min_price: 2.0,
            max_price: 20.0,
        }
    }
}

/// Screener provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenerConfig {
    /// Screener API base URL
    #[serde(default = "default_screener_url")]
    pub base_url: String,

    /// Rows re-verified against the higher-fidelity data source
    #[serde(default = "default_reverify_top")]
    pub reverify_top: usize,

    /// Per-query row limit
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_screener_url() -> String {
    "https://scanner.tradingview.com".to_string()
}
fn default_reverify_top() -> usize {
    25
}
fn default_query_limit() -> usize {
    50
}
fn default_http_timeout_secs() -> u64 {
    15
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: default_screener_url(),
            reverify_top: 25,
            query_limit: 50,
            timeout_secs: 15,
        }
    }
}

/// Full-universe provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UniverseConfig {
    /// Primary listing directory URL (pipe-delimited symbol file)
    #[serde(default = "default_listed_url")]
    pub listed_url: String,

    /// Secondary listing directory URL (other exchanges)
    #[serde(default = "default_other_listed_url")]
    pub other_listed_url: String,

    /// Cap on the prioritized subset scanned in smart mode
    #[serde(default = "default_smart_limit")]
    pub smart_limit: usize,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_listed_url() -> String {
    "https://www.nasdaqtrader.com/dynamic/symdir/nasdaqlisted.txt".to_string()
}
fn default_other_listed_url() -> String {
    "https://www.nasdaqtrader.com/dynamic/symdir/otherlisted.txt".to_string()
}
fn default_smart_limit() -> usize {
    500
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            listed_url: default_listed_url(),
            other_listed_url: default_other_listed_url(),
            smart_limit: 500,
            timeout_secs: 15,
        }
    }
}

/// Market data (quotes and historical bars) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Chart API base URL
    #[serde(default = "default_chart_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_chart_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: default_chart_url(),
            timeout_secs: 15,
        }
    }
}

/// Cache directory and per-namespace TTLs (seconds)
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the per-namespace cache files
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Scan results TTL (15 minutes)
    #[serde(default = "default_scan_results_ttl")]
    pub scan_results_ttl_secs: u64,

    /// Candidate universe TTL (4 hours)
    #[serde(default = "default_universe_ttl")]
    pub universe_ttl_secs: u64,

    /// Quote snapshot TTL (5 minutes)
    #[serde(default = "default_quotes_ttl")]
    pub quotes_ttl_secs: u64,
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("flowscan")
}
fn default_scan_results_ttl() -> u64 {
    900
}
fn default_universe_ttl() -> u64 {
    14_400
}
fn default_quotes_ttl() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            scan_results_ttl_secs: 900,
            universe_ttl_secs: 14_400,
            quotes_ttl_secs: 300,
        }
    }
}

/// Parallel executor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ParallelConfig {
    /// Worker count; 0 derives ~75% of available cores
    #[serde(default)]
    pub workers: usize,

    /// Per-task timeout in seconds
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Batch size for chunked processing of very large item sets
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_task_timeout_secs() -> u64 {
    60
}
fn default_batch_size() -> usize {
    100
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            task_timeout_secs: 60,
            batch_size: 100,
        }
    }
}

impl ParallelConfig {
    /// Resolve the effective worker count
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        ((cores * 3) / 4).max(1)
    }
}

/// Cooperative rate limiting: a fixed delay every N requests
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Insert a delay every N requests
    #[serde(default = "default_delay_every")]
    pub delay_every: u64,

    /// Delay duration in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_every() -> u64 {
    10
}
fn default_delay_ms() -> u64 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            delay_every: 10,
            delay_ms: 100,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Serve Prometheus metrics when true
    #[serde(default)]
    pub metrics_enabled: bool,
}

fn default_metrics_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            log_level: "info".to_string(),
            metrics_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
