//! Prometheus metrics

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Serve the Prometheus scrape endpoint on the given port
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;
    tracing::info!(%addr, "Metrics endpoint listening");
    Ok(())
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Screener query round trip
    ScreenerQuery,
    /// Single history fetch
    HistoryFetch,
    /// One full provider scan
    ProviderScan,
    /// End-to-end composite scan
    CompositeScan,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Size of the cached candidate universe
    UniverseSize,
    /// Results in the latest scan
    LastScanResults,
    /// Pre-filter pass rate of the latest scan
    PrefilterPassRate,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::ScreenerQuery => "flowscan_screener_query_seconds",
        LatencyMetric::HistoryFetch => "flowscan_history_fetch_seconds",
        LatencyMetric::ProviderScan => "flowscan_provider_scan_seconds",
        LatencyMetric::CompositeScan => "flowscan_composite_scan_seconds",
    };
    metrics::histogram!(metric_name).record(duration.as_secs_f64());
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::UniverseSize => "flowscan_universe_size",
        GaugeMetric::LastScanResults => "flowscan_last_scan_results",
        GaugeMetric::PrefilterPassRate => "flowscan_prefilter_pass_rate",
    };
    metrics::gauge!(metric_name).set(value);
}
