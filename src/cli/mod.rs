//! CLI interface for flowscan
//!
//! Provides subcommands for:
//! - `scan`: momentum scan across all providers
//! - `darkflow`: institutional volume-clustering scan
//! - `squeeze`: pressure-cooker short-squeeze scan
//! - `analyze`: deep analysis of a single ticker
//! - `cache`: show or clear the cache
//! - `config`: show configuration

mod analyze;
mod cache;
mod scan;

pub use analyze::AnalyzeArgs;
pub use cache::CacheArgs;
pub use scan::ScanArgs;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::cache::CacheManager;
use crate::config::Config;
use crate::data::ChartClient;
use crate::exec::ParallelExecutor;

#[derive(Parser, Debug)]
#[command(name = "flowscan")]
#[command(about = "Heuristic market scanner for momentum, dark-flow and squeeze setups")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Momentum scan across all providers
    Scan(ScanArgs),
    /// Institutional volume-clustering scan
    Darkflow(ScanArgs),
    /// Pressure-cooker short-squeeze scan
    Squeeze(ScanArgs),
    /// Deep analysis of a single ticker
    Analyze(AnalyzeArgs),
    /// Show or clear the cache
    Cache(CacheArgs),
    /// Show configuration
    Config,
}

/// Shared wiring for every command
pub struct AppContext {
    pub config: Config,
    pub caches: CacheManager,
    pub market: Arc<ChartClient>,
    pub executor: ParallelExecutor,
}

impl AppContext {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let caches = CacheManager::new(&config.cache);
        let market = Arc::new(ChartClient::new(&config.data)?);
        let executor = ParallelExecutor::new(&config.parallel, &config.rate_limit);
        Ok(Self {
            config,
            caches,
            market,
            executor,
        })
    }
}
