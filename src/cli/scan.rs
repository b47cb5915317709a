//! Scan command implementations

use std::sync::Arc;

use clap::Args;
use tokio::sync::mpsc;

use crate::data::MarketData;
use crate::error::ScanError;
use crate::exec::{ParallelExecutor, ProgressEvent};
use crate::prefilter::{FilterCriteria, PreFilter, Verdict};
use crate::provider::{Provider, ScreenerProvider, UniverseProvider};
use crate::scan::{
    CandidateRow, CompositeScanner, DarkFlowScanner, PressureScanner, ResultScore, ScanMode,
    ScanParameters, ScanResult,
};

use super::AppContext;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Market to scan
    #[arg(short, long, default_value = "america")]
    pub market: String,

    /// Scan mode
    #[arg(long, value_enum, default_value = "smart")]
    pub mode: ModeArg,

    /// Price range lower bound (config default when omitted)
    #[arg(long)]
    pub min_price: Option<f64>,

    /// Price range upper bound (config default when omitted)
    #[arg(long)]
    pub max_price: Option<f64>,

    /// Bypass the results cache
    #[arg(long)]
    pub no_cache: bool,

    /// Maximum rows to print
    #[arg(short = 'n', long, default_value_t = 25)]
    pub limit: usize,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Quick,
    Smart,
    Deep,
}

impl From<ModeArg> for ScanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Quick => ScanMode::Quick,
            ModeArg::Smart => ScanMode::Smart,
            ModeArg::Deep => ScanMode::Deep,
        }
    }
}

impl ScanArgs {
    fn params(&self, ctx: &AppContext) -> anyhow::Result<ScanParameters> {
        let scan = &ctx.config.scan;
        Ok(ScanParameters::new(
            self.market.clone(),
            self.min_price.unwrap_or(scan.min_price),
            self.max_price.unwrap_or(scan.max_price),
            self.mode.into(),
            scan.min_change_pct,
            scan.min_rel_vol,
            scan.max_float_m,
        )?)
    }

    fn providers(&self, ctx: &AppContext) -> anyhow::Result<Vec<Arc<dyn Provider>>> {
        let screener = Arc::new(ScreenerProvider::new(
            &ctx.config.screener,
            ctx.market.clone(),
        )?);
        let universe = Arc::new(UniverseProvider::new(
            &ctx.config.universe,
            ctx.market.clone(),
            ctx.caches.universe().clone(),
            progress_executor(ctx),
        )?);
        Ok(vec![screener, universe])
    }

    /// Momentum scan across all providers
    pub async fn execute(&self, ctx: &AppContext) -> anyhow::Result<()> {
        let params = self.params(ctx)?;
        let mut scanner = CompositeScanner::new();
        for provider in self.providers(ctx)? {
            scanner = scanner.register(provider);
        }
        if !self.no_cache {
            scanner = scanner.with_cache(ctx.caches.scan_results().clone());
        }

        let report = scanner.scan(&params).await?;
        if report.from_cache {
            println!("(cached results)");
        }
        print_results(&report.results, self.limit);
        Ok(())
    }

    /// Dark-Flow scan: candidate rows from providers, quote pre-filter,
    /// deep analysis last
    pub async fn execute_darkflow(&self, ctx: &AppContext) -> anyhow::Result<()> {
        let params = self.params(ctx)?;
        let rows = self.collect_rows(ctx, &params).await?;
        let executor = progress_executor(ctx);
        let rows = prefilter_rows(
            rows,
            FilterCriteria::dark_flow(),
            ctx.market.clone(),
            &executor,
        )
        .await;
        let scanner = DarkFlowScanner::new(ctx.market.clone());
        let results = scanner.scan_rows(rows, &executor).await;
        print_results(&results, self.limit);
        Ok(())
    }

    /// Pressure-cooker scan over the same candidate pipeline
    pub async fn execute_squeeze(&self, ctx: &AppContext) -> anyhow::Result<()> {
        let params = self.params(ctx)?;
        let rows = self.collect_rows(ctx, &params).await?;
        let executor = progress_executor(ctx);
        let rows = prefilter_rows(
            rows,
            FilterCriteria::squeeze(),
            ctx.market.clone(),
            &executor,
        )
        .await;
        let scanner = PressureScanner::new(ctx.market.clone());
        let results = scanner.scan_rows(rows, &executor).await;
        print_results(&results, self.limit);
        Ok(())
    }

    async fn collect_rows(
        &self,
        ctx: &AppContext,
        params: &ScanParameters,
    ) -> anyhow::Result<Vec<crate::scan::CandidateRow>> {
        params.validate()?;
        let mut rows = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for provider in self.providers(ctx)? {
            match provider.scan(params).await {
                Ok(provider_rows) => {
                    for row in provider_rows {
                        if seen.insert(row.ticker.clone()) {
                            rows.push(row);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(provider = provider.name(), %err, "Provider failed, skipping");
                }
            }
        }
        Ok(rows)
    }
}

/// Gate candidate rows through the quote pre-filter before any
/// per-ticker history is spent on them
async fn prefilter_rows(
    rows: Vec<CandidateRow>,
    criteria: FilterCriteria,
    market: Arc<dyn MarketData>,
    executor: &ParallelExecutor,
) -> Vec<CandidateRow> {
    let prefilter = Arc::new(PreFilter::new(criteria, market));
    let survivors = executor
        .process(rows, {
            let prefilter = prefilter.clone();
            move |row: CandidateRow| {
                let prefilter = prefilter.clone();
                async move {
                    match prefilter.quick_check(&row.ticker).await {
                        Verdict::Pass => Ok(row),
                        Verdict::Reject { reason } => Err(ScanError::DataQuality(reason)),
                    }
                }
            }
        })
        .await;
    let stats = prefilter.stats();
    tracing::info!(
        checked = stats.checked,
        passed = stats.passed,
        rejected = stats.rejected,
        "Pre-filter pass done"
    );
    survivors
}

/// Executor with a progress sink that logs batch completion
fn progress_executor(ctx: &AppContext) -> crate::exec::ParallelExecutor {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Started { total } => {
                    tracing::info!(total, "Deep analysis started");
                }
                ProgressEvent::ItemDone { completed, total, .. } => {
                    if completed % 50 == 0 || completed == total {
                        tracing::info!(completed, total, "Deep analysis progress");
                    }
                }
                ProgressEvent::BatchDone { batch, batches } => {
                    tracing::debug!(batch, batches, "Batch complete");
                }
                ProgressEvent::Finished { succeeded, failed } => {
                    tracing::info!(succeeded, failed, "Deep analysis finished");
                }
            }
        }
    });
    ctx.executor.clone().with_progress(tx)
}

fn print_results(results: &[ScanResult], limit: usize) {
    if results.is_empty() {
        println!("No qualifying candidates");
        return;
    }
    println!(
        "{:<8} {:>8} {:>8} {:>7} {:>9} {:<6} {:<10} {}",
        "TICKER", "PRICE", "CHANGE%", "RELVOL", "SCORE", "FLOAT", "SOURCE", "CATALYST"
    );
    for result in results.iter().take(limit) {
        let score = match result.score {
            ResultScore::Momentum { pillars, quality } => format!("{}/5|{:.0}", pillars, quality),
            ResultScore::DarkFlow { score } => format!("{:.0}/100", score),
            ResultScore::PressureCooker { score, grade } => format!("{:.0}({})", score, grade),
        };
        let float = result
            .float_shares
            .map(|f| format!("{:.1}M", f as f64 / 1_000_000.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:>8.2} {:>7.1}% {:>6.1}x {:>9} {:<6} {:<10} {}",
            result.ticker,
            result.price,
            result.change_pct,
            result.relative_volume,
            score,
            float,
            result.source,
            result.catalyst.as_deref().unwrap_or("-"),
        );
    }
    if results.len() > limit {
        println!("... and {} more", results.len() - limit);
    }
}
