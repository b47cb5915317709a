//! Single-ticker analysis command

use clap::Args;

use crate::analysis::{find_support_resistance, volume_profile};
use crate::data::{Interval, MarketData, Period};
use crate::scan::{dark_flow_score, DarkFlowScanner};

use super::AppContext;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Ticker symbol
    pub ticker: String,

    /// Daily history window in months
    #[arg(long, default_value_t = 3)]
    pub months: u32,
}

impl AnalyzeArgs {
    pub async fn execute(&self, ctx: &AppContext) -> anyhow::Result<()> {
        let ticker = self.ticker.to_uppercase();

        let quote = ctx.market.quote(&ticker).await?;
        println!("{} @ {:.2} ({:+.1}%)", ticker, quote.price, quote.change_pct);
        println!(
            "  Volume {} ({:.1}x average)",
            quote.volume,
            quote.relative_volume()
        );

        let daily = ctx
            .market
            .history(&ticker, Period::Months(self.months), Interval::Daily)
            .await?;

        let sr = find_support_resistance(&daily, quote.price, 5, 0.02);
        match (sr.nearest_support, sr.nearest_resistance) {
            (Some(s), Some(r)) => {
                println!("  Support {:.2} / Resistance {:.2}", s, r);
                if sr.squeeze {
                    println!("  Squeeze: band under 5% of price");
                }
            }
            (Some(s), None) => println!("  Support {:.2}, no resistance above", s),
            (None, Some(r)) => println!("  Resistance {:.2}, no support below", r),
            (None, None) => println!("  No clustered pivot levels found"),
        }

        if let Some(profile) = volume_profile(&daily, 20, 0.70) {
            println!(
                "  POC {:.2}, value area {:.2} - {:.2}",
                profile.poc_price(),
                profile.value_area_low(),
                profile.value_area_high()
            );
        }

        let scanner = DarkFlowScanner::new(ctx.market.clone());
        match scanner.analyze_ticker(&ticker).await {
            Ok(analysis) => {
                println!(
                    "  Dark Flow {:.0}/100 ({:?} bias, {} unusual volume events)",
                    dark_flow_score(&analysis),
                    analysis.bias,
                    analysis.unusual_volume_count
                );
            }
            Err(err) => {
                tracing::debug!(%err, "Intraday analysis unavailable");
            }
        }

        Ok(())
    }
}
