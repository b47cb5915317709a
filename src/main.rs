use clap::Parser;
use flowscan::cli::{AppContext, Cli, Commands};
use flowscan::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _guard = flowscan::telemetry::init_telemetry(&config.telemetry)?;

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Scan(args) => {
            tracing::info!(market = %args.market, mode = ?args.mode, "Momentum scan");
            args.execute(&ctx).await?;
        }
        Commands::Darkflow(args) => {
            tracing::info!(market = %args.market, "Dark-Flow scan");
            args.execute_darkflow(&ctx).await?;
        }
        Commands::Squeeze(args) => {
            tracing::info!(market = %args.market, "Pressure-cooker scan");
            args.execute_squeeze(&ctx).await?;
        }
        Commands::Analyze(args) => {
            args.execute(&ctx).await?;
        }
        Commands::Cache(args) => {
            args.execute(&ctx)?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Scan: change >= {}%, relvol >= {}x, float < {}M, price {} - {}",
                ctx.config.scan.min_change_pct,
                ctx.config.scan.min_rel_vol,
                ctx.config.scan.max_float_m,
                ctx.config.scan.min_price,
                ctx.config.scan.max_price
            );
            println!("  Cache dir: {}", ctx.config.cache.dir.display());
            println!(
                "  Workers: {} (timeout {}s)",
                ctx.config.parallel.effective_workers(),
                ctx.config.parallel.task_timeout_secs
            );
            println!(
                "  Rate limit: {}ms every {} requests",
                ctx.config.rate_limit.delay_ms, ctx.config.rate_limit.delay_every
            );
        }
    }

    Ok(())
}
