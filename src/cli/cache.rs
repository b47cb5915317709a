//! Cache inspection command

use clap::Args;

use super::AppContext;

#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Remove all cached entries
    #[arg(long)]
    pub clear: bool,

    /// Remove one entry, given as namespace:key
    #[arg(long, value_name = "NAMESPACE:KEY", conflicts_with = "clear")]
    pub remove: Option<String>,
}

impl CacheArgs {
    pub fn execute(&self, ctx: &AppContext) -> anyhow::Result<()> {
        if self.clear {
            ctx.caches.clear_all();
            println!("Cache cleared");
            return Ok(());
        }

        if let Some(spec) = &self.remove {
            let (namespace, key) = spec
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("expected NAMESPACE:KEY, got {}", spec))?;
            let cache = match namespace {
                "scan_results" => ctx.caches.scan_results(),
                "universe" => ctx.caches.universe(),
                "quotes" => ctx.caches.quotes(),
                other => anyhow::bail!("unknown cache namespace {}", other),
            };
            cache.remove(key);
            println!("Removed {} from {}", key, namespace);
            return Ok(());
        }

        for cache in [
            ctx.caches.scan_results(),
            ctx.caches.universe(),
            ctx.caches.quotes(),
        ] {
            println!(
                "{:<14} {:>5} live entries (ttl {}s)",
                cache.name(),
                cache.len(),
                cache.ttl().as_secs()
            );
        }
        Ok(())
    }
}
