//! Cheap metadata-only pre-filtering
//!
//! Rejects tickers from a single quote snapshot before any historical
//! fetch is spent on them. Transient fetch failures are retried through
//! the shared backoff policy and then counted as rejections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::backoff::BackoffPolicy;
use crate::data::MarketData;

/// Bounds checked against a quote snapshot
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    pub min_price: f64,
    pub max_price: f64,
    pub min_volume: u64,
    pub min_change_pct: Option<f64>,
    pub max_float_shares: Option<u64>,
    pub max_market_cap: Option<f64>,
}

impl FilterCriteria {
    /// Momentum runners: low-priced, already moving, busy tape
    pub fn momentum() -> Self {
        Self {
            min_price: 2.0,
            max_price: 20.0,
            min_volume: 500_000,
            min_change_pct: Some(5.0),
            max_float_shares: Some(50_000_000),
            max_market_cap: Some(500_000_000.0),
        }
    }

    /// Institutional-accumulation candidates: quieter tape allowed
    pub fn dark_flow() -> Self {
        Self {
            min_price: 1.0,
            max_price: 50.0,
            min_volume: 300_000,
            min_change_pct: None,
            max_float_shares: None,
            max_market_cap: Some(2_000_000_000.0),
        }
    }

    /// Squeeze candidates: tight floats above all else
    pub fn squeeze() -> Self {
        Self {
            min_price: 1.0,
            max_price: 30.0,
            min_volume: 200_000,
            min_change_pct: None,
            max_float_shares: Some(30_000_000),
            max_market_cap: Some(1_000_000_000.0),
        }
    }
}

/// Outcome of a quick check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Reject { reason: String },
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    fn reject(reason: impl Into<String>) -> Self {
        Verdict::Reject {
            reason: reason.into(),
        }
    }
}

/// Aggregate counter snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStats {
    pub checked: u64,
    pub passed: u64,
    pub rejected: u64,
    pub rejections_by_reason: HashMap<String, u64>,
}

/// Quote-only gatekeeper shared across executor tasks
pub struct PreFilter {
    criteria: FilterCriteria,
    market: Arc<dyn MarketData>,
    backoff: BackoffPolicy,
    checked: AtomicU64,
    passed: AtomicU64,
    rejected: AtomicU64,
    // Taken only on the rejection path
    reasons: Mutex<HashMap<String, u64>>,
}

impl PreFilter {
    pub fn new(criteria: FilterCriteria, market: Arc<dyn MarketData>) -> Self {
        Self {
            criteria,
            market,
            backoff: BackoffPolicy::default(),
            checked: AtomicU64::new(0),
            passed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            reasons: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Check one ticker against the criteria using only its quote
    pub async fn quick_check(&self, ticker: &str) -> Verdict {
        self.checked.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("flowscan_prefilter_checked_total").increment(1);

        let quote = match self
            .backoff
            .retry(|| async { self.market.quote(ticker).await })
            .await
        {
            Ok(quote) => quote,
            Err(err) => {
                return self.record_reject(format!("quote unavailable: {}", err));
            }
        };

        let c = &self.criteria;
        if quote.price < c.min_price || quote.price > c.max_price {
            return self.record_reject(format!(
                "price {:.2} outside [{:.2}, {:.2}]",
                quote.price, c.min_price, c.max_price
            ));
        }
        if quote.volume < c.min_volume {
            return self.record_reject(format!(
                "volume {} below {}",
                quote.volume, c.min_volume
            ));
        }
        if let Some(min_change) = c.min_change_pct {
            if quote.change_pct < min_change {
                return self.record_reject(format!(
                    "change {:.1}% below {:.1}%",
                    quote.change_pct, min_change
                ));
            }
        }
        if let (Some(max_float), Some(float)) = (c.max_float_shares, quote.float_shares) {
            if float > max_float {
                return self.record_reject(format!("float {} above {}", float, max_float));
            }
        }
        if let (Some(max_cap), Some(cap)) = (c.max_market_cap, quote.market_cap) {
            if cap > max_cap {
                return self.record_reject(format!("market cap {:.0} above {:.0}", cap, max_cap));
            }
        }

        self.passed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("flowscan_prefilter_passed_total").increment(1);
        Verdict::Pass
    }

    fn record_reject(&self, reason: String) -> Verdict {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("flowscan_prefilter_rejected_total").increment(1);
        if let Ok(mut reasons) = self.reasons.lock() {
            *reasons.entry(reason.clone()).or_insert(0) += 1;
        }
        Verdict::reject(reason)
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            checked: self.checked.load(Ordering::Relaxed),
            passed: self.passed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            rejections_by_reason: self
                .reasons
                .lock()
                .map(|r| r.clone())
                .unwrap_or_default(),
        }
    }
}
