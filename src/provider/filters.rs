//! Heuristic symbol filtering
//!
//! Shrinks a full listing directory by an order of magnitude without
//! spending a single API call: name keywords for funds, ticker-shape
//! rules for warrants and test symbols, exchange whitelisting.

const ETF_KEYWORDS: &[&str] = &[
    "ETF",
    "FUND",
    "TRUST",
    "INDEX",
    "LEVERAGED",
    "TREASURY",
    "BOND",
    "NOTE",
    "BITCOIN",
    "ETHEREUM",
    "GOLD",
    "SILVER",
    "COMMODITY",
];

const PRIORITY_EXCHANGES: &[&str] = &["NASDAQ", "P", "A", "Z"];

/// Security name suggests a fund rather than an operating company
pub fn is_likely_etf(name: &str) -> bool {
    let upper = name.to_uppercase();
    ETF_KEYWORDS.iter().any(|k| upper.contains(k))
}

pub fn is_test_symbol(ticker: &str) -> bool {
    ticker.ends_with(".TEST")
}

/// Warrant shapes: explicit `.W` suffix, or a trailing W after a
/// non-letter class marker (catches "ABCD.W"-style fifth characters
/// without rejecting ordinary words like "BELOW")
pub fn is_warrant(ticker: &str) -> bool {
    if ticker.ends_with(".W") {
        return true;
    }
    let bytes = ticker.as_bytes();
    if bytes.len() > 4 && bytes[bytes.len() - 1] == b'W' {
        let before = bytes[bytes.len() - 2] as char;
        if !before.is_ascii_alphabetic() {
            return true;
        }
    }
    false
}

pub fn is_priority_exchange(exchange: &str) -> bool {
    PRIORITY_EXCHANGES.contains(&exchange)
}

/// Signs of a delisted or dead listing
pub fn is_likely_delisted(ticker: &str, price: f64, volume: u64, market_cap: Option<f64>) -> bool {
    if ticker.ends_with('Q') || ticker.ends_with('E') || ticker.ends_with('D') {
        return true;
    }
    if price < 0.0001 && volume < 1000 {
        return true;
    }
    if volume == 0 {
        return true;
    }
    if let Some(cap) = market_cap {
        if cap < 100_000.0 {
            return true;
        }
    }
    false
}

/// One entry of a listing directory
#[derive(Debug, Clone)]
pub struct ListedSymbol {
    pub ticker: String,
    pub name: String,
    pub exchange: String,
}

/// Counters for one filtering pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub total: usize,
    pub kept: usize,
    pub dropped_test: usize,
    pub dropped_warrant: usize,
    pub dropped_long: usize,
    pub dropped_etf: usize,
    pub dropped_exchange: usize,
}

/// Stateful heuristic filter that keeps drop statistics
#[derive(Debug, Default)]
pub struct TickerFilter {
    outcome: FilterOutcome,
}

impl TickerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep likely micro-cap candidates, counting what each rule drops
    pub fn filter(&mut self, symbols: &[ListedSymbol]) -> Vec<String> {
        self.outcome = FilterOutcome {
            total: symbols.len(),
            ..Default::default()
        };
        let mut kept = Vec::new();
        for s in symbols {
            if is_test_symbol(&s.ticker) {
                self.outcome.dropped_test += 1;
                continue;
            }
            if is_warrant(&s.ticker) {
                self.outcome.dropped_warrant += 1;
                continue;
            }
            if s.ticker.len() > 5 {
                self.outcome.dropped_long += 1;
                continue;
            }
            if is_likely_etf(&s.name) {
                self.outcome.dropped_etf += 1;
                continue;
            }
            if !is_priority_exchange(&s.exchange) {
                self.outcome.dropped_exchange += 1;
                continue;
            }
            kept.push(s.ticker.clone());
        }
        self.outcome.kept = kept.len();
        tracing::debug!(
            total = self.outcome.total,
            kept = self.outcome.kept,
            etf = self.outcome.dropped_etf,
            warrants = self.outcome.dropped_warrant,
            "Heuristic filter pass"
        );
        kept
    }

    pub fn outcome(&self) -> &FilterOutcome {
        &self.outcome
    }
}

/// Cap a ticker list, favoring 4-letter symbols 80/20
///
/// Four-letter tickers skew toward the small NASDAQ listings this
/// pipeline targets, so they get most of the budget.
pub fn prioritize_tickers(tickers: Vec<String>, limit: usize) -> Vec<String> {
    if tickers.len() <= limit {
        return tickers;
    }
    let mut priority = Vec::new();
    let mut others = Vec::new();
    for t in tickers {
        if t.len() == 4 {
            priority.push(t);
        } else {
            others.push(t);
        }
    }

    let priority_budget = ((limit * 4) / 5).min(priority.len());
    let mut out: Vec<String> = priority.into_iter().take(priority_budget).collect();
    out.extend(others.into_iter().take(limit - out.len()));
    out
}
