//! Candidate providers
//!
//! Each provider turns scan parameters into normalized candidate rows.
//! Providers may fail on network or auth problems; the composite
//! scanner catches those and continues with the remaining providers.

mod filters;
mod screener;
mod universe;

pub use filters::{
    is_likely_delisted, is_likely_etf, is_priority_exchange, is_test_symbol, is_warrant,
    prioritize_tickers, FilterOutcome, ListedSymbol, TickerFilter,
};
pub use screener::ScreenerProvider;
pub use universe::UniverseProvider;

use async_trait::async_trait;

use crate::error::ScanError;
use crate::scan::types::{CandidateRow, ScanParameters};

/// Source of raw candidate rows
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable tag used for result attribution and dedup ordering
    fn name(&self) -> &str;

    async fn scan(&self, params: &ScanParameters) -> Result<Vec<CandidateRow>, ScanError>;
}
