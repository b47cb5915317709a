//! Catalyst signal sources
//!
//! News, options flow and social sentiment are external collaborators.
//! Scoring consumes the `CatalystSignals` struct; the default source
//! reports nothing, which keeps the pipeline fully testable offline.

use async_trait::async_trait;

use crate::error::ScanError;

/// Aggregated external catalyst evidence for one ticker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalystSignals {
    /// News-driven points, 0 to 10
    pub news_score: u8,
    /// Options-flow points, 0 to 10
    pub options_score: u8,
    /// Social-sentiment points, 0 to 10
    pub social_score: u8,
    /// Short label for the strongest catalyst, when known
    pub label: Option<String>,
}

impl CatalystSignals {
    /// Combined contribution, capped at the catalyst category budget
    pub fn total(&self) -> f64 {
        ((self.news_score + self.options_score + self.social_score) as f64).min(20.0)
    }

    pub fn has_news(&self) -> bool {
        self.news_score > 0
    }
}

/// Supplier of catalyst evidence
#[async_trait]
pub trait CatalystSource: Send + Sync {
    async fn signals(&self, ticker: &str) -> Result<CatalystSignals, ScanError>;
}

/// Default source: no external catalyst data available
pub struct NoCatalyst;

#[async_trait]
impl CatalystSource for NoCatalyst {
    async fn signals(&self, _ticker: &str) -> Result<CatalystSignals, ScanError> {
        Ok(CatalystSignals::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_capped_at_category_budget() {
        let signals = CatalystSignals {
            news_score: 10,
            options_score: 10,
            social_score: 10,
            label: None,
        };
        assert_eq!(signals.total(), 20.0);
    }

    #[test]
    fn test_total_sums_below_cap() {
        let signals = CatalystSignals {
            news_score: 5,
            options_score: 10,
            social_score: 0,
            label: Some("FDA".to_string()),
        };
        assert_eq!(signals.total(), 15.0);
        assert!(signals.has_news());
    }

    #[tokio::test]
    async fn test_no_catalyst_reports_nothing() {
        let signals = NoCatalyst.signals("ANY").await.unwrap();
        assert_eq!(signals, CatalystSignals::default());
        assert_eq!(signals.total(), 0.0);
        assert!(!signals.has_news());
    }
}
