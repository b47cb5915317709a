//! Scan parameter and result types

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// How much of the candidate universe a scan covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Screener results only; universe provider skipped
    Quick,
    /// Screener plus a prioritized universe subset
    Smart,
    /// Screener plus the entire filtered universe
    Deep,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Quick => write!(f, "quick"),
            ScanMode::Smart => write!(f, "smart"),
            ScanMode::Deep => write!(f, "deep"),
        }
    }
}

/// Validated inputs to one scan request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanParameters {
    pub market: String,
    pub min_price: f64,
    pub max_price: f64,
    pub mode: ScanMode,
    pub min_change_pct: f64,
    pub min_rel_vol: f64,
    pub max_float_m: f64,
}

impl ScanParameters {
    /// Construct validated parameters; violations fail before any I/O
    pub fn new(
        market: impl Into<String>,
        min_price: f64,
        max_price: f64,
        mode: ScanMode,
        min_change_pct: f64,
        min_rel_vol: f64,
        max_float_m: f64,
    ) -> Result<Self, ScanError> {
        let params = Self {
            market: market.into(),
            min_price,
            max_price,
            mode,
            min_change_pct,
            min_rel_vol,
            max_float_m,
        };
        params.validate()?;
        Ok(params)
    }

    /// Re-check the invariants; fields are public so callers re-validate
    /// at the scan boundary
    pub fn validate(&self) -> Result<(), ScanError> {
        if !(self.min_price < self.max_price) {
            return Err(ScanError::InvalidParams(format!(
                "min_price {} must be below max_price {}",
                self.min_price, self.max_price
            )));
        }
        if self.min_price < 0.0 {
            return Err(ScanError::InvalidParams(format!(
                "min_price {} must be non-negative",
                self.min_price
            )));
        }
        if self.min_change_pct < 0.0 || self.min_rel_vol < 0.0 || self.max_float_m < 0.0 {
            return Err(ScanError::InvalidParams(
                "thresholds must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache fingerprint: identical parameters share a cache entry
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{:.2}:{:.2}:{:.1}:{:.1}:{:.1}",
            self.market,
            self.mode,
            self.min_price,
            self.max_price,
            self.min_change_pct,
            self.min_rel_vol,
            self.max_float_m
        )
    }
}

/// Raw normalized row emitted by a provider, unscored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRow {
    pub ticker: String,
    pub close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub change_pct: f64,
    pub relative_volume: f64,
    pub float_shares: Option<u64>,
    pub market_cap: Option<f64>,
    pub exchange: Option<String>,
    /// Short interest as percent of float, when the source reports it
    pub short_percent: Option<f64>,
    pub days_to_cover: Option<f64>,
    /// Provider tag, kept through dedup for attribution
    pub source: String,
}

/// Letter grade for a pressure-cooker score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Grade is a pure function of score
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::B
        } else if score >= 70.0 {
            Grade::C
        } else if score >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{}", letter)
    }
}

/// Score attached to a result at construction, tagged by engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultScore {
    Momentum { pillars: u8, quality: f64 },
    DarkFlow { score: f64 },
    PressureCooker { score: f64, grade: Grade },
}

impl ResultScore {
    /// Scalar used for ranking
    pub fn value(&self) -> f64 {
        match self {
            ResultScore::Momentum { quality, .. } => *quality,
            ResultScore::DarkFlow { score } => *score,
            ResultScore::PressureCooker { score, .. } => *score,
        }
    }
}

/// One ranked scan hit; immutable after construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub ticker: String,
    pub price: f64,
    pub change_pct: f64,
    pub relative_volume: f64,
    pub volume: u64,
    pub float_shares: Option<u64>,
    pub market_cap: Option<f64>,
    pub exchange: Option<String>,
    pub catalyst: Option<String>,
    pub source: String,
    /// Float under 20M shares
    pub low_float: bool,
    pub score: ResultScore,
}

pub const LOW_FLOAT_SHARES: u64 = 20_000_000;

impl ScanResult {
    /// Build a result from a provider row and its computed score
    pub fn from_row(row: &CandidateRow, score: ResultScore, catalyst: Option<String>) -> Self {
        Self {
            ticker: row.ticker.clone(),
            price: row.close,
            change_pct: row.change_pct,
            relative_volume: row.relative_volume,
            volume: row.volume,
            float_shares: row.float_shares,
            market_cap: row.market_cap,
            exchange: row.exchange.clone(),
            catalyst,
            source: row.source.clone(),
            low_float: row.float_shares.map(|f| f < LOW_FLOAT_SHARES).unwrap_or(false),
            score,
        }
    }

    /// Descending sort: score first, then day change
    pub fn sort_key(&self) -> (f64, f64) {
        (self.score.value(), self.change_pct)
    }
}

/// Sort results by (score desc, change% desc)
pub fn sort_results(results: &mut [ScanResult]) {
    results.sort_by(|a, b| {
        b.sort_key()
            .partial_cmp(&a.sort_key())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn row(ticker: &str, close: f64, change_pct: f64) -> CandidateRow {
        CandidateRow {
            ticker: ticker.to_string(),
            close,
            open: close * 0.95,
            high: close * 1.05,
            low: close * 0.9,
            volume: 5_000_000,
            change_pct,
            relative_volume: 6.0,
            float_shares: Some(12_000_000),
            market_cap: Some(60_000_000.0),
            exchange: Some("NASDAQ".to_string()),
            short_percent: None,
            days_to_cover: None,
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_params_require_price_ordering() {
        let err = ScanParameters::new("US", 20.0, 2.0, ScanMode::Quick, 10.0, 5.0, 20.0);
        assert!(matches!(err, Err(ScanError::InvalidParams(_))));
        let eq = ScanParameters::new("US", 5.0, 5.0, ScanMode::Quick, 10.0, 5.0, 20.0);
        assert!(eq.is_err());
    }

    #[test]
    fn test_params_reject_negative_thresholds() {
        let err = ScanParameters::new("US", 2.0, 20.0, ScanMode::Smart, -1.0, 5.0, 20.0);
        assert!(err.is_err());
    }

    #[test]
    fn test_cache_key_distinguishes_modes() {
        let a = ScanParameters::new("US", 2.0, 20.0, ScanMode::Quick, 10.0, 5.0, 20.0).unwrap();
        let b = ScanParameters::new("US", 2.0, 20.0, ScanMode::Deep, 10.0, 5.0, 20.0).unwrap();
        assert_ne!(a.cache_key(), b.cache_key());
        let a2 = ScanParameters::new("US", 2.0, 20.0, ScanMode::Quick, 10.0, 5.0, 20.0).unwrap();
        assert_eq!(a.cache_key(), a2.cache_key());
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(Grade::from_score(95.0), Grade::A);
        assert_eq!(Grade::from_score(90.0), Grade::A);
        assert_eq!(Grade::from_score(89.9), Grade::B);
        assert_eq!(Grade::from_score(70.0), Grade::C);
        assert_eq!(Grade::from_score(60.0), Grade::D);
        assert_eq!(Grade::from_score(59.9), Grade::F);
        assert_eq!(Grade::from_score(0.0), Grade::F);
    }

    #[test]
    fn test_low_float_derived_at_construction() {
        let mut r = row("LOWF", 5.0, 12.0);
        r.float_shares = Some(19_999_999);
        let result = ScanResult::from_row(
            &r,
            ResultScore::Momentum {
                pillars: 4,
                quality: 80.0,
            },
            None,
        );
        assert!(result.low_float);

        r.float_shares = Some(20_000_000);
        let result = ScanResult::from_row(&r, ResultScore::DarkFlow { score: 50.0 }, None);
        assert!(!result.low_float);

        r.float_shares = None;
        let result = ScanResult::from_row(&r, ResultScore::DarkFlow { score: 50.0 }, None);
        assert!(!result.low_float);
    }

    #[test]
    fn test_sort_by_score_then_change() {
        let mut results = vec![
            ScanResult::from_row(
                &row("A", 5.0, 8.0),
                ResultScore::Momentum {
                    pillars: 3,
                    quality: 60.0,
                },
                None,
            ),
            ScanResult::from_row(
                &row("B", 5.0, 15.0),
                ResultScore::Momentum {
                    pillars: 4,
                    quality: 80.0,
                },
                None,
            ),
            ScanResult::from_row(
                &row("C", 5.0, 20.0),
                ResultScore::Momentum {
                    pillars: 3,
                    quality: 60.0,
                },
                None,
            ),
        ];
        sort_results(&mut results);
        let order: Vec<&str> = results.iter().map(|r| r.ticker.as_str()).collect();
        // B has the top score; C beats A on change% at equal score
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_result_score_serde_tagging() {
        let score = ResultScore::PressureCooker {
            score: 85.0,
            grade: Grade::B,
        };
        let json = serde_json::to_string(&score).unwrap();
        assert!(json.contains("pressure_cooker"));
        let back: ResultScore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, score);
    }
}
