//! Pressure-Cooker scoring: multi-factor short-squeeze setups
//!
//! Four weighted categories: squeeze fundamentals (40), technical setup
//! (25), catalyst strength (20) and a risk adjustment (-15 to +15). The
//! clamped sum maps to a letter grade.

use std::sync::Arc;

use crate::analysis::{
    bollinger_bands, find_support_resistance, macd, rsi, setup_stage, volume_profile, SetupStage,
    VolumeProfile,
};
use crate::catalyst::{CatalystSignals, CatalystSource, NoCatalyst};
use crate::data::{Candle, DataValidator, Interval, MarketData, Period};
use crate::error::ScanError;
use crate::exec::ParallelExecutor;

use super::types::{CandidateRow, Grade, ResultScore, ScanResult};

/// Pressure-Cooker tuning
#[derive(Debug, Clone)]
pub struct PressureConfig {
    /// Minimum score for a result to survive
    pub min_score: f64,
    /// Sweet-spot price range for the fundamentals bonus
    pub min_price: f64,
    pub max_price: f64,
    /// History window fetched per ticker
    pub period: Period,
    pub interval: Interval,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            min_score: 60.0,
            min_price: 1.0,
            max_price: 20.0,
            period: Period::Months(6),
            interval: Interval::Daily,
        }
    }
}

/// Everything the four scoring categories consume
#[derive(Debug, Clone)]
pub struct PressureMetrics {
    pub float_m: Option<f64>,
    /// Short interest as percent of float
    pub short_percent: f64,
    pub days_to_cover: f64,
    pub relative_volume: f64,
    pub avg_volume_20d: f64,
    pub has_reverse_split: bool,
    // Technical
    pub rsi: Option<f64>,
    pub macd_bullish: bool,
    pub near_lower_band: bool,
    pub sr_vp_score: f64,
    pub setup_stage: SetupStage,
    // Catalyst
    pub catalysts: CatalystSignals,
}

/// Per-category breakdown of one score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureScore {
    pub fundamentals: f64,
    pub technical: f64,
    pub catalyst: f64,
    pub risk: f64,
    pub total: f64,
    pub grade: Grade,
}

fn fundamentals_score(m: &PressureMetrics) -> f64 {
    let mut score = 0.0;

    if let Some(float_m) = m.float_m {
        score += if float_m < 1.0 {
            15.0
        } else if float_m < 2.0 {
            12.0
        } else if float_m < 5.0 {
            10.0
        } else {
            0.0
        };
    }

    score += if m.short_percent > 40.0 {
        15.0
    } else if m.short_percent > 30.0 {
        12.0
    } else if m.short_percent > 20.0 {
        10.0
    } else if m.short_percent > 10.0 {
        7.0
    } else {
        0.0
    };

    score += if m.relative_volume > 10.0 {
        10.0
    } else if m.relative_volume > 7.0 {
        8.0
    } else if m.relative_volume > 5.0 {
        6.0
    } else if m.relative_volume > 3.0 {
        4.0
    } else {
        0.0
    };

    score
}

fn technical_score(m: &PressureMetrics) -> f64 {
    let mut score = 0.0;
    if m.rsi.map(|r| r < 30.0).unwrap_or(false) {
        score += 8.0;
    }
    if m.macd_bullish {
        score += 7.0;
    }
    if m.near_lower_band {
        score += 10.0;
    }
    (score + m.sr_vp_score).min(25.0)
}

fn risk_score(m: &PressureMetrics) -> f64 {
    let mut score: f64 = 0.0;
    if m.has_reverse_split {
        score -= 5.0;
    }
    if m.avg_volume_20d < 500_000.0 {
        score -= 5.0;
    }
    if !m.catalysts.has_news() {
        score -= 3.0;
    }
    match m.setup_stage {
        SetupStage::Ready => score += 5.0,
        SetupStage::Breaking => score += 8.0,
        _ => {}
    }
    // Days-to-cover bonus
    if m.days_to_cover > 5.0 {
        score += 7.0;
    } else if m.days_to_cover > 3.0 {
        score += 3.0;
    }
    score.clamp(-15.0, 15.0)
}

/// Score one set of metrics; total is clamped to [0, 100]
pub fn pressure_score(m: &PressureMetrics) -> PressureScore {
    let fundamentals = fundamentals_score(m);
    let technical = technical_score(m);
    let catalyst = m.catalysts.total();
    let risk = risk_score(m);
    let total = (fundamentals + technical + catalyst + risk).clamp(0.0, 100.0);
    PressureScore {
        fundamentals,
        technical,
        catalyst,
        risk,
        total,
        grade: Grade::from_score(total),
    }
}

/// Support/resistance and volume-profile setup bonus, 0 to 30
pub fn sr_vp_score(candles: &[Candle], current_price: f64, rel_vol: f64) -> f64 {
    let mut score = 0.0;
    let sr = find_support_resistance(candles, current_price, 5, 0.02);

    if let Some(resistance) = sr.nearest_resistance {
        let distance_pct = (resistance - current_price) / current_price * 100.0;
        if distance_pct < 2.0 && rel_vol > 3.0 {
            score += 15.0;
        } else if distance_pct < 5.0 {
            score += 8.0;
        }
    }
    if let Some(support) = sr.nearest_support {
        let distance_pct = (current_price - support) / current_price * 100.0;
        if distance_pct < 2.0 {
            score += 10.0;
        }
    }
    if sr.squeeze {
        score += 5.0;
    }

    if let Some(profile) = volume_profile(candles, 20, 0.70) {
        score += profile_position_score(&profile, current_price, rel_vol);
    }

    score.min(30.0)
}

fn profile_position_score(profile: &VolumeProfile, current_price: f64, rel_vol: f64) -> f64 {
    let poc = profile.poc_price();
    if poc > 0.0 && (current_price - poc).abs() / poc < 0.02 {
        return 10.0;
    }
    if current_price > profile.value_area_high() && rel_vol > 3.0 {
        return 15.0;
    }
    if current_price < profile.value_area_low() {
        return 5.0;
    }
    0.0
}

/// Reverse-split signature: a >5x single-bar jump with volume halved
pub fn detect_reverse_split(candles: &[Candle]) -> bool {
    if candles.len() < 40 {
        return false;
    }
    let start = candles.len().saturating_sub(30);
    for i in start.max(1)..candles.len() {
        let prev = &candles[i - 1];
        let curr = &candles[i];
        if prev.close <= 0.0 || prev.volume == 0 {
            continue;
        }
        let price_change = (curr.close - prev.close) / prev.close;
        let volume_change = curr.volume as f64 / prev.volume as f64 - 1.0;
        if price_change > 4.0 && volume_change < -0.5 {
            return true;
        }
    }
    false
}

/// Fetches history and catalyst data per candidate and keeps survivors
pub struct PressureScanner {
    config: PressureConfig,
    market: Arc<dyn MarketData>,
    catalysts: Arc<dyn CatalystSource>,
    validator: DataValidator,
}

impl PressureScanner {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self {
            config: PressureConfig::default(),
            market,
            catalysts: Arc::new(NoCatalyst),
            validator: DataValidator::default(),
        }
    }

    pub fn with_config(mut self, config: PressureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalyst_source(mut self, source: Arc<dyn CatalystSource>) -> Self {
        self.catalysts = source;
        self
    }

    /// Build metrics for one candidate from history plus catalyst data
    pub async fn analyze_row(&self, row: &CandidateRow) -> Result<PressureMetrics, ScanError> {
        let candles = self
            .market
            .history(&row.ticker, self.config.period, self.config.interval)
            .await?;
        self.validator.validate(&row.ticker, &candles)?;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let current_price = row.close;

        let avg_volume_20d = {
            let tail: Vec<u64> = candles.iter().rev().take(20).map(|c| c.volume).collect();
            if tail.is_empty() {
                0.0
            } else {
                tail.iter().sum::<u64>() as f64 / tail.len() as f64
            }
        };

        let near_lower_band = bollinger_bands(&closes, 20, 2.0)
            .map(|b| b.lower > 0.0 && (current_price - b.lower).abs() / b.lower < 0.02)
            .unwrap_or(false);

        let catalysts = self
            .catalysts
            .signals(&row.ticker)
            .await
            .unwrap_or_default();

        Ok(PressureMetrics {
            float_m: row.float_shares.map(|f| f as f64 / 1_000_000.0),
            // Rows from sources without short-interest coverage score
            // zero on those tiers
            short_percent: row.short_percent.unwrap_or(0.0),
            days_to_cover: row.days_to_cover.unwrap_or(0.0),
            relative_volume: row.relative_volume,
            avg_volume_20d,
            has_reverse_split: detect_reverse_split(&candles),
            rsi: rsi(&closes, 14),
            macd_bullish: macd(&closes, 12, 26, 9).map(|m| m.histogram > 0.0).unwrap_or(false),
            near_lower_band,
            sr_vp_score: sr_vp_score(&candles, current_price, row.relative_volume),
            setup_stage: setup_stage(&candles),
            catalysts,
        })
    }

    /// Deep-analyze candidate rows and keep those at or above the floor
    pub async fn scan_rows(
        &self,
        rows: Vec<CandidateRow>,
        executor: &ParallelExecutor,
    ) -> Vec<ScanResult> {
        let min_score = self.config.min_score;
        let scanner = Arc::new(PressureScanner {
            config: self.config.clone(),
            market: self.market.clone(),
            catalysts: self.catalysts.clone(),
            validator: self.validator.clone(),
        });

        let mut results = executor
            .process(rows, move |row: CandidateRow| {
                let scanner = scanner.clone();
                async move {
                    let metrics = scanner.analyze_row(&row).await?;
                    let scored = pressure_score(&metrics);
                    if scored.total < min_score {
                        return Err(ScanError::DataQuality(format!(
                            "{}: score {:.0} below floor",
                            row.ticker, scored.total
                        )));
                    }
                    let catalyst = metrics.catalysts.label.clone().or_else(|| {
                        Some(format!("Pressure {:.0}/100 grade {}", scored.total, scored.grade))
                    });
                    Ok(ScanResult::from_row(
                        &row,
                        ResultScore::PressureCooker {
                            score: scored.total,
                            grade: scored.grade,
                        },
                        catalyst,
                    ))
                }
            })
            .await;

        super::types::sort_results(&mut results);
        results
    }
}
