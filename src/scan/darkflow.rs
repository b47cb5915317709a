//! Dark-Flow analysis: institutional volume clustering signals
//!
//! Pure analysis over an intraday series plus a 0-100 signal score.
//! The scanner wrapper fetches history for candidate rows through the
//! executor and keeps everything at or above the minimum score.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::{volume_profile, VolumeProfile};
use crate::data::{Candle, DataValidator, Interval, MarketData, Period};
use crate::error::ScanError;
use crate::exec::ParallelExecutor;

use super::types::{CandidateRow, ResultScore, ScanResult};

/// Dark-Flow analyzer tuning
#[derive(Debug, Clone)]
pub struct DarkFlowConfig {
    /// Volume profile bin count
    pub bins: usize,
    /// Key levels kept from the profile, nearest first
    pub key_levels: usize,
    /// Minimum score for a result to survive
    pub min_score: f64,
    /// Rows below this relative volume skip deep analysis
    pub min_relative_volume: f64,
    /// History window fetched per ticker
    pub period: Period,
    pub interval: Interval,
}

impl Default for DarkFlowConfig {
    fn default() -> Self {
        Self {
            bins: 20,
            key_levels: 5,
            min_score: 50.0,
            min_relative_volume: 1.5,
            period: Period::Days(5),
            interval: Interval::Minutes(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PocTrend {
    Rising,
    Falling,
    Stable,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapDirection {
    Up,
    Down,
}

/// An overnight gap between consecutive bars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    pub direction: GapDirection,
    pub pct: f64,
}

/// Everything the score and the presentation layer need for one ticker
#[derive(Debug, Clone)]
pub struct DarkFlowAnalysis {
    pub ticker: String,
    pub current_price: f64,
    pub today_open: f64,
    pub today_high: f64,
    pub today_low: f64,
    pub bias: Bias,
    /// Session bias and POC migration agree
    pub bias_confirmed: bool,
    /// Heaviest-volume prices, nearest to current price first
    pub key_levels: Vec<f64>,
    /// A key level sits within 0.5% of the current price
    pub cluster_at_price: bool,
    pub unusual_volume_count: usize,
    pub gaps: Vec<Gap>,
    pub poc_trend: PocTrend,
    /// Low-volume prices that act as magnets
    pub imbalances: Vec<f64>,
    pub profile: VolumeProfile,
    pub squeeze_pct: Option<f64>,
}

/// Analyze one series; None when the series cannot produce a profile
pub fn analyze(ticker: &str, candles: &[Candle], config: &DarkFlowConfig) -> Option<DarkFlowAnalysis> {
    let last = candles.last()?;
    let current_price = last.close;
    if current_price <= 0.0 {
        return None;
    }

    // Session open is the first bar of the latest day
    let today = last.timestamp.date_naive();
    let session: Vec<&Candle> = candles
        .iter()
        .filter(|c| c.timestamp.date_naive() == today)
        .collect();
    let today_open = session.first().map(|c| c.open).unwrap_or(last.open);
    let today_high = session
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let today_low = session.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

    let profile = volume_profile(candles, config.bins, 0.70)?;

    let mut key_levels = profile.levels_by_volume();
    key_levels.truncate(10);
    key_levels.sort_by(|a, b| {
        (a - current_price)
            .abs()
            .partial_cmp(&(b - current_price).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    key_levels.truncate(config.key_levels);

    let cluster_at_price = key_levels
        .iter()
        .take(3)
        .any(|&l| (current_price - l).abs() / current_price < 0.005);

    let unusual_volume_count = detect_unusual_volume(candles);
    let gaps = detect_gaps(candles);
    let poc_trend = poc_migration(candles, config.bins);

    let base_bias = if current_price > today_open {
        Bias::Bullish
    } else {
        Bias::Bearish
    };
    let bias_confirmed = matches!(
        (base_bias, poc_trend),
        (Bias::Bullish, PocTrend::Rising) | (Bias::Bearish, PocTrend::Falling)
    );

    // Squeeze between nearest opposing key levels
    let support = key_levels
        .iter()
        .copied()
        .filter(|&l| l < current_price)
        .fold(None, |acc: Option<f64>, l| Some(acc.map_or(l, |a| a.max(l))));
    let resistance = key_levels
        .iter()
        .copied()
        .filter(|&l| l > current_price)
        .fold(None, |acc: Option<f64>, l| Some(acc.map_or(l, |a| a.min(l))));
    let squeeze_pct = match (support, resistance) {
        (Some(s), Some(r)) => Some((r - s) / current_price),
        _ => None,
    };

    // Bottom-quintile bins are imbalance zones
    let mut sorted_volumes: Vec<f64> = profile.bins.iter().map(|b| b.volume).collect();
    sorted_volumes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let threshold = sorted_volumes[sorted_volumes.len() / 5];
    let imbalances: Vec<f64> = profile
        .bins
        .iter()
        .filter(|b| b.volume < threshold)
        .map(|b| b.mid())
        .take(3)
        .collect();

    Some(DarkFlowAnalysis {
        ticker: ticker.to_string(),
        current_price,
        today_open,
        today_high,
        today_low,
        bias: base_bias,
        bias_confirmed,
        key_levels,
        cluster_at_price,
        unusual_volume_count,
        gaps,
        poc_trend,
        imbalances,
        profile,
        squeeze_pct,
    })
}

/// Bars whose volume exceeds mean + 2 standard deviations
fn detect_unusual_volume(candles: &[Candle]) -> usize {
    if candles.len() < 2 {
        return 0;
    }
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume as f64).collect();
    let mean = volumes.iter().sum::<f64>() / volumes.len() as f64;
    let var = volumes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (volumes.len() as f64 - 1.0);
    let sd = var.sqrt();
    volumes.iter().filter(|&&v| v > mean + 2.0 * sd).count()
}

/// Gaps over 1% between a close and the next open
fn detect_gaps(candles: &[Candle]) -> Vec<Gap> {
    let mut gaps = Vec::new();
    for w in candles.windows(2) {
        let prev_close = w[0].close;
        let open = w[1].open;
        if prev_close <= 0.0 {
            continue;
        }
        let pct = (open - prev_close).abs() / prev_close;
        if pct > 0.01 {
            gaps.push(Gap {
                direction: if open > prev_close {
                    GapDirection::Up
                } else {
                    GapDirection::Down
                },
                pct: pct * 100.0,
            });
        }
    }
    gaps
}

/// Compare the POC of the recent half against the earlier half
fn poc_migration(candles: &[Candle], bins: usize) -> PocTrend {
    if candles.len() < 10 {
        return PocTrend::Unknown;
    }
    let mid = candles.len() / 2;
    let (Some(previous), Some(recent)) = (
        volume_profile(&candles[..mid], bins, 0.70),
        volume_profile(&candles[mid..], bins, 0.70),
    ) else {
        return PocTrend::Unknown;
    };
    let prev_poc = previous.poc_price();
    if prev_poc <= 0.0 {
        return PocTrend::Unknown;
    }
    let change_pct = (recent.poc_price() - prev_poc) / prev_poc * 100.0;
    if change_pct > 2.0 {
        PocTrend::Rising
    } else if change_pct < -2.0 {
        PocTrend::Falling
    } else {
        PocTrend::Stable
    }
}

/// Score the signal strength of one analysis (0-100)
pub fn dark_flow_score(analysis: &DarkFlowAnalysis) -> f64 {
    let mut score: f64 = 0.0;
    let price = analysis.current_price;

    // 1. Institutional activity at the current level
    if analysis.cluster_at_price {
        score += 30.0;
    } else if let Some(closest) = analysis.key_levels.first() {
        if (closest - price).abs() / price < 0.02 {
            score += 20.0;
        }
    }

    // 2. Unusual volume events
    if analysis.unusual_volume_count >= 3 {
        score += 20.0;
    } else if analysis.unusual_volume_count >= 1 {
        score += 10.0;
    }

    // 3. Bullish bias while coiling
    if analysis.bias == Bias::Bullish && price > 0.0 {
        let range_pct = (analysis.today_high - analysis.today_low) / price;
        if range_pct < 0.03 {
            score += 20.0;
        } else if range_pct < 0.05 {
            score += 10.0;
        }
    }

    // 4. Squeeze between the nearest opposing key levels; fewer than
    // three levels is too sparse a profile to call a squeeze
    if analysis.key_levels.len() >= 3 {
        if let Some(squeeze_pct) = analysis.squeeze_pct {
            if squeeze_pct < 0.05 {
                score += 15.0;
            } else if squeeze_pct < 0.10 {
                score += 8.0;
            }
        }
    }

    // 5. Gap behavior confirming the bias
    if let Some(gap) = analysis.gaps.last() {
        if analysis.bias == Bias::Bullish {
            score += match gap.direction {
                GapDirection::Down => 15.0, // filled down-gap
                GapDirection::Up => 8.0,    // continuing up-gap
            };
        }
    }

    score.min(100.0)
}

/// Fetches history per candidate and keeps qualifying Dark-Flow results
pub struct DarkFlowScanner {
    config: DarkFlowConfig,
    market: Arc<dyn MarketData>,
    validator: DataValidator,
}

impl DarkFlowScanner {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self {
            config: DarkFlowConfig::default(),
            market,
            validator: DataValidator::default(),
        }
    }

    pub fn with_config(mut self, config: DarkFlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Analyze one ticker end to end
    pub async fn analyze_ticker(&self, ticker: &str) -> Result<DarkFlowAnalysis, ScanError> {
        let candles = self
            .market
            .history(ticker, self.config.period, self.config.interval)
            .await?;
        self.validator.validate(ticker, &candles)?;
        analyze(ticker, &candles, &self.config)
            .ok_or_else(|| ScanError::DataQuality(format!("{}: no analyzable profile", ticker)))
    }

    /// Deep-analyze candidate rows and keep those at or above the score floor
    pub async fn scan_rows(
        &self,
        rows: Vec<CandidateRow>,
        executor: &ParallelExecutor,
    ) -> Vec<ScanResult> {
        let rows: Vec<CandidateRow> = rows
            .into_iter()
            .filter(|row| row.relative_volume >= self.config.min_relative_volume)
            .collect();
        let min_score = self.config.min_score;
        let scanner = Arc::new(DarkFlowScanner {
            config: self.config.clone(),
            market: self.market.clone(),
            validator: self.validator.clone(),
        });

        let mut results = executor
            .process(rows, move |row: CandidateRow| {
                let scanner = scanner.clone();
                async move {
                    let analysis = scanner.analyze_ticker(&row.ticker).await?;
                    let score = dark_flow_score(&analysis);
                    if score < min_score {
                        return Err(ScanError::DataQuality(format!(
                            "{}: score {:.0} below floor",
                            row.ticker, score
                        )));
                    }
                    let catalyst = Some(format!(
                        "Dark Flow {:.0}/100, {} levels",
                        score,
                        analysis.key_levels.len()
                    ));
                    Ok(ScanResult::from_row(
                        &row,
                        ResultScore::DarkFlow { score },
                        catalyst,
                    ))
                }
            })
            .await;

        super::types::sort_results(&mut results);
        results
    }
}
