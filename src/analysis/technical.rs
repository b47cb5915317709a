//! Support/resistance levels and volume profile

use crate::data::Candle;

use super::PriceBin;

/// Clustered pivot levels around the current price
#[derive(Debug, Clone, PartialEq)]
pub struct SupportResistance {
    /// Clustered pivot lows, ascending
    pub support_levels: Vec<f64>,
    /// Clustered pivot highs, ascending
    pub resistance_levels: Vec<f64>,
    /// Highest support strictly below the current price
    pub nearest_support: Option<f64>,
    /// Lowest resistance strictly above the current price
    pub nearest_resistance: Option<f64>,
    /// Support-resistance gap under 5% of price
    pub squeeze: bool,
}

/// Volume distribution over equal price bins
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProfile {
    pub bins: Vec<PriceBin>,
    /// Index of the Point of Control (heaviest bin)
    pub poc: usize,
    /// Inclusive bin range of the Value Area
    pub value_area: (usize, usize),
    pub total_volume: f64,
}

impl VolumeProfile {
    pub fn poc_price(&self) -> f64 {
        self.bins[self.poc].mid()
    }

    pub fn value_area_low(&self) -> f64 {
        self.bins[self.value_area.0].low
    }

    pub fn value_area_high(&self) -> f64 {
        self.bins[self.value_area.1].high
    }

    /// Volume captured inside the Value Area
    pub fn value_area_volume(&self) -> f64 {
        self.bins[self.value_area.0..=self.value_area.1]
            .iter()
            .map(|b| b.volume)
            .sum()
    }

    /// Bin mid-prices sorted by volume, heaviest first
    pub fn levels_by_volume(&self) -> Vec<f64> {
        let mut order: Vec<usize> = (0..self.bins.len()).collect();
        order.sort_by(|&a, &b| {
            self.bins[b]
                .volume
                .partial_cmp(&self.bins[a].volume)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.into_iter().map(|i| self.bins[i].mid()).collect()
    }
}

/// Find pivot-based support/resistance levels
///
/// A pivot high is a bar whose high is the maximum over the symmetric
/// window of width `2 * window + 1`; pivot lows mirror that. Pivots
/// within `cluster_pct` of a forming level are merged by running average.
pub fn find_support_resistance(
    candles: &[Candle],
    current_price: f64,
    window: usize,
    cluster_pct: f64,
) -> SupportResistance {
    let mut pivot_highs = Vec::new();
    let mut pivot_lows = Vec::new();

    if candles.len() > 2 * window {
        for i in window..candles.len() - window {
            let slice = &candles[i - window..=i + window];
            let high = candles[i].high;
            let low = candles[i].low;
            if slice.iter().all(|c| c.high <= high) {
                pivot_highs.push(high);
            }
            if slice.iter().all(|c| c.low >= low) {
                pivot_lows.push(low);
            }
        }
    }

    let resistance_levels = cluster_levels(&pivot_highs, cluster_pct);
    let support_levels = cluster_levels(&pivot_lows, cluster_pct);

    let nearest_support = support_levels
        .iter()
        .copied()
        .filter(|&l| l < current_price)
        .fold(None, |acc: Option<f64>, l| {
            Some(acc.map_or(l, |a| a.max(l)))
        });
    let nearest_resistance = resistance_levels
        .iter()
        .copied()
        .filter(|&l| l > current_price)
        .fold(None, |acc: Option<f64>, l| {
            Some(acc.map_or(l, |a| a.min(l)))
        });

    let squeeze = match (nearest_support, nearest_resistance) {
        (Some(s), Some(r)) if current_price > 0.0 => (r - s) / current_price < 0.05,
        _ => false,
    };

    SupportResistance {
        support_levels,
        resistance_levels,
        nearest_support,
        nearest_resistance,
        squeeze,
    }
}

/// Merge nearby pivot prices into averaged levels
fn cluster_levels(pivots: &[f64], cluster_pct: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = pivots.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut levels: Vec<f64> = Vec::new();
    let mut members = 0usize;
    for &price in &sorted {
        match levels.last_mut() {
            Some(level) if (price - *level).abs() / *level <= cluster_pct => {
                // running average of the cluster
                *level = (*level * members as f64 + price) / (members as f64 + 1.0);
                members += 1;
            }
            _ => {
                levels.push(price);
                members = 1;
            }
        }
    }
    levels
}

/// Build a volume profile over `bins` equal price bins
///
/// Each candle's volume is split across the bins its high-low span
/// overlaps, weighted by overlap length, so the bin sum equals the
/// series total exactly. The Value Area grows from the POC by annexing
/// whichever adjacent bin holds more volume until it captures at least
/// `value_area_frac` of the total.
pub fn volume_profile(candles: &[Candle], bins: usize, value_area_frac: f64) -> Option<VolumeProfile> {
    if candles.is_empty() || bins == 0 {
        return None;
    }

    let range_low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let range_high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    if !range_low.is_finite() || !range_high.is_finite() || range_high <= range_low {
        return None;
    }

    let bin_width = (range_high - range_low) / bins as f64;
    let mut volumes = vec![0.0f64; bins];

    for candle in candles {
        let volume = candle.volume as f64;
        let span = candle.high - candle.low;
        if span <= 0.0 {
            // Flat candle: all volume in one bin
            let idx = bin_index(candle.low, range_low, bin_width, bins);
            volumes[idx] += volume;
            continue;
        }
        let first = bin_index(candle.low, range_low, bin_width, bins);
        let last = bin_index(candle.high, range_low, bin_width, bins);
        for idx in first..=last {
            let bin_low = range_low + idx as f64 * bin_width;
            let bin_high = bin_low + bin_width;
            let overlap = candle.high.min(bin_high) - candle.low.max(bin_low);
            if overlap > 0.0 {
                volumes[idx] += volume * (overlap / span);
            }
        }
    }

    let total_volume: f64 = volumes.iter().sum();
    let poc = volumes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)?;

    let value_area = build_value_area(&volumes, poc, total_volume, value_area_frac);

    let bins_out = volumes
        .iter()
        .enumerate()
        .map(|(i, &volume)| PriceBin {
            low: range_low + i as f64 * bin_width,
            high: range_low + (i + 1) as f64 * bin_width,
            volume,
        })
        .collect();

    Some(VolumeProfile {
        bins: bins_out,
        poc,
        value_area,
        total_volume,
    })
}

fn bin_index(price: f64, range_low: f64, bin_width: f64, bins: usize) -> usize {
    if bin_width <= 0.0 {
        return 0;
    }
    (((price - range_low) / bin_width) as usize).min(bins - 1)
}

fn build_value_area(volumes: &[f64], poc: usize, total: f64, frac: f64) -> (usize, usize) {
    let mut low = poc;
    let mut high = poc;
    let mut captured = volumes[poc];
    if total <= 0.0 {
        return (low, high);
    }
    while captured / total < frac {
        let below = if low > 0 { Some(volumes[low - 1]) } else { None };
        let above = if high + 1 < volumes.len() {
            Some(volumes[high + 1])
        } else {
            None
        };
        match (below, above) {
            (Some(b), Some(a)) if b >= a => {
                low -= 1;
                captured += b;
            }
            (_, Some(a)) => {
                high += 1;
                captured += a;
            }
            (Some(b), None) => {
                low -= 1;
                captured += b;
            }
            (None, None) => break,
        }
    }
    (low, high)
}
