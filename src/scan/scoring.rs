//! Pillars and quality scoring for momentum candidates

use super::types::{CandidateRow, ScanParameters};

fn float_millions(row: &CandidateRow) -> Option<f64> {
    row.float_shares.map(|f| f as f64 / 1_000_000.0)
}

/// Count how many of the five pillars a candidate satisfies
///
/// Change, relative volume, float ceiling, price-range membership, and
/// the combined catalyst pillar (change and relative volume together).
pub fn pillars_score(row: &CandidateRow, params: &ScanParameters) -> u8 {
    let mut met = 0u8;

    let change_ok = row.change_pct >= params.min_change_pct;
    let rel_vol_ok = row.relative_volume >= params.min_rel_vol;

    if change_ok {
        met += 1;
    }
    if rel_vol_ok {
        met += 1;
    }
    // Unknown float never counts as low float
    if float_millions(row).map(|f| f < params.max_float_m).unwrap_or(false) {
        met += 1;
    }
    if row.close >= params.min_price && row.close <= params.max_price {
        met += 1;
    }
    if change_ok && rel_vol_ok {
        met += 1;
    }

    met
}

/// Tiered 0-100 quality score
pub fn quality_score(row: &CandidateRow) -> f64 {
    let mut score = 0.0;

    // Change tier (max 30)
    score += if row.change_pct >= 50.0 {
        30.0
    } else if row.change_pct >= 25.0 {
        25.0
    } else if row.change_pct >= 15.0 {
        20.0
    } else {
        15.0
    };

    // Relative volume tier (max 30)
    score += if row.relative_volume >= 20.0 {
        30.0
    } else if row.relative_volume >= 10.0 {
        25.0
    } else if row.relative_volume >= 7.0 {
        20.0
    } else {
        15.0
    };

    // Float tier (max 20)
    if let Some(float_m) = float_millions(row) {
        score += if float_m < 1.0 {
            20.0
        } else if float_m < 5.0 {
            15.0
        } else if float_m < 10.0 {
            10.0
        } else if float_m < 20.0 {
            5.0
        } else {
            0.0
        };
    }

    // Price sweet spot (max 10)
    if (5.0..=15.0).contains(&row.close) {
        score += 10.0;
    } else if (3.0..=20.0).contains(&row.close) {
        score += 5.0;
    }

    // Strong momentum bonus (max 10)
    if row.change_pct >= 20.0 && row.relative_volume >= 10.0 {
        score += 10.0;
    } else if row.change_pct >= 15.0 && row.relative_volume >= 7.0 {
        score += 5.0;
    }

    score
}
