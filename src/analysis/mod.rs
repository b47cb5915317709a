//! Technical and volume-profile analysis
//!
//! Pure computation over OHLCV series. No I/O lives here; callers fetch
//! and validate history first.

mod indicators;
mod technical;

pub use indicators::{
    atr, bollinger_bands, consolidation_ratio, macd, rsi, setup_stage, BollingerBands, Macd,
    SetupStage,
};
pub use technical::{find_support_resistance, volume_profile, SupportResistance, VolumeProfile};

/// One price bin of a volume profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBin {
    pub low: f64,
    pub high: f64,
    pub volume: f64,
}

impl PriceBin {
    pub fn mid(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}
