use std::collections::BTreeMap;

use tracing::debug;

use super::binner::{select_peak_bin, PriceBin, PriceBinner};
use super::structs::{Tick, VolumeProfileResult};

/// Accumulates traded volume per price bin for one session
#[derive(Debug, Clone)]
pub struct VolumeProfileBuilder {
    binner: PriceBinner,
    /// Price levels mapped to volume (BTreeMap for sorted access)
    levels: BTreeMap<PriceBin, f64>,
    /// Raw traded range, used for the tie-break midpoint
    price_low: Option<f64>,
    price_high: Option<f64>,
    total_volume: f64,
}

impl VolumeProfileBuilder {
    pub fn new(binner: PriceBinner) -> Self {
        Self {
            binner,
            levels: BTreeMap::new(),
            price_low: None,
            price_high: None,
            total_volume: 0.0,
        }
    }

    /// Add a validated tick; order of calls does not affect the result
    pub fn add_tick(&mut self, tick: &Tick) {
        let Ok(bin) = self.binner.bin(tick.price) else {
            return;
        };
        *self.levels.entry(bin).or_insert(0.0) += tick.volume;
        self.total_volume += tick.volume;
        self.price_low = Some(self.price_low.map_or(tick.price, |low| low.min(tick.price)));
        self.price_high = Some(self.price_high.map_or(tick.price, |high| high.max(tick.price)));
    }

    pub fn volume_at(&self, bin: PriceBin) -> f64 {
        self.levels.get(&bin).copied().unwrap_or(0.0)
    }

    /// Bin with the highest volume; `None` when the session traded nothing
    pub fn poc_bin(&self) -> Option<PriceBin> {
        if self.total_volume <= 0.0 {
            return None;
        }
        let midpoint = self.binner.midpoint(self.price_high?, self.price_low?);
        select_peak_bin(&self.levels, midpoint)
    }

    pub fn finish(self) -> VolumeProfileResult {
        let poc_price = self.poc_bin().map(|bin| self.binner.price(bin));
        debug!(
            levels = self.levels.len(),
            total_volume = self.total_volume,
            poc = ?poc_price,
            "Volume profile built"
        );
        VolumeProfileResult {
            poc_price,
            total_volume: self.total_volume,
            level_count: self.levels.len(),
        }
    }
}
