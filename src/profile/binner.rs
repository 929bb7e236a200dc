use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::ProfileError;

/// Integer price level: `round(price / step)`
/// Uses integer representation for consistent ordering and exact comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PriceBin(pub i64);

impl PriceBin {
    /// Next bin (higher price by one step)
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Previous bin (lower price by one step)
    pub fn previous(self) -> Self {
        Self(self.0 - 1)
    }

    pub fn offset(self, bins: i64) -> Self {
        Self(self.0 + bins)
    }

    /// Absolute distance in bins
    pub fn distance(self, other: PriceBin) -> u64 {
        self.0.abs_diff(other.0)
    }

    pub fn index(self) -> i64 {
        self.0
    }
}

/// Maps prices onto a fixed step grid for one analysis run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBinner {
    step: f64,
}

impl PriceBinner {
    /// `step` is validated by `ProfileConfig::validate`
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn bin(&self, price: f64) -> Result<PriceBin, ProfileError> {
        if !price.is_finite() {
            return Err(ProfileError::NonFinitePrice(price));
        }
        Ok(PriceBin((price / self.step).round() as i64))
    }

    /// Representative price of a bin (bin index × step)
    pub fn price(&self, bin: PriceBin) -> f64 {
        bin.0 as f64 * self.step
    }

    /// Fractional bin coordinate of a price, unrounded
    pub fn position(&self, price: f64) -> f64 {
        price / self.step
    }

    /// Bin coordinate of the midpoint between two prices
    pub fn midpoint(&self, high: f64, low: f64) -> f64 {
        self.position((high + low) / 2.0)
    }

    /// Price span covered between two bin centers
    pub fn span(&self, low: PriceBin, high: PriceBin) -> f64 {
        high.0.saturating_sub(low.0) as f64 * self.step
    }
}

/// Slack when comparing distances to a fractional midpoint
const MIDPOINT_EPSILON: f64 = 1e-9;

/// Pick the bin holding the maximum value.
///
/// Ties go to the bin nearest `midpoint`, the session's `(high + low) / 2`
/// expressed in bin units (see [`PriceBinner::position`]), then to the lower bin.
pub fn select_peak_bin<V>(histogram: &BTreeMap<PriceBin, V>, midpoint: f64) -> Option<PriceBin>
where
    V: PartialOrd + Copy,
{
    let mut best: Option<(PriceBin, V, f64)> = None;

    // Ascending iteration: on a full tie the earlier (lower) bin is kept
    for (&bin, &value) in histogram {
        let distance = (bin.0 as f64 - midpoint).abs();
        let replace = match best {
            None => true,
            Some((_, best_value, best_distance)) => {
                value > best_value || (value == best_value && distance + MIDPOINT_EPSILON < best_distance)
            }
        };
        if replace {
            best = Some((bin, value, distance));
        }
    }

    best.map(|(bin, _, _)| bin)
}
