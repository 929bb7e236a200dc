//! Time Price Opportunity (TPO) profile.
//!
//! The session is cut into fixed periods starting at the session start. Each
//! period marks every bin between its traded low and high (inclusive) as
//! touched, modelling continuous trading through the range rather than exact
//! prints. A bin's TPO count is the number of distinct periods touching it.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::binner::{select_peak_bin, PriceBin, PriceBinner};
use super::structs::{PoorExtreme, Tick, TpoProfileResult, ValueArea};
use crate::config::ProfileConfig;

/// Absolute slack when comparing accumulated coverage against a fractional target
const COVERAGE_EPSILON: f64 = 1e-9;

/// Traded range of one TPO period
#[derive(Debug, Clone, Copy, PartialEq)]
struct PeriodRange {
    low: f64,
    high: f64,
}

/// Per-bin TPO counts for one session
#[derive(Debug, Clone, PartialEq)]
pub struct TpoHistogram {
    binner: PriceBinner,
    counts: BTreeMap<PriceBin, u32>,
    low: Option<PriceBin>,
    high: Option<PriceBin>,
    /// Raw traded range across all periods
    price_low: Option<f64>,
    price_high: Option<f64>,
}

/// Value area expressed in bins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueAreaBins {
    pub low: PriceBin,
    pub high: PriceBin,
    pub tpo_count: u32,
    /// Bin whose count reached the target; `None` when the POC alone covers it
    pub last_added: Option<PriceBin>,
}

/// A run of single-print bins, possibly bridging one-bin gaps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinglePrintRun {
    pub low: PriceBin,
    pub high: PriceBin,
    /// Number of single-print bins in the run (gap bins excluded)
    pub bins: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expansion {
    Up,
    Down,
    Both,
}

impl TpoHistogram {
    pub fn new(binner: PriceBinner) -> Self {
        Self {
            binner,
            counts: BTreeMap::new(),
            low: None,
            high: None,
            price_low: None,
            price_high: None,
        }
    }

    /// Mark every bin of one period's traded range `[low, high]` as touched
    pub fn mark_period(&mut self, low_price: f64, high_price: f64) {
        let (Ok(low), Ok(high)) = (self.binner.bin(low_price), self.binner.bin(high_price)) else {
            return;
        };
        self.price_low = Some(self.price_low.map_or(low_price, |l| l.min(low_price)));
        self.price_high = Some(self.price_high.map_or(high_price, |h| h.max(high_price)));
        for index in low.0..=high.0 {
            *self.counts.entry(PriceBin(index)).or_insert(0) += 1;
        }
        self.low = Some(self.low.map_or(low, |l| l.min(low)));
        self.high = Some(self.high.map_or(high, |h| h.max(high)));
    }

    pub fn count_at(&self, bin: PriceBin) -> u32 {
        self.counts.get(&bin).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn bounds(&self) -> Option<(PriceBin, PriceBin)> {
        Some((self.low?, self.high?))
    }

    /// TPO count summed over `[low, high]`
    pub fn count_between(&self, low: PriceBin, high: PriceBin) -> u32 {
        if low > high {
            return 0;
        }
        self.counts.range(low..=high).map(|(_, count)| *count).sum()
    }

    /// Highest-count bin, ties broken toward the session's price midpoint
    pub fn poc(&self) -> Option<PriceBin> {
        let midpoint = self.binner.midpoint(self.price_high?, self.price_low?);
        select_peak_bin(&self.counts, midpoint)
    }

    /// Expand from the POC until `fraction` of the total count is covered.
    ///
    /// Each step compares the two bins above the upper boundary with the two
    /// below the lower boundary (one bin when only one is left) and extends
    /// toward the larger sum; equal sums extend both sides. Bins are taken one
    /// at a time, nearest first, so expansion stops on the exact bin that
    /// reaches the target. Only that last bin is guaranteed to be required; the
    /// boundary on the other side may be removable.
    pub fn value_area(&self, fraction: f64) -> Option<ValueAreaBins> {
        let poc = self.poc()?;
        let (floor, ceiling) = self.bounds()?;
        let target = fraction * self.total() as f64;
        let reached = |covered: u32| covered as f64 + COVERAGE_EPSILON >= target;

        let mut low = poc;
        let mut high = poc;
        let mut covered = self.count_at(poc);
        let mut last_added = None;

        'expand: while !reached(covered) {
            let up: Vec<PriceBin> = (1..=2).map(|k| high.offset(k)).filter(|b| *b <= ceiling).collect();
            let down: Vec<PriceBin> = (1..=2).map(|k| low.offset(-k)).filter(|b| *b >= floor).collect();
            if up.is_empty() && down.is_empty() {
                break;
            }

            let up_sum: u32 = up.iter().map(|b| self.count_at(*b)).sum();
            let down_sum: u32 = down.iter().map(|b| self.count_at(*b)).sum();
            let direction = if down.is_empty() || (!up.is_empty() && up_sum > down_sum) {
                Expansion::Up
            } else if up.is_empty() || down_sum > up_sum {
                Expansion::Down
            } else {
                Expansion::Both
            };

            for k in 0..2 {
                if direction != Expansion::Down {
                    if let Some(&bin) = up.get(k) {
                        high = bin;
                        last_added = Some(bin);
                        covered += self.count_at(bin);
                        if reached(covered) {
                            break 'expand;
                        }
                    }
                }
                if direction != Expansion::Up {
                    if let Some(&bin) = down.get(k) {
                        low = bin;
                        last_added = Some(bin);
                        covered += self.count_at(bin);
                        if reached(covered) {
                            break 'expand;
                        }
                    }
                }
            }
        }

        Some(ValueAreaBins { low, high, tpo_count: covered, last_added })
    }

    /// Group bins with a count of exactly one into runs, bridging gaps of at most one bin
    pub fn single_print_runs(&self) -> Vec<SinglePrintRun> {
        let mut runs: Vec<SinglePrintRun> = Vec::new();

        for (&bin, _) in self.counts.iter().filter(|(_, count)| **count == 1) {
            match runs.last_mut() {
                Some(run) if bin.distance(run.high) <= 2 => {
                    run.high = bin;
                    run.bins += 1;
                }
                _ => runs.push(SinglePrintRun { low: bin, high: bin, bins: 1 }),
            }
        }

        runs
    }
}

/// Builds the TPO histogram and derived levels for one session
#[derive(Debug, Clone)]
pub struct TpoProfileBuilder<'a> {
    config: &'a ProfileConfig,
    binner: PriceBinner,
    session_start: DateTime<Utc>,
    period_ms: i64,
    periods: BTreeMap<u32, PeriodRange>,
}

impl<'a> TpoProfileBuilder<'a> {
    pub fn new(config: &'a ProfileConfig, binner: PriceBinner, session_start: DateTime<Utc>) -> Self {
        Self {
            config,
            binner,
            session_start,
            period_ms: i64::from(config.tpo_period_minutes) * 60_000,
            periods: BTreeMap::new(),
        }
    }

    /// Period index of a timestamp; `None` before the session start
    pub fn period_index(&self, timestamp: DateTime<Utc>) -> Option<u32> {
        let elapsed = (timestamp - self.session_start).num_milliseconds();
        if elapsed < 0 {
            return None;
        }
        u32::try_from(elapsed / self.period_ms).ok()
    }

    pub fn add_tick(&mut self, tick: &Tick) {
        if !tick.price.is_finite() {
            return;
        }
        let Some(period) = self.period_index(tick.timestamp) else {
            return;
        };
        self.periods
            .entry(period)
            .and_modify(|range| {
                range.low = range.low.min(tick.price);
                range.high = range.high.max(tick.price);
            })
            .or_insert(PeriodRange { low: tick.price, high: tick.price });
    }

    pub fn histogram(&self) -> TpoHistogram {
        let mut histogram = TpoHistogram::new(self.binner);
        for range in self.periods.values() {
            histogram.mark_period(range.low, range.high);
        }
        histogram
    }

    /// Initial balance: traded range over the first `initial_balance_periods` periods
    fn initial_balance(&self) -> (Option<f64>, Option<f64>) {
        let mut ib_high: Option<f64> = None;
        let mut ib_low: Option<f64> = None;
        for range in self.periods.range(..self.config.initial_balance_periods).map(|(_, r)| r) {
            ib_high = Some(ib_high.map_or(range.high, |h| h.max(range.high)));
            ib_low = Some(ib_low.map_or(range.low, |l| l.min(range.low)));
        }
        (ib_high, ib_low)
    }

    fn session_extremes(&self) -> Option<(f64, f64)> {
        let high = self.periods.values().map(|r| r.high).reduce(f64::max)?;
        let low = self.periods.values().map(|r| r.low).reduce(f64::min)?;
        Some((high, low))
    }

    pub fn finish(self) -> TpoProfileResult {
        let histogram = self.histogram();
        let Some((session_high, session_low)) = self.session_extremes() else {
            return TpoProfileResult::default();
        };
        let binner = self.binner;

        let poc_price = histogram.poc().map(|bin| binner.price(bin));

        let value_area = histogram.value_area(self.config.value_area_percent).map(|va| {
            let total = histogram.total();
            ValueArea {
                high: binner.price(va.high),
                low: binner.price(va.low),
                tpo_count: va.tpo_count,
                coverage: if total > 0 { va.tpo_count as f64 / total as f64 } else { 0.0 },
            }
        });

        let (ib_high, ib_low) = self.initial_balance();

        let threshold = self.config.poor_extreme_threshold;
        let poor_high = match binner.bin(session_high) {
            Ok(bin) if histogram.count_at(bin) >= threshold => PoorExtreme::poor(session_high),
            _ => PoorExtreme::default(),
        };
        let poor_low = match binner.bin(session_low) {
            Ok(bin) if histogram.count_at(bin) >= threshold => PoorExtreme::poor(session_low),
            _ => PoorExtreme::default(),
        };

        let qualifying = histogram
            .single_print_runs()
            .into_iter()
            .filter(|run| {
                run.bins >= self.config.single_print_threshold
                    || binner.span(run.low, run.high) >= self.config.single_print_min_span
            })
            .fold(None::<SinglePrintRun>, |widest, run| match widest {
                Some(w) if w.low.distance(w.high) >= run.low.distance(run.high) => Some(w),
                _ => Some(run),
            });

        let period_count = self.periods.len() as u32;
        debug!(
            periods = period_count,
            tpo_total = histogram.total(),
            poc = ?poc_price,
            single_prints = qualifying.is_some(),
            "TPO profile built"
        );

        TpoProfileResult {
            poc_price,
            value_area,
            ib_high,
            ib_low,
            poor_high,
            poor_low,
            single_prints: qualifying.is_some(),
            single_print_high: qualifying.map(|run| binner.price(run.high)),
            single_print_low: qualifying.map(|run| binner.price(run.low)),
            period_count,
        }
    }
}
