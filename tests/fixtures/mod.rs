#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use market_profile::profile::{PoorExtreme, SessionId, SessionProfile, SessionTicks, Tick};

/// Deterministic pseudo-random source for reproducible tick streams
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Uniform in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

/// Create a tick with volume split evenly between bid and ask
pub fn create_tick(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Tick {
    Tick::new(timestamp, price, volume, volume / 2.0, volume / 2.0)
}

/// One tick per minute from `start`, walking in 0.25 increments
pub fn random_walk_ticks(seed: u64, start: DateTime<Utc>, minutes: i64, start_price: f64) -> Vec<Tick> {
    let mut rng = Lcg::new(seed);
    let mut price = start_price;
    (0..minutes)
        .map(|minute| {
            let step = ((rng.next_f64() - 0.5) * 8.0).round() * 0.25;
            price = (price + step).max(1.0);
            let volume = 1.0 + (rng.next_f64() * 20.0).floor();
            let ask_share = rng.next_f64();
            Tick::new(
                start + Duration::minutes(minute),
                price,
                volume,
                volume * (1.0 - ask_share),
                volume * ask_share,
            )
        })
        .collect()
}

/// Random-walk session of `hours` starting at `hour` on 2024-01-`day`
pub fn create_session_ticks(seed: u64, day: u32, name: &str, hour: u32, hours: i64) -> SessionTicks {
    let start = utc(2024, 1, day, hour, 0);
    SessionTicks::new(
        SessionId::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), name),
        start,
        start + Duration::hours(hours),
        random_walk_ticks(seed, start, hours * 60, 100.0),
    )
}

/// Minimal profile with a traded range and volume POC, for tracker tests
pub fn create_profile(day: u32, name: &str, hour: u32, low: f64, high: f64, volume_poc: Option<f64>) -> SessionProfile {
    let start = utc(2024, 1, day, hour, 0);
    SessionProfile {
        session_id: SessionId::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), name),
        start,
        end: start + Duration::hours(8),
        open: Some(low),
        high: Some(high),
        low: Some(low),
        close: Some((low + high) / 2.0),
        total_volume: 100.0,
        delta: 0.0,
        tick_count: 100,
        dropped_ticks: 0,
        volume_poc_price: volume_poc,
        tpo_poc_price: volume_poc,
        vah: None,
        val: None,
        ib_high: None,
        ib_low: None,
        poor_high: PoorExtreme::default(),
        poor_low: PoorExtreme::default(),
        single_prints: false,
        single_print_high: None,
        single_print_low: None,
        tpo_period_count: 16,
    }
}

/// Headerless tick CSV covering `days` weekdays from 2024-01-01, 00:00 to 21:00
pub fn create_tick_csv(seed: u64, days: u32) -> String {
    let mut csv = String::new();
    let mut price = 100.0;
    for day in 1..=days {
        let ticks = random_walk_ticks(seed + u64::from(day), utc(2024, 1, day, 0, 0), 21 * 60, price);
        if let Some(last) = ticks.last() {
            price = last.price;
        }
        for t in ticks {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                t.timestamp.format("%Y-%m-%d %H:%M:%S"),
                t.price,
                t.price,
                t.price,
                t.price,
                t.volume,
                1,
                t.bid_volume,
                t.ask_volume
            ));
        }
    }
    csv
}
