use tracing::{debug, warn};

use super::binner::PriceBinner;
use super::errors::ProfileError;
use super::structs::{
    SessionProfile, SessionSummary, SessionTicks, Tick, TpoProfileResult, VolumeProfileResult,
};
use super::tpo::TpoProfileBuilder;
use super::volume::VolumeProfileBuilder;
use crate::config::ProfileConfig;

/// Composes volume and TPO builder outputs into one immutable [`SessionProfile`]
#[derive(Debug, Clone, Copy)]
pub struct SessionProfileAssembler<'a> {
    config: &'a ProfileConfig,
    binner: PriceBinner,
}

impl<'a> SessionProfileAssembler<'a> {
    pub fn new(config: &'a ProfileConfig) -> Self {
        Self {
            config,
            binner: PriceBinner::new(config.price_step),
        }
    }

    /// Build a session profile from its ticks.
    ///
    /// Ticks with a non-finite price or volume, or outside `[start, end)`, are
    /// dropped and counted. A session without ticks yields a profile with empty
    /// levels rather than an error.
    pub fn assemble(&self, session: &SessionTicks) -> Result<SessionProfile, ProfileError> {
        if session.end <= session.start {
            return Err(ProfileError::integrity(&session.session_id, "session end is not after its start"));
        }

        let (accepted, dropped): (Vec<&Tick>, Vec<&Tick>) = session
            .ticks
            .iter()
            .partition(|t| t.is_valid() && t.timestamp >= session.start && t.timestamp < session.end);
        let dropped_ticks = dropped.len() as u32;
        if dropped_ticks > 0 {
            warn!(
                session = %session.session_id,
                dropped = dropped_ticks,
                "Dropped invalid or out-of-window ticks"
            );
        }

        let accepted: Vec<Tick> = accepted.into_iter().copied().collect();
        let summary = SessionSummary::from_ticks(&accepted);

        let mut volume = VolumeProfileBuilder::new(self.binner);
        let mut tpo = TpoProfileBuilder::new(self.config, self.binner, session.start);
        for tick in &accepted {
            volume.add_tick(tick);
            tpo.add_tick(tick);
        }

        self.compose(session, summary, dropped_ticks, volume.finish(), tpo.finish())
    }

    /// Join builder outputs and session OHLC, enforcing range invariants
    pub fn compose(
        &self,
        session: &SessionTicks,
        summary: SessionSummary,
        dropped_ticks: u32,
        volume: VolumeProfileResult,
        tpo: TpoProfileResult,
    ) -> Result<SessionProfile, ProfileError> {
        let id = &session.session_id;

        if let (Some(high), Some(low)) = (summary.high, summary.low) {
            if high < low {
                return Err(ProfileError::integrity(id, format!("high {} is below low {}", high, low)));
            }
            for (name, value) in [("ib_high", tpo.ib_high), ("ib_low", tpo.ib_low)] {
                if let Some(value) = value {
                    if value < low || value > high {
                        return Err(ProfileError::integrity(
                            id,
                            format!("{} {} outside session range [{}, {}]", name, value, low, high),
                        ));
                    }
                }
            }
        } else if tpo.ib_high.is_some() || tpo.ib_low.is_some() {
            return Err(ProfileError::integrity(id, "initial balance present without a session range"));
        }

        if let (Some(ib_high), Some(ib_low)) = (tpo.ib_high, tpo.ib_low) {
            if ib_high < ib_low {
                return Err(ProfileError::integrity(
                    id,
                    format!("ib_high {} is below ib_low {}", ib_high, ib_low),
                ));
            }
        }

        let profile = SessionProfile {
            session_id: id.clone(),
            start: session.start,
            end: session.end,
            open: summary.open,
            high: summary.high,
            low: summary.low,
            close: summary.close,
            total_volume: summary.total_volume,
            delta: summary.delta,
            tick_count: summary.tick_count,
            dropped_ticks,
            volume_poc_price: volume.poc_price,
            tpo_poc_price: tpo.poc_price,
            vah: tpo.value_area.map(|va| va.high),
            val: tpo.value_area.map(|va| va.low),
            ib_high: tpo.ib_high,
            ib_low: tpo.ib_low,
            poor_high: tpo.poor_high,
            poor_low: tpo.poor_low,
            single_prints: tpo.single_prints,
            single_print_high: tpo.single_print_high,
            single_print_low: tpo.single_print_low,
            tpo_period_count: tpo.period_count,
        };

        debug!(
            session = %profile.session_id,
            ticks = profile.tick_count,
            volume_poc = ?profile.volume_poc_price,
            tpo_poc = ?profile.tpo_poc_price,
            vah = ?profile.vah,
            val = ?profile.val,
            "Session profile assembled"
        );

        Ok(profile)
    }
}
