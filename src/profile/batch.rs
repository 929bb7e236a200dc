use rayon::prelude::*;
use tracing::{info, warn};

use super::assembler::SessionProfileAssembler;
use super::errors::ProfileError;
use super::structs::{SessionId, SessionProfile, SessionTicks};
use crate::config::ProfileConfig;

/// Outcome of building a batch of sessions
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Successfully assembled profiles, sorted by `(start, session_id)`
    pub profiles: Vec<SessionProfile>,
    /// Sessions rejected during assembly
    pub failures: Vec<(SessionId, ProfileError)>,
    pub dropped_ticks: u64,
}

impl BuildReport {
    pub fn session_count(&self) -> usize {
        self.profiles.len() + self.failures.len()
    }
}

/// Build every session's profile in parallel.
///
/// Each worker owns its session's histograms; a rejected session is recorded
/// in `failures` without affecting the others.
pub fn build_session_profiles(sessions: &[SessionTicks], config: &ProfileConfig) -> BuildReport {
    let assembler = SessionProfileAssembler::new(config);

    let results: Vec<(SessionId, Result<SessionProfile, ProfileError>)> = sessions
        .par_iter()
        .map(|session| (session.session_id.clone(), assembler.assemble(session)))
        .collect();

    let mut report = BuildReport::default();
    for (session_id, result) in results {
        match result {
            Ok(profile) => {
                report.dropped_ticks += u64::from(profile.dropped_ticks);
                report.profiles.push(profile);
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "Session profile rejected");
                report.failures.push((session_id, e));
            }
        }
    }

    report
        .profiles
        .par_sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.session_id.cmp(&b.session_id)));
    report.failures.sort_by(|a, b| a.0.cmp(&b.0));

    info!(
        "📊 Built {} session profiles ({} rejected, {} ticks dropped)",
        report.profiles.len(),
        report.failures.len(),
        report.dropped_ticks
    );

    report
}
