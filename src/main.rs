use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use market_profile::config::AnalysisConfig;
use market_profile::errors::AnalysisError;
use market_profile::ingest::{load_ticks_csv, SessionLabeler};
use market_profile::logging::{init_dual_logging, init_simple_logging, log_system_info};
use market_profile::profile::{build_session_profiles, SessionProfile};
use market_profile::report::{write_checkpoint, ReportWriter};
use market_profile::revisit::{PocType, RevisitEngine};

#[derive(Debug, Parser)]
#[clap(name = "market_profile", version, about = "Session market profiles and POC revisit statistics")]
pub struct Cli {
    /// Analysis configuration (TOML); built-in defaults when absent
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Tick CSV: timestamp,open,high,low,close,volume,trades,bid_volume,ask_volume
    #[clap(long)]
    pub input: PathBuf,

    /// Directory receiving the report files
    #[clap(long, default_value = "reports")]
    pub output: PathBuf,

    /// Write the final tracker state to this JSON file
    #[clap(long)]
    pub checkpoint: Option<PathBuf>,

    /// Console-only logging, no log files
    #[clap(long)]
    pub simple_log: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AnalysisConfig::from_toml(path) {
            Ok(config) => {
                println!("✅ Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                eprintln!("❌ Invalid configuration {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => AnalysisConfig::default(),
    };

    let logging_config = config.logging.to_logging_config();
    let _logging_guard = if cli.simple_log {
        if let Err(e) = init_simple_logging(&logging_config.level_filter) {
            eprintln!("❌ Failed to initialize logging: {}", e);
        }
        None
    } else {
        match init_dual_logging(&logging_config) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("❌ Failed to initialize logging system: {}", e);
                if let Err(e) = init_simple_logging(&logging_config.level_filter) {
                    eprintln!("❌ Fallback logging failed too: {}", e);
                }
                warn!("⚠️ Using fallback console-only logging");
                None
            }
        }
    };

    log_system_info();
    info!(
        price_step = config.profile.price_step,
        tpo_period_minutes = config.profile.tpo_period_minutes,
        value_area_percent = config.profile.value_area_percent,
        tolerance = config.tolerance(),
        sessions = config.sessions.len(),
        tracked = ?config.revisit.tracked_sessions,
        "🔧 Analysis configuration"
    );

    if let Err(e) = run_analysis(&cli, &config) {
        error!("💥 Analysis failed: {}", e);
        std::process::exit(1);
    }
}

fn run_analysis(cli: &Cli, config: &AnalysisConfig) -> Result<(), AnalysisError> {
    info!("🚀 Starting market profile analysis for {}", cli.input.display());

    let loaded = load_ticks_csv(&cli.input)?;
    let labeled = SessionLabeler::new(&config.sessions).label(&loaded.ticks);
    let build = build_session_profiles(&labeled.sessions, &config.profile);

    let tracked: Vec<SessionProfile> = build
        .profiles
        .iter()
        .filter(|p| config.revisit.is_tracked(p.session_name()))
        .cloned()
        .collect();
    info!("🎯 Tracking POC revisits over {} of {} sessions", tracked.len(), build.profiles.len());

    let mut engine = RevisitEngine::from_config(config);
    let run = engine.run(&tracked)?;

    let writer = ReportWriter::new(cli.output.clone())?;
    writer.write_all(&build, &run)?;
    if let Some(path) = &cli.checkpoint {
        write_checkpoint(path, &engine.checkpoint())?;
    }

    for poc_type in PocType::ALL {
        let stats = &run.by_type(poc_type).statistics;
        info!(
            poc_type = %poc_type,
            created = stats.created,
            revisited = stats.resolved,
            naked = stats.naked,
            revisit_rate = ?stats.revisit_rate,
            median_sessions = ?stats.sessions_elapsed.map(|s| s.median),
            median_minutes = ?stats.minutes_elapsed.map(|s| s.median),
            next_session_probability = ?stats.next_session_probability,
            "📈 Revisit summary"
        );
    }

    if !build.failures.is_empty() {
        warn!("⚠️ {} sessions were rejected, see session_failures.csv", build.failures.len());
    }
    info!("✅ Analysis complete, reports in {}", writer.output_dir().display());
    Ok(())
}
