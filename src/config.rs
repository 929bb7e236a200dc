//! Analysis configuration loaded once from `config.toml`.
//!
//! The whole run shares a single validated [`AnalysisConfig`]; components take
//! the section they need by reference at construction time.
use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{LogRotation, LoggingConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("price_step must be a positive finite number, got {0}")]
    InvalidPriceStep(f64),
    #[error("tpo_period_minutes must be positive")]
    InvalidTpoPeriod,
    #[error("value_area_percent must be within (0, 1], got {0}")]
    InvalidValueAreaPercent(f64),
    #[error("{0} must be at least 1")]
    ZeroThreshold(&'static str),
    #[error("{name} must be a non-negative finite number, got {value}")]
    NegativeValue { name: &'static str, value: f64 },
    #[error("Duplicate session window name: {0}")]
    DuplicateSession(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn default_price_step() -> f64 {
    1.0
}

fn default_tpo_period_minutes() -> u32 {
    30
}

fn default_value_area_percent() -> f64 {
    0.70
}

fn default_initial_balance_periods() -> u32 {
    2
}

fn default_poor_extreme_threshold() -> u32 {
    2
}

fn default_single_print_threshold() -> u32 {
    3
}

fn default_single_print_min_span() -> f64 {
    20.0
}

fn default_latency_buckets() -> Vec<u32> {
    vec![1, 2, 3, 6]
}

fn default_tracked_sessions() -> Vec<String> {
    ["Asia", "London", "NewYork"].iter().map(|s| s.to_string()).collect()
}

fn default_weekdays() -> Vec<Weekday> {
    vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
}

/// Per-session profile parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_price_step")]
    pub price_step: f64,
    #[serde(default = "default_tpo_period_minutes")]
    pub tpo_period_minutes: u32,
    /// Fraction of total TPO count covered by the value area
    #[serde(default = "default_value_area_percent")]
    pub value_area_percent: f64,
    #[serde(default = "default_initial_balance_periods")]
    pub initial_balance_periods: u32,
    /// Minimum TPO count at a session extreme for it to be "poor"
    #[serde(default = "default_poor_extreme_threshold")]
    pub poor_extreme_threshold: u32,
    /// Minimum number of single-print bins in one run
    #[serde(default = "default_single_print_threshold")]
    pub single_print_threshold: u32,
    /// Minimum price span of one single-print run
    #[serde(default = "default_single_print_min_span")]
    pub single_print_min_span: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            price_step: default_price_step(),
            tpo_period_minutes: default_tpo_period_minutes(),
            value_area_percent: default_value_area_percent(),
            initial_balance_periods: default_initial_balance_periods(),
            poor_extreme_threshold: default_poor_extreme_threshold(),
            single_print_threshold: default_single_print_threshold(),
            single_print_min_span: default_single_print_min_span(),
        }
    }
}

impl ProfileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.price_step.is_finite() || self.price_step <= 0.0 {
            return Err(ConfigError::InvalidPriceStep(self.price_step));
        }
        if self.tpo_period_minutes == 0 {
            return Err(ConfigError::InvalidTpoPeriod);
        }
        if !(self.value_area_percent > 0.0 && self.value_area_percent <= 1.0) {
            return Err(ConfigError::InvalidValueAreaPercent(self.value_area_percent));
        }
        if self.initial_balance_periods == 0 {
            return Err(ConfigError::ZeroThreshold("initial_balance_periods"));
        }
        if self.poor_extreme_threshold == 0 {
            return Err(ConfigError::ZeroThreshold("poor_extreme_threshold"));
        }
        if self.single_print_threshold == 0 {
            return Err(ConfigError::ZeroThreshold("single_print_threshold"));
        }
        if !self.single_print_min_span.is_finite() || self.single_print_min_span < 0.0 {
            return Err(ConfigError::NegativeValue {
                name: "single_print_min_span",
                value: self.single_print_min_span,
            });
        }
        Ok(())
    }
}

/// Revisit tracking parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisitConfig {
    /// Overlap tolerance around a POC; half a price step when absent
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// Session names fed to the tracker (empty = every session)
    #[serde(default = "default_tracked_sessions")]
    pub tracked_sessions: Vec<String>,
    /// Latency buckets (in sessions) reported as cumulative hit shares
    #[serde(default = "default_latency_buckets")]
    pub latency_buckets: Vec<u32>,
}

impl Default for RevisitConfig {
    fn default() -> Self {
        Self {
            tolerance: None,
            tracked_sessions: default_tracked_sessions(),
            latency_buckets: default_latency_buckets(),
        }
    }
}

impl RevisitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(tolerance) = self.tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(ConfigError::NegativeValue { name: "tolerance", value: tolerance });
            }
        }
        Ok(())
    }

    /// Effective tolerance for the given price step
    pub fn resolve_tolerance(&self, price_step: f64) -> f64 {
        self.tolerance.unwrap_or(price_step / 2.0)
    }

    pub fn is_tracked(&self, session_name: &str) -> bool {
        self.tracked_sessions.is_empty() || self.tracked_sessions.iter().any(|s| s == session_name)
    }
}

/// A named, recurring UTC trading window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub name: String,
    pub start: NaiveTime,
    /// Equal to `start` for a full-day window, earlier than `start` when the window wraps midnight
    pub end: NaiveTime,
    #[serde(default = "default_weekdays")]
    pub weekdays: Vec<Weekday>,
}

impl SessionWindow {
    pub fn new(name: &str, start: NaiveTime, end: NaiveTime, weekdays: Vec<Weekday>) -> Self {
        Self { name: name.to_string(), start, end, weekdays }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end <= self.start
    }
}

/// Default window set: three regional sessions, their overlap, the evening gap and weekends
pub fn default_session_windows() -> Vec<SessionWindow> {
    let t = |h: u32, m: u32| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
    vec![
        SessionWindow::new("Asia", t(0, 0), t(9, 0), default_weekdays()),
        SessionWindow::new("London", t(7, 0), t(16, 0), default_weekdays()),
        SessionWindow::new("NewYork", t(13, 30), t(21, 0), default_weekdays()),
        SessionWindow::new("LDN_NY_Overlap", t(13, 30), t(16, 0), default_weekdays()),
        SessionWindow::new("Overnight", t(21, 0), t(0, 0), default_weekdays()),
        SessionWindow::new("Weekend-Sat", t(0, 0), t(0, 0), vec![Weekday::Sat]),
        SessionWindow::new("Weekend-Sun", t(0, 0), t(0, 0), vec![Weekday::Sun]),
    ]
}

/// Logging section of config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingTomlConfig {
    pub log_dir: Option<String>,
    pub level_filter: Option<String>,
    /// "daily" or "hourly"
    pub rotation: Option<String>,
    pub console_timestamps: Option<bool>,
    pub file_json_format: Option<bool>,
}

impl LoggingTomlConfig {
    pub fn to_logging_config(&self) -> LoggingConfig {
        let defaults = LoggingConfig::default();
        let rotation = match self.rotation.as_deref() {
            Some("hourly") => LogRotation::Hourly,
            _ => LogRotation::Daily,
        };
        LoggingConfig {
            log_dir: self.log_dir.clone().unwrap_or(defaults.log_dir),
            level_filter: self.level_filter.clone().unwrap_or(defaults.level_filter),
            rotation,
            console_timestamps: self.console_timestamps.unwrap_or(defaults.console_timestamps),
            file_json_format: self.file_json_format.unwrap_or(defaults.file_json_format),
        }
    }
}

/// Full analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub revisit: RevisitConfig,
    #[serde(default = "default_session_windows")]
    pub sessions: Vec<SessionWindow>,
    #[serde(default)]
    pub logging: LoggingTomlConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            profile: ProfileConfig::default(),
            revisit: RevisitConfig::default(),
            sessions: default_session_windows(),
            logging: LoggingTomlConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.profile.validate()?;
        self.revisit.validate()?;

        let mut seen = HashSet::new();
        for window in &self.sessions {
            if !seen.insert(window.name.as_str()) {
                return Err(ConfigError::DuplicateSession(window.name.clone()));
            }
        }
        Ok(())
    }

    pub fn tolerance(&self) -> f64 {
        self.revisit.resolve_tolerance(self.profile.price_step)
    }
}
