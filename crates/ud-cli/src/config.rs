//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use ud_core::activity::{DEFAULT_DAILY_TIME_CAP_MINUTES, DEFAULT_GENERIC_DOMAINS};
use ud_core::{
    AggregateConfig, DEFAULT_CAP_MINUTES, DEFAULT_EMBED_CONSTANT, DateRange, ReconcileConfig,
};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Upstream per-user session cap, in minutes.
    pub cap_minutes: u64,

    /// First day covered by the report.
    pub date_start: NaiveDate,

    /// Last day covered by the report.
    pub date_end: NaiveDate,

    /// Name of the JS constant holding the data in the dashboard page.
    pub embed_constant: String,

    /// Per-user per-day time ceiling for `aggregate`.
    pub daily_time_cap_minutes: f64,

    /// E-mail domains never treated as organizations.
    pub generic_domains: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cap_minutes: DEFAULT_CAP_MINUTES,
            date_start: NaiveDate::from_ymd_opt(2025, 12, 14).unwrap_or_default(),
            date_end: NaiveDate::from_ymd_opt(2026, 2, 12).unwrap_or_default(),
            embed_constant: DEFAULT_EMBED_CONSTANT.to_string(),
            daily_time_cap_minutes: DEFAULT_DAILY_TIME_CAP_MINUTES,
            generic_domains: DEFAULT_GENERIC_DOMAINS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (UD_*)
        figment = figment.merge(Env::prefixed("UD_"));

        figment.extract()
    }

    /// The report's date range, validated.
    pub fn date_range(&self) -> anyhow::Result<DateRange> {
        DateRange::new(self.date_start, self.date_end).context("invalid configured date range")
    }

    pub const fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            cap_minutes: self.cap_minutes,
        }
    }

    pub fn aggregate_config(&self) -> AggregateConfig {
        AggregateConfig {
            daily_time_cap_minutes: self.daily_time_cap_minutes,
            generic_domains: self
                .generic_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
        }
    }
}

/// Returns the platform-specific config directory.
///
/// On Linux: `~/.config/usage-dashboard`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("usage-dashboard"))
}
