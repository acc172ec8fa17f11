//! Quota tracking configuration.

use std::path::Path;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration from a file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Underlying config file read/parse error.
    #[error("config error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Constants governing how limit-estimate confidence grows with evidence.
///
/// These are heuristics, not contracts: the formula is
/// `cap.min(base + hits * increment)` and only the constants are tunable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceParams {
    /// Starting confidence for a seeded, never-observed limit.
    pub base: f64,
    /// Confidence gained per recorded exhaustion event.
    pub increment: f64,
    /// Hard ceiling; stays below 1.0 for undocumented limits.
    pub cap: f64,
    /// Most-recent exhaustion events retained for the running mean.
    pub max_hits: usize,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            base: 0.5,
            increment: 0.1,
            cap: 0.9,
            max_hits: 100,
        }
    }
}

/// Calendar anchor for the weekly window: a weekday plus a UTC time-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAnchor {
    /// Weekday the window resets on.
    pub weekday: Weekday,
    /// UTC time-of-day the window resets at.
    pub time: NaiveTime,
}

impl Default for WeeklyAnchor {
    fn default() -> Self {
        Self {
            weekday: Weekday::Sun,
            time: NaiveTime::from_hms_opt(10, 59, 0).unwrap_or_default(),
        }
    }
}

/// Remote usage-report endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the usage/cost report API.
    pub base_url: String,
    /// Environment variable holding the API token.
    pub token_env: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token_env: "QUOTAWATCH_API_KEY".to_string(),
        }
    }
}

/// Configuration for quota tracking and limit estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Rolling session window length in hours.
    pub session_window_hours: u32,

    /// Calendar window period in days.
    pub weekly_period_days: u32,

    /// Weekday + UTC time the weekly window resets at.
    pub weekly_anchor: WeeklyAnchor,

    /// Advisory threshold as a fraction of the limit (0.0 - 1.0).
    /// Crossing it appends an advisory warning to the status.
    pub advisory_threshold: f64,

    /// Critical threshold as a fraction of the limit (0.0 - 1.0).
    pub critical_threshold: f64,

    /// Seconds a fetched remote figure stays fresh.
    pub cache_ttl_secs: u64,

    /// Upper bound on a single remote fetch, in seconds.
    pub remote_timeout_secs: u64,

    /// Figure reported when the remote is unreachable and nothing is cached.
    pub remote_fallback_spend: f64,

    /// Confidence-update constants for limit estimation.
    pub confidence: ConfidenceParams,

    /// Prior for the session token limit before any exhaustion is observed.
    pub session_limit_seed: u64,

    /// Prior for the weekly token limit before any exhaustion is observed.
    pub weekly_limit_seed: u64,

    /// Documented context window size (externally guaranteed, confidence 1.0).
    pub context_window_tokens: u64,

    /// Remote endpoint settings; `None` disables remote corroboration.
    pub remote: Option<RemoteConfig>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            session_window_hours: 5,
            weekly_period_days: 7,
            weekly_anchor: WeeklyAnchor::default(),
            advisory_threshold: 0.6,
            critical_threshold: 0.8,
            cache_ttl_secs: 300,
            remote_timeout_secs: 10,
            remote_fallback_spend: 0.0,
            confidence: ConfidenceParams::default(),
            session_limit_seed: 200_000,
            weekly_limit_seed: 1_000_000,
            context_window_tokens: 200_000,
            remote: None,
        }
    }
}

impl QuotaConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file, falling back to defaults for
    /// unspecified fields.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Set the rolling session window length.
    pub fn with_session_window_hours(mut self, hours: u32) -> Self {
        self.session_window_hours = hours;
        self
    }

    /// Set the weekly period length.
    pub fn with_weekly_period_days(mut self, days: u32) -> Self {
        self.weekly_period_days = days;
        self
    }

    /// Set the weekly anchor.
    pub fn with_weekly_anchor(mut self, anchor: WeeklyAnchor) -> Self {
        self.weekly_anchor = anchor;
        self
    }

    /// Set the advisory threshold.
    pub fn with_advisory_threshold(mut self, threshold: f64) -> Self {
        self.advisory_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the critical threshold.
    pub fn with_critical_threshold(mut self, threshold: f64) -> Self {
        self.critical_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the remote cache TTL in seconds.
    pub fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Set the session limit prior.
    pub fn with_session_limit_seed(mut self, tokens: u64) -> Self {
        self.session_limit_seed = tokens;
        self
    }

    /// Set the weekly limit prior.
    pub fn with_weekly_limit_seed(mut self, tokens: u64) -> Self {
        self.weekly_limit_seed = tokens;
        self
    }

    /// Set the confidence-update constants.
    pub fn with_confidence(mut self, params: ConfidenceParams) -> Self {
        self.confidence = params;
        self
    }

    /// Rolling session window as a duration.
    pub fn session_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session_window_hours))
    }

    /// Weekly period as a duration.
    pub fn weekly_period(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.weekly_period_days))
    }

    /// Remote cache TTL as a duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }

    /// Remote fetch timeout as a wall-clock duration.
    pub fn remote_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.remote_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = QuotaConfig::default();
        assert_eq!(config.session_window_hours, 5);
        assert_eq!(config.weekly_period_days, 7);
        assert_eq!(config.weekly_anchor.weekday, Weekday::Sun);
        assert_eq!(config.advisory_threshold, 0.6);
        assert_eq!(config.critical_threshold, 0.8);
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = QuotaConfig::new()
            .with_session_window_hours(3)
            .with_advisory_threshold(0.5)
            .with_session_limit_seed(100_000);

        assert_eq!(config.session_window(), chrono::Duration::hours(3));
        assert_eq!(config.advisory_threshold, 0.5);
        assert_eq!(config.session_limit_seed, 100_000);
    }

    #[test]
    fn test_threshold_clamped() {
        let config = QuotaConfig::new().with_critical_threshold(1.5);
        assert_eq!(config.critical_threshold, 1.0);
    }

    #[test]
    fn test_default_confidence_params() {
        let params = ConfidenceParams::default();
        assert_eq!(params.base, 0.5);
        assert_eq!(params.increment, 0.1);
        assert_eq!(params.cap, 0.9);
        assert_eq!(params.max_hits, 100);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "session_window_hours = 2\nadvisory_threshold = 0.5").expect("write");

        let config = QuotaConfig::from_file(file.path()).expect("load");
        assert_eq!(config.session_window_hours, 2);
        assert_eq!(config.advisory_threshold, 0.5);
        // Unspecified fields keep their defaults.
        assert_eq!(config.weekly_period_days, 7);
        assert_eq!(config.cache_ttl_secs, 300);
    }
}
