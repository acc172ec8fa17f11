//! Quota status service.
//!
//! Composes the rolling and calendar counters, the limit estimators, and the
//! remote usage cache into a single status query. Data flows one way: usage
//! samples feed the counters, exhaustion events feed the estimators, and the
//! remote figure corroborates. Any failure on the remote path degrades to
//! local-only accounting and never fails the status call.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::QuotaConfig;
use crate::estimator::LimitEstimator;
use crate::remote::RemoteUsageCache;
use crate::store::state::TrackerState;
use crate::window::{CalendarWindowCounter, RollingWindowCounter};

/// Which window a warning or exhaustion event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitScope {
    /// Rolling session window.
    Session,
    /// Calendar-anchored weekly window.
    Weekly,
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitScope::Session => write!(f, "session"),
            LimitScope::Weekly => write!(f, "weekly"),
        }
    }
}

/// Severity of a threshold warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    /// Advisory threshold crossed.
    Advisory,
    /// Critical threshold crossed.
    Critical,
}

/// A threshold crossing surfaced by the status query.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaWarning {
    /// Window the warning applies to.
    pub scope: LimitScope,
    /// Severity.
    pub level: WarningLevel,
    /// Usage percent at the time of the check.
    pub percent: f64,
    /// Human-readable message.
    pub message: String,
}

/// Usage figures for one window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowStatus {
    /// Tokens used in the window.
    pub used: u64,
    /// Limit the usage is measured against.
    pub limit: u64,
    /// Confidence in the limit, in `[0, 1]`.
    pub limit_confidence: f64,
    /// Usage as a percent of the limit.
    pub percent: f64,
    /// Tokens left before the limit, clamped to zero.
    pub remaining: u64,
    /// Seconds until the window resets; absent for an empty rolling window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_eta_secs: Option<i64>,
    /// Authoritative remote spend figure, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_spend: Option<f64>,
}

/// Full answer to a status query.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaSnapshot {
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
    /// Rolling session window figures.
    pub session: WindowStatus,
    /// Weekly window figures.
    pub weekly: WindowStatus,
    /// Threshold crossings, session first.
    pub warnings: Vec<QuotaWarning>,
    /// Whether the remote corroboration path fell back to stale or local data.
    pub degraded: bool,
}

/// Main quota tracking service.
pub struct QuotaService {
    config: QuotaConfig,
    rolling: RollingWindowCounter,
    weekly: CalendarWindowCounter,
    session_limit: LimitEstimator,
    weekly_limit: LimitEstimator,
    context_window: LimitEstimator,
    remote: Option<RemoteUsageCache>,
}

impl QuotaService {
    /// Create a service with fresh state.
    pub fn new(config: QuotaConfig) -> Self {
        Self::from_state(config, TrackerState::default())
    }

    /// Restore a service from persisted state.
    pub fn from_state(config: QuotaConfig, state: TrackerState) -> Self {
        let rolling = RollingWindowCounter::from_samples(config.session_window(), state.sessions);
        let weekly = CalendarWindowCounter::from_state(
            config.weekly_anchor,
            config.weekly_period(),
            state.weekly_total,
            state.weekly_reset,
        );
        let session_limit = LimitEstimator::from_estimate(
            &state.session_limit,
            config.session_limit_seed,
            config.confidence,
        );
        let weekly_limit = LimitEstimator::from_estimate(
            &state.weekly_limit,
            config.weekly_limit_seed,
            config.confidence,
        );
        let context_window = LimitEstimator::documented(config.context_window_tokens);

        Self {
            config,
            rolling,
            weekly,
            session_limit,
            weekly_limit,
            context_window,
            remote: None,
        }
    }

    /// Attach a remote usage cache for weekly corroboration.
    pub fn with_remote(mut self, remote: RemoteUsageCache) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Record a resource-consuming operation against both windows.
    pub fn record_usage(
        &mut self,
        tokens: u64,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let description = description.into();
        self.rolling.record(tokens, description, now);
        self.weekly.add(tokens, now);
    }

    /// Record an observed exhaustion event for the given window's limit.
    pub fn record_limit_hit(&mut self, scope: LimitScope, tokens: u64, now: DateTime<Utc>) {
        match scope {
            LimitScope::Session => self.session_limit.record_exhaustion(tokens, now),
            LimitScope::Weekly => self.weekly_limit.record_exhaustion(tokens, now),
        }
    }

    /// Drop all tracked usage. Learned limit estimates survive: exhaustion
    /// events are ground truth about the resource, not about this run.
    pub fn reset(&mut self) {
        self.rolling.clear();
        self.weekly.clear();
    }

    /// Answer the composed status query.
    ///
    /// The remote figure is a spend total, not a token count, so it
    /// corroborates rather than replaces local accounting: it is surfaced
    /// as `weekly.remote_spend` while percent, remaining, and warnings
    /// always come from the local counters. The remote path can only set
    /// `degraded`; it cannot fail the call.
    pub async fn status(&mut self, now: DateTime<Utc>) -> QuotaSnapshot {
        let session_estimate = self.session_limit.estimate();
        let session_used = self.rolling.usage(now);
        let session_percent = percent_of(session_used, session_estimate.value);
        let session = WindowStatus {
            used: session_used,
            limit: session_estimate.value,
            limit_confidence: session_estimate.confidence,
            percent: session_percent,
            remaining: session_estimate.value.saturating_sub(session_used),
            reset_eta_secs: self.rolling.reset_eta(now).map(|eta| eta.num_seconds()),
            remote_spend: None,
        };

        let mut degraded = false;
        let mut remote_spend = None;
        if let Some(remote) = &self.remote {
            let cached = remote.get(now).await;
            degraded = cached.degraded;
            remote_spend = Some(cached.value);
        }

        let weekly_estimate = self.weekly_limit.estimate();
        let weekly_used = self.weekly.usage(now);
        let weekly_percent = percent_of(weekly_used, weekly_estimate.value);
        let weekly = WindowStatus {
            used: weekly_used,
            limit: weekly_estimate.value,
            limit_confidence: weekly_estimate.confidence,
            percent: weekly_percent,
            remaining: weekly_estimate.value.saturating_sub(weekly_used),
            reset_eta_secs: Some(self.weekly.reset_eta(now).num_seconds()),
            remote_spend,
        };

        let mut warnings = Vec::new();
        self.append_warnings(&mut warnings, LimitScope::Session, session_percent);
        self.append_warnings(&mut warnings, LimitScope::Weekly, weekly_percent);

        QuotaSnapshot {
            generated_at: now,
            session,
            weekly,
            warnings,
            degraded,
        }
    }

    fn append_warnings(&self, warnings: &mut Vec<QuotaWarning>, scope: LimitScope, percent: f64) {
        let fraction = percent / 100.0;
        let (level, threshold) = if fraction >= self.config.critical_threshold {
            (WarningLevel::Critical, self.config.critical_threshold)
        } else if fraction >= self.config.advisory_threshold {
            (WarningLevel::Advisory, self.config.advisory_threshold)
        } else {
            return;
        };

        warnings.push(QuotaWarning {
            scope,
            level,
            percent,
            message: format!(
                "{} usage at {:.1}% of limit (threshold {:.0}%)",
                scope,
                percent,
                threshold * 100.0
            ),
        });
    }

    /// Documented context window size.
    pub fn context_window(&self) -> &LimitEstimator {
        &self.context_window
    }

    /// The configuration.
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Snapshot the service for persistence.
    pub fn to_state(&self) -> TrackerState {
        TrackerState {
            sessions: self.rolling.samples().to_vec(),
            weekly_total: self.weekly.total(),
            weekly_reset: self.weekly.reset_at(),
            session_limit: self.session_limit.to_estimate(),
            weekly_limit: self.weekly_limit.to_estimate(),
            context_window: self.context_window.to_estimate(),
        }
    }
}

/// Usage as a percent of a limit; zero when no limit is known.
fn percent_of(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        0.0
    } else {
        used as f64 / limit as f64 * 100.0
    }
}
