//! Persisted quota-tracking state.
//!
//! Pure data types mirroring the on-disk JSON schema. Policy (window
//! arithmetic, estimation, thresholds) lives in the counters and the
//! service, never here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single resource-consuming operation. Immutable once written; dropped
/// from the state once older than the rolling window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    /// When the tokens were consumed.
    pub timestamp: DateTime<Utc>,
    /// Tokens consumed.
    pub tokens: u64,
    /// Operator-facing label for the operation.
    pub description: String,
}

impl UsageSample {
    /// Create a sample stamped at the given instant.
    pub fn new(tokens: u64, description: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at,
            tokens,
            description: description.into(),
        }
    }
}

/// An observed exhaustion event: the resource's hard limit was actually hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitHit {
    /// When the limit was hit.
    pub timestamp: DateTime<Utc>,
    /// Tokens consumed at the moment of exhaustion.
    pub tokens_at_limit: u64,
}

/// Best-guess of a hard limit together with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitEstimate {
    /// Current best-guess limit value.
    pub estimated: u64,
    /// Trust in the estimate, in `[0, 1]`.
    pub confidence: f64,
    /// Exhaustion events the estimate is derived from, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actual_hits: Vec<LimitHit>,
}

impl LimitEstimate {
    /// An empty estimate: no value, no evidence.
    pub fn empty() -> Self {
        Self {
            estimated: 0,
            confidence: 0.0,
            actual_hits: Vec::new(),
        }
    }

    /// An externally documented value, held at full confidence.
    pub fn documented(value: u64) -> Self {
        Self {
            estimated: value,
            confidence: 1.0,
            actual_hits: Vec::new(),
        }
    }
}

impl Default for LimitEstimate {
    fn default() -> Self {
        Self::empty()
    }
}

/// Full persisted state of the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerState {
    /// Rolling-window usage samples, oldest first.
    pub sessions: Vec<UsageSample>,
    /// Tokens accumulated in the current weekly window.
    pub weekly_total: u64,
    /// Instant the weekly window next resets at. The epoch default forces a
    /// recomputation from the configured anchor on first use.
    pub weekly_reset: DateTime<Utc>,
    /// Learned session (rolling window) limit.
    pub session_limit: LimitEstimate,
    /// Learned weekly limit.
    pub weekly_limit: LimitEstimate,
    /// Documented context window size.
    pub context_window: LimitEstimate,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            weekly_total: 0,
            weekly_reset: DateTime::UNIX_EPOCH,
            session_limit: LimitEstimate::empty(),
            weekly_limit: LimitEstimate::empty(),
            context_window: LimitEstimate::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_state_round_trip() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single().expect("timestamp");
        let state = TrackerState {
            sessions: vec![UsageSample::new(50_000, "refactor", at)],
            weekly_total: 50_000,
            weekly_reset: at,
            session_limit: LimitEstimate {
                estimated: 88_000,
                confidence: 0.6,
                actual_hits: vec![LimitHit {
                    timestamp: at,
                    tokens_at_limit: 88_000,
                }],
            },
            weekly_limit: LimitEstimate::empty(),
            context_window: LimitEstimate::documented(200_000),
        };

        let json = serde_json::to_string(&state).expect("serialize");
        let restored: TrackerState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, state);
    }

    #[test]
    fn test_schema_field_names() {
        let state = TrackerState::default();
        let value = serde_json::to_value(&state).expect("serialize");
        for field in [
            "sessions",
            "weekly_total",
            "weekly_reset",
            "session_limit",
            "weekly_limit",
            "context_window",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }

    #[test]
    fn test_empty_hits_omitted() {
        let json = serde_json::to_string(&LimitEstimate::documented(200_000)).expect("serialize");
        assert!(!json.contains("actual_hits"));
    }

    #[test]
    fn test_default_reset_is_epoch() {
        let state = TrackerState::default();
        assert_eq!(state.weekly_reset, DateTime::UNIX_EPOCH);
    }
}
