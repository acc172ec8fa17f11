//! Confidence-weighted estimation of undocumented hard limits.
//!
//! Ordinary usage proves nothing about where a ceiling sits, so the estimate
//! is derived only from genuine exhaustion events. A single event is weak
//! evidence (variable overhead skews it); repeated events converge the mean
//! toward the true limit and justify rising trust. Confidence saturates
//! below full certainty for anything not externally documented.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ConfidenceParams;
use crate::store::state::{LimitEstimate, LimitHit};

/// A limit estimate handed to consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Best-guess limit value.
    pub value: u64,
    /// Trust in the value, in `[0, 1]`.
    pub confidence: f64,
}

/// Evolving best-guess of a hard limit.
///
/// Two flavors: an **unknown** limit starts from a seeded prior at low
/// confidence and learns from exhaustion events; a **documented** limit is
/// externally guaranteed, pinned at confidence 1.0, and never updated.
#[derive(Debug, Clone)]
pub struct LimitEstimator {
    estimated: u64,
    confidence: f64,
    hits: Vec<LimitHit>,
    params: ConfidenceParams,
    documented: bool,
}

impl LimitEstimator {
    /// Create an estimator for an undocumented limit, starting from a prior.
    pub fn unknown(seed: u64, params: ConfidenceParams) -> Self {
        Self {
            estimated: seed,
            confidence: params.base.min(params.cap),
            hits: Vec::new(),
            params,
            documented: false,
        }
    }

    /// Create an estimator for an externally documented value.
    pub fn documented(value: u64) -> Self {
        Self {
            estimated: value,
            confidence: 1.0,
            hits: Vec::new(),
            params: ConfidenceParams::default(),
            documented: true,
        }
    }

    /// Restore an undocumented-limit estimator from persisted state.
    ///
    /// Confidence is recomputed from the retained hits rather than trusted
    /// from disk, so a hand-edited file cannot inflate it. A state with no
    /// evidence and no estimate falls back to the seed.
    pub fn from_estimate(estimate: &LimitEstimate, seed: u64, params: ConfidenceParams) -> Self {
        let mut estimator = Self::unknown(seed, params);
        if estimate.estimated > 0 {
            estimator.estimated = estimate.estimated;
        }
        estimator.hits = estimate.actual_hits.clone();
        estimator.recompute();
        estimator
    }

    /// Record an observed exhaustion event.
    ///
    /// No-op for documented limits: the value is guaranteed, not learned.
    pub fn record_exhaustion(&mut self, tokens_at_limit: u64, at: DateTime<Utc>) {
        if self.documented {
            debug!(tokens_at_limit, "ignoring exhaustion event for documented limit");
            return;
        }

        self.hits.push(LimitHit {
            timestamp: at,
            tokens_at_limit,
        });
        if self.hits.len() > self.params.max_hits {
            let excess = self.hits.len() - self.params.max_hits;
            self.hits.drain(..excess);
        }
        self.recompute();
    }

    /// Recompute estimate and confidence from the retained hits.
    fn recompute(&mut self) {
        if self.hits.is_empty() {
            self.confidence = self.params.base.min(self.params.cap);
            return;
        }
        let sum: u64 = self.hits.iter().map(|h| h.tokens_at_limit).sum();
        self.estimated = sum / self.hits.len() as u64;
        self.confidence = self
            .params
            .cap
            .min(self.params.base + self.hits.len() as f64 * self.params.increment);
    }

    /// Current best guess and its confidence.
    pub fn estimate(&self) -> Estimate {
        Estimate {
            value: self.estimated,
            confidence: self.confidence,
        }
    }

    /// Whether this limit is externally guaranteed.
    pub fn is_documented(&self) -> bool {
        self.documented
    }

    /// Recorded exhaustion events, oldest first.
    pub fn hits(&self) -> &[LimitHit] {
        &self.hits
    }

    /// Snapshot for persistence.
    pub fn to_estimate(&self) -> LimitEstimate {
        LimitEstimate {
            estimated: self.estimated,
            confidence: self.confidence,
            actual_hits: self.hits.clone(),
        }
    }
}
