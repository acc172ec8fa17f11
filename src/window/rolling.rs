//! Rolling look-back window accounting.
//!
//! The window boundary slides continuously backward from "now"; there is no
//! discrete reset instant. Samples strictly older than the window contribute
//! nothing and are pruned as a side effect of reads.

use chrono::{DateTime, Duration, Utc};

use crate::store::state::UsageSample;

/// Usage counter over a fixed look-back duration.
#[derive(Debug, Clone)]
pub struct RollingWindowCounter {
    window: Duration,
    /// Samples ordered by timestamp, oldest first.
    samples: Vec<UsageSample>,
}

impl RollingWindowCounter {
    /// Create an empty counter with the given look-back window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: Vec::new(),
        }
    }

    /// Restore a counter from persisted samples.
    pub fn from_samples(window: Duration, mut samples: Vec<UsageSample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self { window, samples }
    }

    /// Append a usage sample stamped at the given instant.
    pub fn record(&mut self, tokens: u64, description: impl Into<String>, at: DateTime<Utc>) {
        let out_of_order = self
            .samples
            .last()
            .is_some_and(|last| last.timestamp > at);
        self.samples.push(UsageSample::new(tokens, description, at));
        if out_of_order {
            self.samples.sort_by_key(|s| s.timestamp);
        }
    }

    /// Sum of all samples inside `(now - window, now]`.
    ///
    /// Prunes expired samples as a side effect; amortized O(1) per call for
    /// time-ordered samples. Samples stamped after `now` (clock regression)
    /// count nothing but are retained.
    pub fn usage(&mut self, now: DateTime<Utc>) -> u64 {
        self.prune(now);
        self.samples
            .iter()
            .filter(|s| s.timestamp <= now)
            .map(|s| s.tokens)
            .sum()
    }

    /// Tokens left before the given limit, clamped to zero.
    pub fn remaining(&mut self, limit: u64, now: DateTime<Utc>) -> u64 {
        limit.saturating_sub(self.usage(now))
    }

    /// Time until the oldest still-counted sample ages out of the window.
    /// `None` when no sample currently counts.
    pub fn reset_eta(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        self.prune(now);
        let oldest = self.samples.iter().find(|s| s.timestamp <= now)?;
        let eta = oldest.timestamp + self.window - now;
        Some(eta.max(Duration::zero()))
    }

    /// Drop samples strictly older than the window.
    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        let expired = self.samples.partition_point(|s| s.timestamp <= cutoff);
        self.samples.drain(..expired);
    }

    /// Current (possibly unpruned) samples, oldest first.
    pub fn samples(&self) -> &[UsageSample] {
        &self.samples
    }

    /// Consume the counter, yielding its samples for persistence.
    pub fn into_samples(self) -> Vec<UsageSample> {
        self.samples
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// The configured look-back window.
    pub fn window(&self) -> Duration {
        self.window
    }
}
