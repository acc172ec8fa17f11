//! Calendar-anchored window accounting.
//!
//! The weekly window resets at a fixed weekday + time-of-day, independent of
//! when usage occurred. Resets are forward-only and single-fire: crossing a
//! boundary zeroes the accumulator exactly once no matter how often the
//! check runs, and the stored reset instant is recomputed from the anchor
//! rather than incremented, so long idle gaps cannot cause drift.

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::debug;

use crate::config::WeeklyAnchor;

/// Usage accumulator that resets at a calendar anchor.
#[derive(Debug, Clone)]
pub struct CalendarWindowCounter {
    anchor: WeeklyAnchor,
    period: Duration,
    total: u64,
    reset_at: DateTime<Utc>,
}

impl CalendarWindowCounter {
    /// Create an empty counter whose first reset is the next anchor after `now`.
    pub fn new(anchor: WeeklyAnchor, period: Duration, now: DateTime<Utc>) -> Self {
        let mut counter = Self {
            anchor,
            period,
            total: 0,
            reset_at: DateTime::UNIX_EPOCH,
        };
        counter.reset_at = counter.current_boundary(now) + period;
        counter
    }

    /// Restore a counter from persisted state.
    pub fn from_state(
        anchor: WeeklyAnchor,
        period: Duration,
        total: u64,
        reset_at: DateTime<Utc>,
    ) -> Self {
        Self {
            anchor,
            period,
            total,
            reset_at,
        }
    }

    /// The most recent anchor instant at or before `now`.
    pub fn current_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = now.date_naive();
        while date.weekday() != self.anchor.weekday {
            date = date - Duration::days(1);
        }
        let candidate = date.and_time(self.anchor.time).and_utc();
        if candidate > now {
            candidate - self.period
        } else {
            candidate
        }
    }

    /// Zero the accumulator if `now` has crossed the stored reset instant.
    ///
    /// Returns whether a reset fired. On termination `reset_at` lands
    /// strictly after `now`, so repeated calls around a boundary fire once.
    pub fn check_and_maybe_reset(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.reset_at {
            return false;
        }
        debug!(
            total = self.total,
            reset_at = %self.reset_at,
            "weekly window reset"
        );
        self.total = 0;
        self.reset_at = self.current_boundary(now) + self.period;
        true
    }

    /// Add usage to the current window, performing the reset check first.
    pub fn add(&mut self, tokens: u64, now: DateTime<Utc>) {
        self.check_and_maybe_reset(now);
        self.total += tokens;
    }

    /// Usage in the current window, performing the reset check first.
    pub fn usage(&mut self, now: DateTime<Utc>) -> u64 {
        self.check_and_maybe_reset(now);
        self.total
    }

    /// Tokens left before the given limit, clamped to zero.
    pub fn remaining(&mut self, limit: u64, now: DateTime<Utc>) -> u64 {
        limit.saturating_sub(self.usage(now))
    }

    /// Time until the next reset, clamped to zero under clock regression.
    pub fn reset_eta(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).max(Duration::zero())
    }

    /// Current accumulated total without a reset check.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The stored reset instant.
    pub fn reset_at(&self) -> DateTime<Utc> {
        self.reset_at
    }

    /// Zero the accumulator without advancing the reset instant.
    pub fn clear(&mut self) {
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn anchor() -> WeeklyAnchor {
        WeeklyAnchor::default() // Sunday 10:59 UTC
    }

    fn week() -> Duration {
        Duration::days(7)
    }

    #[test]
    fn test_boundary_from_monday_is_preceding_sunday() {
        // Monday 2025-03-10.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).single().expect("timestamp");
        let counter = CalendarWindowCounter::new(anchor(), week(), now);

        let expected = Utc.with_ymd_and_hms(2025, 3, 9, 10, 59, 0).single().expect("timestamp");
        assert_eq!(counter.current_boundary(now), expected);
    }

    #[test]
    fn test_boundary_on_anchor_day_before_anchor_time() {
        // Sunday 2025-03-09 at 08:00, before the 10:59 anchor.
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 8, 0, 0).single().expect("timestamp");
        let counter = CalendarWindowCounter::new(anchor(), week(), now);

        let expected = Utc.with_ymd_and_hms(2025, 3, 2, 10, 59, 0).single().expect("timestamp");
        assert_eq!(counter.current_boundary(now), expected);
    }

    #[test]
    fn test_boundary_walks_back_across_month_edge() {
        // Tuesday 2025-04-01; the anchor weekday lies in the previous month.
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).single().expect("timestamp");
        let counter = CalendarWindowCounter::new(anchor(), week(), now);

        let expected = Utc.with_ymd_and_hms(2025, 3, 30, 10, 59, 0).single().expect("timestamp");
        assert_eq!(counter.current_boundary(now), expected);
    }

    #[test]
    fn test_reset_fires_exactly_once() {
        let monday = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single().expect("timestamp");
        let mut counter = CalendarWindowCounter::new(anchor(), week(), monday);
        counter.add(40_000, monday);

        // Cross the Sunday 10:59 boundary.
        let next_monday = monday + Duration::days(7);
        assert!(counter.check_and_maybe_reset(next_monday));
        assert_eq!(counter.total(), 0);
        assert!(counter.reset_at() > next_monday);

        // Repeated checks near the boundary are no-ops.
        counter.add(5_000, next_monday);
        assert!(!counter.check_and_maybe_reset(next_monday));
        assert!(!counter.check_and_maybe_reset(next_monday + Duration::minutes(1)));
        assert_eq!(counter.total(), 5_000);
    }

    #[test]
    fn test_long_idle_gap_resets_once() {
        let monday = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single().expect("timestamp");
        let mut counter = CalendarWindowCounter::new(anchor(), week(), monday);
        counter.add(100_000, monday);

        // Ten weeks of silence; a single check lands past all missed boundaries.
        let later = monday + Duration::weeks(10);
        assert!(counter.check_and_maybe_reset(later));
        assert_eq!(counter.total(), 0);
        assert!(counter.reset_at() > later);
        assert!(counter.reset_at() - later <= week());
    }

    #[test]
    fn test_add_performs_reset_check() {
        let monday = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single().expect("timestamp");
        let mut counter = CalendarWindowCounter::new(anchor(), week(), monday);
        counter.add(40_000, monday);

        counter.add(1_000, monday + Duration::days(7));
        assert_eq!(counter.total(), 1_000);
    }

    #[test]
    fn test_epoch_reset_fast_forwards() {
        // Persisted default state carries an epoch reset instant.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single().expect("timestamp");
        let mut counter =
            CalendarWindowCounter::from_state(anchor(), week(), 0, DateTime::UNIX_EPOCH);

        assert!(counter.check_and_maybe_reset(now));
        assert!(counter.reset_at() > now);
    }

    #[test]
    fn test_reset_eta_clamped_under_clock_regression() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single().expect("timestamp");
        let counter = CalendarWindowCounter::from_state(anchor(), week(), 0, now - Duration::hours(1));
        assert_eq!(counter.reset_eta(now), Duration::zero());
    }
}
