//! Time-bounded cache around the remote usage report.
//!
//! Insulates local counters from provider latency and failure: a `get`
//! inside the TTL answers from memory; outside it, exactly one refresh runs
//! at a time (concurrent callers wait on the same lock and then read the
//! refreshed entry). Failures degrade to the previous value, or to the
//! configured fallback when nothing was ever fetched; they never propagate
//! past this boundary.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::warn;

use crate::remote::report::{BucketWidth, UsageReportSource};

/// Answer from the cache, flagged when it came from a degraded path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedUsage {
    /// The authoritative figure (or fallback).
    pub value: f64,
    /// When the figure was fetched; `None` for the fallback constant.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Whether the remote was unreachable and a stale or fallback value is
    /// being served.
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: f64,
    fetched_at: DateTime<Utc>,
}

/// TTL cache over a [`UsageReportSource`].
pub struct RemoteUsageCache {
    source: Arc<dyn UsageReportSource>,
    ttl: Duration,
    fetch_timeout: std::time::Duration,
    lookback: Duration,
    fallback: f64,
    entry: Mutex<Option<CacheEntry>>,
}

impl RemoteUsageCache {
    /// Create a cache over the given source.
    ///
    /// `lookback` is how far back the report query reaches (typically the
    /// weekly period); `fallback` is the documented constant served when the
    /// remote fails and nothing was ever cached.
    pub fn new(
        source: Arc<dyn UsageReportSource>,
        ttl: Duration,
        fetch_timeout: std::time::Duration,
        lookback: Duration,
        fallback: f64,
    ) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            lookback,
            fallback,
            entry: Mutex::new(None),
        }
    }

    /// Get the authoritative usage figure.
    ///
    /// Serves the cached value while it is strictly younger than the TTL;
    /// otherwise attempts a refresh bounded by the fetch timeout. This call
    /// never fails: timeout, transport error, and malformed responses all
    /// take the fallback path.
    pub async fn get(&self, now: DateTime<Utc>) -> CachedUsage {
        // Holding the lock across the refresh serializes concurrent callers:
        // whoever arrives second observes the refreshed entry as fresh.
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if now - cached.fetched_at < self.ttl {
                return CachedUsage {
                    value: cached.value,
                    fetched_at: Some(cached.fetched_at),
                    degraded: false,
                };
            }
        }

        let fetch = self.source.fetch(now - self.lookback, BucketWidth::Day);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(report)) => {
                let value = report.total();
                *entry = Some(CacheEntry {
                    value,
                    fetched_at: now,
                });
                CachedUsage {
                    value,
                    fetched_at: Some(now),
                    degraded: false,
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "remote usage fetch failed, serving cached value");
                self.degraded(entry.as_ref())
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.fetch_timeout.as_secs(),
                    "remote usage fetch timed out, serving cached value"
                );
                self.degraded(entry.as_ref())
            }
        }
    }

    fn degraded(&self, entry: Option<&CacheEntry>) -> CachedUsage {
        match entry {
            Some(cached) => CachedUsage {
                value: cached.value,
                fetched_at: Some(cached.fetched_at),
                degraded: true,
            },
            None => CachedUsage {
                value: self.fallback,
                fetched_at: None,
                degraded: true,
            },
        }
    }
}
