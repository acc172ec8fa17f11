//! Token quota tracking with learned limit estimation.
//!
//! Tracks consumption of a rate-limited token quota against two budgets (a
//! rolling session window and a calendar-anchored weekly window) and
//! incrementally learns the true, undocumented hard limits from observed
//! exhaustion events.
//!
//! # Overview
//!
//! - **store**: persisted state schema and its file-backed repository
//! - **window**: rolling and calendar-anchored usage counters
//! - **estimator**: confidence-weighted estimation of unknown hard limits
//! - **remote**: TTL cache around the authoritative remote usage report
//! - **service**: composes everything into a single status query
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use quotawatch::config::QuotaConfig;
//! use quotawatch::service::QuotaService;
//!
//! # tokio_test::block_on(async {
//! let mut service = QuotaService::new(QuotaConfig::default());
//! service.record_usage(50_000, "refactor", Utc::now());
//!
//! let snapshot = service.status(Utc::now()).await;
//! assert_eq!(snapshot.session.used, 50_000);
//! # });
//! ```

pub mod config;
pub mod estimator;
pub mod remote;
pub mod service;
pub mod store;
pub mod window;

pub use config::{ConfidenceParams, QuotaConfig, WeeklyAnchor};
pub use estimator::{Estimate, LimitEstimator};
pub use remote::{HttpUsageReportSource, RemoteUsageCache, UsageReportSource};
pub use service::{LimitScope, QuotaService, QuotaSnapshot, QuotaWarning, WarningLevel};
pub use store::{StateRepository, TrackerState};
