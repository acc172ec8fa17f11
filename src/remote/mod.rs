//! Remote authoritative usage figures: report contract and TTL cache.

pub mod cache;
pub mod report;

pub use cache::{CachedUsage, RemoteUsageCache};
pub use report::{
    BucketWidth, HttpUsageReportSource, ReportBucket, ReportError, ResultRecord, UsageReport,
    UsageReportSource,
};
