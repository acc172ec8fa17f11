//! Remote usage/cost report contract.
//!
//! The external authority returns day-bucketed records, each carrying an
//! amount; the core only ever needs the scalar sum across all buckets. The
//! HTTP client is one implementation of the contract; tests substitute
//! their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the remote report collaborator.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Transport or decode failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the API.
    #[error("API returned status {status}")]
    Api { status: u16 },
}

/// Bucket width for the report query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketWidth {
    /// One bucket per day.
    Day,
}

impl BucketWidth {
    /// Wire representation of the bucket width.
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketWidth::Day => "1d",
        }
    }
}

/// A single result record inside a bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Monetary or token amount for the record.
    #[serde(default)]
    pub amount: f64,
}

/// One day bucket of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportBucket {
    /// Bucket start instant.
    pub starting_at: DateTime<Utc>,
    /// Records inside the bucket.
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

/// Day-bucketed usage report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageReport {
    /// Buckets, oldest first.
    #[serde(default)]
    pub data: Vec<ReportBucket>,
}

impl UsageReport {
    /// Sum of all amounts across buckets and results.
    pub fn total(&self) -> f64 {
        self.data
            .iter()
            .flat_map(|bucket| bucket.results.iter())
            .map(|record| record.amount)
            .sum()
    }
}

/// External collaborator producing the authoritative usage report.
#[async_trait]
pub trait UsageReportSource: Send + Sync {
    /// Fetch the report covering `starting_at` onward.
    async fn fetch(
        &self,
        starting_at: DateTime<Utc>,
        width: BucketWidth,
    ) -> Result<UsageReport, ReportError>;
}

/// HTTP implementation of the report contract.
#[derive(Debug, Clone)]
pub struct HttpUsageReportSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpUsageReportSource {
    /// Create a client against the given base URL with a bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl UsageReportSource for HttpUsageReportSource {
    async fn fetch(
        &self,
        starting_at: DateTime<Utc>,
        width: BucketWidth,
    ) -> Result<UsageReport, ReportError> {
        let url = format!("{}/usage_report", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("starting_at", starting_at.to_rfc3339()),
                ("bucket_width", width.as_str().to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Api {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_total_sums_all_buckets() {
        let report: UsageReport = serde_json::from_str(
            r#"{
                "data": [
                    {"starting_at": "2025-03-09T00:00:00Z", "results": [{"amount": 1.5}, {"amount": 2.0}]},
                    {"starting_at": "2025-03-10T00:00:00Z", "results": [{"amount": 3.25}]}
                ]
            }"#,
        )
        .expect("deserialize");

        assert!((report.total() - 6.75).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report_totals_zero() {
        let report: UsageReport = serde_json::from_str(r#"{"data": []}"#).expect("deserialize");
        assert_eq!(report.total(), 0.0);
    }

    #[test]
    fn test_missing_fields_default() {
        let report: UsageReport = serde_json::from_str(
            r#"{"data": [{"starting_at": "2025-03-09T00:00:00Z", "results": [{}]}]}"#,
        )
        .expect("deserialize");
        assert_eq!(report.total(), 0.0);
    }

    #[test]
    fn test_bucket_width_wire_format() {
        assert_eq!(BucketWidth::Day.as_str(), "1d");
    }
}
