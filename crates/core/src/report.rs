//! Derived report structures.
//!
//! `ReportData` is built fresh from a snapshot of event/asset rows and a
//! date window on every report render or PDF export. It is never
//! persisted and carries no identity: two runs over identical inputs
//! produce structurally identical values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{error::ReportError, Severity};

/// Inclusive report window. Both endpoints are required; construction
/// from optional endpoints is the single place the invalid-window
/// precondition is checked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Self, ReportError> {
        match (from, to) {
            (Some(from), Some(to)) => Ok(Self { from, to }),
            _ => Err(ReportError::InvalidWindow),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts <= self.to
    }
}

/// Event counts per named severity bucket. Events with unspecified
/// severity are excluded here but still count toward
/// `ExecutiveSummary::total_events`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityHistogram {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub info: u64,
}

impl SeverityHistogram {
    pub fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
            Severity::Unspecified => {}
        }
    }

    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
            Severity::Unspecified => 0,
        }
    }

    /// Sum over the named buckets only.
    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutiveSummary {
    pub total_events: u64,
    pub critical_count: u64,
    pub high_count: u64,
    pub assets_monitored: u64,
    /// Composite 0-100 score from weighted severity counts.
    pub risk_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetStatusSummary {
    pub total: u64,
    pub online: u64,
    pub offline: u64,
    /// Assets with at least one vulnerability record.
    pub vulnerable: u64,
}

/// One row of the top high-severity events table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopEvent {
    pub event_id: String,
    pub alert_name: String,
    pub severity: Severity,
    pub host: String,
    pub timestamp: DateTime<Utc>,
}

/// One row of the vulnerable-assets ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VulnerableAsset {
    pub asset_id: String,
    pub name: String,
    pub ip_address: String,
    pub critical_vulns: u64,
    pub total_vulns: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceMetrics {
    pub events_processed: u64,
    pub avg_response_time_ms: f64,
    pub system_uptime_pct: f64,
}

/// The full derived report consumed by the report tabs and the PDF
/// exporter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportData {
    pub window: ReportWindow,
    pub summary: ExecutiveSummary,
    pub histogram: SeverityHistogram,
    pub asset_summary: AssetStatusSummary,
    pub top_events: Vec<TopEvent>,
    pub vulnerable_assets: Vec<VulnerableAsset>,
    pub recommendations: Vec<String>,
    pub compliance: ComplianceMetrics,
}
