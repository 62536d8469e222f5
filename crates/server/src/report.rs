//! Report aggregation pipeline.
//!
//! Turns a snapshot of event/asset rows plus a date window into the
//! `ReportData` consumed by the report tabs and the PDF exporter.
//! Pure and synchronous: no I/O, no clock reads. The only inputs that
//! are not derivable from the rows are the compliance telemetry values,
//! which callers inject via [`TelemetryInputs`].

use chrono::{DateTime, Utc};

use soc_core::{
    Asset, AssetStatus, AssetStatusSummary, ComplianceMetrics, ExecutiveSummary, ReportData,
    ReportError, ReportWindow, SecurityEvent, SeverityHistogram, TopEvent, VulnerableAsset,
};

/// Ranked tables are capped at this many rows.
pub const TOP_LIMIT: usize = 10;

/// The chat assistant's recommendation helper caps its list here.
pub const CHAT_RECOMMENDATION_CAP: usize = 5;

/// Compliance metrics that cannot be derived from the rows themselves.
/// Wired from real telemetry by the binary; defaults are zeros so an
/// unconfigured deployment is visible rather than plausible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryInputs {
    pub avg_response_time_ms: f64,
    pub system_uptime_pct: f64,
}

impl Default for TelemetryInputs {
    fn default() -> Self {
        Self {
            avg_response_time_ms: 0.0,
            system_uptime_pct: 0.0,
        }
    }
}

/// Aggregate a report over `[from, to]` inclusive.
///
/// Either endpoint missing fails with `ReportError::InvalidWindow`
/// before any computation; given a valid window the function is total.
pub fn aggregate(
    events: &[SecurityEvent],
    assets: &[Asset],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    telemetry: TelemetryInputs,
) -> Result<ReportData, ReportError> {
    let window = ReportWindow::new(from, to)?;
    Ok(aggregate_in_window(events, assets, window, telemetry))
}

/// Aggregation body; all downstream counts derive from the filtered set.
pub fn aggregate_in_window(
    events: &[SecurityEvent],
    assets: &[Asset],
    window: ReportWindow,
    telemetry: TelemetryInputs,
) -> ReportData {
    let filtered: Vec<&SecurityEvent> = events
        .iter()
        .filter(|e| window.contains(e.timestamp))
        .collect();
    let total_events = filtered.len() as u64;

    let mut histogram = SeverityHistogram::default();
    for event in &filtered {
        histogram.bump(event.severity);
    }

    let risk_score = risk_score(&histogram, total_events);

    let top_events = top_events(&filtered);
    let vulnerable_assets = vulnerable_assets(assets);
    let asset_summary = asset_summary(assets);

    let recommendations = build_recommendations(
        histogram.critical,
        histogram.high,
        asset_summary.vulnerable,
        asset_summary.offline,
        None,
    );

    ReportData {
        window,
        summary: ExecutiveSummary {
            total_events,
            critical_count: histogram.critical,
            high_count: histogram.high,
            assets_monitored: assets.len() as u64,
            risk_score,
        },
        histogram,
        asset_summary,
        top_events,
        vulnerable_assets,
        recommendations,
        compliance: ComplianceMetrics {
            events_processed: total_events,
            avg_response_time_ms: telemetry.avg_response_time_ms,
            system_uptime_pct: telemetry.system_uptime_pct,
        },
    }
}

/// `min(100, round((critical*10 + high*5 + medium*2) / max(1, total) * 100))`
///
/// Weights reflect relative blast radius; dividing by `max(1, total)`
/// normalizes independent of alert volume and keeps the empty set at 0.
/// Downstream consumers compare scores across tenants, so the exact
/// formula is load-bearing.
pub fn risk_score(histogram: &SeverityHistogram, total_events: u64) -> u8 {
    let weighted = histogram.critical * 10 + histogram.high * 5 + histogram.medium * 2;
    let normalized = (weighted as f64 / total_events.max(1) as f64 * 100.0).round() as u64;
    normalized.min(100) as u8
}

/// Critical/high events, newest first, capped at [`TOP_LIMIT`].
fn top_events(filtered: &[&SecurityEvent]) -> Vec<TopEvent> {
    let mut actionable: Vec<&&SecurityEvent> = filtered
        .iter()
        .filter(|e| e.severity.is_actionable())
        .collect();
    actionable.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    actionable
        .into_iter()
        .take(TOP_LIMIT)
        .map(|e| TopEvent {
            event_id: e.event_id.clone(),
            alert_name: e.alert_name.clone(),
            severity: e.severity,
            host: e.host.clone(),
            timestamp: e.timestamp,
        })
        .collect()
}

/// Assets with at least one vulnerability, ranked by critical-CVE count
/// descending, capped at [`TOP_LIMIT`].
fn vulnerable_assets(assets: &[Asset]) -> Vec<VulnerableAsset> {
    let mut vulnerable: Vec<&Asset> = assets.iter().filter(|a| a.is_vulnerable()).collect();
    vulnerable.sort_by(|a, b| b.critical_vuln_count().cmp(&a.critical_vuln_count()));

    vulnerable
        .into_iter()
        .take(TOP_LIMIT)
        .map(|a| VulnerableAsset {
            asset_id: a.asset_id.clone(),
            name: a.name.clone(),
            ip_address: a.ip_address.clone(),
            critical_vulns: a.critical_vuln_count() as u64,
            total_vulns: a.vulnerabilities.len() as u64,
        })
        .collect()
}

fn asset_summary(assets: &[Asset]) -> AssetStatusSummary {
    AssetStatusSummary {
        total: assets.len() as u64,
        online: assets
            .iter()
            .filter(|a| a.status == AssetStatus::Online)
            .count() as u64,
        offline: assets
            .iter()
            .filter(|a| a.status == AssetStatus::Offline)
            .count() as u64,
        vulnerable: assets.iter().filter(|a| a.is_vulnerable()).count() as u64,
    }
}

const REC_IMMEDIATE_ATTENTION: &str = "Immediate attention required: critical severity events \
     detected in this period. Initiate incident response procedures.";
const REC_SCHEDULE_PATCHING: &str = "Schedule patching for vulnerable assets, prioritizing \
     hosts with critical CVEs.";
const REC_INVESTIGATE_OFFLINE: &str = "Investigate offline assets to confirm planned downtime \
     and rule out compromise.";
const REC_REVIEW_MONITORING: &str = "High alert volume observed: review monitoring rules and \
     tune detection thresholds.";

const REC_GENERAL_TAIL: [&str; 4] = [
    "Maintain regular backup verification and recovery drills.",
    "Keep endpoint protection agents and signatures up to date.",
    "Review user access rights and enforce least privilege.",
    "Run periodic security awareness training for staff.",
];

/// Single recommendation generator shared by the report view (uncapped)
/// and the chat assistant (capped to [`CHAT_RECOMMENDATION_CAP`]).
/// Conditional advisories first, in fixed order, then the general tail.
pub fn build_recommendations(
    critical_count: u64,
    high_count: u64,
    vulnerable_assets: u64,
    offline_assets: u64,
    cap: Option<usize>,
) -> Vec<String> {
    let mut recs = Vec::new();

    if critical_count > 0 {
        recs.push(REC_IMMEDIATE_ATTENTION.to_string());
    }
    if vulnerable_assets > 0 {
        recs.push(REC_SCHEDULE_PATCHING.to_string());
    }
    if offline_assets > 0 {
        recs.push(REC_INVESTIGATE_OFFLINE.to_string());
    }
    if high_count > 5 {
        recs.push(REC_REVIEW_MONITORING.to_string());
    }

    recs.extend(REC_GENERAL_TAIL.iter().map(|s| s.to_string()));

    if let Some(cap) = cap {
        recs.truncate(cap);
    }
    recs
}
