use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Label, Severity};

/// One detected security occurrence, as stored per tenant.
///
/// `event_id` is unique across the store. Forensic attributes (process,
/// file, network 5-tuple, registry, MITRE tactic/technique) are carried
/// through unvalidated in `forensics`; the aggregation pipeline never
/// reads them, they only travel to the UI and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_id: String,
    pub client_id: String,
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub severity: Severity,
    pub event_type: String,
    pub alert_name: String,

    /// Host name or IP the event was observed on.
    pub host: String,

    #[serde(default)]
    pub label: Label,

    /// Free-text analyst state, e.g. "open", "triaged".
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub comments: String,

    /// Optional forensic attributes, keyed by attribute name.
    #[serde(default)]
    pub forensics: BTreeMap<String, serde_json::Value>,
}

impl SecurityEvent {
    /// True if the alert name or event type mentions `needle`
    /// (case-insensitive). Used by the fallback classifier.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.alert_name.to_ascii_lowercase().contains(&needle)
            || self.event_type.to_ascii_lowercase().contains(&needle)
    }

    /// True if the timestamp lies within `[from, to]` inclusive.
    pub fn in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.timestamp >= from && self.timestamp <= to
    }
}
