use serde::{Deserialize, Serialize};

use super::Severity;

/// Operational state of a monitored asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Online,
    Offline,
    Maintenance,
}

impl AssetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetStatus::Online => "online",
            AssetStatus::Offline => "offline",
            AssetStatus::Maintenance => "maintenance",
        }
    }

    /// Lenient parse used when reading raw store rows. Unknown states
    /// read as offline so a malformed row surfaces in the offline
    /// callouts instead of vanishing.
    pub fn parse(s: &str) -> AssetStatus {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => AssetStatus::Online,
            "maintenance" => AssetStatus::Maintenance,
            _ => AssetStatus::Offline,
        }
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One vulnerability record attached to an asset.
///
/// Vulnerability payloads arrive as loosely-shaped JSON; every field
/// defaults so a malformed record degrades to an empty entry rather
/// than failing the asset row.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Vulnerability {
    #[serde(default)]
    pub cve_id: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

impl Vulnerability {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// A monitored asset owned by a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub client_id: String,
    pub name: String,
    pub ip_address: String,
    pub status: AssetStatus,

    /// Possibly empty; order carries no meaning.
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
}

impl Asset {
    pub fn is_vulnerable(&self) -> bool {
        !self.vulnerabilities.is_empty()
    }

    pub fn critical_vuln_count(&self) -> usize {
        self.vulnerabilities
            .iter()
            .filter(|v| v.is_critical())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_defaults_to_offline() {
        assert_eq!(AssetStatus::parse("online"), AssetStatus::Online);
        assert_eq!(AssetStatus::parse("MAINTENANCE"), AssetStatus::Maintenance);
        assert_eq!(AssetStatus::parse("decommissioned"), AssetStatus::Offline);
    }

    #[test]
    fn malformed_vulnerability_defaults_instead_of_failing() {
        let v: Vulnerability = serde_json::from_str("{}").unwrap();
        assert_eq!(v.cve_id, "");
        assert_eq!(v.severity, Severity::Unspecified);
        assert!(!v.is_critical());
    }

    #[test]
    fn critical_vuln_count_filters_by_severity() {
        let asset = Asset {
            asset_id: "a1".to_string(),
            client_id: "c1".to_string(),
            name: "db-01".to_string(),
            ip_address: "10.0.0.9".to_string(),
            status: AssetStatus::Online,
            vulnerabilities: vec![
                Vulnerability {
                    cve_id: "CVE-2025-0001".to_string(),
                    severity: Severity::Critical,
                    description: String::new(),
                },
                Vulnerability {
                    cve_id: "CVE-2025-0002".to_string(),
                    severity: Severity::Medium,
                    description: String::new(),
                },
            ],
        };
        assert!(asset.is_vulnerable());
        assert_eq!(asset.critical_vuln_count(), 1);
    }
}
