use serde::{Deserialize, Serialize};

/// Severity bucket assigned to a security event or vulnerability.
///
/// Rows arrive from the store as free text; anything outside the five
/// named buckets maps to `Unspecified` instead of failing the row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
    #[serde(other)]
    Unspecified,
}

impl Severity {
    /// The five named buckets, in display order. `Unspecified` is
    /// excluded: it never appears in histograms or report tables.
    pub const NAMED: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Risk-score weight: critical=10, high=5, medium=2, everything else 0.
    pub fn weight(self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::High => 5,
            Severity::Medium => 2,
            Severity::Low | Severity::Info | Severity::Unspecified => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
            Severity::Unspecified => "unspecified",
        }
    }

    /// Lenient parse used when reading raw store rows.
    pub fn parse(s: &str) -> Severity {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            "info" => Severity::Info,
            _ => Severity::Unspecified,
        }
    }

    pub fn is_actionable(self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Unspecified
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
