use serde::{Deserialize, Serialize};

/// Analyst classification of an event: true/false positive/negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Label {
    #[serde(rename = "TP")]
    TruePositive,
    #[serde(rename = "TN")]
    TrueNegative,
    #[serde(rename = "FP")]
    FalsePositive,
    #[serde(rename = "FN")]
    FalseNegative,
    #[serde(rename = "unclassified")]
    #[serde(other)]
    Unclassified,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::TruePositive => "TP",
            Label::TrueNegative => "TN",
            Label::FalsePositive => "FP",
            Label::FalseNegative => "FN",
            Label::Unclassified => "unclassified",
        }
    }

    /// Lenient parse used when reading raw store rows.
    pub fn parse(s: &str) -> Label {
        match s.trim() {
            "TP" => Label::TruePositive,
            "TN" => Label::TrueNegative,
            "FP" => Label::FalsePositive,
            "FN" => Label::FalseNegative,
            _ => Label::Unclassified,
        }
    }
}

impl Default for Label {
    fn default() -> Self {
        Label::Unclassified
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
