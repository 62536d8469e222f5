pub mod asset;
pub mod client;
pub mod error;
pub mod event;
pub mod label;
pub mod report;
pub mod severity;

pub use asset::{Asset, AssetStatus, Vulnerability};
pub use client::{Client, ClientSettings};
pub use error::ReportError;
pub use event::SecurityEvent;
pub use label::Label;
pub use report::{
    AssetStatusSummary, ComplianceMetrics, ExecutiveSummary, ReportData, ReportWindow,
    SeverityHistogram, TopEvent, VulnerableAsset,
};
pub use severity::Severity;
