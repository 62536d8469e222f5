use thiserror::Error;

/// Failures of the report aggregation pipeline.
///
/// The pipeline is total given a valid window, so this stays a
/// single-variant taxonomy: store and chat failures live with their
/// own components.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("report window is missing an endpoint; both from and to are required")]
    InvalidWindow,
}
