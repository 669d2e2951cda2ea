use thiserror::Error;

/// Failure inside a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened or is unavailable.
    #[error("store '{store}' unavailable: {message}")]
    Unavailable { store: String, message: String },
    /// A query or statement failed.
    #[error("store '{store}': {message}")]
    Query { store: String, message: String },
    /// A persisted row could not be decoded.
    #[error("store '{store}', key '{key}': {message}")]
    Corrupt { store: String, key: String, message: String },
}

/// Failure of one reconciliation step against one store.
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct ReconError {
    pub store: String,
    pub step: ReconStep,
    #[source]
    pub source: StoreError,
}

/// The four reconciliation steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconStep {
    SnapshotLastReport,
    ResetCurrent,
    ApplyFresh,
    ComputeDelta,
}

impl std::fmt::Display for ReconStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SnapshotLastReport => write!(f, "snapshot_last_report"),
            Self::ResetCurrent => write!(f, "reset_current"),
            Self::ApplyFresh => write!(f, "apply_fresh"),
            Self::ComputeDelta => write!(f, "compute_delta"),
        }
    }
}
