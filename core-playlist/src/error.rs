use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Precondition violations of the pure reorder helpers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    #[error("Index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Target order is not a permutation of the source order")]
    NotAPermutation,
}

/// Caller-facing failure category of a sync operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncErrorKind {
    PermissionDenied,
    QuotaExceeded,
    PreconditionFailed,
    TransientError,
    Cancelled,
}

impl SyncErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorKind::PermissionDenied => "permission-denied",
            SyncErrorKind::QuotaExceeded => "quota-exceeded",
            SyncErrorKind::PreconditionFailed => "precondition-failed",
            SyncErrorKind::TransientError => "transient-error",
            SyncErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// Apply stopped after committing `applied` of `total` position updates.
    /// Committed updates are not rolled back.
    #[error("Reorder partially applied ({applied} of {total} updates committed): {source}")]
    PartiallyApplied {
        applied: usize,
        total: usize,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Failure category; looks through `PartiallyApplied`
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::PermissionDenied(_) => SyncErrorKind::PermissionDenied,
            SyncError::QuotaExceeded(_) => SyncErrorKind::QuotaExceeded,
            SyncError::PreconditionFailed(_) => SyncErrorKind::PreconditionFailed,
            SyncError::Transient(_) => SyncErrorKind::TransientError,
            SyncError::Cancelled => SyncErrorKind::Cancelled,
            SyncError::PartiallyApplied { source, .. } => source.kind(),
        }
    }

    /// Number of remote updates already committed when the error occurred
    pub fn applied_updates(&self) -> usize {
        match self {
            SyncError::PartiallyApplied { applied, .. } => *applied,
            _ => 0,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, SyncError::PartiallyApplied { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
