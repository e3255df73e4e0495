//! Error types for the replication layer.

use dimsync_store::StoreError;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors that abort the handling of an event.
///
/// Disabled policies, filtered paths, missing counterparts and reentrant calls
/// are not errors; they show up as skips in the audit trail.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// A store operation failed. Targets visited before the failure keep
    /// their changes.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
