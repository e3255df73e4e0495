//! Error types for the store layer.

use dimsync_types::{DimensionContext, NodeIdentity};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No node at the given address.
    #[error("node not found: {0}")]
    NotFound(String),

    /// A variant already exists at the adopt target.
    #[error("node already exists: {0}")]
    AlreadyExists(String),

    /// The parent identity is not materialized in the adopt target context.
    #[error("parent {parent} does not exist in context [{context}]")]
    ParentMissing {
        parent: NodeIdentity,
        context: DimensionContext,
    },

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// A change listener failed while handling a notification.
    #[error("listener error: {0}")]
    Listener(String),

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}
