//! Core type definitions for dimsync.
//!
//! This crate defines the fundamental types every other dimsync crate
//! operates on:
//! - [`DimensionContext`]: a coordinate in dimension space (language, region, ...)
//! - [`NodeIdentity`]: the identifier shared by all variants of one content item
//!
//! Content nodes, node-type configuration and replication policies live in
//! `dimsync-model`; this crate deliberately knows nothing about them.

mod context;
mod ids;

pub use context::DimensionContext;
pub use ids::NodeIdentity;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid dimension context: {0}")]
    InvalidContext(String),
}
