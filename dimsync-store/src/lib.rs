//! Content store layer for dimsync.
//!
//! The replicator never owns content nodes. It talks to whatever storage the
//! host uses through the [`ContentStore`] trait, and learns about changes
//! through [`NodeListener`] callbacks the store fires synchronously.
//!
//! # Architecture
//!
//! - [`ContentStore`] is the lookup/mutation surface (including `adopt`)
//! - [`NodeListener`] is the change-notification surface
//! - [`MemoryStore`] implements both sides in memory, for tests and embedders

mod error;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{ContentStore, ListenerResult, NodeListener};
