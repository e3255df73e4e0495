//! Variant replication engine for dimsync.
//!
//! A content node may be materialized in several dimension contexts
//! (languages, regions, ...). The replicator keeps those variants consistent:
//! when one variant is added, removed or changed, it propagates the change to
//! its siblings as far as the node type's replication policy allows.
//!
//! # Architecture
//!
//! - **Locator**: finds the contexts to propagate to, and the counterpart in each
//! - **Engine**: gates events on policy and runs the replication operations
//! - **Guard**: stops a write to a counterpart from echoing back to its source
//! - **Audit**: records every applied action and meaningful skip
//! - **Dispatcher**: turns store notifications into events
//!
//! # Example
//!
//! ```
//! use dimsync_model::NodeTypeRegistry;
//! use dimsync_replicator::{ReplicationDispatcher, Replicator};
//! use dimsync_store::MemoryStore;
//! use std::sync::Arc;
//!
//! let registry = NodeTypeRegistry::from_toml_str(
//!     r#"
//!     [node_types."Acme:Text".replication]
//!     structure = true
//!     "#,
//! )
//! .unwrap();
//!
//! let store = Arc::new(MemoryStore::new());
//! let replicator = Arc::new(Replicator::new(store.clone(), Arc::new(registry)));
//! ReplicationDispatcher::attach(&store, &replicator).unwrap();
//! ```

pub mod audit;
mod dispatcher;
mod engine;
mod error;
mod event;
pub mod guard;
pub mod locator;
pub mod logging;

pub use audit::{
    AuditAction, AuditEntry, AuditSeverity, AuditSink, MemoryAuditSink, TracingAuditSink,
};
pub use dispatcher::ReplicationDispatcher;
pub use engine::{ReplicationReport, Replicator};
pub use error::{ReplicationError, ReplicationResult};
pub use event::ReplicationEvent;
pub use guard::{InFlightGuard, InFlightToken};
pub use locator::{Target, VariantLocator};
