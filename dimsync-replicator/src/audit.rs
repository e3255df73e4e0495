//! Audit trail of replication decisions.
//!
//! Every applied action and every meaningful skip produces one [`AuditEntry`],
//! addressed by the target context and the node identity. Severity separates
//! routine skips (debug) from state changes (info) and anomalies (warning).

use chrono::{DateTime, Utc};
use dimsync_types::{DimensionContext, NodeIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// The replication operation an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Remove,
    SynchronizeAll,
    SynchronizeEmptyOnly,
    UpdateProperty,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Remove => "remove",
            Self::SynchronizeAll => "synchronize_all",
            Self::SynchronizeEmptyOnly => "synchronize_empty_only",
            Self::UpdateProperty => "update_property",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    /// Expected no-ops, e.g. the variant already exists.
    Debug,
    /// A target variant changed, or a routine skip worth knowing about.
    Info,
    /// Something that should not normally happen.
    Warning,
}

/// One recorded replication decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The target context the decision is about.
    pub context: DimensionContext,
    pub identity: NodeIdentity,
    pub action: AuditAction,
    pub severity: AuditSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        context: DimensionContext,
        identity: NodeIdentity,
        action: AuditAction,
        severity: AuditSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            context,
            identity,
            action,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// `[NodeIdentifier: <id>, TargetDimension: <context>] <message>`
    pub fn render(&self) -> String {
        format!(
            "[NodeIdentifier: {}, TargetDimension: {}] {}",
            self.identity, self.context, self.message
        )
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Writes entries to `tracing` at the level matching their severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        let line = entry.render();
        match entry.severity {
            AuditSeverity::Debug => debug!(
                target: "dimsync::audit",
                action = %entry.action,
                identity = %entry.identity,
                context = %entry.context,
                "{line}"
            ),
            AuditSeverity::Info => info!(
                target: "dimsync::audit",
                action = %entry.action,
                identity = %entry.identity,
                context = %entry.context,
                "{line}"
            ),
            AuditSeverity::Warning => warn!(
                target: "dimsync::audit",
                action = %entry.action,
                identity = %entry.identity,
                context = %entry.context,
                "{line}"
            ),
        }
    }
}

/// Keeps entries in memory and forwards them to [`TracingAuditSink`].
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries recorded for one action.
    pub fn entries_for(&self, action: AuditAction) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        TracingAuditSink.record(entry.clone());
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
