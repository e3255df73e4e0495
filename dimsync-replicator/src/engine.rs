//! Replication engine: decides what an event propagates to and applies it.
//!
//! The engine is synchronous: an event is fully handled, every target context
//! visited, before `handle` returns. A store failure aborts the event and is
//! returned as is; targets visited before the failure keep their changes.

use crate::audit::{AuditAction, AuditEntry, AuditSeverity, AuditSink, TracingAuditSink};
use crate::error::ReplicationResult;
use crate::event::ReplicationEvent;
use crate::guard::{InFlightGuard, InFlightToken};
use crate::locator::VariantLocator;
use dimsync_model::{is_empty_value, ContentNode, PolicyResolver, ReplicationPolicy, UpdateMode};
use dimsync_store::ContentStore;
use dimsync_types::{DimensionContext, NodeIdentity};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Outcome counts of one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Target variants that were changed.
    pub applied: usize,
    /// Target contexts visited but left alone.
    pub skipped: usize,
}

impl ReplicationReport {
    /// True if no target was visited at all.
    pub fn is_noop(&self) -> bool {
        self.applied == 0 && self.skipped == 0
    }
}

/// What an event turns into once the policy has been consulted.
#[derive(Debug)]
enum Operation<'a> {
    Create { hidden: bool },
    Remove,
    SynchronizeAll { excluded: &'a BTreeSet<String> },
    SynchronizeEmptyOnly,
    UpdateProperty {
        property: &'a str,
        value: &'a Value,
        empty_only: bool,
    },
}

impl Operation<'_> {
    fn action(&self) -> AuditAction {
        match self {
            Self::Create { .. } => AuditAction::Create,
            Self::Remove => AuditAction::Remove,
            Self::SynchronizeAll { .. } => AuditAction::SynchronizeAll,
            Self::SynchronizeEmptyOnly => AuditAction::SynchronizeEmptyOnly,
            Self::UpdateProperty { .. } => AuditAction::UpdateProperty,
        }
    }
}

/// Keeps the variants of a node consistent across dimension contexts.
pub struct Replicator {
    store: Arc<dyn ContentStore>,
    resolver: Arc<dyn PolicyResolver>,
    audit: Arc<dyn AuditSink>,
    guard: InFlightGuard,
}

impl Replicator {
    /// Creates a replicator auditing to `tracing`, with its own guard.
    pub fn new(store: Arc<dyn ContentStore>, resolver: Arc<dyn PolicyResolver>) -> Self {
        Self::with_parts(store, resolver, Arc::new(TracingAuditSink), InFlightGuard::new())
    }

    /// Creates a replicator from explicit collaborators.
    ///
    /// Replicators sharing a store should share one guard.
    pub fn with_parts(
        store: Arc<dyn ContentStore>,
        resolver: Arc<dyn PolicyResolver>,
        audit: Arc<dyn AuditSink>,
        guard: InFlightGuard,
    ) -> Self {
        Self {
            store,
            resolver,
            audit,
            guard,
        }
    }

    pub fn guard(&self) -> &InFlightGuard {
        &self.guard
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    // ── Entry points ─────────────────────────────────────────────

    pub fn on_node_added(&self, node: &ContentNode) -> ReplicationResult<ReplicationReport> {
        self.handle(&ReplicationEvent::added(node.clone()))
    }

    pub fn on_node_removed(&self, node: &ContentNode) -> ReplicationResult<ReplicationReport> {
        self.handle(&ReplicationEvent::removed(node.clone()))
    }

    pub fn on_node_updated(&self, node: &ContentNode) -> ReplicationResult<ReplicationReport> {
        self.handle(&ReplicationEvent::updated(node.clone()))
    }

    pub fn on_property_changed(
        &self,
        node: &ContentNode,
        property: &str,
        old_value: Option<&Value>,
        new_value: &Value,
    ) -> ReplicationResult<ReplicationReport> {
        self.handle(&ReplicationEvent::property_changed(
            node.clone(),
            property,
            old_value.cloned(),
            new_value.clone(),
        ))
    }

    /// Handles one event: consults the node type's policy and runs the
    /// matching operation.
    pub fn handle(&self, event: &ReplicationEvent) -> ReplicationResult<ReplicationReport> {
        let node = event.node();
        let policy = self.resolver.resolve(&node.node_type);
        if !policy.is_enabled() {
            return Ok(ReplicationReport::default());
        }

        let Some(operation) = plan(event, &policy) else {
            debug!(
                "No replication for {} event on {} ({})",
                event.kind(),
                node.identity,
                node.node_type
            );
            return Ok(ReplicationReport::default());
        };

        if !policy.allows_path(&node.path) {
            self.record(
                &node.context,
                node.identity,
                operation.action(),
                AuditSeverity::Debug,
                format!("Path {} is outside the allowed path prefixes, skipped.", node.path),
            );
            return Ok(ReplicationReport::default());
        }

        debug!("Handling {} event on {} as {:?}", event.kind(), node.identity, operation);

        match operation {
            Operation::Create { hidden } => {
                if self.is_premature_add(node, &policy)? {
                    debug!(
                        "Node {} added before its {} auto-created children were attached, skipped",
                        node.identity, policy.auto_created_child_count
                    );
                    return Ok(ReplicationReport::default());
                }
                self.create_variant(node, hidden)
            }
            Operation::Remove => self.remove_variant(node),
            Operation::SynchronizeAll { excluded } => self.synchronize_all(node, excluded),
            Operation::SynchronizeEmptyOnly => self.synchronize_empty_only(node),
            Operation::UpdateProperty {
                property,
                value,
                empty_only,
            } => self.update_property(node, property, value, empty_only),
        }
    }

    // ── Operations ───────────────────────────────────────────────

    /// Materializes `node` in every target context that lacks it.
    pub fn create_variant(
        &self,
        node: &ContentNode,
        create_hidden: bool,
    ) -> ReplicationResult<ReplicationReport> {
        let Some(_token) = self.enter(node) else {
            return Ok(ReplicationReport::default());
        };

        let mut report = ReplicationReport::default();
        for target in self.locator().target_contexts(node)? {
            match target.counterpart {
                Some(existing) => {
                    let (severity, message) = if existing.removed {
                        (
                            AuditSeverity::Info,
                            "Node variant was removed in target context, not re-created.",
                        )
                    } else {
                        (
                            AuditSeverity::Debug,
                            "Node variant already exists in target context, skipped.",
                        )
                    };
                    self.record(
                        &target.context,
                        node.identity,
                        AuditAction::Create,
                        severity,
                        message,
                    );
                    report.skipped += 1;
                }
                None => {
                    let variant = self.store.adopt(node, &target.context)?;
                    self.store.set_hidden(&variant.address(), create_hidden)?;
                    let message = if create_hidden {
                        "Node was replicated to target context as hidden node."
                    } else {
                        "Node was replicated to target context."
                    };
                    self.record(
                        &target.context,
                        node.identity,
                        AuditAction::Create,
                        AuditSeverity::Info,
                        message,
                    );
                    report.applied += 1;
                }
            }
        }
        Ok(report)
    }

    /// Removes every live counterpart of `node`.
    pub fn remove_variant(&self, node: &ContentNode) -> ReplicationResult<ReplicationReport> {
        let Some(_token) = self.enter(node) else {
            return Ok(ReplicationReport::default());
        };

        let mut report = ReplicationReport::default();
        for target in self.locator().target_contexts(node)? {
            let (severity, message) = match target.counterpart {
                Some(variant) if !variant.removed => {
                    self.store.remove(&variant.address())?;
                    report.applied += 1;
                    (AuditSeverity::Info, "Node variant was deleted.")
                }
                Some(_) => {
                    report.skipped += 1;
                    (AuditSeverity::Debug, "Node variant was already deleted, skipped.")
                }
                None => {
                    report.skipped += 1;
                    (AuditSeverity::Debug, "No node variant in target context, skipped.")
                }
            };
            self.record(&target.context, node.identity, AuditAction::Remove, severity, message);
        }
        Ok(report)
    }

    /// Copies the whole property map of `node` onto each counterpart, keeping
    /// the counterpart's values for `excluded_properties`.
    pub fn synchronize_all(
        &self,
        node: &ContentNode,
        excluded_properties: &BTreeSet<String>,
    ) -> ReplicationResult<ReplicationReport> {
        let Some(_token) = self.enter(node) else {
            return Ok(ReplicationReport::default());
        };

        let mut report = ReplicationReport::default();
        for target in self.locator().target_contexts(node)? {
            let Some(variant) = self.live_counterpart(
                &target.context,
                node.identity,
                target.counterpart,
                AuditAction::SynchronizeAll,
                AuditSeverity::Info,
            ) else {
                report.skipped += 1;
                continue;
            };

            let mut properties = node.properties.clone();
            for name in excluded_properties {
                match variant.properties.get(name) {
                    Some(kept) => properties.insert(name.clone(), kept.clone()),
                    None => properties.remove(name),
                };
            }
            self.store.replace_properties(&variant.address(), properties)?;
            self.record(
                &target.context,
                node.identity,
                AuditAction::SynchronizeAll,
                AuditSeverity::Info,
                "Content of target node was updated.",
            );
            report.applied += 1;
        }
        Ok(report)
    }

    /// Fills empty properties of each counterpart from `node`, never
    /// overwriting a value.
    pub fn synchronize_empty_only(
        &self,
        node: &ContentNode,
    ) -> ReplicationResult<ReplicationReport> {
        let Some(_token) = self.enter(node) else {
            return Ok(ReplicationReport::default());
        };

        let mut report = ReplicationReport::default();
        for target in self.locator().target_contexts(node)? {
            let Some(variant) = self.live_counterpart(
                &target.context,
                node.identity,
                target.counterpart,
                AuditAction::SynchronizeEmptyOnly,
                AuditSeverity::Warning,
            ) else {
                report.skipped += 1;
                continue;
            };

            let address = variant.address();
            let mut filled = 0;
            for (name, value) in &node.properties {
                if is_empty_value(value) || !variant.is_property_empty(name) {
                    continue;
                }
                self.store.set_property(&address, name, value.clone())?;
                filled += 1;
            }

            let (severity, message) = if filled == 0 {
                report.skipped += 1;
                (
                    AuditSeverity::Debug,
                    "Target node has no empty properties to fill, skipped.".to_string(),
                )
            } else {
                report.applied += 1;
                (
                    AuditSeverity::Info,
                    format!("{filled} empty properties of target node were filled."),
                )
            };
            self.record(
                &target.context,
                node.identity,
                AuditAction::SynchronizeEmptyOnly,
                severity,
                message,
            );
        }
        Ok(report)
    }

    /// Sets one property on each counterpart. With `empty_only`, counterparts
    /// that already hold a value are left alone.
    ///
    /// Writing to a counterpart re-enters the replicator through the store's
    /// change notification; that nested call finds the identity in flight
    /// and returns without propagating.
    pub fn update_property(
        &self,
        node: &ContentNode,
        property: &str,
        value: &Value,
        empty_only: bool,
    ) -> ReplicationResult<ReplicationReport> {
        let Some(_token) = self.enter(node) else {
            return Ok(ReplicationReport::default());
        };

        let mut report = ReplicationReport::default();
        for target in self.locator().target_contexts(node)? {
            let Some(variant) = self.live_counterpart(
                &target.context,
                node.identity,
                target.counterpart,
                AuditAction::UpdateProperty,
                AuditSeverity::Info,
            ) else {
                report.skipped += 1;
                continue;
            };

            if empty_only && !variant.is_property_empty(property) {
                self.record(
                    &target.context,
                    node.identity,
                    AuditAction::UpdateProperty,
                    AuditSeverity::Debug,
                    format!("Property {property} of target node is not empty, skipped."),
                );
                report.skipped += 1;
                continue;
            }

            self.store.set_property(&variant.address(), property, value.clone())?;
            self.record(
                &target.context,
                node.identity,
                AuditAction::UpdateProperty,
                AuditSeverity::Info,
                format!("Property {property} of target node was updated."),
            );
            report.applied += 1;
        }
        Ok(report)
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn locator(&self) -> VariantLocator<'_> {
        VariantLocator::new(self.store.as_ref())
    }

    fn enter(&self, node: &ContentNode) -> Option<InFlightToken> {
        let token = self.guard.try_enter(node.identity);
        if token.is_none() {
            debug!("Node {} is already being replicated, skipping nested call", node.identity);
        }
        token
    }

    /// Zero attached children while the node type auto-creates some means the
    /// add event fired before the node was fully built.
    fn is_premature_add(
        &self,
        node: &ContentNode,
        policy: &ReplicationPolicy,
    ) -> ReplicationResult<bool> {
        if policy.auto_created_child_count == 0 {
            return Ok(false);
        }
        Ok(self.store.child_count(&node.address())? == 0)
    }

    /// Unwraps a counterpart for the synchronization operations, recording
    /// the skip when it is missing (at `missing_severity`) or removed.
    fn live_counterpart(
        &self,
        context: &DimensionContext,
        identity: NodeIdentity,
        counterpart: Option<ContentNode>,
        action: AuditAction,
        missing_severity: AuditSeverity,
    ) -> Option<ContentNode> {
        match counterpart {
            Some(variant) if !variant.removed => Some(variant),
            Some(_) => {
                let message = "Target node was deleted, skipped.";
                self.record(context, identity, action, AuditSeverity::Debug, message);
                None
            }
            None => {
                let message = "Target node does not exist, skipped.";
                self.record(context, identity, action, missing_severity, message);
                None
            }
        }
    }

    fn record(
        &self,
        context: &DimensionContext,
        identity: NodeIdentity,
        action: AuditAction,
        severity: AuditSeverity,
        message: impl Into<String>,
    ) {
        self.audit
            .record(AuditEntry::new(context.clone(), identity, action, severity, message));
    }
}

/// Maps an event to the operation its node type's policy asks for.
fn plan<'a>(event: &'a ReplicationEvent, policy: &'a ReplicationPolicy) -> Option<Operation<'a>> {
    match event {
        ReplicationEvent::Added { .. } => policy.create.then_some(Operation::Create {
            hidden: policy.create_hidden,
        }),
        ReplicationEvent::Removed { .. } => policy.remove.then_some(Operation::Remove),
        ReplicationEvent::Updated { .. } => {
            if !policy.content_update {
                None
            } else if policy.content_update_empty_only {
                Some(Operation::SynchronizeEmptyOnly)
            } else {
                Some(Operation::SynchronizeAll {
                    excluded: &policy.excluded_properties,
                })
            }
        }
        ReplicationEvent::PropertyChanged {
            property,
            old_value,
            new_value,
            ..
        } => {
            if old_value.as_ref() == Some(new_value) {
                return None;
            }
            let mode = policy.property_update_mode(property)?;
            Some(Operation::UpdateProperty {
                property,
                value: new_value,
                empty_only: mode == UpdateMode::EmptyOnly,
            })
        }
    }
}
