//! Audit trail.

use crate::ids::UserId;
use crate::store::StoreFuture;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Before/after snapshots attached to an audit entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditChanges {
    /// State before the action
    pub before: Option<serde_json::Value>,
    /// State after the action
    pub after: Option<serde_json::Value>,
}

/// One recorded action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entity kind, e.g. `transport_form`, `vehicle_assignment`
    pub entity_type: String,
    /// Entity id
    pub entity_id: String,
    /// Action name, e.g. `create`, `update_allocations`, `submit`
    pub action: String,
    /// Acting user
    pub actor_id: UserId,
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// Optional snapshots
    pub changes: Option<AuditChanges>,
}

impl AuditEntry {
    /// Entry without change snapshots.
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl ToString,
        action: impl Into<String>,
        actor_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            action: action.into(),
            actor_id,
            timestamp,
            changes: None,
        }
    }

    /// Attach before/after snapshots. Values that fail to serialize are
    /// recorded as absent.
    #[must_use]
    pub fn with_changes<B: Serialize, A: Serialize>(
        mut self,
        before: Option<&B>,
        after: Option<&A>,
    ) -> Self {
        self.changes = Some(AuditChanges {
            before: before.and_then(|b| serde_json::to_value(b).ok()),
            after: after.and_then(|a| serde_json::to_value(a).ok()),
        });
        self
    }
}

/// Append-only audit log.
pub trait AuditLog: Send + Sync {
    /// Record an entry.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`](crate::AllocationError::Storage)
    /// if the entry cannot be persisted.
    fn record(&self, entry: AuditEntry) -> StoreFuture<'_, ()>;

    /// Entries for one entity, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`](crate::AllocationError::Storage)
    /// on storage failure.
    fn entries_for(&self, entity_type: &str, entity_id: &str) -> StoreFuture<'_, Vec<AuditEntry>>;

    /// Entries recorded at or after `since`, newest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`](crate::AllocationError::Storage)
    /// on storage failure.
    fn recent(&self, since: DateTime<Utc>, limit: usize) -> StoreFuture<'_, Vec<AuditEntry>>;
}
