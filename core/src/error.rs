//! Error types for allocation and assignment operations.

use crate::ids::{AssignmentId, UserId};
use thiserror::Error;

/// Result type alias for allocation operations.
pub type Result<T> = std::result::Result<T, AllocationError>;

/// Every failure mode of the allocation pipeline.
///
/// Structural errors (`InvalidAllocation`, `Forbidden`, `NotFound`) abort the
/// whole operation before anything is written. Per-record conflicts
/// (`StorageConflict`) are absorbed by the stores and reported in a
/// [`ReconcileOutcome`](crate::ReconcileOutcome) instead of being returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    // ═══════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════

    /// Malformed allocation input: negative count, duplicate vendor,
    /// over-allocation or assignments from another booking.
    #[error("Invalid allocation: {reason}")]
    InvalidAllocation {
        /// What was wrong with the input
        reason: String,
    },

    /// Transport details are missing required fields.
    #[error("Missing required fields: {}", missing.join(", "))]
    IncompleteDetails {
        /// Names of the missing fields
        missing: Vec<String>,
    },

    /// Transport details are present but inconsistent.
    #[error("Invalid transport details: {reason}")]
    InvalidDetails {
        /// What was inconsistent
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Lifecycle Errors
    // ═══════════════════════════════════════════════════════════

    /// The assignment is no longer a draft.
    #[error("Vehicle assignment {assignment_id} has already been submitted")]
    AlreadySubmitted {
        /// Assignment that was already submitted
        assignment_id: AssignmentId,
    },

    /// A draft targeted for deletion changed status underneath the
    /// reconciliation pass.
    #[error("Vehicle assignment {assignment_id} changed status during reconciliation")]
    StorageConflict {
        /// Assignment whose deletion was skipped
        assignment_id: AssignmentId,
    },

    /// A notification could not be delivered.
    #[error("Failed to notify {recipient}: {reason}")]
    NotificationDelivery {
        /// Intended recipient
        recipient: UserId,
        /// Delivery failure reason
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Access Errors
    // ═══════════════════════════════════════════════════════════

    /// The actor lacks the permission required by the operation.
    #[error("Insufficient permissions: {required}")]
    Forbidden {
        /// Permission (or ownership rule) that was not satisfied
        required: String,
    },

    /// Entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("booking", "vehicle assignment", ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AllocationError {
    /// Shorthand for [`AllocationError::InvalidAllocation`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidAllocation {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`AllocationError::Forbidden`].
    pub fn forbidden(required: impl Into<String>) -> Self {
        Self::Forbidden {
            required: required.into(),
        }
    }

    /// Shorthand for [`AllocationError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
