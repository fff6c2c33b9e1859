//! Vehicle-allocation reconciliation.
//!
//! Keeps the number of vehicle assignments per vendor equal to the vendor's
//! requested count:
//!
//! - too few: create empty drafts for the vendor
//! - too many: delete surplus drafts, oldest first
//! - submitted assignments are never deletion candidates; if there are not
//!   enough drafts to delete, the vendor stays over-provisioned
//! - vendors without an allocation are left untouched
//!
//! [`reconcile`] is pure. It returns a [`ReconcilePlan`] that the caller
//! applies through an [`AssignmentStore`](crate::AssignmentStore).

use crate::allocation::{self, Allocation};
use crate::assignment::{DraftAssignment, VehicleAssignment};
use crate::environment::ReconcileEnvironment;
use crate::error::{AllocationError, Result};
use crate::ids::{AssignmentId, BookingId, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Creates and deletes needed to match allocation counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    /// New drafts, in allocation order
    pub created: Vec<DraftAssignment>,
    /// Drafts to delete, oldest first per vendor
    pub deleted: Vec<AssignmentId>,
}

impl ReconcilePlan {
    /// Whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }
}

/// What a store actually did with a plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Drafts inserted
    pub created: Vec<DraftAssignment>,
    /// Drafts deleted
    pub deleted: Vec<AssignmentId>,
    /// Planned deletions skipped because the record was submitted (or
    /// removed) after the plan was computed
    pub skipped: Vec<AssignmentId>,
}

impl ReconcileOutcome {
    /// Whether anything was written.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }
}

/// Compute the plan that brings `existing` in line with `allocations`.
///
/// `existing` must hold every assignment of `booking_id` in creation order.
/// Drafts with equal `created_at` keep that order when choosing which to
/// delete first.
///
/// # Errors
///
/// Returns [`AllocationError::InvalidAllocation`] if a vendor appears twice
/// in `allocations` or an assignment of another booking is passed in. No plan
/// is produced in that case.
pub fn reconcile(
    booking_id: BookingId,
    allocations: &[Allocation],
    existing: &[VehicleAssignment],
    env: &ReconcileEnvironment,
) -> Result<ReconcilePlan> {
    allocation::ensure_unique_vendors(allocations)?;

    if let Some(foreign) = existing.iter().find(|a| a.booking_id() != booking_id) {
        return Err(AllocationError::invalid(format!(
            "assignment {} belongs to booking {}, not {booking_id}",
            foreign.id(),
            foreign.booking_id()
        )));
    }

    let mut by_vendor: HashMap<UserId, Vec<&VehicleAssignment>> = HashMap::new();
    for assignment in existing {
        by_vendor.entry(assignment.vendor_id()).or_default().push(assignment);
    }

    let now = env.clock.now();
    let mut plan = ReconcilePlan::default();

    for allocation in allocations {
        let vendor_id = allocation.vendor_id;
        let group = by_vendor.get(&vendor_id).map_or(&[][..], Vec::as_slice);
        let current = group.len();
        let requested = allocation.requested_count as usize;

        match current.cmp(&requested) {
            Ordering::Less => {
                plan.created.extend((current..requested).map(|_| {
                    DraftAssignment::new(env.ids.next_assignment_id(), booking_id, vendor_id, now)
                }));
            }
            Ordering::Greater => {
                let surplus = current - requested;
                let mut drafts: Vec<&DraftAssignment> =
                    group.iter().filter_map(|a| a.as_draft()).collect();
                drafts.sort_by_key(|d| d.created_at);

                if drafts.len() < surplus {
                    tracing::warn!(
                        %booking_id,
                        %vendor_id,
                        requested,
                        current,
                        removable = drafts.len(),
                        "Not enough drafts to remove, vendor stays over-provisioned"
                    );
                }

                plan.deleted.extend(drafts.iter().take(surplus).map(|d| d.id));
            }
            Ordering::Equal => {}
        }
    }

    tracing::debug!(
        %booking_id,
        created = plan.created.len(),
        deleted = plan.deleted.len(),
        "Reconciliation planned"
    );

    Ok(plan)
}
