//! In-memory store for testing.
//!
//! [`InMemoryFleetStore`] implements [`BookingStore`], [`AssignmentStore`] and
//! [`AuditLog`] over a single `RwLock`, so every operation is atomic with
//! respect to every other one. Clones share state.

use chrono::{DateTime, Utc};
use fleet_allocation_core::{
    AllocationError, AssignmentId, AssignmentStore, AuditEntry, AuditLog, Booking, BookingEditor,
    BookingFilter, BookingId, BookingStore, DraftAssignment, DraftDetails, EditedBooking, Planner,
    ReconcileOutcome, ReconcilePlan, Result, StoreFuture, SubmittedAssignment, TransportDetails,
    UserId, VehicleAssignment, WorkingYear,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct State {
    bookings: HashMap<BookingId, Booking>,
    /// Insertion order doubles as creation order
    assignments: Vec<VehicleAssignment>,
    counters: HashMap<WorkingYear, u32>,
    audit: Vec<AuditEntry>,
}

impl State {
    fn position(&self, id: AssignmentId) -> Option<usize> {
        self.assignments.iter().position(|a| a.id() == id)
    }

    fn for_booking(&self, booking_id: BookingId) -> Vec<VehicleAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.booking_id() == booking_id)
            .cloned()
            .collect()
    }

    fn apply(&mut self, booking_id: BookingId, plan: ReconcilePlan) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        for id in plan.deleted {
            match self.position(id) {
                Some(index)
                    if self.assignments[index].is_draft()
                        && self.assignments[index].booking_id() == booking_id =>
                {
                    self.assignments.remove(index);
                    outcome.deleted.push(id);
                }
                _ => outcome.skipped.push(id),
            }
        }

        for draft in plan.created {
            self.assignments.push(VehicleAssignment::Draft(draft.clone()));
            outcome.created.push(draft);
        }

        outcome
    }
}

/// In-memory bookings, assignments and audit entries.
///
/// # Example
///
/// ```
/// use fleet_allocation_testing::InMemoryFleetStore;
///
/// let store = InMemoryFleetStore::new();
/// assert_eq!(store.assignment_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryFleetStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryFleetStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total number of stored assignments, all bookings.
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.read().assignments.len()
    }

    /// Every audit entry in recording order.
    #[must_use]
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.read().audit.clone()
    }

    /// Insert an assignment directly, bypassing reconciliation.
    pub fn seed_assignment(&self, assignment: impl Into<VehicleAssignment>) {
        self.write().assignments.push(assignment.into());
    }

    /// Remove all data
    pub fn clear(&self) {
        *self.write() = State::default();
    }
}

impl BookingStore for InMemoryFleetStore {
    fn insert(&self, booking: Booking) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.write();
            if state.bookings.contains_key(&booking.id) {
                return Err(AllocationError::Storage(format!(
                    "booking {} already exists",
                    booking.id
                )));
            }
            if state.bookings.values().any(|b| b.ref_id == booking.ref_id) {
                return Err(AllocationError::Storage(format!(
                    "reference {} already exists",
                    booking.ref_id
                )));
            }
            state.bookings.insert(booking.id, booking);
            Ok(())
        })
    }

    fn get(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move { Ok(self.read().bookings.get(&id).cloned()) })
    }

    fn list(&self, filter: BookingFilter) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let mut bookings: Vec<Booking> = self
                .read()
                .bookings
                .values()
                .filter(|b| filter.matches(b))
                .cloned()
                .collect();
            bookings.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.ref_id.cmp(&a.ref_id))
            });
            Ok(bookings)
        })
    }

    fn edit<'a>(
        &'a self,
        id: BookingId,
        editor: BookingEditor<'a>,
    ) -> StoreFuture<'a, EditedBooking> {
        Box::pin(async move {
            let mut state = self.write();
            let before = state
                .bookings
                .get(&id)
                .cloned()
                .ok_or_else(|| AllocationError::not_found("booking", id))?;
            let existing = state.for_booking(id);
            let edit = editor(&before, &existing)?;

            let after = Booking {
                allocations: edit.booking.allocations,
                status: edit.booking.status,
                deletion: edit.booking.deletion,
                updated_at: edit.booking.updated_at,
                ..before.clone()
            };
            state.bookings.insert(id, after.clone());
            let outcome = state.apply(id, edit.plan);
            Ok(EditedBooking {
                before,
                after,
                outcome,
            })
        })
    }

    fn next_ref_counter(&self, year: WorkingYear) -> StoreFuture<'_, u32> {
        Box::pin(async move {
            let mut state = self.write();
            let counter = state.counters.entry(year).or_insert(0);
            *counter += 1;
            Ok(*counter)
        })
    }
}

impl AssignmentStore for InMemoryFleetStore {
    fn list_by_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Vec<VehicleAssignment>> {
        Box::pin(async move { Ok(self.read().for_booking(booking_id)) })
    }

    fn list_by_vendor(&self, vendor_id: UserId) -> StoreFuture<'_, Vec<VehicleAssignment>> {
        Box::pin(async move {
            Ok(self
                .read()
                .assignments
                .iter()
                .filter(|a| a.vendor_id() == vendor_id)
                .cloned()
                .collect())
        })
    }

    fn get(&self, id: AssignmentId) -> StoreFuture<'_, Option<VehicleAssignment>> {
        Box::pin(async move {
            let state = self.read();
            Ok(state.position(id).map(|i| state.assignments[i].clone()))
        })
    }

    fn apply_plan(
        &self,
        booking_id: BookingId,
        plan: ReconcilePlan,
    ) -> StoreFuture<'_, ReconcileOutcome> {
        Box::pin(async move { Ok(self.write().apply(booking_id, plan)) })
    }

    fn reconcile<'a>(
        &'a self,
        booking_id: BookingId,
        planner: Planner<'a>,
    ) -> StoreFuture<'a, ReconcileOutcome> {
        Box::pin(async move {
            let mut state = self.write();
            let existing = state.for_booking(booking_id);
            let plan = planner(&existing)?;
            Ok(state.apply(booking_id, plan))
        })
    }

    fn save_draft_details(
        &self,
        id: AssignmentId,
        details: DraftDetails,
    ) -> StoreFuture<'_, DraftAssignment> {
        Box::pin(async move {
            let mut state = self.write();
            let index = state
                .position(id)
                .ok_or_else(|| AllocationError::not_found("assignment", id))?;
            match &mut state.assignments[index] {
                VehicleAssignment::Draft(draft) => {
                    draft.details = details;
                    Ok(draft.clone())
                }
                VehicleAssignment::Submitted(_) => {
                    Err(AllocationError::AlreadySubmitted { assignment_id: id })
                }
            }
        })
    }

    fn submit(
        &self,
        id: AssignmentId,
        details: TransportDetails,
        submitted_by: UserId,
        submitted_at: DateTime<Utc>,
    ) -> StoreFuture<'_, SubmittedAssignment> {
        Box::pin(async move {
            let mut state = self.write();
            let index = state
                .position(id)
                .ok_or_else(|| AllocationError::not_found("assignment", id))?;
            let draft = state.assignments[index].clone().into_draft()?;
            let submitted = draft.submit(details, submitted_by, submitted_at)?;
            state.assignments[index] = VehicleAssignment::Submitted(submitted.clone());
            Ok(submitted)
        })
    }
}

impl AuditLog for InMemoryFleetStore {
    fn record(&self, entry: AuditEntry) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.write().audit.push(entry);
            Ok(())
        })
    }

    fn entries_for(&self, entity_type: &str, entity_id: &str) -> StoreFuture<'_, Vec<AuditEntry>> {
        let entity_type = entity_type.to_string();
        let entity_id = entity_id.to_string();
        Box::pin(async move {
            let mut entries: Vec<AuditEntry> = self
                .read()
                .audit
                .iter()
                .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
                .cloned()
                .collect();
            entries.reverse();
            Ok(entries)
        })
    }

    fn recent(&self, since: DateTime<Utc>, limit: usize) -> StoreFuture<'_, Vec<AuditEntry>> {
        Box::pin(async move {
            Ok(self
                .read()
                .audit
                .iter()
                .rev()
                .filter(|e| e.timestamp >= since)
                .take(limit)
                .cloned()
                .collect())
        })
    }
}
