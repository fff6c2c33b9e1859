//! Store traits for bookings and vehicle assignments.
//!
//! # Implementations
//!
//! - `PostgresFleetStore` (in `fleet-allocation-postgres`): production storage
//! - `InMemoryFleetStore` (in `fleet-allocation-testing`): fast, deterministic tests
//!
//! # Dyn Compatibility
//!
//! These traits return `Pin<Box<dyn Future>>` instead of using `async fn` so
//! the service can hold them as `Arc<dyn AssignmentStore>`.

use crate::assignment::{DraftAssignment, DraftDetails, SubmittedAssignment, TransportDetails, VehicleAssignment};
use crate::booking::{Booking, BookingFilter};
use crate::error::Result;
use crate::ids::{AssignmentId, BookingId, UserId};
use crate::reconciler::{ReconcileOutcome, ReconcilePlan};
use crate::ref_id::WorkingYear;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Computes a reconciliation plan from the booking's current assignments.
///
/// Stores call it inside their atomic scope, after locking the booking's
/// assignments and before writing.
pub type Planner<'a> =
    Box<dyn FnOnce(&[VehicleAssignment]) -> Result<ReconcilePlan> + Send + 'a>;

/// Result of a [`BookingEditor`]: the booking to store and the assignment
/// changes that go with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingEdit {
    /// Booking to persist
    pub booking: Booking,
    /// Drafts to create and delete
    pub plan: ReconcilePlan,
}

impl BookingEdit {
    /// Store `booking` without touching assignments.
    #[must_use]
    pub fn booking_only(booking: Booking) -> Self {
        Self {
            booking,
            plan: ReconcilePlan::default(),
        }
    }
}

/// A committed [`BookingStore::edit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditedBooking {
    /// Booking as read inside the edit
    pub before: Booking,
    /// Booking as stored
    pub after: Booking,
    /// What applying the plan did
    pub outcome: ReconcileOutcome,
}

/// Computes the new booking state and assignment plan from the locked
/// booking and its current assignments.
pub type BookingEditor<'a> =
    Box<dyn FnOnce(&Booking, &[VehicleAssignment]) -> Result<BookingEdit> + Send + 'a>;

/// Persistence for bookings, their allocations and reference counters.
///
/// Implementations store vehicle assignments alongside bookings so that
/// [`edit`](Self::edit) can change both atomically.
pub trait BookingStore: Send + Sync {
    /// Insert a new booking.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the booking id or reference already exists or the
    /// write fails.
    fn insert(&self, booking: Booking) -> StoreFuture<'_, ()>;

    /// Load a booking.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on storage failure. A missing booking is `Ok(None)`.
    fn get(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Bookings matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on failure.
    fn list(&self, filter: BookingFilter) -> StoreFuture<'_, Vec<Booking>>;

    /// Read-modify-write a booking and its assignments in one atomic scope.
    ///
    /// The store locks the booking and its assignments, passes both to
    /// `editor`, persists the returned booking's mutable fields (allocations,
    /// status, deletion, `updated_at`) and applies the returned plan with the
    /// same re-check as [`AssignmentStore::apply_plan`]. Concurrent edits of
    /// one booking serialize; each editor sees the previous edit's result.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown booking, the editor's error (nothing
    /// written) or `Storage`.
    fn edit<'a>(&'a self, id: BookingId, editor: BookingEditor<'a>)
    -> StoreFuture<'a, EditedBooking>;

    /// Atomically increment and return the booking counter for `year`.
    /// The first booking of a year gets `1`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on failure.
    fn next_ref_counter(&self, year: WorkingYear) -> StoreFuture<'_, u32>;
}

/// Persistence for vehicle assignments.
pub trait AssignmentStore: Send + Sync {
    /// Every assignment of a booking, any status, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on failure.
    fn list_by_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Vec<VehicleAssignment>>;

    /// Every assignment of a vendor across bookings, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on failure.
    fn list_by_vendor(&self, vendor_id: UserId) -> StoreFuture<'_, Vec<VehicleAssignment>>;

    /// Load one assignment.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on failure. A missing record is `Ok(None)`.
    fn get(&self, id: AssignmentId) -> StoreFuture<'_, Option<VehicleAssignment>>;

    /// Apply a precomputed plan.
    ///
    /// Inserts every created draft and deletes every planned id, all within
    /// one atomic scope. Each deletion re-checks the record immediately
    /// before deleting: a record that is no longer a draft (or no longer
    /// exists) is left alone and reported in [`ReconcileOutcome::skipped`].
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the writes fail, in which case nothing is applied.
    fn apply_plan(
        &self,
        booking_id: BookingId,
        plan: ReconcilePlan,
    ) -> StoreFuture<'_, ReconcileOutcome>;

    /// Read the booking's assignments, plan, and apply in one step.
    ///
    /// The default reads and applies separately and relies on the re-check in
    /// [`apply_plan`](Self::apply_plan). Transactional stores override it to
    /// hold a lock across the whole read-modify-write.
    ///
    /// # Errors
    ///
    /// Returns the planner's error (nothing written) or `Storage`.
    fn reconcile<'a>(
        &'a self,
        booking_id: BookingId,
        planner: Planner<'a>,
    ) -> StoreFuture<'a, ReconcileOutcome> {
        Box::pin(async move {
            let existing = self.list_by_booking(booking_id).await?;
            let plan = planner(&existing)?;
            self.apply_plan(booking_id, plan).await
        })
    }

    /// Save partial vendor details on a draft.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, `AlreadySubmitted` if the record
    /// is no longer a draft.
    fn save_draft_details(
        &self,
        id: AssignmentId,
        details: DraftDetails,
    ) -> StoreFuture<'_, DraftAssignment>;

    /// Compare-and-set `draft → submitted`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, `AlreadySubmitted` if the record
    /// was not a draft at the moment of the update.
    fn submit(
        &self,
        id: AssignmentId,
        details: TransportDetails,
        submitted_by: UserId,
        submitted_at: DateTime<Utc>,
    ) -> StoreFuture<'_, SubmittedAssignment>;
}
