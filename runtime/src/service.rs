//! The allocation service: the imperative shell around the reconciler.
//!
//! Every operation takes the acting user explicitly, checks permissions,
//! talks to the stores, records an audit entry and, where drafts were
//! created, notifies the vendors that own them.

use crate::dispatch::{DispatchReport, NotificationDispatcher};
use crate::metrics::{ReconcileMetrics, SubmissionMetrics};
use crate::retry::RetryPolicy;
use chrono::{DateTime, Datelike, Duration, Utc};
use fleet_allocation_core::reconciler;
use fleet_allocation_core::{
    Actor, Allocation, AllocationError, AssignmentId, AssignmentStore, AuditEntry, AuditLog,
    Booking, BookingDeletion, BookingEdit, BookingEditor, BookingFilter, BookingId, BookingStats,
    BookingStatus, BookingStore, DraftAssignment, DraftDetails, EditedBooking, NewBooking,
    Notification, Notifier, ReconcileEnvironment, ReconcileOutcome, Result, Role,
    SubmittedAssignment, TransportDetails, UserId, VehicleAssignment, WorkingYear, permissions,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

const BOOKING: &str = "booking";
const VEHICLE_ASSIGNMENT: &str = "vehicle_assignment";

/// How far back [`AllocationService::recent_activity`] looks.
pub const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Default number of entries returned by [`AllocationService::recent_activity`].
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// A booking after a change, with what reconciliation and notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingChange {
    /// Booking as stored after the change
    pub booking: Booking,
    /// Drafts created, deleted and skipped
    pub outcome: ReconcileOutcome,
    /// Notification delivery counts
    pub notifications: DispatchReport,
}

/// One row of a vendor's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorBookingSummary {
    /// Booking
    pub booking_id: BookingId,
    /// Human-readable reference
    pub ref_id: String,
    /// Carrier booking number
    pub booking_no: String,
    /// Booking status
    pub status: BookingStatus,
    /// Assignments of this vendor on the booking
    pub total: usize,
    /// Of which submitted
    pub submitted: usize,
    /// Booking creation time
    pub created_at: DateTime<Utc>,
}

impl VendorBookingSummary {
    /// Assignments still waiting for details.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.total - self.submitted
    }
}

/// Booking and vehicle-assignment operations.
///
/// Every change to a booking goes through [`BookingStore::edit`], which
/// writes the booking and reconciles its assignments atomically. Any number
/// of services may share one store.
///
/// # Example
///
/// ```
/// use fleet_allocation_core::{Allocation, NewBooking, ReconcileEnvironment};
/// use fleet_allocation_runtime::AllocationService;
/// use fleet_allocation_testing::{InMemoryFleetStore, RecordingNotifier, fixtures};
/// use std::sync::Arc;
///
/// # async fn example() -> fleet_allocation_core::Result<()> {
/// let store = Arc::new(InMemoryFleetStore::new());
/// let service = AllocationService::new(
///     store.clone(),
///     store.clone(),
///     store,
///     Arc::new(RecordingNotifier::new()),
///     ReconcileEnvironment::system(),
/// );
///
/// let employee = fixtures::employee();
/// let vendor = fixtures::vendor();
/// let change = service
///     .create_booking(&employee, fixtures::new_booking(3, vec![Allocation::new(vendor.id, 2)]))
///     .await?;
/// assert_eq!(change.outcome.created.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct AllocationService {
    bookings: Arc<dyn BookingStore>,
    assignments: Arc<dyn AssignmentStore>,
    audit: Arc<dyn AuditLog>,
    dispatcher: NotificationDispatcher,
    env: ReconcileEnvironment,
}

impl AllocationService {
    /// Service over the given stores, with the default notification retry policy.
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        assignments: Arc<dyn AssignmentStore>,
        audit: Arc<dyn AuditLog>,
        notifier: Arc<dyn Notifier>,
        env: ReconcileEnvironment,
    ) -> Self {
        Self {
            bookings,
            assignments,
            audit,
            dispatcher: NotificationDispatcher::new(notifier, RetryPolicy::default()),
            env,
        }
    }

    /// Replace the notification retry policy.
    #[must_use]
    pub fn with_notify_retry(mut self, policy: RetryPolicy) -> Self {
        self.dispatcher = self.dispatcher.with_policy(policy);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Bookings
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a booking, its draft assignments and the vendor notifications.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the actor is an admin or employee with `forms.create`
    /// - `InvalidAllocation` for a blank booking number, zero vehicles,
    ///   repeated vendors or over-allocation; nothing is written
    /// - `Storage` on store failure
    #[tracing::instrument(skip_all, fields(actor = %actor.id))]
    pub async fn create_booking(&self, actor: &Actor, request: NewBooking) -> Result<BookingChange> {
        actor.require(permissions::FORMS_CREATE)?;
        actor.require_role(&[Role::Admin, Role::Employee])?;
        request.validate()?;

        let now = self.env.clock.now();
        let year = WorkingYear::containing(now);
        let counter = self.bookings.next_ref_counter(year).await?;

        let booking = Booking {
            id: self.env.ids.next_booking_id(),
            ref_id: year.ref_id(counter),
            booking_no: request.booking_no.trim().to_string(),
            created_by: actor.id,
            vehicle_quantity: request.vehicle_quantity,
            allocations: request.allocations,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
            deletion: None,
        };
        self.bookings.insert(booking.clone()).await?;
        tracing::info!(booking_id = %booking.id, ref_id = %booking.ref_id, "Booking created");

        // Plans from the stored allocations, which a concurrent update may
        // already have replaced.
        let env = &self.env;
        let edited = self
            .reconcile_edit(
                booking.id,
                "create",
                Box::new(move |current, existing| {
                    let plan = reconciler::reconcile(current.id, &current.allocations, existing, env)?;
                    Ok(BookingEdit {
                        booking: current.clone(),
                        plan,
                    })
                }),
            )
            .await?;

        self.record_audit(
            AuditEntry::new(BOOKING, booking.id, "create", actor.id, now)
                .with_changes(None::<&Booking>, Some(&booking)),
        )
        .await;

        let notifications = self.notify_created(&edited.after, &edited.outcome.created).await;
        Ok(BookingChange {
            booking: edited.after,
            outcome: edited.outcome,
            notifications,
        })
    }

    /// Replace a booking's allocations and reconcile its assignments.
    ///
    /// Vendors missing from `allocations` keep their assignments; send them
    /// with a count of zero (see [`Booking::with_dropped_vendors_zeroed`]) to
    /// remove their drafts.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without `forms.edit`, or for an employee editing a
    ///   booking they did not create
    /// - `NotFound` for an unknown booking
    /// - `InvalidAllocation` for a completed or deleted booking, repeated
    ///   vendors or over-allocation; nothing is written
    /// - `Storage` on store failure
    #[tracing::instrument(skip_all, fields(actor = %actor.id, %booking_id))]
    pub async fn update_allocations(
        &self,
        actor: &Actor,
        booking_id: BookingId,
        allocations: Vec<Allocation>,
    ) -> Result<BookingChange> {
        actor.require(permissions::FORMS_EDIT)?;

        let now = self.env.clock.now();
        let env = &self.env;
        let edited = self
            .reconcile_edit(
                booking_id,
                "update",
                Box::new(move |current, existing| {
                    if !current.editable_by(actor) {
                        return Err(AllocationError::forbidden("admin or booking owner"));
                    }
                    ensure_open(current)?;
                    current.check_allocations(&allocations)?;

                    let plan = reconciler::reconcile(current.id, &allocations, existing, env)?;
                    Ok(BookingEdit {
                        booking: Booking {
                            allocations,
                            updated_at: now,
                            ..current.clone()
                        },
                        plan,
                    })
                }),
            )
            .await?;

        self.record_audit(
            AuditEntry::new(BOOKING, booking_id, "update_allocations", actor.id, now)
                .with_changes(Some(&edited.before.allocations), Some(&edited.after.allocations)),
        )
        .await;

        let notifications = self.notify_created(&edited.after, &edited.outcome.created).await;
        Ok(BookingChange {
            booking: edited.after,
            outcome: edited.outcome,
            notifications,
        })
    }

    /// Mark a booking completed once every requested vehicle is submitted.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without `forms.edit` or for a non-owner employee
    /// - `NotFound` for an unknown booking
    /// - `InvalidAllocation` for a deleted booking
    /// - `IncompleteDetails` listing the vendors still owing vehicles
    #[tracing::instrument(skip_all, fields(actor = %actor.id, %booking_id))]
    pub async fn complete_booking(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        actor.require(permissions::FORMS_EDIT)?;

        let now = self.env.clock.now();
        let edited = self
            .bookings
            .edit(
                booking_id,
                Box::new(move |current, existing| {
                    if !current.editable_by(actor) {
                        return Err(AllocationError::forbidden("admin or booking owner"));
                    }
                    if current.is_deleted() {
                        return Err(deleted_error(current));
                    }
                    if current.status == BookingStatus::Completed {
                        return Ok(BookingEdit::booking_only(current.clone()));
                    }

                    let missing = missing_vehicles(current, existing);
                    if !missing.is_empty() {
                        return Err(AllocationError::IncompleteDetails { missing });
                    }
                    Ok(BookingEdit::booking_only(Booking {
                        status: BookingStatus::Completed,
                        updated_at: now,
                        ..current.clone()
                    }))
                }),
            )
            .await?;

        if edited.before.status == BookingStatus::Completed {
            return Ok(edited.after);
        }
        tracing::info!(ref_id = %edited.after.ref_id, "Booking completed");

        self.record_audit(
            AuditEntry::new(BOOKING, booking_id, "submit", actor.id, now)
                .with_changes(Some(&edited.before.status), Some(&edited.after.status)),
        )
        .await;
        Ok(edited.after)
    }

    /// Soft-delete a booking. Its assignments are kept.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without `forms.delete`
    /// - `NotFound` for an unknown booking
    /// - `InvalidAllocation` if the booking is already deleted
    #[tracing::instrument(skip_all, fields(actor = %actor.id, %booking_id))]
    pub async fn delete_booking(
        &self,
        actor: &Actor,
        booking_id: BookingId,
        reason: &str,
    ) -> Result<Booking> {
        actor.require(permissions::FORMS_DELETE)?;

        let now = self.env.clock.now();
        let reason = reason.trim().to_string();
        let deletion = BookingDeletion {
            deleted_at: now,
            deleted_by: actor.id,
            reason: reason.clone(),
        };
        let edited = self
            .bookings
            .edit(
                booking_id,
                Box::new(move |current, _| {
                    if current.is_deleted() {
                        return Err(AllocationError::invalid(format!(
                            "booking {} is already deleted",
                            current.ref_id
                        )));
                    }
                    Ok(BookingEdit::booking_only(Booking {
                        deletion: Some(deletion),
                        updated_at: now,
                        ..current.clone()
                    }))
                }),
            )
            .await?;
        tracing::info!(ref_id = %edited.after.ref_id, "Booking deleted");

        self.record_audit(
            AuditEntry::new(BOOKING, booking_id, "delete", actor.id, now).with_changes(
                Some(&json!({ "is_deleted": false })),
                Some(&json!({ "is_deleted": true, "deletion_reason": reason })),
            ),
        )
        .await;
        Ok(edited.after)
    }

    /// Undo a soft delete.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without `forms.restore`
    /// - `NotFound` for an unknown booking
    /// - `InvalidAllocation` if the booking is not deleted
    #[tracing::instrument(skip_all, fields(actor = %actor.id, %booking_id))]
    pub async fn restore_booking(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        actor.require(permissions::FORMS_RESTORE)?;

        let now = self.env.clock.now();
        let edited = self
            .bookings
            .edit(
                booking_id,
                Box::new(move |current, _| {
                    if !current.is_deleted() {
                        return Err(AllocationError::invalid(format!(
                            "booking {} is not deleted",
                            current.ref_id
                        )));
                    }
                    Ok(BookingEdit::booking_only(Booking {
                        deletion: None,
                        updated_at: now,
                        ..current.clone()
                    }))
                }),
            )
            .await?;
        tracing::info!(ref_id = %edited.after.ref_id, "Booking restored");

        self.record_audit(
            AuditEntry::new(BOOKING, booking_id, "restore", actor.id, now).with_changes(
                Some(&json!({ "is_deleted": true })),
                Some(&json!({ "is_deleted": false })),
            ),
        )
        .await;
        Ok(edited.after)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Vehicle assignments
    // ═══════════════════════════════════════════════════════════════════════

    /// Save partial details on one of the vendor's drafts.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without `vehicles.submit` or for another vendor's assignment
    /// - `NotFound` for an unknown assignment
    /// - `AlreadySubmitted` once the assignment is submitted
    #[tracing::instrument(skip_all, fields(actor = %actor.id, %assignment_id))]
    pub async fn save_vehicle_draft(
        &self,
        actor: &Actor,
        assignment_id: AssignmentId,
        details: DraftDetails,
    ) -> Result<DraftAssignment> {
        actor.require(permissions::VEHICLES_SUBMIT)?;
        let assignment = self.owned_assignment(actor, assignment_id).await?;
        if !assignment.is_draft() {
            return Err(AllocationError::AlreadySubmitted { assignment_id });
        }

        let draft = self
            .assignments
            .save_draft_details(assignment_id, details)
            .await?;
        tracing::debug!("Draft details saved");
        Ok(draft)
    }

    /// Lock an assignment with complete vehicle and driver details.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without `vehicles.submit` or for another vendor's assignment
    /// - `NotFound` for an unknown assignment
    /// - `IncompleteDetails` / `InvalidDetails` for bad details
    /// - `AlreadySubmitted` if the assignment was already submitted
    #[tracing::instrument(skip_all, fields(actor = %actor.id, %assignment_id))]
    pub async fn submit_vehicle_details(
        &self,
        actor: &Actor,
        assignment_id: AssignmentId,
        details: TransportDetails,
    ) -> Result<SubmittedAssignment> {
        actor.require(permissions::VEHICLES_SUBMIT)?;
        let assignment = self.owned_assignment(actor, assignment_id).await?;

        let details = details.normalized();
        if let Err(e) = details.validate() {
            SubmissionMetrics::record("invalid");
            return Err(e);
        }

        let now = self.env.clock.now();
        let submitted = match self
            .assignments
            .submit(assignment_id, details, actor.id, now)
            .await
        {
            Ok(submitted) => submitted,
            Err(e @ AllocationError::AlreadySubmitted { .. }) => {
                SubmissionMetrics::record("conflict");
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        SubmissionMetrics::record("submitted");
        tracing::info!(booking_id = %submitted.booking_id, "Vehicle details submitted");

        self.record_audit(
            AuditEntry::new(VEHICLE_ASSIGNMENT, assignment_id, "submit", actor.id, now)
                .with_changes(assignment.as_draft(), Some(&submitted)),
        )
        .await;
        Ok(submitted)
    }

    /// Submit the details previously saved on a draft.
    ///
    /// # Errors
    ///
    /// As [`submit_vehicle_details`](Self::submit_vehicle_details); missing
    /// saved fields yield `IncompleteDetails`.
    pub async fn submit_saved_draft(
        &self,
        actor: &Actor,
        assignment_id: AssignmentId,
    ) -> Result<SubmittedAssignment> {
        actor.require(permissions::VEHICLES_SUBMIT)?;
        let draft = self
            .owned_assignment(actor, assignment_id)
            .await?
            .into_draft()?;
        let details = draft.details.complete()?;
        self.submit_vehicle_details(actor, assignment_id, details)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// One live booking.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown or deleted booking; `Forbidden` unless the
    /// actor is an admin, the owning employee, an allocated vendor or an
    /// order placer.
    pub async fn get_booking(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        let booking = self.load_booking(booking_id).await?;
        if !booking.visible_to(actor) {
            return Err(AllocationError::forbidden(
                "admin, booking owner, allocated vendor or forms.read",
            ));
        }
        Ok(booking)
    }

    /// Bookings the actor may see, narrowed by `filter`, newest first.
    ///
    /// Employees only get their own bookings and vendors the bookings
    /// allocated to them. Only admins may filter by creator or include
    /// deleted bookings.
    ///
    /// # Errors
    ///
    /// `Forbidden` without `forms.read` (`vehicles.read` for vendors).
    #[tracing::instrument(skip_all, fields(actor = %actor.id))]
    pub async fn list_bookings(&self, actor: &Actor, filter: BookingFilter) -> Result<Vec<Booking>> {
        let mut filter = filter;
        if !actor.is_admin() {
            filter.created_by = None;
            filter.include_deleted = false;
        }
        match actor.role {
            Role::Employee => {
                actor.require(permissions::FORMS_READ)?;
                filter.created_by = Some(actor.id);
            }
            Role::Vendor => {
                actor.require(permissions::VEHICLES_READ)?;
                filter.vendor_id = Some(actor.id);
            }
            Role::Admin | Role::OrderPlacer => actor.require(permissions::FORMS_READ)?,
        }

        let bookings = self.bookings.list(filter).await?;
        tracing::debug!(count = bookings.len(), "Bookings listed");
        Ok(bookings)
    }

    /// Counts over every live booking.
    ///
    /// # Errors
    ///
    /// `Forbidden` without `forms.view_all`.
    pub async fn booking_stats(&self, actor: &Actor) -> Result<BookingStats> {
        actor.require(permissions::FORMS_VIEW_ALL)?;

        let now = self.env.clock.now();
        let bookings = self.bookings.list(BookingFilter::default()).await?;
        let mut stats = BookingStats {
            total: bookings.len(),
            ..BookingStats::default()
        };
        for booking in &bookings {
            match booking.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Completed => stats.completed += 1,
            }
            if booking.created_at.year() == now.year() && booking.created_at.month() == now.month() {
                stats.this_month += 1;
            }
        }
        Ok(stats)
    }

    /// A booking's assignments. Vendors only see their own.
    ///
    /// # Errors
    ///
    /// `Forbidden` without `forms.read` or `vehicles.read`; `NotFound` for
    /// an unknown or deleted booking.
    pub async fn booking_assignments(
        &self,
        actor: &Actor,
        booking_id: BookingId,
    ) -> Result<Vec<VehicleAssignment>> {
        if !actor.has_permission(permissions::FORMS_READ) {
            actor.require(permissions::VEHICLES_READ)?;
        }
        self.load_booking(booking_id).await?;

        let mut assignments = self.assignments.list_by_booking(booking_id).await?;
        if actor.role == Role::Vendor {
            assignments.retain(|a| a.vendor_id() == actor.id);
        }
        Ok(assignments)
    }

    /// Per-booking assignment counts for a vendor, newest booking first.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor is that vendor (with `vehicles.read`) or
    /// an admin.
    #[tracing::instrument(skip_all, fields(actor = %actor.id, %vendor_id))]
    pub async fn vendor_summary(
        &self,
        actor: &Actor,
        vendor_id: UserId,
    ) -> Result<Vec<VendorBookingSummary>> {
        if !actor.is_admin() {
            actor.require(permissions::VEHICLES_READ)?;
            if actor.id != vendor_id {
                return Err(AllocationError::forbidden("own assignments"));
            }
        }

        let assignments = self.assignments.list_by_vendor(vendor_id).await?;
        let mut counts: Vec<(BookingId, usize, usize)> = Vec::new();
        for assignment in &assignments {
            let submitted = usize::from(!assignment.is_draft());
            match counts.iter_mut().find(|(id, ..)| *id == assignment.booking_id()) {
                Some((_, total, done)) => {
                    *total += 1;
                    *done += submitted;
                }
                None => counts.push((assignment.booking_id(), 1, submitted)),
            }
        }

        let mut summary = Vec::with_capacity(counts.len());
        for (booking_id, total, submitted) in counts {
            let Some(booking) = self.bookings.get(booking_id).await? else {
                tracing::warn!(%booking_id, "Assignments reference a missing booking");
                continue;
            };
            if booking.is_deleted() {
                continue;
            }
            summary.push(VendorBookingSummary {
                booking_id,
                ref_id: booking.ref_id,
                booking_no: booking.booking_no,
                status: booking.status,
                total,
                submitted,
                created_at: booking.created_at,
            });
        }
        summary.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summary)
    }

    /// Audit entries for one entity, newest first. Admins only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins.
    pub async fn audit_trail(
        &self,
        actor: &Actor,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>> {
        actor.require_role(&[Role::Admin])?;
        actor.require(permissions::AUDIT_READ)?;
        self.audit.entries_for(entity_type, entity_id).await
    }

    /// Audit entries of the last [`RECENT_ACTIVITY_DAYS`] days across all
    /// entities, newest first, at most `limit` (default
    /// [`DEFAULT_ACTIVITY_LIMIT`]). Admins only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins.
    pub async fn recent_activity(
        &self,
        actor: &Actor,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>> {
        actor.require_role(&[Role::Admin])?;
        actor.require(permissions::AUDIT_READ)?;

        let since = self.env.clock.now() - Duration::days(RECENT_ACTIVITY_DAYS);
        self.audit
            .recent(since, limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT))
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════

    /// A booking that exists and is not deleted.
    async fn load_booking(&self, id: BookingId) -> Result<Booking> {
        self.bookings
            .get(id)
            .await?
            .filter(|booking| !booking.is_deleted())
            .ok_or_else(|| AllocationError::not_found(BOOKING, id))
    }

    async fn owned_assignment(
        &self,
        actor: &Actor,
        id: AssignmentId,
    ) -> Result<VehicleAssignment> {
        let assignment = self
            .assignments
            .get(id)
            .await?
            .ok_or_else(|| AllocationError::not_found(VEHICLE_ASSIGNMENT, id))?;
        if assignment.vendor_id() != actor.id {
            return Err(AllocationError::forbidden("assigned vendor"));
        }
        Ok(assignment)
    }

    async fn reconcile_edit<'a>(
        &'a self,
        booking_id: BookingId,
        trigger: &'static str,
        editor: BookingEditor<'a>,
    ) -> Result<EditedBooking> {
        let started = Instant::now();
        let edited = self.bookings.edit(booking_id, editor).await?;
        let outcome = &edited.outcome;

        if !outcome.skipped.is_empty() {
            tracing::warn!(
                skipped = ?outcome.skipped,
                "Drafts submitted during reconciliation were kept"
            );
        }
        ReconcileMetrics::record_run(
            trigger,
            outcome.created.len(),
            outcome.deleted.len(),
            outcome.skipped.len(),
            started.elapsed(),
        );
        tracing::info!(
            created = outcome.created.len(),
            deleted = outcome.deleted.len(),
            skipped = outcome.skipped.len(),
            "Assignments reconciled"
        );
        Ok(edited)
    }

    async fn notify_created(&self, booking: &Booking, created: &[DraftAssignment]) -> DispatchReport {
        let batch = created
            .iter()
            .map(|draft| {
                (
                    draft.vendor_id,
                    Notification::vehicle_assigned(&booking.ref_id, draft),
                )
            })
            .collect();
        self.dispatcher.dispatch(batch).await
    }

    async fn record_audit(&self, entry: AuditEntry) {
        let (entity_type, action) = (entry.entity_type.clone(), entry.action.clone());
        if let Err(error) = self.audit.record(entry).await {
            tracing::warn!(%entity_type, %action, %error, "Audit entry not recorded");
        }
    }
}

fn deleted_error(booking: &Booking) -> AllocationError {
    AllocationError::invalid(format!("booking {} is deleted", booking.ref_id))
}

/// Reject changes to completed or deleted bookings.
fn ensure_open(booking: &Booking) -> Result<()> {
    if booking.is_deleted() {
        return Err(deleted_error(booking));
    }
    if booking.status == BookingStatus::Completed {
        return Err(AllocationError::invalid(format!(
            "booking {} is completed",
            booking.ref_id
        )));
    }
    Ok(())
}

/// One entry per allocated vendor with fewer submitted vehicles than requested.
fn missing_vehicles(booking: &Booking, assignments: &[VehicleAssignment]) -> Vec<String> {
    booking
        .allocations
        .iter()
        .filter(|allocation| {
            let submitted = assignments
                .iter()
                .filter(|a| a.vendor_id() == allocation.vendor_id && !a.is_draft())
                .count();
            submitted < allocation.requested_count as usize
        })
        .map(|allocation| format!("vehicles from vendor {}", allocation.vendor_id))
        .collect()
}

impl std::fmt::Debug for AllocationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationService")
            .field("dispatcher", &self.dispatcher)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}
