//! `AssignmentStore` over the `vehicle_assignments` table.
//!
//! Rows keep a `seq` column filled from a sequence; every listing orders by it
//! so creation order survives identical `created_at` timestamps.

use crate::{PostgresFleetStore, storage};
use chrono::{DateTime, Utc};
use fleet_allocation_core::{
    AllocationError, AssignmentId, AssignmentStatus, AssignmentStore, BookingId, DraftAssignment,
    DraftDetails, Planner, ReconcileOutcome, ReconcilePlan, Result, StoreFuture,
    SubmittedAssignment, TransportDetails, UserId, VehicleAssignment,
};
use sqlx::Row;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::types::Json;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

impl AssignmentStore for PostgresFleetStore {
    fn list_by_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Vec<VehicleAssignment>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, booking_id, vendor_id, status, details,
                       created_at, submitted_at, submitted_by
                FROM vehicle_assignments
                WHERE booking_id = $1
                ORDER BY seq
                ",
            )
            .bind(booking_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list booking assignments"))?;

            rows.iter().map(assignment_from_row).collect()
        })
    }

    fn list_by_vendor(&self, vendor_id: UserId) -> StoreFuture<'_, Vec<VehicleAssignment>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, booking_id, vendor_id, status, details,
                       created_at, submitted_at, submitted_by
                FROM vehicle_assignments
                WHERE vendor_id = $1
                ORDER BY seq
                ",
            )
            .bind(vendor_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list vendor assignments"))?;

            rows.iter().map(assignment_from_row).collect()
        })
    }

    fn get(&self, id: AssignmentId) -> StoreFuture<'_, Option<VehicleAssignment>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, booking_id, vendor_id, status, details,
                       created_at, submitted_at, submitted_by
                FROM vehicle_assignments
                WHERE id = $1
                ",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("load vehicle assignment"))?;

            row.as_ref().map(assignment_from_row).transpose()
        })
    }

    fn apply_plan(
        &self,
        booking_id: BookingId,
        plan: ReconcilePlan,
    ) -> StoreFuture<'_, ReconcileOutcome> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(storage("begin transaction"))?;
            let outcome = apply_in(&mut tx, booking_id, plan).await?;
            tx.commit().await.map_err(storage("commit reconciliation"))?;
            Ok(outcome)
        })
    }

    fn reconcile<'a>(
        &'a self,
        booking_id: BookingId,
        planner: Planner<'a>,
    ) -> StoreFuture<'a, ReconcileOutcome> {
        Box::pin(async move {
            let started = Instant::now();
            let mut tx = self.pool.begin().await.map_err(storage("begin transaction"))?;

            // Serializes reconciliations of one booking, including the
            // booking with no assignment rows yet.
            sqlx::query("SELECT id FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage("lock booking"))?;

            let existing = lock_assignments(&mut tx, booking_id).await?;

            // Dropping `tx` on a planner error rolls back.
            let plan = planner(&existing)?;
            let outcome = apply_in(&mut tx, booking_id, plan).await?;
            tx.commit().await.map_err(storage("commit reconciliation"))?;

            metrics::histogram!("postgres_reconcile_transaction_seconds")
                .record(started.elapsed().as_secs_f64());
            Ok(outcome)
        }
        .instrument(tracing::debug_span!("postgres_reconcile", %booking_id)))
    }

    fn save_draft_details(
        &self,
        id: AssignmentId,
        details: DraftDetails,
    ) -> StoreFuture<'_, DraftAssignment> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                UPDATE vehicle_assignments
                SET details = $2
                WHERE id = $1 AND status = 'draft'
                RETURNING id, booking_id, vendor_id, status, details,
                          created_at, submitted_at, submitted_by
                ",
            )
            .bind(id.as_uuid())
            .bind(Json(&details))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("save draft details"))?;

            match row {
                Some(row) => assignment_from_row(&row)?.into_draft(),
                None => Err(self.not_a_draft(id).await),
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
            details.validate()?;

            let row = sqlx::query(
                r"
                UPDATE vehicle_assignments
                SET status = 'submitted', details = $2, submitted_at = $3, submitted_by = $4
                WHERE id = $1 AND status = 'draft'
                RETURNING id, booking_id, vendor_id, status, details,
                          created_at, submitted_at, submitted_by
                ",
            )
            .bind(id.as_uuid())
            .bind(Json(&details))
            .bind(submitted_at)
            .bind(submitted_by.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("submit vehicle assignment"))?;

            let Some(row) = row else {
                metrics::counter!("postgres_submit_conflicts_total").increment(1);
                return Err(self.not_a_draft(id).await);
            };

            match assignment_from_row(&row)? {
                VehicleAssignment::Submitted(submitted) => Ok(submitted),
                VehicleAssignment::Draft(draft) => Err(AllocationError::Storage(format!(
                    "assignment {} still a draft after submit",
                    draft.id
                ))),
            }
        })
    }
}

impl PostgresFleetStore {
    /// Error for a conditional update that matched no draft row.
    async fn not_a_draft(&self, id: AssignmentId) -> AllocationError {
        match AssignmentStore::get(self, id).await {
            Ok(Some(_)) => AllocationError::AlreadySubmitted { assignment_id: id },
            Ok(None) => AllocationError::not_found("assignment", id),
            Err(e) => e,
        }
    }
}

/// A booking's assignments in creation order, row-locked until `conn`'s
/// transaction ends.
pub(crate) async fn lock_assignments(
    conn: &mut PgConnection,
    booking_id: BookingId,
) -> Result<Vec<VehicleAssignment>> {
    let rows = sqlx::query(
        r"
        SELECT id, booking_id, vendor_id, status, details,
               created_at, submitted_at, submitted_by
        FROM vehicle_assignments
        WHERE booking_id = $1
        ORDER BY seq
        FOR UPDATE
        ",
    )
    .bind(booking_id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(storage("lock booking assignments"))?;

    rows.iter().map(assignment_from_row).collect()
}

/// Insert the plan's drafts and delete its ids on `conn`.
///
/// Deletion only matches a draft of `booking_id`; anything else is reported
/// as skipped.
pub(crate) async fn apply_in(
    conn: &mut PgConnection,
    booking_id: BookingId,
    plan: ReconcilePlan,
) -> Result<ReconcileOutcome> {
    for draft in &plan.created {
        sqlx::query(
            r"
            INSERT INTO vehicle_assignments (id, booking_id, vendor_id, status, details, created_at)
            VALUES ($1, $2, $3, 'draft', $4, $5)
            ",
        )
        .bind(draft.id.as_uuid())
        .bind(draft.booking_id.as_uuid())
        .bind(draft.vendor_id.as_uuid())
        .bind(Json(&draft.details))
        .bind(draft.created_at)
        .execute(&mut *conn)
        .await
        .map_err(storage("insert draft assignment"))?;
    }

    let mut deleted = Vec::with_capacity(plan.deleted.len());
    let mut skipped = Vec::new();
    for id in plan.deleted {
        let result = sqlx::query(
            r"
            DELETE FROM vehicle_assignments
            WHERE id = $1 AND booking_id = $2 AND status = 'draft'
            ",
        )
        .bind(id.as_uuid())
        .bind(booking_id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(storage("delete draft assignment"))?;

        if result.rows_affected() == 0 {
            tracing::warn!(assignment_id = %id, "Planned deletion skipped, record is no longer a draft");
            skipped.push(id);
        } else {
            deleted.push(id);
        }
    }

    Ok(ReconcileOutcome {
        created: plan.created,
        deleted,
        skipped,
    })
}

fn assignment_from_row(row: &PgRow) -> Result<VehicleAssignment> {
    let decode = storage("decode vehicle assignment");
    let id = AssignmentId::from_uuid(row.try_get::<Uuid, _>("id").map_err(&decode)?);
    let booking_id = BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id").map_err(&decode)?);
    let vendor_id = UserId::from_uuid(row.try_get::<Uuid, _>("vendor_id").map_err(&decode)?);
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(&decode)?;
    let status: AssignmentStatus = row.try_get::<String, _>("status").map_err(&decode)?.parse()?;

    match status {
        AssignmentStatus::Draft => {
            let Json(details): Json<DraftDetails> = row.try_get("details").map_err(&decode)?;
            Ok(VehicleAssignment::Draft(DraftAssignment {
                id,
                booking_id,
                vendor_id,
                created_at,
                details,
            }))
        }
        AssignmentStatus::Submitted => {
            let Json(details): Json<TransportDetails> = row.try_get("details").map_err(&decode)?;
            let submitted_at: Option<DateTime<Utc>> = row.try_get("submitted_at").map_err(&decode)?;
            let submitted_by: Option<Uuid> = row.try_get("submitted_by").map_err(&decode)?;
            let (Some(submitted_at), Some(submitted_by)) = (submitted_at, submitted_by) else {
                return Err(AllocationError::Storage(format!(
                    "submitted assignment {id} has no submission stamp"
                )));
            };
            Ok(VehicleAssignment::Submitted(SubmittedAssignment {
                id,
                booking_id,
                vendor_id,
                created_at,
                details,
                submitted_at,
                submitted_by: UserId::from_uuid(submitted_by),
            }))
        }
    }
}
