//! `BookingStore` over the `bookings` and `ref_counters` tables.

use crate::assignments::{apply_in, lock_assignments};
use crate::{PostgresFleetStore, from_db_count, is_unique_violation, storage, to_db_count};
use chrono::{DateTime, Utc};
use fleet_allocation_core::{
    Allocation, AllocationError, Booking, BookingDeletion, BookingEditor, BookingFilter, BookingId,
    BookingStore, EditedBooking, Result, StoreFuture, UserId, WorkingYear,
};
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

impl BookingStore for PostgresFleetStore {
    fn insert(&self, booking: Booking) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let quantity = to_db_count(booking.vehicle_quantity, "vehicle_quantity")?;
            sqlx::query(
                r"
                INSERT INTO bookings (
                    id, ref_id, booking_no, created_by, vehicle_quantity,
                    allocations, status, created_at, updated_at,
                    deleted_at, deleted_by, deletion_reason
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(booking.id.as_uuid())
            .bind(&booking.ref_id)
            .bind(&booking.booking_no)
            .bind(booking.created_by.as_uuid())
            .bind(quantity)
            .bind(Json(&booking.allocations))
            .bind(booking.status.as_str())
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .bind(booking.deletion.as_ref().map(|d| d.deleted_at))
            .bind(booking.deletion.as_ref().map(|d| *d.deleted_by.as_uuid()))
            .bind(booking.deletion.as_ref().map(|d| d.reason.as_str()))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AllocationError::Storage(format!(
                        "booking {} or reference {} already exists",
                        booking.id, booking.ref_id
                    ))
                } else {
                    AllocationError::Storage(format!("Failed to insert booking: {e}"))
                }
            })?;

            tracing::debug!(booking_id = %booking.id, ref_id = %booking.ref_id, "Booking inserted");
            Ok(())
        })
    }

    fn get(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, ref_id, booking_no, created_by, vehicle_quantity,
                       allocations, status, created_at, updated_at,
                       deleted_at, deleted_by, deletion_reason
                FROM bookings
                WHERE id = $1
                ",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("load booking"))?;

            row.as_ref().map(booking_from_row).transpose()
        })
    }

    fn list(&self, filter: BookingFilter) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, ref_id, booking_no, created_by, vehicle_quantity,
                       allocations, status, created_at, updated_at,
                       deleted_at, deleted_by, deletion_reason
                FROM bookings
                WHERE ($1::uuid IS NULL OR created_by = $1)
                  AND ($2::text IS NULL
                       OR allocations @> jsonb_build_array(jsonb_build_object('vendor_id', $2::text)))
                  AND ($3::text IS NULL OR status = $3)
                  AND ($4::timestamptz IS NULL OR created_at >= $4)
                  AND ($5::timestamptz IS NULL OR created_at <= $5)
                  AND ($6::text IS NULL OR strpos(ref_id, $6) > 0)
                  AND ($7 OR deleted_at IS NULL)
                ORDER BY created_at DESC, ref_id DESC
                ",
            )
            .bind(filter.created_by.map(|id| *id.as_uuid()))
            .bind(filter.vendor_id.map(|id| id.to_string()))
            .bind(filter.status.map(|status| status.as_str()))
            .bind(filter.created_from)
            .bind(filter.created_to)
            .bind(filter.ref_id_contains.as_deref())
            .bind(filter.include_deleted)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list bookings"))?;

            rows.iter().map(booking_from_row).collect()
        })
    }

    fn edit<'a>(
        &'a self,
        id: BookingId,
        editor: BookingEditor<'a>,
    ) -> StoreFuture<'a, EditedBooking> {
        Box::pin(
            async move {
                let started = Instant::now();
                let mut tx = self.pool.begin().await.map_err(storage("begin transaction"))?;

                let row = sqlx::query(
                    r"
                    SELECT id, ref_id, booking_no, created_by, vehicle_quantity,
                           allocations, status, created_at, updated_at,
                           deleted_at, deleted_by, deletion_reason
                    FROM bookings
                    WHERE id = $1
                    FOR UPDATE
                    ",
                )
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage("lock booking"))?
                .ok_or_else(|| AllocationError::not_found("booking", id))?;
                let before = booking_from_row(&row)?;
                let existing = lock_assignments(&mut tx, id).await?;

                // Dropping `tx` on an editor error rolls back.
                let edit = editor(&before, &existing)?;
                let deletion = edit.booking.deletion.as_ref();

                let row = sqlx::query(
                    r"
                    UPDATE bookings
                    SET allocations = $2, status = $3, updated_at = $4,
                        deleted_at = $5, deleted_by = $6, deletion_reason = $7
                    WHERE id = $1
                    RETURNING id, ref_id, booking_no, created_by, vehicle_quantity,
                              allocations, status, created_at, updated_at,
                              deleted_at, deleted_by, deletion_reason
                    ",
                )
                .bind(id.as_uuid())
                .bind(Json(&edit.booking.allocations))
                .bind(edit.booking.status.as_str())
                .bind(edit.booking.updated_at)
                .bind(deletion.map(|d| d.deleted_at))
                .bind(deletion.map(|d| *d.deleted_by.as_uuid()))
                .bind(deletion.map(|d| d.reason.as_str()))
                .fetch_one(&mut *tx)
                .await
                .map_err(storage("update booking"))?;
                let after = booking_from_row(&row)?;

                let outcome = apply_in(&mut tx, id, edit.plan).await?;
                tx.commit().await.map_err(storage("commit booking edit"))?;

                metrics::histogram!("postgres_booking_edit_seconds")
                    .record(started.elapsed().as_secs_f64());
                Ok(EditedBooking {
                    before,
                    after,
                    outcome,
                })
            }
            .instrument(tracing::debug_span!("postgres_booking_edit", booking_id = %id)),
        )
    }

    fn next_ref_counter(&self, year: WorkingYear) -> StoreFuture<'_, u32> {
        Box::pin(async move {
            let (counter,): (i32,) = sqlx::query_as(
                r"
                INSERT INTO ref_counters (working_year, counter)
                VALUES ($1, 1)
                ON CONFLICT (working_year)
                DO UPDATE SET counter = ref_counters.counter + 1
                RETURNING counter
                ",
            )
            .bind(year.start_year())
            .fetch_one(&self.pool)
            .await
            .map_err(storage("advance reference counter"))?;

            from_db_count(counter, "ref counter")
        })
    }
}

fn booking_from_row(row: &PgRow) -> Result<Booking> {
    let decode = storage("decode booking");
    let status: String = row.try_get("status").map_err(&decode)?;
    let Json(allocations): Json<Vec<Allocation>> = row.try_get("allocations").map_err(&decode)?;

    Ok(Booking {
        id: BookingId::from_uuid(row.try_get::<Uuid, _>("id").map_err(&decode)?),
        ref_id: row.try_get("ref_id").map_err(&decode)?,
        booking_no: row.try_get("booking_no").map_err(&decode)?,
        created_by: UserId::from_uuid(row.try_get::<Uuid, _>("created_by").map_err(&decode)?),
        vehicle_quantity: from_db_count(
            row.try_get("vehicle_quantity").map_err(&decode)?,
            "vehicle_quantity",
        )?,
        allocations,
        status: status.parse()?,
        created_at: row.try_get("created_at").map_err(&decode)?,
        updated_at: row.try_get("updated_at").map_err(&decode)?,
        deletion: deletion_from_row(row)?,
    })
}

fn deletion_from_row(row: &PgRow) -> Result<Option<BookingDeletion>> {
    let decode = storage("decode booking deletion");
    let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at").map_err(&decode)?;
    let deleted_by: Option<Uuid> = row.try_get("deleted_by").map_err(&decode)?;
    let reason: Option<String> = row.try_get("deletion_reason").map_err(&decode)?;

    Ok(deleted_at.zip(deleted_by).map(|(deleted_at, deleted_by)| BookingDeletion {
        deleted_at,
        deleted_by: UserId::from_uuid(deleted_by),
        reason: reason.unwrap_or_default(),
    }))
}
