//! `AuditLog` over the `audit_log` table.

use crate::{PostgresFleetStore, storage};
use chrono::{DateTime, Utc};
use fleet_allocation_core::{AuditChanges, AuditEntry, AuditLog, Result, StoreFuture, UserId};
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use uuid::Uuid;

impl AuditLog for PostgresFleetStore {
    fn record(&self, entry: AuditEntry) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO audit_log (entity_type, entity_id, action, actor_id, recorded_at, changes)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(&entry.entity_type)
            .bind(&entry.entity_id)
            .bind(&entry.action)
            .bind(entry.actor_id.as_uuid())
            .bind(entry.timestamp)
            .bind(entry.changes.as_ref().map(Json))
            .execute(&self.pool)
            .await
            .map_err(storage("record audit entry"))?;
            Ok(())
        })
    }

    fn entries_for(&self, entity_type: &str, entity_id: &str) -> StoreFuture<'_, Vec<AuditEntry>> {
        let entity_type = entity_type.to_string();
        let entity_id = entity_id.to_string();
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT entity_type, entity_id, action, actor_id, recorded_at, changes
                FROM audit_log
                WHERE entity_type = $1 AND entity_id = $2
                ORDER BY id DESC
                ",
            )
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("load audit entries"))?;

            rows.iter().map(entry_from_row).collect()
        })
    }

    fn recent(&self, since: DateTime<Utc>, limit: usize) -> StoreFuture<'_, Vec<AuditEntry>> {
        Box::pin(async move {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = sqlx::query(
                r"
                SELECT entity_type, entity_id, action, actor_id, recorded_at, changes
                FROM audit_log
                WHERE recorded_at >= $1
                ORDER BY id DESC
                LIMIT $2
                ",
            )
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("load recent audit entries"))?;

            rows.iter().map(entry_from_row).collect()
        })
    }
}

fn entry_from_row(row: &PgRow) -> Result<AuditEntry> {
    let decode = storage("decode audit entry");
    let changes: Option<Json<AuditChanges>> = row.try_get("changes").map_err(&decode)?;

    Ok(AuditEntry {
        entity_type: row.try_get("entity_type").map_err(&decode)?,
        entity_id: row.try_get("entity_id").map_err(&decode)?,
        action: row.try_get("action").map_err(&decode)?,
        actor_id: UserId::from_uuid(row.try_get::<Uuid, _>("actor_id").map_err(&decode)?),
        timestamp: row.try_get("recorded_at").map_err(&decode)?,
        changes: changes.map(|Json(changes)| changes),
    })
}
