//! In-app notification inbox.

use crate::storage;
use chrono::{DateTime, Utc};
use fleet_allocation_core::{AllocationError, Notification, Notifier, Result, UserId};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;

/// Default page size for [`PostgresNotificationOutbox::list_for_user`].
pub const DEFAULT_INBOX_LIMIT: i64 = 50;

/// A stored notification as shown in a user's inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxEntry {
    /// Row id
    pub id: i64,
    /// Recipient
    pub user_id: UserId,
    /// The message
    pub notification: Notification,
    /// Whether the user has opened it
    pub is_read: bool,
    /// When it was stored
    pub created_at: DateTime<Utc>,
}

/// [`Notifier`] that writes into the `notifications` table.
///
/// Delivery means "stored in the recipient's inbox"; clients poll
/// [`list_for_user`](Self::list_for_user) and
/// [`unread_count`](Self::unread_count).
#[derive(Clone, Debug)]
pub struct PostgresNotificationOutbox {
    pool: PgPool,
}

impl PostgresNotificationOutbox {
    /// Outbox over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Newest notifications for `user_id`, at most `limit`
    /// (defaults to [`DEFAULT_INBOX_LIMIT`]).
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`] if the query fails.
    pub async fn list_for_user(&self, user_id: UserId, limit: Option<i64>) -> Result<Vec<InboxEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, kind, title, message, data, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY id DESC
            LIMIT $2
            ",
        )
        .bind(user_id.as_uuid())
        .bind(limit.unwrap_or(DEFAULT_INBOX_LIMIT))
        .fetch_all(&self.pool)
        .await
        .map_err(storage("list notifications"))?;

        rows.iter().map(entry_from_row).collect()
    }

    /// Number of unread notifications for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`] if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage("count unread notifications"))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Mark one of `user_id`'s notifications as read.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::NotFound`] if the notification does not
    /// exist or belongs to someone else.
    pub async fn mark_as_read(&self, user_id: UserId, notification_id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage("mark notification read"))?;

        if result.rows_affected() == 0 {
            return Err(AllocationError::not_found("notification", notification_id));
        }
        Ok(())
    }

    /// Mark every notification of `user_id` as read, returning how many changed.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`] if the update fails.
    pub async fn mark_all_as_read(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(storage("mark notifications read"))?;

        Ok(result.rows_affected())
    }
}

impl Notifier for PostgresNotificationOutbox {
    fn notify(
        &self,
        recipient: UserId,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO notifications (user_id, kind, title, message, data)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(recipient.as_uuid())
            .bind(&notification.kind)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(Json(&notification.data))
            .execute(&self.pool)
            .await
            .map_err(|e| AllocationError::NotificationDelivery {
                recipient,
                reason: e.to_string(),
            })?;

            tracing::debug!(%recipient, kind = %notification.kind, "Notification stored");
            Ok(())
        })
    }
}

fn entry_from_row(row: &PgRow) -> Result<InboxEntry> {
    let decode = storage("decode notification");
    let Json(data): Json<serde_json::Value> = row.try_get("data").map_err(&decode)?;

    Ok(InboxEntry {
        id: row.try_get("id").map_err(&decode)?,
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(&decode)?),
        notification: Notification {
            kind: row.try_get("kind").map_err(&decode)?,
            title: row.try_get("title").map_err(&decode)?,
            message: row.try_get("message").map_err(&decode)?,
            data,
        },
        is_read: row.try_get("is_read").map_err(&decode)?,
        created_at: row.try_get("created_at").map_err(&decode)?,
    })
}
