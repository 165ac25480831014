/// Notification model and database operations
///
/// Notifications are addressed to a single user and only that user may see
/// or change them. Some are created directly by the user, others by the API
/// when a task is assigned or a team membership is granted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str = "id, user_id, message, read, timestamp";

/// Notification row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,

    /// Addressee
    pub user_id: Uuid,

    pub message: String,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateNotification {
    pub message: Option<String>,
    pub read: Option<bool>,
}

impl Notification {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        message: String,
        read: bool,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO notifications (user_id, message, read) VALUES ($1, $2, $3) RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(message)
            .bind(read)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM notifications WHERE id = $1", NOTIFICATION_COLUMNS);

        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the user's notifications, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE user_id = $1
            ORDER BY timestamp DESC, id
            LIMIT $2 OFFSET $3
            "#,
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateNotification,
    ) -> Result<Option<Self>, sqlx::Error> {
        // No updated_at on notifications; seed SET with a no-op assignment
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE notifications SET id = id");

        if let Some(message) = data.message {
            query.push(", message = ").push_bind(message);
        }
        if let Some(read) = data.read {
            query.push(", read = ").push_bind(read);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(NOTIFICATION_COLUMNS);

        query.build_query_as::<Notification>().fetch_optional(pool).await
    }

    /// Sets `read = true`; calling it again is harmless
    pub async fn mark_read(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE notifications SET read = TRUE WHERE id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Marks every unread notification of the user read, returning how many changed
    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
