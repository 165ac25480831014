/// Comment model and database operations
///
/// Comments hang off a task and are readable by the owner of that task's
/// project. Deleting the task or the author removes the comment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const COMMENT_COLUMNS: &str = "c.id, c.task_id, c.author_id, c.content, c.created_at, c.updated_at";

/// Comment row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub async fn create(
        pool: &PgPool,
        task_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, author_id, content, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM comments c WHERE c.id = $1", COMMENT_COLUMNS);

        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Owner of the project the comment's task belongs to
    pub async fn project_owner(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT p.owner_id
            FROM comments c
            JOIN tasks t ON t.id = c.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists comments on tasks in projects the user owns, oldest first
    pub async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
        task_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        query.push(COMMENT_COLUMNS);
        push_visible_scope(&mut query, user_id, task_id);
        query
            .push(" ORDER BY c.created_at ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<Comment>().fetch_all(pool).await
    }

    pub async fn count_visible(
        pool: &PgPool,
        user_id: Uuid,
        task_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
        push_visible_scope(&mut query, user_id, task_id);

        query.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Replaces the content and bumps `updated_at`
    pub async fn update_content(
        pool: &PgPool,
        id: Uuid,
        content: String,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, task_id, author_id, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_visible_scope(query: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, task_id: Option<Uuid>) {
    query
        .push(
            " FROM comments c JOIN tasks t ON t.id = c.task_id \
             JOIN projects p ON p.id = t.project_id WHERE p.owner_id = ",
        )
        .push_bind(user_id);

    if let Some(task_id) = task_id {
        query.push(" AND c.task_id = ").push_bind(task_id);
    }
}
