/// Project model and database operations
///
/// A project belongs to exactly one owner and is only visible to that owner.
/// Deleting the owner cascades to their projects, and deleting a project
/// cascades to its tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     url VARCHAR(512),
///     image_url VARCHAR(512),
///     status work_status NOT NULL DEFAULT 'not_started',
///     progress INTEGER CHECK (progress BETWEEN 0 AND 100),
///     start_date DATE,
///     end_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::status::WorkStatus;

const PROJECT_COLUMNS: &str = "id, owner_id, title, description, url, image_url, status, progress, \
                               start_date, end_date, created_at, updated_at";

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    /// The only user allowed to see or change the project
    pub owner_id: Uuid,

    pub title: String,
    pub description: String,

    /// External link
    pub url: Option<String>,

    /// Cover image reference
    pub image_url: Option<String>,

    pub status: WorkStatus,

    /// Percentage, 0..=100
    pub progress: Option<i32>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub status: WorkStatus,
    pub progress: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub status: Option<WorkStatus>,
    pub progress: Option<Option<i32>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
}

impl Project {
    /// Inserts a project
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO projects (owner_id, title, description, url, image_url, status,
                                  progress, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&sql)
            .bind(data.owner_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.url)
            .bind(data.image_url)
            .bind(data.status)
            .bind(data.progress)
            .bind(data.start_date)
            .bind(data.end_date)
            .fetch_one(pool)
            .await
    }

    /// Finds a project by ID regardless of owner
    ///
    /// Callers decide visibility with the policy table.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);

        sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetches every project whose id is in `ids`
    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {} FROM projects WHERE id = ANY($1)", PROJECT_COLUMNS);

        sqlx::query_as::<_, Project>(&sql)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Lists the owner's projects, newest first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM projects
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&sql)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Counts the owner's projects
    pub async fn count_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(pool)
            .await
    }

    /// Applies a partial update and bumps `updated_at`
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE projects SET updated_at = NOW()");

        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(url) = data.url {
            query.push(", url = ").push_bind(url);
        }
        if let Some(image_url) = data.image_url {
            query.push(", image_url = ").push_bind(image_url);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(progress) = data.progress {
            query.push(", progress = ").push_bind(progress);
        }
        if let Some(start_date) = data.start_date {
            query.push(", start_date = ").push_bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            query.push(", end_date = ").push_bind(end_date);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(PROJECT_COLUMNS);

        query.build_query_as::<Project>().fetch_optional(pool).await
    }

    /// Deletes a project and, by cascade, its tasks and their comments
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl UpdateProject {
    /// Start/end dates after applying this update to `current`
    pub fn effective_dates(&self, current: &Project) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            self.start_date.unwrap_or(current.start_date),
            self.end_date.unwrap_or(current.end_date),
        )
    }
}

/// True when both dates are set and the end precedes the start
pub fn dates_out_of_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    matches!((start, end), (Some(s), Some(e)) if e < s)
}
