/// Task model and database operations
///
/// Tasks live inside a project and are cascade-deleted with it. A task is
/// visible to the owner of its project and to its assignee.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     due_date DATE,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     status work_status NOT NULL DEFAULT 'not_started',
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Visibility
///
/// ```sql
/// -- tasks visible to $1
/// SELECT t.* FROM tasks t
/// JOIN projects p ON p.id = t.project_id
/// WHERE p.owner_id = $1 OR t.assigned_to = $1
/// ```
///
/// The join yields one row per task, so a user who both owns the project and
/// is the assignee sees the task once.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::status::{TaskPriority, WorkStatus};

const TASK_COLUMNS: &str = "t.id, t.project_id, t.title, t.description, t.due_date, t.priority, \
                            t.status, t.completed, t.assigned_to, t.created_at, t.updated_at";

const TASK_RETURNING: &str = "id, project_id, title, description, due_date, priority, status, \
                              completed, assigned_to, created_at, updated_at";

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub status: WorkStatus,
    pub completed: bool,

    /// User responsible for the task
    pub assigned_to: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub status: WorkStatus,
    pub completed: bool,
    pub assigned_to: Option<Uuid>,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub project_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<WorkStatus>,
    pub completed: Option<bool>,
    pub assigned_to: Option<Option<Uuid>>,
}

/// Optional filters for [`Task::list_visible`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<WorkStatus>,
}

impl Task {
    /// Inserts a task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO tasks (project_id, title, description, due_date, priority, status,
                               completed, assigned_to)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            TASK_RETURNING
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.project_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.priority)
            .bind(data.status)
            .bind(data.completed)
            .bind(data.assigned_to)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID regardless of visibility
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM tasks t WHERE t.id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists tasks the user can see, newest first
    pub async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
        filter: TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        query.push(TASK_COLUMNS);
        push_visible_scope(&mut query, user_id, filter);
        query
            .push(" ORDER BY t.created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<Task>().fetch_all(pool).await
    }

    /// Counts tasks the user can see
    pub async fn count_visible(
        pool: &PgPool,
        user_id: Uuid,
        filter: TaskFilter,
    ) -> Result<i64, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
        push_visible_scope(&mut query, user_id, filter);

        query.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Applies a partial update and bumps `updated_at`
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTask) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(project_id) = data.project_id {
            query.push(", project_id = ").push_bind(project_id);
        }
        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(due_date) = data.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(priority) = data.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(completed) = data.completed {
            query.push(", completed = ").push_bind(completed);
        }
        if let Some(assigned_to) = data.assigned_to {
            query.push(", assigned_to = ").push_bind(assigned_to);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TASK_RETURNING);

        query.build_query_as::<Task>().fetch_optional(pool).await
    }

    /// Deletes a task and, by cascade, its comments
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_visible_scope(query: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: TaskFilter) {
    query
        .push(" FROM tasks t JOIN projects p ON p.id = t.project_id WHERE (p.owner_id = ")
        .push_bind(user_id)
        .push(" OR t.assigned_to = ")
        .push_bind(user_id)
        .push(")");

    if let Some(project_id) = filter.project_id {
        query.push(" AND t.project_id = ").push_bind(project_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND t.status = ").push_bind(status);
    }
}
