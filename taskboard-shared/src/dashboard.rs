/// Dashboard aggregation
///
/// Per-user counts shown on the landing page. Each count is an independent
/// point-in-time read; no transaction spans them.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::dashboard::DashboardStats;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let stats = DashboardStats::compute(&pool, user_id).await?;
/// assert!(stats.pending_tasks <= stats.total_tasks);
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{notification::Notification, status::WorkStatus};

/// How many notifications the dashboard embeds
pub const RECENT_NOTIFICATIONS: i64 = 5;

/// Failure while computing dashboard stats
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The database could not be reached (pool exhausted, closed, or I/O)
    #[error("Data store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    /// A query ran and failed
    #[error("Dashboard query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DashboardError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DashboardError::StoreUnavailable(err)
            }
            other => DashboardError::Query(other),
        }
    }
}

/// Aggregated counts for one user
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Projects the user owns
    pub total_projects: i64,

    /// Tasks in owned projects or assigned to the user, each counted once
    pub total_tasks: i64,

    /// Subset of `total_tasks` not yet completed
    pub pending_tasks: i64,

    /// Distinct members across every team the user created or belongs to
    pub total_team_members: i64,

    pub unread_notifications: i64,

    /// Newest first, at most [`RECENT_NOTIFICATIONS`]
    pub recent_notifications: Vec<Notification>,
}

impl DashboardStats {
    /// Computes all counts for `user_id`
    pub async fn compute(pool: &PgPool, user_id: Uuid) -> Result<Self, DashboardError> {
        let total_projects: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE owner_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await
                .map_err(log_failure("total_projects"))?;

        let (total_tasks, pending_tasks): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE t.status::text = ANY($2))
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE p.owner_id = $1 OR t.assigned_to = $1
            "#,
        )
        .bind(user_id)
        .bind(WorkStatus::pending_names())
        .fetch_one(pool)
        .await
        .map_err(log_failure("total_tasks"))?;

        let total_team_members: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT tm.user_id)
            FROM team_members tm
            JOIN teams t ON t.id = tm.team_id
            WHERE t.created_by = $1
               OR tm.team_id IN (SELECT team_id FROM team_members WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(log_failure("total_team_members"))?;

        let unread_notifications = Notification::unread_count(pool, user_id)
            .await
            .map_err(log_failure("unread_notifications"))?;

        let recent_notifications =
            Notification::list_for_user(pool, user_id, RECENT_NOTIFICATIONS, 0)
                .await
                .map_err(log_failure("recent_notifications"))?;

        debug!(
            user_id = %user_id,
            total_projects,
            total_tasks,
            pending_tasks,
            total_team_members,
            "Dashboard stats computed"
        );

        Ok(Self {
            total_projects,
            total_tasks,
            pending_tasks,
            total_team_members,
            unread_notifications,
            recent_notifications,
        })
    }
}

fn log_failure(stat: &'static str) -> impl Fn(sqlx::Error) -> DashboardError {
    move |err| {
        warn!(stat, error = %err, "Dashboard query failed");
        DashboardError::from(err)
    }
}
