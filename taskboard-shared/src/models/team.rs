/// Team model and membership operations
///
/// A team has one creator and any number of members. The creator is
/// enrolled as a member when the team is created, in the same transaction
/// as the insert.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(150) NOT NULL,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE team_members (
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

const TEAM_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at";

/// Team row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// Only the creator may delete the team or remove members
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `Some(None)` clears the description
#[derive(Debug, Clone, Default)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl Team {
    /// Inserts a team and enrolls its creator as the first member
    pub async fn create(
        pool: &PgPool,
        name: String,
        description: Option<String>,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO teams (name, description, created_by) VALUES ($1, $2, $3) RETURNING {}",
            TEAM_COLUMNS
        );

        let team = sqlx::query_as::<_, Team>(&sql)
            .bind(name)
            .bind(description)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO team_members (team_id, user_id) VALUES ($1, $2)")
            .bind(team.id)
            .bind(created_by)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(team_id = %team.id, "Team created");
        Ok(team)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM teams WHERE id = $1", TEAM_COLUMNS);

        sqlx::query_as::<_, Team>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists teams the user created or belongs to, newest first
    pub async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM teams
            WHERE created_by = $1
               OR id IN (SELECT team_id FROM team_members WHERE user_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            TEAM_COLUMNS
        );

        sqlx::query_as::<_, Team>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_visible(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM teams
            WHERE created_by = $1
               OR id IN (SELECT team_id FROM team_members WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Member ids for several teams at once, as `(team_id, user_id)` pairs
    pub async fn member_pairs(
        pool: &PgPool,
        team_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>, sqlx::Error> {
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as(
            r#"
            SELECT team_id, user_id
            FROM team_members
            WHERE team_id = ANY($1)
            ORDER BY joined_at, user_id
            "#,
        )
        .bind(team_ids)
        .fetch_all(pool)
        .await
    }

    pub async fn is_member(pool: &PgPool, team_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM team_members WHERE team_id = $1 AND user_id = $2)",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Adds a member
    ///
    /// Returns false when the user was already a member.
    pub async fn add_member(pool: &PgPool, team_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (team_id, user_id) DO NOTHING
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a member; false when they were not one
    pub async fn remove_member(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTeam) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE teams SET updated_at = NOW()");

        if let Some(name) = data.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TEAM_COLUMNS);

        query.build_query_as::<Team>().fetch_optional(pool).await
    }

    /// Deletes a team; memberships go with it
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
