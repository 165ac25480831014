//! Integration tests for schema migrations
//!
//! Need a PostgreSQL server reachable through `DATABASE_URL`. Tests that
//! start from an empty schema work on a throwaway database next to the
//! configured one and drop it afterwards.

use taskboard_shared::db::{
    migrations::{drop_database, ensure_database_exists, get_migration_status, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use uuid::Uuid;

macro_rules! database_url {
    () => {
        match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

/// Same server and credentials, different database name
fn scratch_url(base: &str) -> String {
    let (prefix, _) = base.rsplit_once('/').unwrap_or((base, ""));
    format!("{}/taskboard_scratch_{}", prefix, Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_fresh_database_migrates_fully() {
    let base = database_url!();
    let url = scratch_url(&base);

    ensure_database_exists(&url).await.expect("scratch database should be created");
    let pool = create_pool(DatabaseConfig::with_url(url.clone()))
        .await
        .expect("pool should connect");

    let before = get_migration_status(&pool).await.expect("status should load");
    assert_eq!(before.applied_migrations, 0);
    assert!(before.latest_version.is_none());
    assert!(!before.is_up_to_date);

    run_migrations(&pool).await.expect("migrations should apply");

    let after = get_migration_status(&pool).await.expect("status should load");
    assert_eq!(after.applied_migrations, after.embedded_migrations);
    assert!(after.is_up_to_date);

    for table in ["users", "projects", "tasks", "comments", "teams", "team_members", "notifications"] {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .expect("table lookup should succeed");

        assert!(exists, "table {} missing after migrations", table);
    }

    for type_name in ["work_status", "task_priority"] {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT FROM pg_type WHERE typname = $1)")
            .bind(type_name)
            .fetch_one(&pool)
            .await
            .expect("type lookup should succeed");

        assert!(exists, "enum {} missing after migrations", type_name);
    }

    close_pool(pool).await;
    drop_database(&url).await.expect("scratch database should drop");
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let url = database_url!();

    let pool = create_pool(DatabaseConfig::with_url(url))
        .await
        .expect("pool should connect");

    run_migrations(&pool).await.expect("first run should succeed");
    let first = get_migration_status(&pool).await.expect("status should load");

    run_migrations(&pool).await.expect("second run should succeed");
    let second = get_migration_status(&pool).await.expect("status should load");

    assert_eq!(first, second);
    close_pool(pool).await;
}

#[tokio::test]
async fn test_drop_database_removes_it() {
    let base = database_url!();
    let url = scratch_url(&base);

    ensure_database_exists(&url).await.expect("scratch database should be created");
    drop_database(&url).await.expect("drop should succeed");

    // Dropping again is a no-op
    drop_database(&url).await.expect("second drop should succeed");

    let result = create_pool(DatabaseConfig {
        acquire_timeout_seconds: 2,
        ..DatabaseConfig::with_url(url)
    })
    .await;
    assert!(result.is_err(), "dropped database should not accept connections");
}
