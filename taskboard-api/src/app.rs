/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::auth::middleware::create_jwt_middleware;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Secret used to sign and verify JWTs
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the router with every route and the middleware stack
///
/// ```text
/// /health                              public
/// /auth/{register,login,refresh}       public
/// /users/{profile,update_profile,dashboard_stats}
/// /projects, /projects/:id
/// /tasks, /tasks/:id, /tasks/:id/comments
/// /comments, /comments/:id
/// /teams, /teams/:id, /teams/:id/{add_member,remove_member}
/// /notifications, /notifications/:id, /notifications/:id/mark_as_read,
/// /notifications/{mark_all_as_read,unread_count}
/// ```
///
/// Everything outside `/health` and `/auth` requires a bearer access token.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{auth, comments, health, notifications, projects, tasks, teams, users};

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh));

    let user_routes = Router::new()
        .route("/profile", get(users::profile))
        .route("/update_profile", patch(users::update_profile).put(users::update_profile))
        .route("/dashboard_stats", get(users::dashboard_stats));

    let project_routes = Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/:id",
            get(projects::get_project)
                .put(projects::replace_project)
                .patch(projects::patch_project)
                .delete(projects::delete_project),
        );

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::replace_task)
                .patch(tasks::patch_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/:id/comments",
            get(comments::list_task_comments).post(comments::create_task_comment),
        );

    let comment_routes = Router::new()
        .route("/", get(comments::list_comments).post(comments::create_comment))
        .route(
            "/:id",
            get(comments::get_comment)
                .put(comments::replace_comment)
                .patch(comments::patch_comment)
                .delete(comments::delete_comment),
        );

    let team_routes = Router::new()
        .route("/", get(teams::list_teams).post(teams::create_team))
        .route(
            "/:id",
            get(teams::get_team)
                .put(teams::replace_team)
                .patch(teams::patch_team)
                .delete(teams::delete_team),
        )
        .route("/:id/add_member", post(teams::add_member))
        .route("/:id/remove_member", post(teams::remove_member));

    // Static segments win over `/:id` in the matcher
    let notification_routes = Router::new()
        .route(
            "/",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/unread_count", get(notifications::unread_count))
        .route("/mark_all_as_read", post(notifications::mark_all_as_read))
        .route(
            "/:id",
            get(notifications::get_notification)
                .put(notifications::replace_notification)
                .patch(notifications::patch_notification)
                .delete(notifications::delete_notification),
        )
        .route("/:id/mark_as_read", post(notifications::mark_as_read));

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .nest("/teams", team_routes)
        .nest("/notifications", notification_routes)
        .layer(middleware::from_fn(create_jwt_middleware(state.jwt_secret().to_string())));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
