/// Authentication endpoints
///
/// - `POST /auth/register` - Create an account and get tokens
/// - `POST /auth/login` - Exchange credentials for tokens
/// - `POST /auth/refresh` - Exchange a refresh token for a new access token
///
/// These routes are public; everything else requires a bearer token.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    views::UserView,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register request
///
/// `name` may be omitted when `first_name`/`last_name` are given; they are
/// joined into the display name.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 75, message = "First name must be at most 75 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 75, message = "Last name must be at most 75 characters"))]
    pub last_name: Option<String>,
}

impl RegisterRequest {
    /// Display name, from `name` or the joined first/last names
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }

        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        (!joined.is_empty()).then_some(joined)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Register/login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Access token
    pub token: String,

    pub refresh_token: String,

    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// Registers a new user
///
/// # Errors
///
/// - `422`: invalid email, name, or password, or the email is already taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let name = req
        .display_name()
        .ok_or_else(|| ApiError::invalid_field("name", "Name is required"))?;

    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    let email = req.email.trim().to_string();

    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::invalid_field(
            "email",
            "A user with this email already exists",
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    // A concurrent registration can still win the race; the unique
    // constraint then surfaces as the same 422 via From<sqlx::Error>.
    let user = User::create(
        &state.db,
        CreateUser {
            email,
            password_hash,
            name,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret(), state.config.access_token_ttl())?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: tokens.token,
            refresh_token: tokens.refresh_token,
            user: UserView::from(user),
        }),
    ))
}

/// Logs a user in
///
/// Unknown email and wrong password produce the same `401`.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let Some(user) = User::find_by_email(&state.db, req.email.trim()).await? else {
        password::verify_dummy(&req.password);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret(), state.config.access_token_ttl())?;

    Ok(Json(AuthResponse {
        token: tokens.token,
        refresh_token: tokens.refresh_token,
        user: UserView::from(user),
    }))
}

/// Issues a new access token
///
/// # Errors
///
/// - `401`: the refresh token is invalid, expired, or an access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let token = jwt::refresh_access_token(
        &req.refresh_token,
        state.jwt_secret(),
        state.config.access_token_ttl(),
    )?;

    Ok(Json(RefreshResponse { token }))
}
