/// User endpoints
///
/// - `GET /users/profile`
/// - `PATCH /users/update_profile`
/// - `GET /users/dashboard_stats`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::double_option,
    views::{self, NotificationView, UserView},
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    dashboard::DashboardStats,
    models::user::{UpdateProfile, User},
};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub profile_image: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
}

impl UpdateProfileRequest {
    fn check_lengths(&self) -> ApiResult<()> {
        let limits = [
            ("profile_image", &self.profile_image, 512),
            ("phone", &self.phone, 32),
            ("location", &self.location, 255),
        ];

        for (field, value, max) in limits {
            if let Some(Some(v)) = value {
                if v.chars().count() > max {
                    return Err(ApiError::invalid_field(
                        field,
                        format!("Must be at most {} characters", max),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl From<UpdateProfileRequest> for UpdateProfile {
    fn from(req: UpdateProfileRequest) -> Self {
        UpdateProfile {
            name: req.name,
            profile_image: req.profile_image,
            phone: req.phone,
            location: req.location,
            bio: req.bio,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_projects: i64,
    pub total_tasks: i64,
    pub pending_tasks: i64,
    pub total_team_members: i64,
    pub unread_notifications: i64,
    pub recent_notifications: Vec<NotificationView>,
}

/// The requester's own profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserView>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserView::from(user)))
}

/// Edits the requester's profile; `null` clears optional fields
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserView>> {
    req.validate()?;
    req.check_lengths()?;

    let user = User::update_profile(&state.db, auth.user_id, req.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::debug!(user_id = %user.id, "Profile updated");

    Ok(Json(UserView::from(user)))
}

/// Aggregated counts for the landing page
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardResponse>> {
    let stats = DashboardStats::compute(&state.db, auth.user_id).await?;
    let recent_notifications = views::notification_views(&state.db, stats.recent_notifications).await?;

    Ok(Json(DashboardResponse {
        total_projects: stats.total_projects,
        total_tasks: stats.total_tasks,
        pending_tasks: stats.pending_tasks,
        total_team_members: stats.total_team_members,
        unread_notifications: stats.unread_notifications,
        recent_notifications,
    }))
}
