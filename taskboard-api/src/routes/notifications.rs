/// Notification endpoints
///
/// Every notification is private to its addressee.
///
/// - `GET /notifications`, `POST /notifications`
/// - `GET/PUT/PATCH/DELETE /notifications/:id`
/// - `POST /notifications/:id/mark_as_read`
/// - `POST /notifications/mark_all_as_read`
/// - `GET /notifications/unread_count`

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{ensure_visible, not_found, Page, Pagination},
    views::{self, NotificationView},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        authorization::{Relation, ResourceKind},
        middleware::AuthContext,
    },
    models::notification::{Notification, UpdateNotification},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct NotificationRequest {
    #[validate(length(min = 1, message = "Message must not be empty"))]
    pub message: String,

    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchNotificationRequest {
    #[validate(length(min = 1, message = "Message must not be empty"))]
    pub message: Option<String>,

    pub read: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllResponse {
    pub updated: u64,
}

fn relation(notification: &Notification, auth: &AuthContext) -> Relation {
    if notification.user_id == auth.user_id {
        Relation::addressee()
    } else {
        Relation::NONE
    }
}

/// Loads one of the caller's notifications, or 404
async fn load_own(state: &AppState, auth: &AuthContext, id: Uuid) -> ApiResult<Notification> {
    let notification = Notification::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Notification))?;

    ensure_visible(ResourceKind::Notification, relation(&notification, auth))?;
    Ok(notification)
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<NotificationView>>> {
    let count = Notification::count_for_user(&state.db, auth.user_id).await?;
    let notifications =
        Notification::list_for_user(&state.db, auth.user_id, page.limit(), page.offset()).await?;

    let results = views::notification_views(&state.db, notifications).await?;
    Ok(Json(Page::new(count, page, results)))
}

/// Creates a notification addressed to the caller
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<NotificationRequest>,
) -> ApiResult<(StatusCode, Json<NotificationView>)> {
    req.validate()?;

    let notification =
        Notification::create(&state.db, auth.user_id, req.message, req.read).await?;

    Ok((
        StatusCode::CREATED,
        Json(views::notification_view(&state.db, notification).await?),
    ))
}

pub async fn get_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<NotificationView>> {
    let notification = load_own(&state, &auth, id).await?;
    Ok(Json(views::notification_view(&state.db, notification).await?))
}

pub async fn replace_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<NotificationRequest>,
) -> ApiResult<Json<NotificationView>> {
    req.validate()?;

    let update = UpdateNotification {
        message: Some(req.message),
        read: Some(req.read),
    };
    apply_update(&state, &auth, id, update).await
}

pub async fn patch_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchNotificationRequest>,
) -> ApiResult<Json<NotificationView>> {
    req.validate()?;

    let update = UpdateNotification {
        message: req.message,
        read: req.read,
    };
    apply_update(&state, &auth, id, update).await
}

async fn apply_update(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    update: UpdateNotification,
) -> ApiResult<Json<NotificationView>> {
    load_own(state, auth, id).await?;

    let notification = Notification::update(&state.db, id, update)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Notification))?;

    Ok(Json(views::notification_view(&state.db, notification).await?))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_own(&state, &auth, id).await?;

    if !Notification::delete(&state.db, id).await? {
        return Err(not_found(ResourceKind::Notification));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Marks one notification read; repeated calls succeed
pub async fn mark_as_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<NotificationView>> {
    load_own(&state, &auth, id).await?;

    let notification = Notification::mark_read(&state.db, id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Notification))?;

    Ok(Json(views::notification_view(&state.db, notification).await?))
}

pub async fn mark_all_as_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MarkAllResponse>> {
    let updated = Notification::mark_all_read(&state.db, auth.user_id).await?;
    tracing::debug!(user_id = %auth.user_id, updated, "Notifications marked read");

    Ok(Json(MarkAllResponse { updated }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let unread_count = Notification::unread_count(&state.db, auth.user_id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_only_addressee_relates() {
        let owner = Uuid::new_v4();
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: owner,
            message: "hello".to_string(),
            read: false,
            timestamp: Utc::now(),
        };

        assert_eq!(
            relation(&notification, &AuthContext::new(owner)),
            Relation::addressee()
        );
        assert_eq!(
            relation(&notification, &AuthContext::new(Uuid::new_v4())),
            Relation::NONE
        );
    }

    #[test]
    fn test_request_defaults_unread() {
        let req: NotificationRequest =
            serde_json::from_str(r#"{"message": "Remember the standup"}"#).unwrap();
        assert!(!req.read);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_unread_count_shape() {
        let json = serde_json::to_value(UnreadCountResponse { unread_count: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({ "unread_count": 4 }));
    }
}
