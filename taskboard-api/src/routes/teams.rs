/// Team endpoints
///
/// - `GET /teams` - Teams the caller created or belongs to
/// - `POST /teams` - Create a team; the caller becomes its first member
/// - `GET /teams/:id`, `PUT /teams/:id`, `PATCH /teams/:id`
/// - `DELETE /teams/:id` - Creator only
/// - `POST /teams/:id/add_member` - `{user_id}`
/// - `POST /teams/:id/remove_member` - `{user_id}`, creator only

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, ensure_visible, not_found, Page, Pagination},
    views::{self, TeamView},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        authorization::{require, Action, Relation, ResourceKind},
        middleware::AuthContext,
    },
    models::{
        notification::Notification,
        team::{Team, UpdateTeam},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Body of `POST` and `PUT`
#[derive(Debug, Deserialize, Validate)]
pub struct TeamRequest {
    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: String,

    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchTeamRequest {
    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// Body of `add_member` and `remove_member`
#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    #[serde(alias = "user")]
    pub user_id: Uuid,
}

impl From<TeamRequest> for UpdateTeam {
    fn from(req: TeamRequest) -> Self {
        UpdateTeam {
            name: Some(req.name),
            description: Some(req.description),
        }
    }
}

impl From<PatchTeamRequest> for UpdateTeam {
    fn from(req: PatchTeamRequest) -> Self {
        UpdateTeam {
            name: req.name,
            description: req.description,
        }
    }
}

async fn load_with_relation(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<(Team, Relation)> {
    let team = Team::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Team))?;

    let rel = Relation {
        owner: team.created_by == auth.user_id,
        member: Team::is_member(&state.db, id, auth.user_id).await?,
        ..Relation::NONE
    };

    Ok((team, rel))
}

/// Loads a team the caller can see and checks `action` against it
async fn load_for(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    action: Action,
) -> ApiResult<Team> {
    let (team, rel) = load_with_relation(state, auth, id).await?;
    ensure_visible(ResourceKind::Team, rel)?;
    require(ResourceKind::Team, action, rel)?;
    Ok(team)
}

pub async fn list_teams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<TeamView>>> {
    let count = Team::count_visible(&state.db, auth.user_id).await?;
    let teams = Team::list_visible(&state.db, auth.user_id, page.limit(), page.offset()).await?;

    let results = views::team_views(&state.db, teams).await?;
    Ok(Json(Page::new(count, page, results)))
}

pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TeamRequest>,
) -> ApiResult<(StatusCode, Json<TeamView>)> {
    req.validate()?;

    let team = Team::create(&state.db, req.name, req.description, auth.user_id).await?;
    tracing::info!(team_id = %team.id, created_by = %auth.user_id, "Team created");

    Ok((StatusCode::CREATED, Json(views::team_view(&state.db, team).await?)))
}

pub async fn get_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TeamView>> {
    let team = load_for(&state, &auth, id, Action::Read).await?;
    Ok(Json(views::team_view(&state.db, team).await?))
}

pub async fn replace_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<TeamRequest>,
) -> ApiResult<Json<TeamView>> {
    req.validate()?;
    apply_update(&state, &auth, id, req.into()).await
}

pub async fn patch_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchTeamRequest>,
) -> ApiResult<Json<TeamView>> {
    req.validate()?;
    apply_update(&state, &auth, id, req.into()).await
}

async fn apply_update(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    update: UpdateTeam,
) -> ApiResult<Json<TeamView>> {
    load_for(state, auth, id, Action::Update).await?;

    let team = Team::update(&state.db, id, update)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Team))?;

    Ok(Json(views::team_view(&state.db, team).await?))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_for(&state, &auth, id, Action::Delete).await?;

    if !Team::delete(&state.db, id).await? {
        return Err(not_found(ResourceKind::Team));
    }

    tracing::info!(team_id = %id, "Team deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Adds a user to the team
///
/// Adding someone who is already a member succeeds without changes. A
/// newly added member other than the caller is notified.
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<Json<TeamView>> {
    let team = load_for(&state, &auth, id, Action::Update).await?;

    if !User::exists(&state.db, req.user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let added = Team::add_member(&state.db, team.id, req.user_id).await?;

    if added {
        tracing::info!(team_id = %team.id, user_id = %req.user_id, "Team member added");

        if req.user_id != auth.user_id {
            Notification::create(
                &state.db,
                req.user_id,
                format!("You have been added to team \"{}\"", team.name),
                false,
            )
            .await?;
        }
    }

    Ok(Json(views::team_view(&state.db, team).await?))
}

/// Removes a member; the creator cannot be removed
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<Json<TeamView>> {
    let team = load_for(&state, &auth, id, Action::Delete).await?;

    if req.user_id == team.created_by {
        return Err(ApiError::BadRequest(
            "The team creator cannot be removed".to_string(),
        ));
    }

    if !Team::remove_member(&state.db, team.id, req.user_id).await? {
        return Err(ApiError::NotFound("User is not a member of this team".to_string()));
    }

    tracing::info!(team_id = %team.id, user_id = %req.user_id, "Team member removed");

    Ok(Json(views::team_view(&state.db, team).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_clears_description() {
        let req: TeamRequest = serde_json::from_str(r#"{"name": "Platform"}"#).unwrap();
        let update = UpdateTeam::from(req);

        assert_eq!(update.name.as_deref(), Some("Platform"));
        assert_eq!(update.description, Some(None));
    }

    #[test]
    fn test_patch_keeps_description() {
        let req: PatchTeamRequest = serde_json::from_str(r#"{"name": "Infra"}"#).unwrap();
        let update = UpdateTeam::from(req);

        assert_eq!(update.description, None);
    }

    #[test]
    fn test_member_request_accepts_user_alias() {
        let user_id = Uuid::new_v4();
        let req: MemberRequest =
            serde_json::from_value(serde_json::json!({ "user": user_id })).unwrap();
        assert_eq!(req.user_id, user_id);
    }

    #[test]
    fn test_name_length() {
        let req = TeamRequest {
            name: "x".repeat(151),
            description: None,
        };
        assert!(req.validate().is_err());
    }
}
