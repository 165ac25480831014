/// Project endpoints
///
/// - `GET /projects` - List the caller's projects
/// - `POST /projects` - Create a project owned by the caller
/// - `GET /projects/:id`
/// - `PUT /projects/:id` - Replace all writable fields
/// - `PATCH /projects/:id` - Change some fields
/// - `DELETE /projects/:id` - Delete the project and its tasks
///
/// Projects are private to their owner.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, ensure_visible, not_found, Page, Pagination},
    views::{self, ProjectView},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        authorization::{require, Action, Relation, ResourceKind},
        middleware::AuthContext,
    },
    models::{
        project::{dates_out_of_order, CreateProject, Project, UpdateProject},
        status::WorkStatus,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Column width of `url` and `image_url`
const MAX_LINK_LENGTH: usize = 512;

/// Body of `POST` and `PUT`
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[validate(url(message = "Invalid URL"), length(max = 512))]
    pub url: Option<String>,

    #[validate(length(max = 512, message = "Image reference is too long"))]
    pub image_url: Option<String>,

    #[serde(default)]
    pub status: WorkStatus,

    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Body of `PATCH`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub url: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,

    pub status: Option<WorkStatus>,

    #[serde(default, deserialize_with = "double_option")]
    pub progress: Option<Option<i32>>,

    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
}

impl PatchProjectRequest {
    /// Checks the nullable fields the derive cannot see through
    fn check(&self) -> ApiResult<()> {
        if let Some(Some(progress)) = self.progress {
            if !(0..=100).contains(&progress) {
                return Err(ApiError::invalid_field(
                    "progress",
                    "Progress must be between 0 and 100",
                ));
            }
        }
        for (field, value) in [("url", &self.url), ("image_url", &self.image_url)] {
            if let Some(Some(v)) = value {
                if v.chars().count() > MAX_LINK_LENGTH {
                    return Err(ApiError::invalid_field(
                        field,
                        format!("Must be at most {} characters", MAX_LINK_LENGTH),
                    ));
                }
            }
        }
        if let Some(Some(url)) = &self.url {
            if !validator::ValidateUrl::validate_url(url) {
                return Err(ApiError::invalid_field("url", "Invalid URL"));
            }
        }
        Ok(())
    }
}

impl From<ProjectRequest> for UpdateProject {
    fn from(req: ProjectRequest) -> Self {
        UpdateProject {
            title: Some(req.title),
            description: Some(req.description),
            url: Some(req.url),
            image_url: Some(req.image_url),
            status: Some(req.status),
            progress: Some(req.progress),
            start_date: Some(req.start_date),
            end_date: Some(req.end_date),
        }
    }
}

impl From<PatchProjectRequest> for UpdateProject {
    fn from(req: PatchProjectRequest) -> Self {
        UpdateProject {
            title: req.title,
            description: req.description,
            url: req.url,
            image_url: req.image_url,
            status: req.status,
            progress: req.progress,
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

/// How the caller relates to a project, and to anything created inside it
pub(crate) fn relation(project: &Project, auth: &AuthContext) -> Relation {
    Relation {
        owner: project.owner_id == auth.user_id,
        ..Relation::NONE
    }
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ApiResult<()> {
    if dates_out_of_order(start, end) {
        return Err(ApiError::invalid_field(
            "end_date",
            "End date must not be before start date",
        ));
    }
    Ok(())
}

/// Loads a project the caller can read, or 404
pub(crate) async fn load_visible(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<Project> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Project))?;

    ensure_visible(ResourceKind::Project, relation(&project, auth))?;
    Ok(project)
}

/// Loads a project and checks the caller may perform `action` on it
pub(crate) async fn load_for(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    action: Action,
) -> ApiResult<Project> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Project))?;

    require(ResourceKind::Project, action, relation(&project, auth))?;
    Ok(project)
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<ProjectView>>> {
    let count = Project::count_by_owner(&state.db, auth.user_id).await?;
    let projects =
        Project::list_by_owner(&state.db, auth.user_id, page.limit(), page.offset()).await?;

    let results = views::project_views(&state.db, projects).await?;
    Ok(Json(Page::new(count, page, results)))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    req.validate()?;
    check_dates(req.start_date, req.end_date)?;

    let project = Project::create(
        &state.db,
        CreateProject {
            owner_id: auth.user_id,
            title: req.title,
            description: req.description,
            url: req.url,
            image_url: req.image_url,
            status: req.status,
            progress: req.progress,
            start_date: req.start_date,
            end_date: req.end_date,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, owner_id = %auth.user_id, "Project created");

    Ok((StatusCode::CREATED, Json(views::project_view(&state.db, project).await?)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectView>> {
    let project = load_visible(&state, &auth, id).await?;
    Ok(Json(views::project_view(&state.db, project).await?))
}

pub async fn replace_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<Json<ProjectView>> {
    req.validate()?;
    apply_update(&state, &auth, id, req.into()).await
}

pub async fn patch_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchProjectRequest>,
) -> ApiResult<Json<ProjectView>> {
    req.validate()?;
    req.check()?;
    apply_update(&state, &auth, id, req.into()).await
}

async fn apply_update(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    update: UpdateProject,
) -> ApiResult<Json<ProjectView>> {
    let current = load_for(state, auth, id, Action::Update).await?;

    let (start, end) = update.effective_dates(&current);
    check_dates(start, end)?;

    let project = Project::update(&state.db, id, update)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Project))?;

    Ok(Json(views::project_view(&state.db, project).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_for(&state, &auth, id, Action::Delete).await?;

    if !Project::delete(&state.db, id).await? {
        return Err(not_found(ResourceKind::Project));
    }

    tracing::info!(project_id = %id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}
