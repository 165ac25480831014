/// Task endpoints
///
/// - `GET /tasks` - Tasks in the caller's projects or assigned to them;
///   filter with `?project_id=` and `?status=`
/// - `POST /tasks` - Create a task in a project the caller owns
/// - `GET /tasks/:id`
/// - `PUT /tasks/:id`, `PATCH /tasks/:id`
/// - `DELETE /tasks/:id` - Project owner only
///
/// When a task is assigned to someone other than the caller, the new
/// assignee gets a notification.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, ensure_visible, not_found, projects, Page, Pagination},
    views::{self, TaskView},
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
        notification::Notification,
        project::Project,
        status::{TaskPriority, WorkStatus},
        task::{CreateTask, Task, TaskFilter, UpdateTask},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

/// `GET /tasks` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub project_id: Option<Uuid>,
    pub status: Option<WorkStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TaskListParams {
    fn filter(&self) -> TaskFilter {
        TaskFilter {
            project_id: self.project_id,
            status: self.status,
        }
    }

    fn pagination(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Body of `POST` and `PUT`
#[derive(Debug, Deserialize, Validate)]
pub struct TaskRequest {
    pub project_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub status: WorkStatus,

    #[serde(default)]
    pub completed: bool,

    /// Defaults to the caller on create
    pub assigned_to: Option<Uuid>,
}

/// Body of `PATCH`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchTaskRequest {
    pub project_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,

    pub priority: Option<TaskPriority>,
    pub status: Option<WorkStatus>,
    pub completed: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
}

impl From<TaskRequest> for UpdateTask {
    fn from(req: TaskRequest) -> Self {
        UpdateTask {
            project_id: Some(req.project_id),
            title: Some(req.title),
            description: Some(req.description),
            due_date: Some(req.due_date),
            priority: Some(req.priority),
            status: Some(req.status),
            completed: Some(req.completed),
            assigned_to: Some(req.assigned_to),
        }
    }
}

impl From<PatchTaskRequest> for UpdateTask {
    fn from(req: PatchTaskRequest) -> Self {
        UpdateTask {
            project_id: req.project_id,
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            priority: req.priority,
            status: req.status,
            completed: req.completed,
            assigned_to: req.assigned_to,
        }
    }
}

fn relation(task: &Task, project_owner: Uuid, auth: &AuthContext) -> Relation {
    Relation {
        owner: project_owner == auth.user_id,
        assignee: task.assigned_to == Some(auth.user_id),
        ..Relation::NONE
    }
}

/// Fetches a task together with how the caller relates to it
pub(crate) async fn load_with_relation(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<(Task, Relation)> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Task))?;

    let project = Project::find_by_id(&state.db, task.project_id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Project))?;

    let rel = relation(&task, project.owner_id, auth);
    Ok((task, rel))
}

async fn ensure_user_exists(state: &AppState, user_id: Uuid) -> ApiResult<()> {
    if User::exists(&state.db, user_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("User not found".to_string()))
    }
}

async fn notify_assignment(state: &AppState, task: &Task, auth: &AuthContext) -> ApiResult<()> {
    let Some(assignee) = task.assigned_to else {
        return Ok(());
    };
    if assignee == auth.user_id {
        return Ok(());
    }

    Notification::create(
        &state.db,
        assignee,
        format!("You have been assigned to task \"{}\"", task.title),
        false,
    )
    .await?;

    tracing::debug!(task_id = %task.id, assignee = %assignee, "Assignment notification sent");
    Ok(())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<TaskListParams>,
) -> ApiResult<Json<Page<TaskView>>> {
    let page = params.pagination();
    let filter = params.filter();

    let count = Task::count_visible(&state.db, auth.user_id, filter).await?;
    let tasks =
        Task::list_visible(&state.db, auth.user_id, filter, page.limit(), page.offset()).await?;

    let results = views::task_views(&state.db, tasks).await?;
    Ok(Json(Page::new(count, page, results)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    req.validate()?;

    let project = projects::load_visible(&state, &auth, req.project_id).await?;
    require(ResourceKind::Task, Action::Create, projects::relation(&project, &auth))?;

    let assignee = req.assigned_to.unwrap_or(auth.user_id);
    if assignee != auth.user_id {
        ensure_user_exists(&state, assignee).await?;
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id: project.id,
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            priority: req.priority,
            status: req.status,
            completed: req.completed,
            assigned_to: Some(assignee),
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, project_id = %project.id, "Task created");

    notify_assignment(&state, &task, &auth).await?;

    Ok((StatusCode::CREATED, Json(views::task_view(&state.db, task).await?)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskView>> {
    let (task, rel) = load_with_relation(&state, &auth, id).await?;
    ensure_visible(ResourceKind::Task, rel)?;

    Ok(Json(views::task_view(&state.db, task).await?))
}

pub async fn replace_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<Json<TaskView>> {
    req.validate()?;
    apply_update(&state, &auth, id, req.into()).await
}

pub async fn patch_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    req.validate()?;
    apply_update(&state, &auth, id, req.into()).await
}

async fn apply_update(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    update: UpdateTask,
) -> ApiResult<Json<TaskView>> {
    let (current, rel) = load_with_relation(state, auth, id).await?;
    require(ResourceKind::Task, Action::Update, rel)?;

    // Moving a task requires owning the destination project
    if let Some(project_id) = update.project_id {
        if project_id != current.project_id {
            let destination = projects::load_visible(state, auth, project_id).await?;
            require(ResourceKind::Task, Action::Create, projects::relation(&destination, auth))?;
        }
    }

    let reassigned = match update.assigned_to {
        Some(Some(user_id)) if current.assigned_to != Some(user_id) => {
            ensure_user_exists(state, user_id).await?;
            true
        }
        _ => false,
    };

    let task = Task::update(&state.db, id, update)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Task))?;

    if reassigned {
        notify_assignment(state, &task, auth).await?;
    }

    Ok(Json(views::task_view(&state.db, task).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let (_, rel) = load_with_relation(&state, &auth, id).await?;
    require(ResourceKind::Task, Action::Delete, rel)?;

    if !Task::delete(&state.db, id).await? {
        return Err(not_found(ResourceKind::Task));
    }

    tracing::info!(task_id = %id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}
