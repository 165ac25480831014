/// Comment endpoints
///
/// - `GET /comments` - Comments on tasks in the caller's projects; `?task_id=` filters
/// - `POST /comments` - `{task_id, content}`
/// - `GET /comments/:id`, `PUT /comments/:id`, `PATCH /comments/:id`, `DELETE /comments/:id`
/// - `GET /tasks/:id/comments`, `POST /tasks/:id/comments`
///
/// Only the owner of the task's project may comment. The author may edit
/// their comment; the author or the project owner may delete it.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{ensure_visible, not_found, tasks, Page, Pagination},
    views::{self, CommentView},
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
    models::comment::Comment,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct CommentListParams {
    pub task_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[serde(alias = "task")]
    pub task_id: Uuid,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,
}

/// Body of `PUT` and `POST /tasks/:id/comments`
#[derive(Debug, Deserialize, Validate)]
pub struct CommentContent {
    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchCommentRequest {
    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,
}

async fn load_with_relation(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<(Comment, Relation)> {
    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Comment))?;

    let project_owner = Comment::project_owner(&state.db, id)
        .await?
        .ok_or_else(|| not_found(ResourceKind::Comment))?;

    let rel = Relation {
        owner: project_owner == auth.user_id,
        author: comment.author_id == auth.user_id,
        ..Relation::NONE
    };

    Ok((comment, rel))
}

async fn list(
    state: &AppState,
    auth: &AuthContext,
    task_id: Option<Uuid>,
    page: Pagination,
) -> ApiResult<Page<CommentView>> {
    let count = Comment::count_visible(&state.db, auth.user_id, task_id).await?;
    let comments =
        Comment::list_visible(&state.db, auth.user_id, task_id, page.limit(), page.offset()).await?;

    let results = views::comment_views(&state.db, comments).await?;
    Ok(Page::new(count, page, results))
}

async fn create(
    state: &AppState,
    auth: &AuthContext,
    task_id: Uuid,
    content: String,
) -> ApiResult<CommentView> {
    let (task, rel) = tasks::load_with_relation(state, auth, task_id).await?;
    ensure_visible(ResourceKind::Task, rel)?;

    let comment_rel = Relation {
        owner: rel.owner,
        author: true,
        ..Relation::NONE
    };
    require(ResourceKind::Comment, Action::Create, comment_rel)?;

    let comment = Comment::create(&state.db, task.id, auth.user_id, content).await?;
    tracing::debug!(comment_id = %comment.id, task_id = %task.id, "Comment created");

    Ok(views::comment_view(&state.db, comment).await?)
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<CommentListParams>,
) -> ApiResult<Json<Page<CommentView>>> {
    let page = Pagination {
        limit: params.limit,
        offset: params.offset,
    };

    Ok(Json(list(&state, &auth, params.task_id, page).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    req.validate()?;

    let view = create(&state, &auth, req.task_id, req.content).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_task_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<CommentView>>> {
    let (_, rel) = tasks::load_with_relation(&state, &auth, task_id).await?;
    ensure_visible(ResourceKind::Task, rel)?;

    Ok(Json(list(&state, &auth, Some(task_id), page).await?))
}

pub async fn create_task_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CommentContent>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    req.validate()?;

    let view = create(&state, &auth, task_id, req.content).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CommentView>> {
    let (comment, rel) = load_with_relation(&state, &auth, id).await?;
    ensure_visible(ResourceKind::Comment, rel)?;

    Ok(Json(views::comment_view(&state.db, comment).await?))
}

pub async fn replace_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentContent>,
) -> ApiResult<Json<CommentView>> {
    req.validate()?;
    apply_update(&state, &auth, id, Some(req.content)).await
}

pub async fn patch_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchCommentRequest>,
) -> ApiResult<Json<CommentView>> {
    req.validate()?;
    apply_update(&state, &auth, id, req.content).await
}

async fn apply_update(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    content: Option<String>,
) -> ApiResult<Json<CommentView>> {
    let (current, rel) = load_with_relation(state, auth, id).await?;
    require(ResourceKind::Comment, Action::Update, rel)?;

    let comment = match content {
        Some(content) => Comment::update_content(&state.db, id, content)
            .await?
            .ok_or_else(|| not_found(ResourceKind::Comment))?,
        None => current,
    };

    Ok(Json(views::comment_view(&state.db, comment).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let (_, rel) = load_with_relation(&state, &auth, id).await?;
    require(ResourceKind::Comment, Action::Delete, rel)?;

    if !Comment::delete(&state.db, id).await? {
        return Err(not_found(ResourceKind::Comment));
    }

    Ok(StatusCode::NO_CONTENT)
}
