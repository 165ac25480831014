/// Response shapes
///
/// Entities are returned with their related rows nested: a task carries its
/// project (with the project's owner) and its assignee, a team carries its
/// creator and members, and so on. Builders take rows that were already
/// fetched, collect the related ids, load them with one `WHERE id = ANY($1)`
/// query per table, and assemble the nested objects in memory.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use taskboard_shared::models::{
    comment::Comment,
    notification::Notification,
    project::Project,
    status::{TaskPriority, WorkStatus},
    task::Task,
    team::Team,
    user::User,
};
use uuid::Uuid;

/// Public user fields; never includes the password hash
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub profile_image: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            profile_image: user.profile_image.clone(),
            phone: user.phone.clone(),
            location: user.location.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView::from(&user)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,

    /// Owner
    pub user: Option<UserView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub status: WorkStatus,
    pub completed: bool,
    pub project_id: Uuid,
    pub project: Option<ProjectView>,
    pub assigned_to: Option<UserView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,

    /// Task id
    pub task: Uuid,

    /// Author
    pub user: Option<UserView>,

    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<UserView>,
    pub members: Vec<UserView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,

    /// Addressee
    pub user: Option<UserView>,
}

type UserMap = HashMap<Uuid, UserView>;

async fn load_users(pool: &PgPool, ids: HashSet<Uuid>) -> Result<UserMap, sqlx::Error> {
    let ids: Vec<Uuid> = ids.into_iter().collect();
    let users = User::find_many(pool, &ids).await?;

    Ok(users.iter().map(|u| (u.id, UserView::from(u))).collect())
}

pub async fn project_views(
    pool: &PgPool,
    projects: Vec<Project>,
) -> Result<Vec<ProjectView>, sqlx::Error> {
    let users = load_users(pool, projects.iter().map(|p| p.owner_id).collect()).await?;
    Ok(assemble_projects(projects, &users))
}

pub async fn project_view(pool: &PgPool, project: Project) -> Result<ProjectView, sqlx::Error> {
    single(project_views(pool, vec![project]).await?)
}

pub async fn task_views(pool: &PgPool, tasks: Vec<Task>) -> Result<Vec<TaskView>, sqlx::Error> {
    let project_ids: Vec<Uuid> = tasks
        .iter()
        .map(|t| t.project_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let projects = Project::find_many(pool, &project_ids).await?;

    let mut user_ids: HashSet<Uuid> = tasks.iter().filter_map(|t| t.assigned_to).collect();
    user_ids.extend(projects.iter().map(|p| p.owner_id));
    let users = load_users(pool, user_ids).await?;

    let projects: HashMap<Uuid, ProjectView> = assemble_projects(projects, &users)
        .into_iter()
        .map(|view| (view.project.id, view))
        .collect();

    Ok(assemble_tasks(tasks, &projects, &users))
}

pub async fn task_view(pool: &PgPool, task: Task) -> Result<TaskView, sqlx::Error> {
    single(task_views(pool, vec![task]).await?)
}

pub async fn comment_views(
    pool: &PgPool,
    comments: Vec<Comment>,
) -> Result<Vec<CommentView>, sqlx::Error> {
    let users = load_users(pool, comments.iter().map(|c| c.author_id).collect()).await?;
    Ok(assemble_comments(comments, &users))
}

pub async fn comment_view(pool: &PgPool, comment: Comment) -> Result<CommentView, sqlx::Error> {
    single(comment_views(pool, vec![comment]).await?)
}

pub async fn team_views(pool: &PgPool, teams: Vec<Team>) -> Result<Vec<TeamView>, sqlx::Error> {
    let team_ids: Vec<Uuid> = teams.iter().map(|t| t.id).collect();
    let pairs = Team::member_pairs(pool, &team_ids).await?;

    let mut user_ids: HashSet<Uuid> = teams.iter().map(|t| t.created_by).collect();
    user_ids.extend(pairs.iter().map(|(_, user_id)| *user_id));
    let users = load_users(pool, user_ids).await?;

    Ok(assemble_teams(teams, &pairs, &users))
}

pub async fn team_view(pool: &PgPool, team: Team) -> Result<TeamView, sqlx::Error> {
    single(team_views(pool, vec![team]).await?)
}

pub async fn notification_views(
    pool: &PgPool,
    notifications: Vec<Notification>,
) -> Result<Vec<NotificationView>, sqlx::Error> {
    let users = load_users(pool, notifications.iter().map(|n| n.user_id).collect()).await?;

    Ok(notifications
        .into_iter()
        .map(|notification| NotificationView {
            user: users.get(&notification.user_id).cloned(),
            notification,
        })
        .collect())
}

pub async fn notification_view(
    pool: &PgPool,
    notification: Notification,
) -> Result<NotificationView, sqlx::Error> {
    single(notification_views(pool, vec![notification]).await?)
}

fn single<T>(mut views: Vec<T>) -> Result<T, sqlx::Error> {
    views.pop().ok_or(sqlx::Error::RowNotFound)
}

fn assemble_projects(projects: Vec<Project>, users: &UserMap) -> Vec<ProjectView> {
    projects
        .into_iter()
        .map(|project| ProjectView {
            user: users.get(&project.owner_id).cloned(),
            project,
        })
        .collect()
}

fn assemble_tasks(
    tasks: Vec<Task>,
    projects: &HashMap<Uuid, ProjectView>,
    users: &UserMap,
) -> Vec<TaskView> {
    tasks
        .into_iter()
        .map(|task| TaskView {
            id: task.id,
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            priority: task.priority,
            status: task.status,
            completed: task.completed,
            project_id: task.project_id,
            project: projects.get(&task.project_id).cloned(),
            assigned_to: task.assigned_to.and_then(|id| users.get(&id).cloned()),
            created_at: task.created_at,
            updated_at: task.updated_at,
        })
        .collect()
}

fn assemble_comments(comments: Vec<Comment>, users: &UserMap) -> Vec<CommentView> {
    comments
        .into_iter()
        .map(|comment| CommentView {
            id: comment.id,
            task: comment.task_id,
            user: users.get(&comment.author_id).cloned(),
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
        .collect()
}

fn assemble_teams(teams: Vec<Team>, pairs: &[(Uuid, Uuid)], users: &UserMap) -> Vec<TeamView> {
    let mut members: HashMap<Uuid, Vec<UserView>> = HashMap::new();
    for (team_id, user_id) in pairs {
        if let Some(user) = users.get(user_id) {
            members.entry(*team_id).or_default().push(user.clone());
        }
    }

    teams
        .into_iter()
        .map(|team| TeamView {
            id: team.id,
            created_by: users.get(&team.created_by).cloned(),
            members: members.remove(&team.id).unwrap_or_default(),
            name: team.name,
            description: team.description,
            created_at: team.created_at,
            updated_at: team.updated_at,
        })
        .collect()
}
