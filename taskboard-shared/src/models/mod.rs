/// Database models for Taskboard
///
/// Each module pairs a row type (`sqlx::FromRow`) with the SQL that reads and
/// writes it. Listing queries take the requesting user's id and apply the
/// same visibility rules as [`crate::auth::authorization`].
///
/// # Models
///
/// - `user`: Accounts and profiles
/// - `project`: Projects owned by a single user
/// - `task`: Work items inside a project, optionally assigned
/// - `comment`: Discussion attached to a task
/// - `team`: Named groups of users
/// - `notification`: Messages addressed to one user
/// - `status`: Enumerations shared by projects and tasks

pub mod comment;
pub mod notification;
pub mod project;
pub mod status;
pub mod task;
pub mod team;
pub mod user;
