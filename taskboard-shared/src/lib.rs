//! # Taskboard Shared Library
//!
//! Domain types, persistence, and authentication primitives used by the
//! Taskboard API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pooling and schema migrations
//! - `models`: Row types and SQL for users, projects, tasks, comments, teams, notifications
//! - `auth`: Password hashing, JWT tokens, request authentication and the resource policy table
//! - `dashboard`: Per-user aggregate statistics

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod models;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
