/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check
/// - `auth`: Register, login, token refresh
/// - `users`: Profile and dashboard
/// - `projects`, `tasks`, `comments`, `teams`, `notifications`: CRUD
///
/// Helpers shared by the list endpoints live here too.

pub mod auth;
pub mod comments;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod teams;
pub mod users;

use serde::{Deserialize, Deserializer, Serialize};
use taskboard_shared::auth::authorization::{is_permitted, Action, Relation, ResourceKind};

use crate::error::{ApiError, ApiResult};

/// Page size when `limit` is absent
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest accepted `limit`
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Limit clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Offset, never negative
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// List response envelope
#[derive(Debug, Serialize)]
pub struct Page<T> {
    /// Total matching rows, ignoring limit/offset
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: i64, pagination: Pagination, results: Vec<T>) -> Self {
        Self {
            count,
            limit: pagination.limit(),
            offset: pagination.offset(),
            results,
        }
    }
}

/// Read check: an entity the caller may not read is reported as missing
pub fn ensure_visible(kind: ResourceKind, rel: Relation) -> ApiResult<()> {
    if is_permitted(kind, Action::Read, rel) {
        Ok(())
    } else {
        Err(not_found(kind))
    }
}

pub fn not_found(kind: ResourceKind) -> ApiError {
    let name = kind.to_string();
    let mut chars = name.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => name,
    };
    ApiError::NotFound(format!("{} not found", capitalized))
}

/// Deserializes a nullable PATCH field
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// a missing key stays `None`, `null` becomes `Some(None)`, and a value
/// becomes `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
