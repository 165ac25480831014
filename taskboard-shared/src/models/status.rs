/// Enumerations shared by projects and tasks
///
/// # Schema
///
/// ```sql
/// CREATE TYPE work_status AS ENUM ('not_started', 'in_progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
/// ```

use serde::{Deserialize, Serialize};

/// Progress of a project or task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "work_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    /// Not picked up yet (`todo` is accepted on input)
    #[default]
    #[serde(alias = "todo")]
    NotStarted,

    /// Being worked on
    InProgress,

    /// Done
    Completed,
}

impl WorkStatus {
    pub const ALL: [WorkStatus; 3] = [
        WorkStatus::NotStarted,
        WorkStatus::InProgress,
        WorkStatus::Completed,
    ];

    /// Database/JSON representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::NotStarted => "not_started",
            WorkStatus::InProgress => "in_progress",
            WorkStatus::Completed => "completed",
        }
    }

    /// Counted as pending on the dashboard
    pub fn is_pending(&self) -> bool {
        !matches!(self, WorkStatus::Completed)
    }

    /// Database names of every pending status
    pub fn pending_names() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|status| status.is_pending())
            .map(WorkStatus::as_str)
            .collect()
    }
}

/// Task urgency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}
