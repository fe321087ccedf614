use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::User;

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is finished.
    Completed,
    /// Task was abandoned.
    Canceled,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: i32,
    /// The title of the task.
    pub title: String,
    /// An optional description for the task.
    pub description: Option<String>,
    /// The current status of the task.
    pub status: TaskStatus,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task.
#[derive(Debug, Deserialize, Validate)]
pub struct NewTask {
    /// Optional explicit id; creation fails with 400 when it is already taken.
    pub id: Option<i32>,
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Defaults to `todo` when omitted.
    #[serde(default)]
    pub status: TaskStatus,
}

/// Partial update for a task; omitted fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

/// Query parameters for listing tasks.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskQuery {
    /// Number of records to skip. Defaults to 0.
    #[validate(range(min = 0))]
    pub skip: Option<i64>,
    /// Maximum number of records to return. Defaults to 100.
    #[validate(range(min = 1))]
    pub limit: Option<i64>,
    /// Filter tasks by status.
    pub status: Option<TaskStatus>,
    /// Case-insensitive substring filter on the title.
    pub title: Option<String>,
}

/// A task together with the users assigned to it.
#[derive(Debug, Serialize)]
pub struct TaskWithUsers {
    #[serde(flatten)]
    pub task: Task,
    pub assigned_users: Vec<User>,
}
