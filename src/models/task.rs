use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    Pending,
    /// Task is currently being worked on.
    InProgress,
    /// Task is done.
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// A single comment on a task. Comments are embedded on the task row in
/// append order and are never edited or removed through the API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    /// Id of the user who wrote the comment. Retained as a historical
    /// record even after the account is deleted.
    pub author: i32,
    pub created_at: DateTime<Utc>,
}

/// Represents a task entity as stored in the database and returned by the
/// API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// The project this task belongs to. Immutable after creation.
    pub project_id: Uuid,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    /// The user the task is assigned to, if any.
    pub assigned_to: Option<i32>,
    /// The user who created the task. Immutable.
    pub created_by: i32,
    /// Embedded comments, oldest first.
    pub comments: Json<Vec<Comment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub project_id: Uuid,
    /// Defaults to medium when absent.
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<i32>,
}

/// Merge-patch payload for task updates. Absent and empty-string fields
/// leave the stored value unchanged; the project reference is not
/// patchable.
#[derive(Debug, Deserialize, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<i32>,
}

/// Body of `POST /tasks/{id}/comments`.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}
