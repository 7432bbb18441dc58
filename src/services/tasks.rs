//! Task service. Authorization is delegated to the project access
//! controller: reads and writes require owner-or-member access on the
//! parent project, deletion requires the owner.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Comment, Task, TaskInput, TaskPatch, TaskStatus};

use super::projects;
use super::{merge_opt_text, merge_text};

const NOT_FOUND: &str = "Task not found";

const TASK_COLUMNS: &str = "id, title, description, project_id, status, priority, due_date, \
     assigned_to, created_by, comments, created_at, updated_at";

async fn fetch(pool: &PgPool, id: Uuid) -> Result<Option<Task>, AppError> {
    let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(task)
}

/// Loads the parent project of a task, which the schema guarantees exists.
async fn parent_project(pool: &PgPool, project_id: Uuid) -> Result<crate::models::Project, AppError> {
    projects::fetch(pool, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

/// All tasks of a project, newest first. Requires owner-or-member access.
pub async fn list_for_project(
    pool: &PgPool,
    project_id: Uuid,
    requester_id: i32,
) -> Result<Vec<Task>, AppError> {
    // get() performs the existence-then-access checks.
    projects::get(pool, project_id, requester_id).await?;

    let sql = format!(
        "SELECT {} FROM tasks WHERE project_id = $1 ORDER BY created_at DESC",
        TASK_COLUMNS
    );
    let tasks = sqlx::query_as::<_, Task>(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await?;
    Ok(tasks)
}

/// Tasks assigned to the requester, newest first. Assignment implies
/// visibility, so no project-level check is needed.
pub async fn list_for_user(pool: &PgPool, requester_id: i32) -> Result<Vec<Task>, AppError> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE assigned_to = $1 ORDER BY created_at DESC",
        TASK_COLUMNS
    );
    let tasks = sqlx::query_as::<_, Task>(&sql)
        .bind(requester_id)
        .fetch_all(pool)
        .await?;
    Ok(tasks)
}

pub async fn get(pool: &PgPool, id: Uuid, requester_id: i32) -> Result<Task, AppError> {
    let task = fetch(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    let project = parent_project(pool, task.project_id).await?;
    projects::require_access(&project, requester_id)?;

    Ok(task)
}

/// Creates a task in the given project. Any project participant may
/// create; the creator is recorded and immutable.
pub async fn create(pool: &PgPool, requester_id: i32, input: TaskInput) -> Result<Task, AppError> {
    let project = projects::fetch(pool, input.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    projects::require_access(&project, requester_id)?;

    let sql = format!(
        "INSERT INTO tasks (id, title, description, project_id, status, priority, due_date, \
         assigned_to, created_by) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.project_id)
        .bind(TaskStatus::Pending)
        .bind(input.priority.unwrap_or_default())
        .bind(input.due_date)
        .bind(input.assigned_to)
        .bind(requester_id)
        .fetch_one(pool)
        .await?;

    Ok(task)
}

/// Merge-patch update by any project participant. The project reference is
/// not patchable. Runs as a single-row transaction.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    requester_id: i32,
    patch: TaskPatch,
) -> Result<Task, AppError> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {} FROM tasks WHERE id = $1 FOR UPDATE", TASK_COLUMNS);
    let row = sqlx::query_as::<_, Task>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let mut row = row.ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    let project = parent_project(pool, row.project_id).await?;
    projects::require_access(&project, requester_id)?;

    merge_text(&mut row.title, patch.title);
    merge_opt_text(&mut row.description, patch.description);
    if let Some(status) = patch.status {
        row.status = status;
    }
    if let Some(priority) = patch.priority {
        row.priority = priority;
    }
    if let Some(due_date) = patch.due_date {
        row.due_date = Some(due_date);
    }
    if let Some(assigned_to) = patch.assigned_to {
        row.assigned_to = Some(assigned_to);
    }

    let sql = format!(
        "UPDATE tasks SET title = $1, description = $2, status = $3, priority = $4, \
         due_date = $5, assigned_to = $6, updated_at = NOW() WHERE id = $7 RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.status)
        .bind(row.priority)
        .bind(row.due_date)
        .bind(row.assigned_to)
        .bind(row.id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(task)
}

/// Deletes a task. Stricter than update: only the project owner may
/// delete, including tasks they did not create.
pub async fn delete(pool: &PgPool, id: Uuid, requester_id: i32) -> Result<(), AppError> {
    let task = fetch(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    let project = parent_project(pool, task.project_id).await?;
    projects::require_manage(&project, requester_id)?;

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Appends a comment to the task. The append is a single atomic JSONB
/// concat, so concurrent comments never lose each other; comments are
/// never edited or removed through this API.
pub async fn add_comment(
    pool: &PgPool,
    id: Uuid,
    requester_id: i32,
    text: String,
) -> Result<Task, AppError> {
    let task = fetch(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    let project = parent_project(pool, task.project_id).await?;
    projects::require_access(&project, requester_id)?;

    let comment = Comment {
        text,
        author: requester_id,
        created_at: Utc::now(),
    };

    let sql = format!(
        "UPDATE tasks SET comments = comments || $1, updated_at = NOW() \
         WHERE id = $2 RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(Json(vec![comment]))
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(task)
}
