//! Project access controller: project CRUD, membership management, and the
//! authorization checks the task service reuses.
//!
//! Every operation checks existence before authorization, so callers can
//! tell 404 from 403.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Project, ProjectInput, ProjectPatch, ProjectStatus};

use super::{merge_opt_text, merge_text};

const NOT_FOUND: &str = "Project not found";
const NO_ACCESS: &str = "You do not have access to this project";
const OWNER_ONLY: &str = "Only the project owner can perform this action";

/// Project row with the member ids aggregated in join order.
const PROJECT_SELECT: &str = "SELECT p.id, p.name, p.description, p.owner_id, p.status, \
     p.start_date, p.end_date, \
     ARRAY(SELECT pm.user_id FROM project_members pm \
           WHERE pm.project_id = p.id ORDER BY pm.added_at, pm.user_id) AS members, \
     p.created_at \
     FROM projects p";

/// Bare project row, used inside update transactions where the member set
/// is handled separately.
#[derive(FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    owner_id: i32,
    status: ProjectStatus,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

pub(crate) async fn fetch(pool: &PgPool, id: Uuid) -> Result<Option<Project>, AppError> {
    let sql = format!("{} WHERE p.id = $1", PROJECT_SELECT);
    let project = sqlx::query_as::<_, Project>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(project)
}

pub(crate) fn require_access(project: &Project, user_id: i32) -> Result<(), AppError> {
    if project.can_access(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(NO_ACCESS.into()))
    }
}

pub(crate) fn require_manage(project: &Project, user_id: i32) -> Result<(), AppError> {
    if project.can_manage(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(OWNER_ONLY.into()))
    }
}

/// Creates a project owned by `owner_id`. The initial member set defaults
/// to empty; duplicate ids are collapsed.
pub async fn create(pool: &PgPool, owner_id: i32, input: ProjectInput) -> Result<Project, AppError> {
    let project_id = Uuid::new_v4();
    let mut members = input.members.unwrap_or_default();
    members.sort_unstable();
    members.dedup();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO projects (id, name, description, owner_id, start_date, end_date) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(project_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(owner_id)
    .bind(input.start_date)
    .bind(input.end_date)
    .execute(&mut *tx)
    .await?;

    for user_id in &members {
        sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    fetch(pool, project_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Failed to load created project".into()))
}

/// Every project where the user is owner or member, newest first.
pub async fn list_accessible(pool: &PgPool, user_id: i32) -> Result<Vec<Project>, AppError> {
    let sql = format!(
        "{} WHERE p.owner_id = $1 OR EXISTS \
         (SELECT 1 FROM project_members pm WHERE pm.project_id = p.id AND pm.user_id = $1) \
         ORDER BY p.created_at DESC",
        PROJECT_SELECT
    );
    let projects = sqlx::query_as::<_, Project>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(projects)
}

pub async fn get(pool: &PgPool, id: Uuid, requester_id: i32) -> Result<Project, AppError> {
    let project = fetch(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    require_access(&project, requester_id)?;
    Ok(project)
}

/// Owner-only merge-patch. A present `members` list fully replaces the
/// member set (deduplicated); absent leaves it untouched.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    requester_id: i32,
    patch: ProjectPatch,
) -> Result<Project, AppError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ProjectRow>(
        "SELECT id, name, description, owner_id, status, start_date, end_date \
         FROM projects WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let mut row = row.ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    if row.owner_id != requester_id {
        return Err(AppError::Forbidden(OWNER_ONLY.into()));
    }

    merge_text(&mut row.name, patch.name);
    merge_opt_text(&mut row.description, patch.description);
    if let Some(status) = patch.status {
        row.status = status;
    }
    if let Some(start_date) = patch.start_date {
        row.start_date = Some(start_date);
    }
    if let Some(end_date) = patch.end_date {
        row.end_date = Some(end_date);
    }

    sqlx::query(
        "UPDATE projects SET name = $1, description = $2, status = $3, start_date = $4, \
         end_date = $5 WHERE id = $6",
    )
    .bind(&row.name)
    .bind(&row.description)
    .bind(row.status)
    .bind(row.start_date)
    .bind(row.end_date)
    .bind(row.id)
    .execute(&mut *tx)
    .await?;

    if let Some(mut members) = patch.members {
        members.sort_unstable();
        members.dedup();

        sqlx::query("DELETE FROM project_members WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for user_id in &members {
            sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    fetch(pool, id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Failed to load updated project".into()))
}

/// Owner-only. Tasks under the project are deleted with it.
pub async fn delete(pool: &PgPool, id: Uuid, requester_id: i32) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let owner_id =
        sqlx::query_scalar::<_, i32>("SELECT owner_id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    let owner_id = owner_id.ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    if owner_id != requester_id {
        return Err(AppError::Forbidden(OWNER_ONLY.into()));
    }

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Owner-only. Fails with 400 when the user is already a member; the target
/// user must exist.
pub async fn add_member(
    pool: &PgPool,
    id: Uuid,
    requester_id: i32,
    user_id: i32,
) -> Result<Project, AppError> {
    let mut tx = pool.begin().await?;

    let owner_id =
        sqlx::query_scalar::<_, i32>("SELECT owner_id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    let owner_id = owner_id.ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    if owner_id != requester_id {
        return Err(AppError::Forbidden(OWNER_ONLY.into()));
    }

    let target = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if target.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    let already_member = sqlx::query_scalar::<_, i32>(
        "SELECT 1 FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;
    if already_member.is_some() {
        return Err(AppError::BadRequest(
            "User is already a member of this project".into(),
        ));
    }

    sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    fetch(pool, id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Failed to load updated project".into()))
}

/// Owner-only. Removing a user who is not a member is a no-op success.
pub async fn remove_member(
    pool: &PgPool,
    id: Uuid,
    requester_id: i32,
    user_id: i32,
) -> Result<Project, AppError> {
    let project = fetch(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    require_manage(&project, requester_id)?;

    sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    fetch(pool, id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Failed to load updated project".into()))
}
